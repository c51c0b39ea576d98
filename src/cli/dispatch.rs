use super::audit::cmd_audit;
use super::env::CliArgs;
use super::info::cmd_info;
use super::locate::cmd_locate;
use super::stats::cmd_stats;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Audit(args) => cmd_audit(args, ctx).await,
        Commands::Locate(args) => cmd_locate(args, ctx).await,
        Commands::Stats(args) => cmd_stats(args, ctx).await,
        Commands::Info => cmd_info(ctx).await,
    }
}
