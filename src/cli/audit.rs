use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use soul_a11y_dom::FlatTree;
use soul_a11y_engine::{metrics, Context};
use tracing::{debug, warn};

use super::context::CliContext;
use super::output::render_structured;
use super::runtime::load_document;
use crate::catalog::builtin_audit;
use crate::report::render_human;

#[derive(Args, Clone, Debug)]
pub struct AuditArgs {
    /// HTML file to audit
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only audit inside elements matching this selector (repeatable)
    #[arg(long, value_name = "SELECTOR")]
    pub include: Vec<String>,

    /// Skip elements matching this selector (repeatable)
    #[arg(long, value_name = "SELECTOR")]
    pub exclude: Vec<String>,

    /// Report full locator paths
    #[arg(long)]
    pub absolute_paths: bool,

    /// Exit with an error when violations are found
    #[arg(long)]
    pub fail_on_violation: bool,
}

pub async fn cmd_audit(args: AuditArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let document = load_document(&args.file).await?;
    let tree = FlatTree::build(&document).context("building flattened tree")?;

    let include = if args.include.is_empty() {
        config.include.as_slice()
    } else {
        args.include.as_slice()
    };
    let exclude = if args.exclude.is_empty() {
        config.exclude.as_slice()
    } else {
        args.exclude.as_slice()
    };
    let context =
        Context::from_selectors(&tree, include, exclude).context("resolving audit context")?;

    let mut audit = builtin_audit();
    for patch in config.rules.iter().cloned() {
        let rule_id = patch.id.clone();
        if let Err(err) = audit.configure_rule(patch) {
            warn!(rule = %rule_id, error = %err, "ignoring rule configuration");
        }
    }

    let mut options = config.options.clone();
    options.absolute_paths |= args.absolute_paths;

    let report = audit.run(&tree, &context, &options).await;
    debug!(metrics = ?metrics::snapshot(), "engine counters");

    match render_structured(&report, ctx.output())? {
        Some(rendered) => println!("{rendered}"),
        None => print!("{}", render_human(&report)),
    }

    if args.fail_on_violation && report.has_violations() {
        bail!(
            "{} accessibility violation(s) found in {}",
            report.violation_count(),
            args.file.display()
        );
    }
    Ok(())
}
