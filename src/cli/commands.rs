use clap::Subcommand;

use super::audit::AuditArgs;
use super::locate::LocateArgs;
use super::stats::StatsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Audit an HTML file with the built-in rules
    Audit(AuditArgs),

    /// Print unique locators for the elements matching a selector
    Locate(LocateArgs),

    /// Print tag, class and attribute frequencies of a document
    Stats(StatsArgs),

    /// Show version, configuration and the rule catalog
    Info,
}
