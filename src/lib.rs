//! soul-a11y library
//!
//! Built-in rule catalog, configuration loading, report rendering and the CLI.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod report;

pub use catalog::builtin_audit;
pub use config::{load_configuration, AuditConfig, LoadedConfig};
