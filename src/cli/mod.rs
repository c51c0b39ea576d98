pub mod app;
pub mod audit;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod locate;
pub mod output;
pub mod runtime;
pub mod stats;

pub use app::run;
pub use audit::{cmd_audit, AuditArgs};
pub use locate::{cmd_locate, LocateArgs};
pub use stats::{cmd_stats, StatsArgs};
