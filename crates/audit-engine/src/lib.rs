//! Accessibility rule engine.
//!
//! Rules gather nodes from a flattened tree inside a [`Context`], run their checks over
//! every gathered node and report each node under a unique locator. All per-run state
//! (feature statistics, selection cache) lives in a [`RunContext`].

pub mod audit;
pub mod check;
pub mod errors;
pub mod locator;
pub mod metrics;
pub mod options;
pub mod queue;
pub mod result;
pub mod rule;
pub mod run_context;
pub mod select;

pub use audit::{Audit, AuditReport, RuleError, RuleReport};
pub use check::{
    resolve_check_option, Check, CheckNode, CheckOption, CheckOutcome, CheckRef, CheckRegistry,
};
pub use errors::{AuditError, AuditResult, CheckError};
pub use locator::{friendly_uri_end, get_selector, FeatureStatistics, Locator, LocatorOptions};
pub use options::{CheckOverride, RuleOverride, RunOnly, RunOptions};
pub use queue::CheckQueue;
pub use result::{CheckResult, CheckValue, DqElement, NodeResult, RuleResult};
pub use rule::{CheckGroup, CheckKind, MatchFn, Rule, RulePatch, RuleSpec};
pub use run_context::RunContext;
pub use select::{is_node_in_context, select, Context};
