//! Error types for rule execution

use soul_a11y_dom::DomError;
use thiserror::Error;

/// Failure raised by a check (or a rule's match predicate) while looking at one node.
#[derive(Debug, Error, Clone)]
pub enum CheckError {
    /// A tree capability the check relies on is not available here
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The check could not produce a result
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl CheckError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

/// Errors surfaced by a rule run or by audit configuration.
#[derive(Debug, Error, Clone)]
pub enum AuditError {
    /// The rule's match predicate failed while filtering gathered nodes
    #[error("rule '{rule_id}' is not supported here: {cause}")]
    Unsupported { rule_id: String, cause: String },

    /// A check failed; the rule produced no result
    #[error("check '{check_id}' failed in rule '{rule_id}': {source}")]
    CheckFailed {
        rule_id: String,
        check_id: String,
        #[source]
        source: CheckError,
    },

    /// A rule references a check that is not registered
    #[error("rule '{rule_id}' references unknown check '{check_id}'")]
    UnknownCheck { rule_id: String, check_id: String },

    /// No rule with this id is registered
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// The rule's selector could not be parsed
    #[error("rule '{rule_id}' has an invalid selector: {source}")]
    Selector {
        rule_id: String,
        #[source]
        source: DomError,
    },
}

impl AuditError {
    /// Rule-scoped errors are recorded by the caller, which keeps running other rules.
    pub fn is_rule_scoped(&self) -> bool {
        matches!(
            self,
            AuditError::Unsupported { .. } | AuditError::Selector { .. }
        )
    }

    pub fn rule_id(&self) -> Option<&str> {
        match self {
            AuditError::Unsupported { rule_id, .. }
            | AuditError::CheckFailed { rule_id, .. }
            | AuditError::UnknownCheck { rule_id, .. }
            | AuditError::Selector { rule_id, .. } => Some(rule_id),
            AuditError::UnknownRule(_) => None,
        }
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
