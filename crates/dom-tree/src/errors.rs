//! Error types for the markup tree

use thiserror::Error;

use crate::node::NodeId;

/// Errors raised while building or querying a [`Document`](crate::Document).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Selector text could not be parsed
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Operation requires an element node
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Tree mutation would produce an invalid hierarchy
    #[error("invalid hierarchy: {0}")]
    Hierarchy(String),

    /// Host already carries a shadow root
    #[error("node {0} already hosts a shadow root")]
    ShadowAlreadyAttached(NodeId),

    /// Document has no root element to flatten
    #[error("document has no document element")]
    MissingDocumentElement,
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    pub fn hierarchy(message: impl Into<String>) -> Self {
        Self::Hierarchy(message.into())
    }
}

pub type DomResult<T> = Result<T, DomError>;
