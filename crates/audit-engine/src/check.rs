//! Check contract and registry.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use soul_a11y_dom::{Document, FlatTree, NodeId, VNodeId, VirtualRef};

use crate::errors::CheckError;
use crate::options::{CheckOverride, RunOptions};
use crate::result::{CheckResult, CheckValue, DqElement};
use crate::locator::LocatorOptions;
use crate::run_context::RunContext;

/// The node a check (or a rule's match predicate) is looking at.
#[derive(Clone, Copy, Debug)]
pub struct CheckNode<'a> {
    tree: &'a FlatTree<'a>,
    vnode: VNodeId,
}

impl<'a> CheckNode<'a> {
    pub fn new(tree: &'a FlatTree<'a>, vnode: VNodeId) -> Self {
        Self { tree, vnode }
    }

    pub fn tree(&self) -> &'a FlatTree<'a> {
        self.tree
    }

    pub fn document(&self) -> &'a Document {
        self.tree.document()
    }

    pub fn vnode(&self) -> VNodeId {
        self.vnode
    }

    /// The actual tree node.
    pub fn node(&self) -> NodeId {
        self.tree.node_of(self.vnode)
    }

    pub fn element(&self) -> VirtualRef<'a> {
        self.tree.element(self.vnode)
    }

    pub fn local_name(&self) -> &'a str {
        self.document().local_name(self.node()).unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.document().attribute(self.node(), name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// What a check reports for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub result: CheckValue,
    pub data: Value,
    /// Other nodes involved in the finding.
    pub related_nodes: Vec<NodeId>,
}

impl CheckOutcome {
    pub fn new(result: CheckValue) -> Self {
        Self {
            result,
            data: Value::Null,
            related_nodes: Vec::new(),
        }
    }

    pub fn pass() -> Self {
        Self::new(CheckValue::Pass)
    }

    pub fn fail() -> Self {
        Self::new(CheckValue::Fail)
    }

    pub fn indeterminate() -> Self {
        Self::new(CheckValue::Indeterminate)
    }

    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_related(mut self, nodes: Vec<NodeId>) -> Self {
        self.related_nodes = nodes;
        self
    }
}

/// Options a check runs with, after all override layers.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOption {
    pub enabled: bool,
    pub options: Value,
    pub absolute_paths: bool,
}

/// An atomic test applied to one node.
#[async_trait]
pub trait Check: Send + Sync {
    fn id(&self) -> &str;

    fn enabled(&self) -> bool {
        true
    }

    fn default_options(&self) -> Value {
        Value::Null
    }

    /// `Ok(None)` means the check has nothing to report for this node.
    async fn evaluate(
        &self,
        node: CheckNode<'_>,
        option: &CheckOption,
    ) -> Result<Option<CheckOutcome>, CheckError>;

    /// Post-run filter over every result this check produced within one rule. Returns the
    /// indices of the results to keep, or `None` when the check has no filter.
    fn after(&self, _results: &[&CheckResult], _option: &CheckOption) -> Option<Vec<usize>> {
        None
    }
}

/// Reference from a rule to a check, optionally carrying rule-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CheckRefRepr", into = "CheckRefRepr")]
pub struct CheckRef {
    pub id: String,
    pub options: Option<Value>,
}

impl CheckRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: None,
        }
    }

    pub fn with_options(id: impl Into<String>, options: Value) -> Self {
        Self {
            id: id.into(),
            options: Some(options),
        }
    }
}

impl From<&str> for CheckRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Accepts either a bare id or `{ id, options }`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CheckRefRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },
}

impl From<CheckRefRepr> for CheckRef {
    fn from(repr: CheckRefRepr) -> Self {
        match repr {
            CheckRefRepr::Id(id) => Self::new(id),
            CheckRefRepr::Full { id, options } => Self { id, options },
        }
    }
}

impl From<CheckRef> for CheckRefRepr {
    fn from(reference: CheckRef) -> Self {
        match reference.options {
            None => CheckRefRepr::Id(reference.id),
            Some(options) => CheckRefRepr::Full {
                id: reference.id,
                options: Some(options),
            },
        }
    }
}

/// Checks known to an audit, keyed by id.
#[derive(Default)]
pub struct CheckRegistry {
    checks: DashMap<String, Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `check`, replacing any check with the same id.
    pub fn register(&self, check: Arc<dyn Check>) {
        self.checks.insert(check.id().to_string(), check);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Check>> {
        self.checks.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.checks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.checks.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("CheckRegistry").field("checks", &ids).finish()
    }
}

impl CheckOverride {
    fn apply(&self, option: &mut CheckOption) {
        if let Some(enabled) = self.enabled {
            option.enabled = enabled;
        }
        if let Some(options) = &self.options {
            option.options = options.clone();
        }
    }
}

/// Resolves the options `check` runs with inside `rule_id`: the check's own defaults, the
/// rule's reference, run-wide check overrides, then the rule's check overrides.
pub fn resolve_check_option(
    check: &dyn Check,
    rule_id: &str,
    reference: Option<&CheckRef>,
    options: &RunOptions,
) -> CheckOption {
    let mut resolved = CheckOption {
        enabled: check.enabled(),
        options: check.default_options(),
        absolute_paths: options.absolute_paths,
    };
    if let Some(value) = reference.and_then(|r| r.options.as_ref()) {
        resolved.options = value.clone();
    }
    if let Some(check_override) = options.checks.get(check.id()) {
        check_override.apply(&mut resolved);
    }
    if let Some(rule_override) = options
        .rules
        .get(rule_id)
        .and_then(|rule| rule.checks.get(check.id()))
    {
        rule_override.apply(&mut resolved);
    }
    resolved
}

impl CheckResult {
    pub(crate) fn from_outcome(
        run: &RunContext<'_>,
        id: &str,
        outcome: CheckOutcome,
        option: &CheckOption,
    ) -> Self {
        let locator = LocatorOptions {
            to_root: option.absolute_paths,
            ..LocatorOptions::default()
        };
        Self {
            id: id.to_string(),
            result: outcome.result,
            data: outcome.data,
            related_nodes: outcome
                .related_nodes
                .into_iter()
                .map(|node| DqElement::new(run, node, &locator))
                .collect(),
            filtered: false,
        }
    }
}
