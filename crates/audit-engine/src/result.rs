//! Rule and check results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use soul_a11y_dom::NodeId;

use crate::locator::{get_selector, Locator, LocatorOptions};
use crate::rule::CheckKind;
use crate::run_context::RunContext;

/// Longest markup snippet kept for a reported node.
pub const SOURCE_SNIPPET_MAX: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckValue {
    Pass,
    Fail,
    Indeterminate,
}

/// A reported node: its locator plus a markup snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqElement {
    pub selector: Locator,
    pub source: String,
    #[serde(skip)]
    pub element: Option<NodeId>,
}

impl DqElement {
    pub fn new(run: &RunContext<'_>, element: NodeId, options: &LocatorOptions) -> Self {
        Self {
            selector: get_selector(run, element, options),
            source: run.document().source_snippet(element, SOURCE_SNIPPET_MAX),
            element: Some(element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub result: CheckValue,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub related_nodes: Vec<DqElement>,
    /// Set when an after-filter dropped this result.
    #[serde(default)]
    pub filtered: bool,
}

/// Check results recorded for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node: DqElement,
    pub any: Vec<CheckResult>,
    pub all: Vec<CheckResult>,
    pub none: Vec<CheckResult>,
}

impl NodeResult {
    pub fn group(&self, kind: CheckKind) -> &[CheckResult] {
        match kind {
            CheckKind::Any => &self.any,
            CheckKind::All => &self.all,
            CheckKind::None => &self.none,
        }
    }

    pub fn group_mut(&mut self, kind: CheckKind) -> &mut Vec<CheckResult> {
        match kind {
            CheckKind::Any => &mut self.any,
            CheckKind::All => &mut self.all,
            CheckKind::None => &mut self.none,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty() && self.none.is_empty()
    }

    /// Pass/fail/incomplete verdict for this node.
    ///
    /// `all` checks must pass, `none` checks must not pass (they detect the unwanted
    /// condition), and at least one `any` check must pass when there are any. A missing
    /// verdict without a failure makes the node incomplete.
    pub fn outcome(&self) -> CheckValue {
        let mut incomplete = false;

        for check in &self.all {
            match check.result {
                CheckValue::Fail => return CheckValue::Fail,
                CheckValue::Indeterminate => incomplete = true,
                CheckValue::Pass => {}
            }
        }
        for check in &self.none {
            match check.result {
                CheckValue::Pass => return CheckValue::Fail,
                CheckValue::Indeterminate => incomplete = true,
                CheckValue::Fail => {}
            }
        }
        if !self.any.is_empty() && !self.any.iter().any(|c| c.result == CheckValue::Pass) {
            if self.any.iter().any(|c| c.result == CheckValue::Indeterminate) {
                incomplete = true;
            } else {
                return CheckValue::Fail;
            }
        }

        if incomplete {
            CheckValue::Indeterminate
        } else {
            CheckValue::Pass
        }
    }
}

/// Outcome of running one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub id: String,
    pub page_level: bool,
    pub tags: Vec<String>,
    pub nodes: Vec<NodeResult>,
}

impl RuleResult {
    pub fn new(id: impl Into<String>, page_level: bool, tags: Vec<String>) -> Self {
        Self {
            id: id.into(),
            page_level,
            tags,
            nodes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: &str, result: CheckValue) -> CheckResult {
        CheckResult {
            id: id.into(),
            result,
            data: Value::Null,
            related_nodes: Vec::new(),
            filtered: false,
        }
    }

    fn node(any: Vec<CheckResult>, all: Vec<CheckResult>, none: Vec<CheckResult>) -> NodeResult {
        NodeResult {
            node: DqElement {
                selector: Locator::Single("p".into()),
                source: "<p>".into(),
                element: None,
            },
            any,
            all,
            none,
        }
    }

    #[test]
    fn test_outcome_combinators() {
        use CheckValue::*;
        assert_eq!(node(vec![check("a", Fail), check("b", Pass)], vec![], vec![]).outcome(), Pass);
        assert_eq!(node(vec![check("a", Fail)], vec![], vec![]).outcome(), Fail);
        assert_eq!(node(vec![], vec![check("a", Pass)], vec![check("n", Pass)]).outcome(), Fail);
        assert_eq!(node(vec![], vec![check("a", Pass)], vec![check("n", Fail)]).outcome(), Pass);
        assert_eq!(
            node(vec![check("a", Indeterminate)], vec![check("b", Pass)], vec![]).outcome(),
            Indeterminate
        );
        assert_eq!(
            node(vec![check("a", Indeterminate)], vec![check("b", Fail)], vec![]).outcome(),
            Fail
        );
    }

    #[test]
    fn test_locator_serializes_untagged() {
        let single = serde_json::to_value(Locator::Single("#main".into())).unwrap();
        assert_eq!(single, serde_json::json!("#main"));
        let shadow =
            serde_json::to_value(Locator::Shadow(vec!["#host".into(), "#inner".into()])).unwrap();
        assert_eq!(shadow, serde_json::json!(["#host", "#inner"]));
    }
}
