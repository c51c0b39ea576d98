//! Built-in checks and rules.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use soul_a11y_dom::{escape_string, SelectorList};
use soul_a11y_engine::{
    Audit, Check, CheckError, CheckNode, CheckOption, CheckOutcome, CheckResult, RuleSpec,
};

/// Roles that mark an image as decorative.
const PRESENTATIONAL_ROLES: &[&str] = &["presentation", "none"];

const MAIN_LANDMARK: &str = r#"main, [role="main"]"#;

/// Image has a text alternative or is marked decorative.
pub struct HasAlt;

#[async_trait]
impl Check for HasAlt {
    fn id(&self) -> &str {
        "has-alt"
    }

    async fn evaluate(
        &self,
        node: CheckNode<'_>,
        _option: &CheckOption,
    ) -> Result<Option<CheckOutcome>, CheckError> {
        let decorative = node
            .attribute("role")
            .is_some_and(|role| PRESENTATIONAL_ROLES.contains(&role.trim()));
        let labelled = ["alt", "aria-label", "aria-labelledby"]
            .iter()
            .any(|name| node.has_attribute(name));
        Ok(Some(CheckOutcome::from_bool(decorative || labelled)))
    }
}

/// Document element declares a language.
pub struct HasLang;

#[async_trait]
impl Check for HasLang {
    fn id(&self) -> &str {
        "has-lang"
    }

    async fn evaluate(
        &self,
        node: CheckNode<'_>,
        _option: &CheckOption,
    ) -> Result<Option<CheckOutcome>, CheckError> {
        let lang = ["lang", "xml:lang"]
            .iter()
            .filter_map(|name| node.attribute(name))
            .map(str::trim)
            .find(|lang| !lang.is_empty());
        Ok(Some(match lang {
            Some(lang) => CheckOutcome::pass().with_data(json!(lang)),
            None => CheckOutcome::fail(),
        }))
    }
}

/// Id value is unique within the element's root.
pub struct DuplicateId;

#[async_trait]
impl Check for DuplicateId {
    fn id(&self) -> &str {
        "duplicate-id"
    }

    async fn evaluate(
        &self,
        node: CheckNode<'_>,
        _option: &CheckOption,
    ) -> Result<Option<CheckOutcome>, CheckError> {
        let Some(id) = node.attribute("id").map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let doc = node.document();
        let selector = SelectorList::parse(&format!("[id={}]", escape_string(id)))?;
        let others: Vec<_> = doc
            .query_all(doc.root_of(node.node()), &selector)
            .into_iter()
            .filter(|other| *other != node.node())
            .collect();

        Ok(Some(
            CheckOutcome::from_bool(others.is_empty())
                .with_data(json!(id))
                .with_related(others),
        ))
    }

    /// Reports every id value once.
    fn after(&self, results: &[&CheckResult], _option: &CheckOption) -> Option<Vec<usize>> {
        let mut seen = HashSet::new();
        Some(
            results
                .iter()
                .enumerate()
                .filter(|(_, result)| seen.insert(result.data.to_string()))
                .map(|(index, _)| index)
                .collect(),
        )
    }
}

/// Page has a main landmark.
pub struct HasMain;

#[async_trait]
impl Check for HasMain {
    fn id(&self) -> &str {
        "has-main"
    }

    async fn evaluate(
        &self,
        node: CheckNode<'_>,
        _option: &CheckOption,
    ) -> Result<Option<CheckOutcome>, CheckError> {
        let tree = node.tree();
        let selector = SelectorList::parse(MAIN_LANDMARK)?;
        let mains: Vec<_> = tree
            .query_all_filter(tree.root(), &selector, |_| true)
            .into_iter()
            .map(|vnode| tree.node_of(vnode))
            .collect();
        Ok(Some(
            CheckOutcome::from_bool(!mains.is_empty())
                .with_data(json!(mains.len()))
                .with_related(mains),
        ))
    }
}

/// Checks and rules shipped with the CLI.
pub fn builtin_audit() -> Audit {
    let mut audit = Audit::new();
    let checks: [Arc<dyn Check>; 4] = [
        Arc::new(HasAlt),
        Arc::new(HasLang),
        Arc::new(DuplicateId),
        Arc::new(HasMain),
    ];
    for check in checks {
        audit.add_check(check);
    }

    audit.add_rule(
        RuleSpec::new("image-alt")
            .selector("img")
            .any(["has-alt"])
            .tags(["wcag2a", "cat.text-alternatives"]),
    );
    audit.add_rule(
        RuleSpec::new("html-has-lang")
            .selector("html")
            .any(["has-lang"])
            .tags(["wcag2a", "cat.language"]),
    );
    audit.add_rule(
        RuleSpec::new("duplicate-id")
            .selector("[id]")
            .any(["duplicate-id"])
            .exclude_hidden(false)
            .tags(["wcag2a", "cat.parsing"]),
    );
    audit.add_rule(
        RuleSpec::new("landmark-one-main")
            .selector("html")
            .all(["has-main"])
            .page_level(true)
            .tags(["best-practice", "cat.semantics"]),
    );
    audit
}
