use std::sync::Arc;

use pretty_assertions::assert_eq;
use soul_a11y_dom::{Document, FlatTree, VNodeId};
use soul_a11y_engine::{is_node_in_context, select, Context, RunContext};

const PAGE: &str = r#"<!doctype html>
<html><body>
  <div id="outer">
    <p id="p1"></p>
    <div id="inner">
      <p id="p2"></p>
      <div id="deep"><p id="p3"></p></div>
    </div>
  </div>
  <p id="p4"></p>
  <section id="widget"><template shadowrootmode="open"><p id="p5"></p></template></section>
</body></html>"#;

fn ids(tree: &FlatTree<'_>, nodes: &[VNodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| {
            tree.document()
                .attribute(tree.node_of(*node), "id")
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[test]
fn whole_document_includes_shadow_content_in_tree_order() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let found = select("p", &Context::document(&tree), &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["p1", "p2", "p3", "p4", "p5"]);
}

#[test]
fn nested_includes_do_not_duplicate_nodes() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let context = Context::from_selectors(&tree, &["#inner", "#outer", "#deep"], &[]).unwrap();
    let found = select("p", &context, &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["p2", "p3", "p1"]);
}

#[test]
fn exclude_nested_in_include_removes_nodes() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let context = Context::from_selectors(&tree, &["#outer"], &["#inner"]).unwrap();
    let found = select("p", &context, &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["p1"]);
}

#[test]
fn exclude_outside_the_include_scope_is_ignored() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    // #deep is included again inside the excluded #inner
    let context = Context::from_selectors(&tree, &["#outer", "#deep"], &["#inner"]).unwrap();
    let found = select("p", &context, &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["p1", "p3"]);

    // selections are cached per run, so a different context needs a fresh run
    let run = RunContext::new(&tree);
    let context = Context::from_selectors(&tree, &["#inner"], &["#outer"]).unwrap();
    let found = select("p", &context, &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["p2", "p3"]);
}

#[test]
fn include_root_itself_can_match() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let context = Context::from_selectors(&tree, &["#deep"], &[]).unwrap();
    let found = select("div", &context, &run).unwrap();
    assert_eq!(ids(&tree, &found), vec!["deep"]);
}

#[test]
fn membership_requires_a_covering_include() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();

    let context = Context::from_selectors(&tree, &["#inner"], &["#deep"]).unwrap();
    let by_id = |id: &str| {
        tree.iter()
            .find(|node| doc.attribute(tree.node_of(*node), "id") == Some(id))
            .unwrap()
    };
    assert!(!is_node_in_context(&tree, by_id("p1"), &context));
    assert!(is_node_in_context(&tree, by_id("p2"), &context));
    assert!(!is_node_in_context(&tree, by_id("p3"), &context));
    assert!(!is_node_in_context(&tree, by_id("deep"), &context));
}

#[test]
fn repeated_selection_returns_the_cached_result() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);
    let context = Context::document(&tree);

    let first = select("p", &context, &run).unwrap();
    let second = select("p", &context, &run).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // keys are the exact selector text
    let scoped = select("body p", &context, &run).unwrap();
    assert!(!Arc::ptr_eq(&first, &scoped));
    assert_eq!(first, scoped);

    let fresh = RunContext::new(&tree);
    let third = select("p", &context, &fresh).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn invalid_selectors_are_reported() {
    let doc = Document::parse_html(PAGE).unwrap();
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    assert!(select("p[", &Context::document(&tree), &run).is_err());
    assert!(Context::from_selectors(&tree, &["##"], &[]).is_err());
}
