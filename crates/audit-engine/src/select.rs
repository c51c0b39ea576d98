//! Context-bounded node selection.

use std::collections::HashSet;
use std::sync::Arc;

use soul_a11y_dom::{DomResult, FlatTree, SelectorList, VNodeId};
use tracing::debug;

use crate::metrics;
use crate::run_context::RunContext;

/// Resolved include/exclude node sets. Every node belongs to the flattened tree the run
/// was built from; membership is decided by containment, not identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub include: Vec<VNodeId>,
    pub exclude: Vec<VNodeId>,
}

impl Context {
    pub fn new(include: Vec<VNodeId>, exclude: Vec<VNodeId>) -> Self {
        Self { include, exclude }
    }

    /// The whole document, nothing excluded.
    pub fn document(tree: &FlatTree<'_>) -> Self {
        Self::new(vec![tree.root()], Vec::new())
    }

    /// Resolves selector lists against `tree`. An empty include list means the whole
    /// document.
    pub fn from_selectors<S: AsRef<str>>(
        tree: &FlatTree<'_>,
        include: &[S],
        exclude: &[S],
    ) -> DomResult<Self> {
        let include = if include.is_empty() {
            vec![tree.root()]
        } else {
            resolve_all(tree, include)?
        };
        let exclude = resolve_all(tree, exclude)?;
        Ok(Self::new(include, exclude))
    }
}

fn resolve_all<S: AsRef<str>>(tree: &FlatTree<'_>, selectors: &[S]) -> DomResult<Vec<VNodeId>> {
    let mut nodes = Vec::new();
    for selector in selectors {
        let parsed = SelectorList::parse(selector.as_ref())?;
        if tree.matches(tree.root(), &parsed) {
            nodes.push(tree.root());
        }
        nodes.extend(tree.query_all_filter(tree.root(), &parsed, |_| true));
    }
    Ok(nodes)
}

/// Nodes matching `selector` inside `context`, in include order, without duplicates.
///
/// Results are cached per run under the exact selector text; a repeated call returns the
/// same shared slice.
pub fn select(selector: &str, context: &Context, run: &RunContext<'_>) -> DomResult<Arc<[VNodeId]>> {
    if let Some(cached) = run.cached_selection(selector) {
        metrics::record_select(true);
        return Ok(cached);
    }
    metrics::record_select(false);

    let parsed = SelectorList::parse(selector)?;
    let tree = run.tree();
    let in_context = |node: VNodeId| is_node_in_context(tree, node, context);

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for root in reduce_includes(tree, &context.include) {
        if tree.matches(root, &parsed) && in_context(root) && seen.insert(root) {
            result.push(root);
        }
        for node in tree.query_all_filter(root, &parsed, in_context) {
            if seen.insert(node) {
                result.push(node);
            }
        }
    }

    debug!(%selector, matched = result.len(), "selection resolved");
    let result: Arc<[VNodeId]> = result.into();
    run.store_selection(selector, Arc::clone(&result));
    Ok(result)
}

/// Drops include roots nested inside an earlier root.
fn reduce_includes(tree: &FlatTree<'_>, include: &[VNodeId]) -> Vec<VNodeId> {
    let mut reduced: Vec<VNodeId> = Vec::with_capacity(include.len());
    for candidate in include {
        if !reduced.iter().any(|kept| tree.contains(*kept, *candidate)) {
            reduced.push(*candidate);
        }
    }
    reduced
}

/// The most specific entry of `candidates` that contains `node`. Covering entries form an
/// ancestor chain, so the deepest is the one latest in pre-order.
fn deepest_covering(tree: &FlatTree<'_>, candidates: &[VNodeId], node: VNodeId) -> Option<VNodeId> {
    candidates
        .iter()
        .copied()
        .filter(|candidate| tree.contains(*candidate, node))
        .max()
}

/// A node is in context when some include covers it and no exclude nested inside that
/// include covers it as well.
pub fn is_node_in_context(tree: &FlatTree<'_>, node: VNodeId, context: &Context) -> bool {
    let Some(include) = deepest_covering(tree, &context.include, node) else {
        return false;
    };
    match deepest_covering(tree, &context.exclude, node) {
        None => true,
        Some(exclude) => tree.contains(exclude, include),
    }
}
