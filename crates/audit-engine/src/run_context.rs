//! Per-run analysis state.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use soul_a11y_dom::{Document, FlatTree, InlineVisibility, VNodeId, VisibilityProbe};
use tracing::debug;
use uuid::Uuid;

use crate::locator::FeatureStatistics;
use crate::metrics;

/// Everything that is computed once per analysis run and shared by all rules of that run:
/// the feature statistics behind locator synthesis and the selection cache. Build a new
/// context for every run; nothing here may outlive the tree it was built for.
pub struct RunContext<'t> {
    id: Uuid,
    tree: &'t FlatTree<'t>,
    statistics: OnceCell<FeatureStatistics>,
    selections: DashMap<String, Arc<[VNodeId]>>,
    visibility: Arc<dyn VisibilityProbe>,
}

impl<'t> RunContext<'t> {
    pub fn new(tree: &'t FlatTree<'t>) -> Self {
        Self::with_visibility(tree, Arc::new(InlineVisibility))
    }

    pub fn with_visibility(tree: &'t FlatTree<'t>, visibility: Arc<dyn VisibilityProbe>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tree,
            statistics: OnceCell::new(),
            selections: DashMap::new(),
            visibility,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tree(&self) -> &'t FlatTree<'t> {
        self.tree
    }

    pub fn document(&self) -> &'t Document {
        self.tree.document()
    }

    pub fn visibility(&self) -> &dyn VisibilityProbe {
        self.visibility.as_ref()
    }

    /// Feature statistics for this run's tree, collected on first use.
    pub fn statistics(&self) -> &FeatureStatistics {
        self.statistics.get_or_init(|| {
            let statistics = FeatureStatistics::collect(self.tree);
            metrics::record_statistics_build();
            debug!(
                run = %self.id,
                elements = statistics.elements,
                "selector statistics collected"
            );
            statistics
        })
    }

    pub fn has_statistics(&self) -> bool {
        self.statistics.get().is_some()
    }

    pub(crate) fn cached_selection(&self, selector: &str) -> Option<Arc<[VNodeId]>> {
        self.selections
            .get(selector)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn store_selection(&self, selector: &str, nodes: Arc<[VNodeId]>) {
        self.selections.insert(selector.to_string(), nodes);
    }
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("id", &self.id)
            .field("elements", &self.tree.len())
            .field("statistics", &self.has_statistics())
            .field("cached_selections", &self.selections.len())
            .finish()
    }
}
