//! Rules: gather nodes, fan checks out over them, post-filter the evidence.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use soul_a11y_dom::VNodeId;
use tracing::{debug, instrument};

use crate::check::{resolve_check_option, CheckNode, CheckRef, CheckRegistry};
use crate::errors::{AuditError, AuditResult, CheckError};
use crate::locator::LocatorOptions;
use crate::metrics;
use crate::options::RunOptions;
use crate::queue::CheckQueue;
use crate::result::{CheckResult, DqElement, NodeResult, RuleResult};
use crate::run_context::RunContext;
use crate::select::{select, Context};

const DEFAULT_SELECTOR: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Any,
    All,
    None,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [CheckKind::Any, CheckKind::All, CheckKind::None];

    fn slot(self) -> usize {
        match self {
            CheckKind::Any => 0,
            CheckKind::All => 1,
            CheckKind::None => 2,
        }
    }
}

/// One combinator group of a rule with its check references.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckGroup {
    Any(Vec<CheckRef>),
    All(Vec<CheckRef>),
    None(Vec<CheckRef>),
}

impl CheckGroup {
    pub fn new(kind: CheckKind, checks: Vec<CheckRef>) -> Self {
        match kind {
            CheckKind::Any => CheckGroup::Any(checks),
            CheckKind::All => CheckGroup::All(checks),
            CheckKind::None => CheckGroup::None(checks),
        }
    }

    pub fn kind(&self) -> CheckKind {
        match self {
            CheckGroup::Any(_) => CheckKind::Any,
            CheckGroup::All(_) => CheckKind::All,
            CheckGroup::None(_) => CheckKind::None,
        }
    }

    pub fn checks(&self) -> &[CheckRef] {
        match self {
            CheckGroup::Any(checks) | CheckGroup::All(checks) | CheckGroup::None(checks) => checks,
        }
    }
}

type MatchPredicate = dyn Fn(CheckNode<'_>) -> Result<bool, CheckError> + Send + Sync;

/// Optional per-node match predicate supplied by the rule author.
#[derive(Clone)]
pub struct MatchFn(Arc<MatchPredicate>);

impl MatchFn {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(CheckNode<'_>) -> Result<bool, CheckError> + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn call(&self, node: CheckNode<'_>) -> Result<bool, CheckError> {
        (self.0)(node)
    }
}

impl std::fmt::Debug for MatchFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MatchFn(..)")
    }
}

fn default_selector() -> String {
    DEFAULT_SELECTOR.to_string()
}

fn default_true() -> bool {
    true
}

/// Declarative rule definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default = "default_true")]
    pub exclude_hidden: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub page_level: bool,
    #[serde(default)]
    pub any: Vec<CheckRef>,
    #[serde(default)]
    pub all: Vec<CheckRef>,
    #[serde(default)]
    pub none: Vec<CheckRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub matches: Option<MatchFn>,
}

impl RuleSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selector: default_selector(),
            exclude_hidden: true,
            enabled: true,
            page_level: false,
            any: Vec::new(),
            all: Vec::new(),
            none: Vec::new(),
            tags: Vec::new(),
            matches: None,
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn any<I, C>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CheckRef>,
    {
        self.any = checks.into_iter().map(Into::into).collect();
        self
    }

    pub fn all<I, C>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CheckRef>,
    {
        self.all = checks.into_iter().map(Into::into).collect();
        self
    }

    pub fn none<I, C>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CheckRef>,
    {
        self.none = checks.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_level(mut self, page_level: bool) -> Self {
        self.page_level = page_level;
        self
    }

    pub fn exclude_hidden(mut self, exclude_hidden: bool) -> Self {
        self.exclude_hidden = exclude_hidden;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn matches(mut self, predicate: MatchFn) -> Self {
        self.matches = Some(predicate);
        self
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial rule update. Only fields that are present are applied; a boolean given as
/// `null` goes back to its construction default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulePatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclude_hidden: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub enabled: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_level: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<CheckRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<CheckRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub none: Option<Vec<CheckRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip)]
    pub matches: Option<MatchFn>,
}

impl RulePatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    selector: String,
    exclude_hidden: bool,
    enabled: bool,
    page_level: bool,
    groups: [CheckGroup; 3],
    tags: Vec<String>,
    matches: Option<MatchFn>,
    registry: Arc<CheckRegistry>,
}

impl Rule {
    pub fn new(spec: RuleSpec, registry: Arc<CheckRegistry>) -> Self {
        Self {
            id: spec.id,
            selector: spec.selector,
            exclude_hidden: spec.exclude_hidden,
            enabled: spec.enabled,
            page_level: spec.page_level,
            groups: [
                CheckGroup::Any(spec.any),
                CheckGroup::All(spec.all),
                CheckGroup::None(spec.none),
            ],
            tags: spec.tags,
            matches: spec.matches,
            registry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn excludes_hidden(&self) -> bool {
        self.exclude_hidden
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_page_level(&self) -> bool {
        self.page_level
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn groups(&self) -> &[CheckGroup] {
        &self.groups
    }

    pub fn group(&self, kind: CheckKind) -> &CheckGroup {
        &self.groups[kind.slot()]
    }

    /// Applies the fields present in `patch`. The id is never changed.
    pub fn configure(&mut self, patch: RulePatch) {
        if let Some(selector) = patch.selector {
            self.selector = selector;
        }
        if let Some(exclude_hidden) = patch.exclude_hidden {
            self.exclude_hidden = exclude_hidden.unwrap_or(true);
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled.unwrap_or(true);
        }
        if let Some(page_level) = patch.page_level {
            self.page_level = page_level.unwrap_or(false);
        }
        for (kind, checks) in [
            (CheckKind::Any, patch.any),
            (CheckKind::All, patch.all),
            (CheckKind::None, patch.none),
        ] {
            if let Some(checks) = checks {
                self.groups[kind.slot()] = CheckGroup::new(kind, checks);
            }
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(matches) = patch.matches {
            self.matches = Some(matches);
        }
    }

    /// Nodes this rule applies to: selector matches inside `context`, minus hidden nodes
    /// when the rule excludes them, minus nodes the match predicate rejects.
    pub fn gather(&self, run: &RunContext<'_>, context: &Context) -> AuditResult<Vec<VNodeId>> {
        let selected =
            select(&self.selector, context, run).map_err(|source| AuditError::Selector {
                rule_id: self.id.clone(),
                source,
            })?;

        let tree = run.tree();
        let mut gathered = Vec::with_capacity(selected.len());
        for vnode in selected.iter().copied() {
            if self.exclude_hidden && run.visibility().is_hidden(tree, vnode) {
                continue;
            }
            if let Some(predicate) = &self.matches {
                let keep = predicate
                    .call(CheckNode::new(tree, vnode))
                    .map_err(|cause| AuditError::Unsupported {
                        rule_id: self.id.clone(),
                        cause: cause.to_string(),
                    })?;
                if !keep {
                    continue;
                }
            }
            gathered.push(vnode);
        }
        Ok(gathered)
    }

    /// Runs every check group over every gathered node. Node records come back in gather
    /// order. The first failing check fails the whole run.
    #[instrument(skip_all, fields(rule = %self.id, run = %run.id()))]
    pub async fn run(
        &self,
        run: &RunContext<'_>,
        context: &Context,
        options: &RunOptions,
    ) -> AuditResult<RuleResult> {
        let started = Instant::now();
        let nodes = self.gather(run, context)?;
        if options.performance_timer {
            debug!(
                gathered = nodes.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "gather finished"
            );
        }

        let locator = LocatorOptions {
            to_root: options.absolute_paths,
            ..LocatorOptions::default()
        };
        let mut queue = CheckQueue::new();
        for vnode in nodes {
            queue.defer(self.run_node(run, vnode, options, &locator));
        }
        let records = queue.join().await?;

        let mut result = RuleResult::new(self.id.clone(), self.page_level, self.tags.clone());
        result.nodes = records.into_iter().flatten().collect();

        metrics::record_rule_run(started.elapsed());
        if options.performance_timer {
            debug!(
                records = result.nodes.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rule finished"
            );
        }
        Ok(result)
    }

    async fn run_node(
        &self,
        run: &RunContext<'_>,
        vnode: VNodeId,
        options: &RunOptions,
        locator: &LocatorOptions,
    ) -> AuditResult<Option<NodeResult>> {
        let node = CheckNode::new(run.tree(), vnode);
        let mut queue = CheckQueue::new();
        for group in &self.groups {
            queue.defer(self.run_group(run, node, group, options));
        }
        let groups = queue.join().await?;
        if groups.iter().all(|(_, results)| results.is_empty()) {
            return Ok(None);
        }

        let mut record = NodeResult {
            node: DqElement::new(run, node.node(), locator),
            any: Vec::new(),
            all: Vec::new(),
            none: Vec::new(),
        };
        for (kind, results) in groups {
            *record.group_mut(kind) = results;
        }
        Ok(Some(record))
    }

    async fn run_group<'a>(
        &'a self,
        run: &'a RunContext<'_>,
        node: CheckNode<'a>,
        group: &'a CheckGroup,
        options: &'a RunOptions,
    ) -> AuditResult<(CheckKind, Vec<CheckResult>)> {
        let mut queue = CheckQueue::new();
        for reference in group.checks() {
            let check = self
                .registry
                .get(&reference.id)
                .ok_or_else(|| AuditError::UnknownCheck {
                    rule_id: self.id.clone(),
                    check_id: reference.id.clone(),
                })?;
            let option = resolve_check_option(check.as_ref(), &self.id, Some(reference), options);
            queue.defer(async move {
                if !option.enabled {
                    return Ok(None);
                }
                metrics::record_check();
                let outcome = check.evaluate(node, &option).await.map_err(|source| {
                    AuditError::CheckFailed {
                        rule_id: self.id.clone(),
                        check_id: check.id().to_string(),
                        source,
                    }
                })?;
                Ok(outcome.map(|outcome| CheckResult::from_outcome(run, check.id(), outcome, &option)))
            });
        }
        let results = queue.join().await?;
        Ok((group.kind(), results.into_iter().flatten().collect()))
    }

    /// Applies check after-filters, drops filtered evidence and empty records, then merges
    /// a page-level rule's records into one.
    pub fn after(&self, mut result: RuleResult, options: &RunOptions) -> RuleResult {
        self.mark_filtered(&mut result, options);

        for record in &mut result.nodes {
            for kind in CheckKind::ALL {
                record.group_mut(kind).retain(|check| !check.filtered);
            }
        }
        result.nodes.retain(|record| !record.is_empty());

        if self.page_level && result.nodes.len() > 1 {
            let mut records = std::mem::take(&mut result.nodes).into_iter();
            if let Some(mut merged) = records.next() {
                for record in records {
                    merged.any.extend(record.any);
                    merged.all.extend(record.all);
                    merged.none.extend(record.none);
                }
                result.nodes.push(merged);
            }
        }
        result
    }

    /// Check references of this rule, one per check id, first occurrence first.
    fn check_references(&self) -> Vec<&CheckRef> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .flat_map(CheckGroup::checks)
            .filter(|reference| seen.insert(reference.id.as_str()))
            .collect()
    }

    pub(crate) fn mark_filtered(&self, result: &mut RuleResult, options: &RunOptions) {
        for reference in self.check_references() {
            let Some(check) = self.registry.get(&reference.id) else {
                continue;
            };
            let option = resolve_check_option(check.as_ref(), &self.id, Some(reference), options);

            let mut positions = Vec::new();
            for (n, record) in result.nodes.iter().enumerate() {
                for kind in CheckKind::ALL {
                    for (c, instance) in record.group(kind).iter().enumerate() {
                        if instance.id == reference.id {
                            positions.push((n, kind, c));
                        }
                    }
                }
            }
            if positions.is_empty() {
                continue;
            }

            let instances: Vec<&CheckResult> = positions
                .iter()
                .map(|&(n, kind, c)| &result.nodes[n].group(kind)[c])
                .collect();
            let Some(kept) = check.after(&instances, &option) else {
                continue;
            };
            let kept: HashSet<usize> = kept.into_iter().collect();
            debug!(
                rule = %self.id,
                check = %reference.id,
                total = positions.len(),
                kept = kept.len(),
                "after filter applied"
            );

            for (index, (n, kind, c)) in positions.into_iter().enumerate() {
                if !kept.contains(&index) {
                    result.nodes[n].group_mut(kind)[c].filtered = true;
                }
            }
        }
    }
}
