//! The audit aggregate: a check registry plus the ordered rule list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soul_a11y_dom::FlatTree;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::check::{Check, CheckRegistry};
use crate::errors::{AuditError, AuditResult};
use crate::options::RunOptions;
use crate::result::{CheckValue, NodeResult, RuleResult};
use crate::rule::{Rule, RulePatch, RuleSpec};
use crate::run_context::RunContext;
use crate::select::Context;

#[derive(Debug, Default)]
pub struct Audit {
    registry: Arc<CheckRegistry>,
    rules: Vec<Rule>,
}

impl Audit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Arc<CheckRegistry> {
        &self.registry
    }

    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        self.registry.register(check);
    }

    /// Adds a rule, replacing any rule with the same id in place.
    pub fn add_rule(&mut self, spec: RuleSpec) {
        let rule = Rule::new(spec, Arc::clone(&self.registry));
        match self.rules.iter_mut().find(|existing| existing.id() == rule.id()) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn configure_rule(&mut self, patch: RulePatch) -> AuditResult<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|rule| rule.id() == patch.id)
            .ok_or_else(|| AuditError::UnknownRule(patch.id.clone()))?;
        rule.configure(patch);
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id() == id)
    }

    /// Runs every enabled rule over `tree` with a fresh run context.
    pub async fn run(&self, tree: &FlatTree<'_>, context: &Context, options: &RunOptions) -> AuditReport {
        let run = RunContext::new(tree);
        self.run_with(&run, context, options).await
    }

    /// Runs every enabled rule within an existing run context. A failing rule is recorded
    /// in the report and the remaining rules still run.
    #[instrument(skip_all, fields(run = %run.id()))]
    pub async fn run_with(
        &self,
        run: &RunContext<'_>,
        context: &Context,
        options: &RunOptions,
    ) -> AuditReport {
        let mut report = AuditReport::new(run.id());

        for rule in &self.rules {
            if !options.rule_enabled(rule.id(), rule.tags(), rule.is_enabled()) {
                continue;
            }
            match rule.run(run, context, options).await {
                Ok(result) => report.push(rule.after(result, options)),
                Err(err) => {
                    warn!(rule = %rule.id(), error = %err, "rule run failed");
                    report.errors.push(RuleError::from_error(rule.id(), &err));
                }
            }
        }

        info!(
            passes = report.passes.len(),
            violations = report.violations.len(),
            incomplete = report.incomplete.len(),
            inapplicable = report.inapplicable.len(),
            errors = report.errors.len(),
            "audit finished"
        );
        report
    }
}

/// Nodes of one rule that landed in the same bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    pub id: String,
    pub tags: Vec<String>,
    pub page_level: bool,
    pub nodes: Vec<NodeResult>,
}

impl RuleReport {
    fn empty(result: &RuleResult) -> Self {
        Self {
            id: result.id.clone(),
            tags: result.tags.clone(),
            page_level: result.page_level,
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleError {
    pub rule_id: String,
    pub message: String,
    /// Whether the failure was limited to the rule's own setup (selector or match
    /// predicate) rather than a check.
    pub rule_scoped: bool,
}

impl RuleError {
    fn from_error(rule_id: &str, err: &AuditError) -> Self {
        Self {
            rule_id: err.rule_id().unwrap_or(rule_id).to_string(),
            message: err.to_string(),
            rule_scoped: err.is_rule_scoped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub passes: Vec<RuleReport>,
    pub violations: Vec<RuleReport>,
    pub incomplete: Vec<RuleReport>,
    pub inapplicable: Vec<RuleReport>,
    pub errors: Vec<RuleError>,
}

impl AuditReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            passes: Vec::new(),
            violations: Vec::new(),
            incomplete: Vec::new(),
            inapplicable: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Splits a finished rule result into buckets. A rule shows up once per bucket it has
    /// nodes in; a rule without nodes is inapplicable.
    fn push(&mut self, result: RuleResult) {
        if result.nodes.is_empty() {
            self.inapplicable.push(RuleReport::empty(&result));
            return;
        }

        let mut passes = RuleReport::empty(&result);
        let mut violations = RuleReport::empty(&result);
        let mut incomplete = RuleReport::empty(&result);
        for node in result.nodes {
            match node.outcome() {
                CheckValue::Pass => passes.nodes.push(node),
                CheckValue::Fail => violations.nodes.push(node),
                CheckValue::Indeterminate => incomplete.nodes.push(node),
            }
        }

        for (bucket, report) in [
            (&mut self.passes, passes),
            (&mut self.violations, violations),
            (&mut self.incomplete, incomplete),
        ] {
            if !report.nodes.is_empty() {
                bucket.push(report);
            }
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.iter().map(|rule| rule.nodes.len()).sum()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}
