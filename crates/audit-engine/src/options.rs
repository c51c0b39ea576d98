//! Per-run options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Log gather counts and timings at debug level.
    pub performance_timer: bool,
    /// Report full-path locators (`to_root`) instead of the shortest unique ones.
    pub absolute_paths: bool,
    /// Restrict the run to rules carrying one of these tags, or to these rule ids.
    pub run_only: Option<RunOnly>,
    /// Overrides applied to a check wherever it is used.
    pub checks: HashMap<String, CheckOverride>,
    /// Per-rule overrides.
    pub rules: HashMap<String, RuleOverride>,
}

impl RunOptions {
    /// Whether a rule takes part in the run, after `run_only` and per-rule overrides.
    pub fn rule_enabled(&self, rule_id: &str, tags: &[String], default_enabled: bool) -> bool {
        if let Some(enabled) = self.rules.get(rule_id).and_then(|rule| rule.enabled) {
            return enabled;
        }
        match &self.run_only {
            Some(RunOnly::Rule(ids)) => ids.iter().any(|id| id == rule_id),
            Some(RunOnly::Tag(wanted)) => {
                default_enabled && tags.iter().any(|tag| wanted.contains(tag))
            }
            None => default_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum RunOnly {
    Tag(Vec<String>),
    Rule(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOverride {
    pub enabled: Option<bool>,
    pub options: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverride {
    pub enabled: Option<bool>,
    pub checks: HashMap<String, CheckOverride>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_only_and_overrides() {
        let tags = vec!["wcag2a".to_string()];
        let mut options: RunOptions = serde_json::from_value(serde_json::json!({
            "run_only": { "type": "tag", "values": ["wcag2a"] }
        }))
        .unwrap();
        assert!(options.rule_enabled("image-alt", &tags, true));
        assert!(!options.rule_enabled("landmark", &[], true));
        assert!(!options.rule_enabled("image-alt", &tags, false));

        options.rules.insert(
            "landmark".into(),
            RuleOverride {
                enabled: Some(true),
                ..RuleOverride::default()
            },
        );
        assert!(options.rule_enabled("landmark", &[], true));

        options.run_only = Some(RunOnly::Rule(vec!["image-alt".into()]));
        assert!(options.rule_enabled("image-alt", &tags, false));
    }
}
