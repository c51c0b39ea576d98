//! Configuration management module
//!
//! Audit configuration is layered: built-in defaults, then an optional YAML or JSON file,
//! then `SOUL_A11Y_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use soul_a11y_engine::{RulePatch, RunOnly, RunOptions};
use tokio::fs;
use tracing::{info, warn};

pub const ENV_ABSOLUTE_PATHS: &str = "SOUL_A11Y_ABSOLUTE_PATHS";
pub const ENV_PERFORMANCE_TIMER: &str = "SOUL_A11Y_PERFORMANCE_TIMER";
pub const ENV_RUN_ONLY: &str = "SOUL_A11Y_RUN_ONLY";

/// Prefix selecting rule ids instead of tags in `SOUL_A11Y_RUN_ONLY`.
const RUN_ONLY_RULES_PREFIX: &str = "rules:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Options passed to every run
    pub options: RunOptions,
    /// Rule reconfigurations applied on top of the built-in catalog
    pub rules: Vec<RulePatch>,
    /// Selectors bounding the audit; empty means the whole document
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

pub struct LoadedConfig {
    pub config: AuditConfig,
    pub path: Option<PathBuf>,
}

/// Config file used when none is given: `./config/soul-a11y.yaml`, then
/// `<config dir>/soul-a11y/config.yaml`.
fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("config/soul-a11y.yaml");
    if local.exists() {
        return Some(local);
    }
    let mut path = dirs::config_dir()?;
    path.push("soul-a11y");
    path.push("config.yaml");
    path.exists().then_some(path)
}

fn parse_config(path: &Path, content: &str) -> Result<AuditConfig> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content).context("Failed to parse JSON config file")
    } else {
        serde_yaml::from_str(content).context("Failed to parse YAML config file")
    }
}

/// Load configuration from defaults, the config file and the environment
pub async fn load_configuration(config_file: Option<&Path>) -> Result<LoadedConfig> {
    let path = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let mut config = match &path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = parse_config(path, &content)?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        Some(path) => {
            warn!("Config file not found, using defaults: {}", path.display());
            AuditConfig::default()
        }
        None => AuditConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(LoadedConfig { config, path })
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(%key, %value, "ignoring invalid boolean override");
            None
        }
    }
}

/// `wcag2a,best-practice` selects tags; `rules:image-alt,duplicate-id` selects rule ids.
fn parse_run_only(value: &str) -> Option<RunOnly> {
    let (rules, list) = match value.trim().strip_prefix(RUN_ONLY_RULES_PREFIX) {
        Some(list) => (true, list),
        None => (false, value),
    };
    let values: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(if rules {
        RunOnly::Rule(values)
    } else {
        RunOnly::Tag(values)
    })
}

/// Environment variable overrides
pub fn apply_env_overrides<F>(config: &mut AuditConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(flag) = lookup(ENV_ABSOLUTE_PATHS).and_then(|v| parse_flag(ENV_ABSOLUTE_PATHS, &v))
    {
        config.options.absolute_paths = flag;
    }
    if let Some(flag) =
        lookup(ENV_PERFORMANCE_TIMER).and_then(|v| parse_flag(ENV_PERFORMANCE_TIMER, &v))
    {
        config.options.performance_timer = flag;
    }
    if let Some(run_only) = lookup(ENV_RUN_ONLY).and_then(|v| parse_run_only(&v)) {
        config.options.run_only = Some(run_only);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_yaml_and_json_files() {
        let yaml = r#"
options:
  absolute_paths: true
  run_only: { type: tag, values: [wcag2a] }
rules:
  - id: landmark-one-main
    enabled: false
include: ["main"]
"#;
        let config = parse_config(Path::new("audit.yaml"), yaml).unwrap();
        assert!(config.options.absolute_paths);
        assert_eq!(config.options.run_only, Some(RunOnly::Tag(vec!["wcag2a".into()])));
        assert_eq!(config.rules[0].id, "landmark-one-main");
        assert_eq!(config.rules[0].enabled, Some(Some(false)));
        assert_eq!(config.include, vec!["main".to_string()]);

        let json = r##"{ "exclude": ["#ads"] }"##;
        let config = parse_config(Path::new("audit.JSON"), json).unwrap();
        assert_eq!(config.exclude, vec!["#ads".to_string()]);
        assert!(!config.options.absolute_paths);
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ABSOLUTE_PATHS, "yes"),
            (ENV_PERFORMANCE_TIMER, "maybe"),
            (ENV_RUN_ONLY, "rules: image-alt, duplicate-id"),
        ]
        .into_iter()
        .collect();

        let mut config = AuditConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));
        assert!(config.options.absolute_paths);
        assert!(!config.options.performance_timer);
        assert_eq!(
            config.options.run_only,
            Some(RunOnly::Rule(vec!["image-alt".into(), "duplicate-id".into()]))
        );
    }

    #[test]
    fn test_run_only_tags() {
        assert_eq!(
            parse_run_only("wcag2a,best-practice"),
            Some(RunOnly::Tag(vec!["wcag2a".into(), "best-practice".into()]))
        );
        assert_eq!(parse_run_only(" , "), None);
    }
}
