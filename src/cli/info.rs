use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use super::context::CliContext;
use super::output::render_structured;
use crate::catalog::builtin_audit;

#[derive(Debug, Serialize)]
struct RuleInfo<'a> {
    id: &'a str,
    selector: &'a str,
    enabled: bool,
    page_level: bool,
    tags: &'a [String],
}

pub async fn cmd_info(ctx: &CliContext) -> Result<()> {
    let mut audit = builtin_audit();
    for patch in ctx.config().rules.iter().cloned() {
        let rule_id = patch.id.clone();
        if let Err(err) = audit.configure_rule(patch) {
            warn!(rule = %rule_id, error = %err, "ignoring rule configuration");
        }
    }
    let rules: Vec<RuleInfo<'_>> = audit
        .rules()
        .iter()
        .map(|rule| RuleInfo {
            id: rule.id(),
            selector: rule.selector(),
            enabled: rule.is_enabled(),
            page_level: rule.is_page_level(),
            tags: rule.tags(),
        })
        .collect();

    if let Some(rendered) = render_structured(&rules, ctx.output())? {
        println!("{rendered}");
        return Ok(());
    }

    println!("soul-a11y System Information");
    println!("============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!();

    println!("Configuration:");
    match ctx.config_path() {
        Some(path) => println!("- Config File: {}", path.display()),
        None => println!("- Config File: (defaults)"),
    }
    let options = &ctx.config().options;
    println!("- Absolute Paths: {}", options.absolute_paths);
    println!("- Performance Timer: {}", options.performance_timer);
    if let Some(run_only) = &options.run_only {
        println!("- Run Only: {:?}", run_only);
    }
    println!();

    println!("Rules:");
    for rule in &rules {
        let state = if rule.enabled { "on " } else { "off" };
        let scope = if rule.page_level { " (page)" } else { "" };
        println!(
            "- [{state}] {}{scope}  {}  [{}]",
            rule.id,
            rule.selector,
            rule.tags.join(", ")
        );
    }
    Ok(())
}
