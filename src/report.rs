//! Human-readable audit reports.

use std::fmt::Write;

use soul_a11y_engine::{AuditReport, CheckResult, CheckValue, NodeResult, RuleReport};

const RULE_SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn render_human(report: &AuditReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Accessibility Audit");
    let _ = writeln!(out, "{RULE_SEPARATOR}");
    let _ = writeln!(out, "Run:          {}", report.run_id);
    let _ = writeln!(out, "Finished:     {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Violations:   {} ({} nodes)", report.violations.len(), report.violation_count());
    let _ = writeln!(out, "Incomplete:   {}", report.incomplete.len());
    let _ = writeln!(out, "Passes:       {}", report.passes.len());
    let _ = writeln!(out, "Inapplicable: {}", report.inapplicable.len());

    write_section(&mut out, "Violations", &report.violations);
    write_section(&mut out, "Needs review", &report.incomplete);

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nErrors");
        for error in &report.errors {
            let scope = if error.rule_scoped { "skipped" } else { "failed" };
            let _ = writeln!(out, "  {} ({scope}): {}", error.rule_id, error.message);
        }
    }
    out
}

fn write_section(out: &mut String, title: &str, rules: &[RuleReport]) {
    if rules.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for rule in rules {
        let _ = writeln!(out, "  {} [{}]", rule.id, rule.tags.join(", "));
        for node in &rule.nodes {
            write_node(out, node);
        }
    }
}

fn write_node(out: &mut String, node: &NodeResult) {
    let _ = writeln!(out, "    - {}", node.node.selector);
    let _ = writeln!(out, "      {}", node.node.source);
    let findings = node
        .any
        .iter()
        .chain(&node.all)
        .filter(|check| check.result != CheckValue::Pass)
        .chain(node.none.iter().filter(|check| check.result != CheckValue::Fail));
    for check in findings {
        let _ = writeln!(out, "      {}", describe(check));
    }
}

fn describe(check: &CheckResult) -> String {
    let mut line = format!("{}: {:?}", check.id, check.result).to_lowercase();
    if !check.data.is_null() {
        let _ = write!(line, " ({})", check.data);
    }
    for related in &check.related_nodes {
        let _ = write!(line, "\n        related: {}", related.selector);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_audit;
    use soul_a11y_dom::{Document, FlatTree};
    use soul_a11y_engine::{Context, RunOptions};

    #[test]
    fn test_human_report_lists_violating_nodes() {
        let doc = Document::parse_html(
            r#"<html><body><main><img src="/logo.png"><p id="a"></p><p id="a"></p></main></body></html>"#,
        )
        .unwrap();
        let tree = FlatTree::build(&doc).unwrap();
        let report = tokio_test::block_on(builtin_audit().run(
            &tree,
            &Context::document(&tree),
            &RunOptions::default(),
        ));

        let text = render_human(&report);
        assert!(text.contains("image-alt [wcag2a, cat.text-alternatives]"), "{text}");
        assert!(text.contains(r#"- img"#), "{text}");
        assert!(text.contains(r#"has-alt: fail"#), "{text}");
        assert!(text.contains(r#"duplicate-id: fail ("a")"#), "{text}");
        assert!(text.contains("related: p:nth-child(3)"), "{text}");
        assert!(!text.contains("Errors"));
    }
}
