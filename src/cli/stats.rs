use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use soul_a11y_dom::FlatTree;
use soul_a11y_engine::RunContext;

use super::context::CliContext;
use super::output::render_structured;
use super::runtime::load_document;

#[derive(Args, Clone, Debug)]
pub struct StatsArgs {
    /// HTML file to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Show only the most frequent entries of each table
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

pub async fn cmd_stats(args: StatsArgs, ctx: &CliContext) -> Result<()> {
    let document = load_document(&args.file).await?;
    let tree = FlatTree::build(&document).context("building flattened tree")?;
    let run = RunContext::new(&tree);
    let statistics = run.statistics();

    if let Some(rendered) = render_structured(statistics, ctx.output())? {
        println!("{rendered}");
        return Ok(());
    }

    println!("Elements: {}", statistics.elements);
    print_table("Tags", &statistics.tags, args.top);
    print_table("Classes", &statistics.classes, args.top);
    print_table("Attributes", &statistics.attributes, args.top);
    Ok(())
}

fn print_table(title: &str, counts: &BTreeMap<String, usize>, top: usize) {
    if counts.is_empty() {
        return;
    }
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    println!("\n{title}");
    for (key, count) in entries.into_iter().take(top) {
        println!("  {count:>5}  {key}");
    }
}
