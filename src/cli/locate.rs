use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use soul_a11y_dom::FlatTree;
use soul_a11y_engine::{get_selector, select, Context, Locator, LocatorOptions, RunContext};

use super::context::CliContext;
use super::output::render_structured;
use super::runtime::load_document;

#[derive(Args, Clone, Debug)]
pub struct LocateArgs {
    /// HTML file to search
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Selector to match, across shadow boundaries
    #[arg(value_name = "SELECTOR")]
    pub selector: String,

    /// Build full paths up to each root
    #[arg(long)]
    pub to_root: bool,

    /// Minimum number of ancestor segments
    #[arg(long, default_value_t = 0)]
    pub min_depth: usize,
}

#[derive(Debug, Serialize)]
struct Located {
    locator: Locator,
    source: String,
}

pub async fn cmd_locate(args: LocateArgs, ctx: &CliContext) -> Result<()> {
    let document = load_document(&args.file).await?;
    let tree = FlatTree::build(&document).context("building flattened tree")?;
    let run = RunContext::new(&tree);

    let nodes = select(&args.selector, &Context::document(&tree), &run)
        .with_context(|| format!("selecting {}", args.selector))?;
    let options = LocatorOptions {
        to_root: args.to_root,
        min_depth: args.min_depth,
        ..LocatorOptions::default()
    };
    let located: Vec<Located> = nodes
        .iter()
        .map(|vnode| {
            let element = tree.node_of(*vnode);
            Located {
                locator: get_selector(&run, element, &options),
                source: document.source_snippet(element, 120),
            }
        })
        .collect();

    match render_structured(&located, ctx.output())? {
        Some(rendered) => println!("{rendered}"),
        None if located.is_empty() => println!("No elements match {}", args.selector),
        None => {
            for entry in &located {
                println!("{}", entry.locator);
            }
        }
    }
    Ok(())
}
