use std::path::Path;

use anyhow::{Context, Result};
use soul_a11y_dom::Document;
use tokio::fs;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for reports
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Reads and parses an HTML file.
pub async fn load_document(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let document = Document::parse_html(&source)
        .with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), nodes = document.len(), "document loaded");
    Ok(document)
}
