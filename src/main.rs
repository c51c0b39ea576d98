use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    soul_a11y_cli::cli::run().await
}
