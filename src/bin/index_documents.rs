use anyhow::{Context, Result};
use clap::Parser;
use docsearch::{
    config::{self, Component},
    ingest::IngestionPipeline,
    logging,
};

#[derive(Parser)]
#[command(
    name = "index-documents",
    about = "Analyze, embed and index every blob in a container"
)]
struct Cli {
    /// Container to read; overrides `CONTAINER_NAME`.
    #[arg(long)]
    container: Option<String>,
    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config =
        config::init_config(Component::Ingestion).context("Failed to load configuration")?;
    if let (Some(container), Some(storage)) = (cli.container, config.storage.as_mut()) {
        storage.container_name = container;
    }

    let pipeline =
        IngestionPipeline::from_config(&config).context("Failed to initialize ingestion")?;
    let report = pipeline.run().await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }
    Ok(())
}
