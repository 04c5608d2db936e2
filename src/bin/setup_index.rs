use anyhow::{Context, Result};
use clap::Parser;
use docsearch::{
    config::{self, Component},
    logging,
    provision::provision_index,
    search::SearchService,
};

#[derive(Parser)]
#[command(
    name = "setup-index",
    about = "Create or update the document index schema"
)]
struct Cli {
    /// Index to provision; overrides `SEARCH_INDEX_NAME`.
    #[arg(long)]
    index_name: Option<String>,
}

/// Exits with status 0 when the service rejects the schema: the failure is logged by
/// `provision_index` and there is nothing to retry. Only configuration and client
/// construction errors produce a non-zero status.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config =
        config::init_config(Component::Provisioner).context("Failed to load configuration")?;
    let search = config
        .search
        .as_mut()
        .context("Search service configuration is missing")?;
    if let Some(name) = cli.index_name {
        search.index_name = name;
    }

    let service = SearchService::new(search).context("Failed to build search client")?;
    if let Err(error) = provision_index(&service, config.embedding.dimension).await {
        tracing::debug!(error = %error, "Provisioning ended without applying the schema");
    }
    Ok(())
}
