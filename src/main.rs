use anyhow::{Context, Result};
use clap::Parser;
use docsearch::{
    api,
    config::{self, Component},
    logging,
    query::QueryService,
};
use std::{net::Ipv4Addr, sync::Arc};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "docsearch", about = "Search page and JSON query endpoint")]
struct Cli {
    /// Serve canned results without contacting the search service.
    #[arg(long)]
    dev_mode: bool,
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let config = config::init_config(Component::QueryService {
        force_dev_mode: cli.dev_mode,
    })
    .context("Failed to load configuration")?;
    let service = QueryService::from_config(&config).context("Failed to build query service")?;
    let app = api::create_router(Arc::new(service));

    let port = cli.port.unwrap_or(config.server.port);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!(dev_mode = config.server.dev_mode, "Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
