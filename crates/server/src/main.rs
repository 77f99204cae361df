//! tether server entry point.
//!
//! Boots the offline-first worker (install, then activate) and serves its
//! tools over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tether_client::{FetchClient, FetchConfig};
use tether_core::{AppConfig, CacheDb};
use tether_worker::{InstallOutcome, ServiceWorker, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

const INSTALL_RETRY_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = config.origin_url()?;
    tracing::info!(origin = %origin, generation = %config.cache_version, "starting tether on stdio transport");

    let store = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app_config(&config)?)?;
    let worker = Arc::new(ServiceWorker::new(
        Arc::new(store),
        Arc::new(network),
        WorkerConfig::from_app_config(&config)?,
    ));

    match worker.install_with_retry(config.install_attempts, INSTALL_RETRY_DELAY).await {
        InstallOutcome::Complete { entries } => tracing::info!(entries, "install complete"),
        InstallOutcome::Degraded { reason } => tracing::warn!("continuing without a complete precache: {reason}"),
    }
    worker.on_activate().await?;

    let handler = handler::TetherServer::new(Arc::clone(&worker), origin);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.settle().await;
    Ok(())
}
