//! CLI entry point - the composition root.
//!
//! Loads the catalog, builds the controller and serves the HTTP API until
//! Ctrl-C, then stops whatever model is running.

use std::sync::Arc;

use clap::Parser;
use llamaswitch_axum::start_server;
use llamaswitch_cli::Cli;
use llamaswitch_core::{ModelCatalog, ModelCatalogPort};
use llamaswitch_runtime::{CATALOG_POLL_INTERVAL, SessionController, watch_catalog};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let catalog = Arc::new(ModelCatalog::load(cli.config.clone()));
    info!(
        path = %cli.config.display(),
        models = catalog.models().len(),
        "Model catalog loaded"
    );

    let controller = SessionController::with_http_probe(cli.controller_config(), catalog.clone());

    let cancel = CancellationToken::new();
    let watcher = cli.watch.then(|| {
        watch_catalog(
            catalog.clone(),
            controller.clone(),
            CATALOG_POLL_INTERVAL,
            cancel.clone(),
        )
    });

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Ctrl-C received");
            cancel.cancel();
        }
    };

    let served = start_server(cli.server_config(), controller, shutdown).await;

    cancel.cancel();
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    served
}
