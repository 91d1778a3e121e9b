//! Axum server bootstrap - the composition root for the HTTP adapter.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use llamaswitch_runtime::SessionController;
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::{create_router, create_spa_router};

/// Default time a proxied request waits for an auto-loaded model.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface the control server binds to.
    pub host: String,
    /// Port for the HTTP server.
    pub port: u16,
    /// Optional directory with the dashboard's static files.
    pub static_dir: Option<PathBuf>,
    pub cors: CorsConfig,
    /// How long `/v1/*` requests wait for a model to become ready.
    pub load_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11435,
            static_dir: None,
            cors: CorsConfig::default(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Set the static directory for SPA serving.
    #[must_use]
    pub fn with_static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(path.into());
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Everything the handlers need.
pub struct ServerContext {
    pub controller: SessionController,
    /// Client for forwarding to llama-server. No overall timeout, since
    /// streamed completions can run for minutes.
    pub upstream: Client,
    pub load_timeout: Duration,
}

impl ServerContext {
    pub fn new(controller: SessionController, load_timeout: Duration) -> Self {
        Self {
            controller,
            upstream: Client::new(),
            load_timeout,
        }
    }
}

/// Serve the control API until `shutdown` resolves, then stop the model.
///
/// If `config.static_dir` is set, serves the dashboard with SPA fallback.
pub async fn start_server(
    config: ServerConfig,
    controller: SessionController,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let ctx = Arc::new(ServerContext::new(controller.clone(), config.load_timeout));

    let app = if let Some(ref static_dir) = config.static_dir {
        info!("Serving static assets from: {}", static_dir.display());
        create_spa_router(ctx, static_dir, &config.cors)
    } else {
        create_router(ctx, &config.cors)
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("llamaswitch listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    info!("Shutting down, stopping model server");
    controller.shutdown().await;
    served.context("HTTP server failed")
}
