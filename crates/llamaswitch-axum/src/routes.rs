//! Route definitions and router construction.
//!
//! Axum 0.8 path syntax; no path parameters are needed here.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::bootstrap::CorsConfig;
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Control API, nested under `/api`.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(handlers::config::get))
        .route("/status", get(handlers::control::status))
        .route("/start", post(handlers::control::start))
        .route("/stop", post(handlers::control::stop))
        .route("/logs", get(handlers::logs::list))
        .route("/logs/clear", post(handlers::logs::clear))
}

/// OpenAI-compatible surface, nested under `/v1`.
pub(crate) fn openai_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::openai::models))
        .route("/chat/completions", post(handlers::openai::proxy))
        .route("/completions", post(handlers::openai::proxy))
}

/// Create the router with the control API, the OpenAI routes and `/health`.
pub fn create_router(state: AppState, cors_config: &CorsConfig) -> Router {
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .nest("/v1", openai_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Like [`create_router`], plus the dashboard served from `static_dir` with
/// `index.html` as the fallback for client-side routes.
pub fn create_spa_router<P: AsRef<Path>>(
    state: AppState,
    static_dir: P,
    cors_config: &CorsConfig,
) -> Router {
    let static_path = static_dir.as_ref();
    let serve_dir =
        ServeDir::new(static_path).fallback(ServeFile::new(static_path.join("index.html")));

    create_router(state, cors_config).fallback_service(serve_dir)
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
