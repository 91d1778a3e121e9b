//! Axum web adapter for llamaswitch.
//!
//! Exposes the session controller as a JSON control API under `/api`, an
//! OpenAI-compatible surface under `/v1` that auto-loads the requested
//! model, and optionally the dashboard's static files.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod routes;
pub mod state;

pub use bootstrap::{CorsConfig, DEFAULT_LOAD_TIMEOUT, ServerConfig, ServerContext, start_server};
pub use error::HttpError;
pub use routes::{create_router, create_spa_router};
pub use state::AppState;
