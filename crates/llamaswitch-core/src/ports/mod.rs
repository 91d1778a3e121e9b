//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the session controller expects from
//! infrastructure. They contain no implementation details.

pub mod model_catalog;
pub mod server_probe;

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use model_catalog::ModelCatalogPort;
pub use server_probe::{MetricsSample, ProbeError, ServerProbe};

/// Errors returned synchronously by session controller operations.
///
/// Only failures that happen before or during the spawn attempt are
/// returned this way; anything after a successful spawn is recorded in
/// the published status instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested model key is not in the catalog.
    #[error("Model not found in config: {0}")]
    ModelNotFound(String),

    /// Context size must be a positive integer.
    #[error("Invalid context size: {0}")]
    InvalidContextSize(i64),

    /// The model's command template expands to nothing.
    #[error("Model {0} has an empty command")]
    EmptyCommand(String),

    /// No port could be allocated under the configured policy.
    #[error("Port unavailable: {0}")]
    PortUnavailable(String),

    /// The process could not be spawned (not found, permission denied, ...).
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The session went away (crash or stop) while a caller waited on it.
    #[error("Server is not running: {0}")]
    NotRunning(String),

    /// A caller-imposed wait elapsed before the server became ready.
    #[error("Model failed to load within {0:?}")]
    ReadyTimeout(Duration),

    /// A controller task panicked or was cancelled by runtime shutdown.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result of a successful `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub port: u16,
    pub command: String,
}
