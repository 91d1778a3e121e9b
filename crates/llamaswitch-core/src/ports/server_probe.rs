//! Server probe port.
//!
//! Abstracts how the controller asks a spawned server whether it is ready
//! and how busy it is. The runtime implements this over HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed probe. Always treated as transient by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Connection refused, reset or timed out.
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-success status (503 while loading).
    #[error("Server returned status {0}")]
    Status(u16),

    /// The response body could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Counters scraped from a running server. `None` means not reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub prompt_speed: Option<f64>,
    pub gen_speed: Option<f64>,
    pub total_tokens: Option<u64>,
    pub ctx_used: Option<u64>,
}

impl MetricsSample {
    /// True when the scrape produced no usable counter.
    pub const fn is_empty(&self) -> bool {
        self.prompt_speed.is_none()
            && self.gen_speed.is_none()
            && self.total_tokens.is_none()
            && self.ctx_used.is_none()
    }
}

/// Readiness and statistics probe for a server listening on `port`.
#[async_trait]
pub trait ServerProbe: Send + Sync {
    /// One readiness check. `Ok(())` means the server is ready to serve.
    async fn check_ready(&self, port: u16) -> Result<(), ProbeError>;

    /// One statistics scrape.
    async fn scrape_stats(&self, port: u16) -> Result<MetricsSample, ProbeError>;
}
