//! HTTP probe for llama-server processes.
//!
//! Readiness is `GET /health` answering 2xx (llama-server answers 503 while
//! the model is still loading). Statistics come from the Prometheus text on
//! `GET /metrics`, which the server only exposes when started with
//! `--metrics`. Without it the scrape fails and the log parser is the only
//! source of counters.

use async_trait::async_trait;
use llamaswitch_core::{MetricsSample, ProbeError, ServerProbe};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Per-request timeout for probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// [`ServerProbe`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpServerProbe {
    client: Client,
    host: String,
}

impl HttpServerProbe {
    /// Probe servers listening on `host`.
    pub fn new(host: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build probe client, probes will not time out");
                Client::new()
            });
        Self {
            client,
            host: host.into(),
        }
    }

    fn url(&self, port: u16, path: &str) -> String {
        format!("http://{}:{port}{path}", self.host)
    }

    async fn get(&self, port: u16, path: &str) -> Result<reqwest::Response, ProbeError> {
        let response = self
            .client
            .get(self.url(port, path))
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl ServerProbe for HttpServerProbe {
    async fn check_ready(&self, port: u16) -> Result<(), ProbeError> {
        self.get(port, "/health").await.map(|_| ())
    }

    async fn scrape_stats(&self, port: u16) -> Result<MetricsSample, ProbeError> {
        let body = self
            .get(port, "/metrics")
            .await?
            .text()
            .await
            .map_err(|e| ProbeError::Malformed(e.to_string()))?;
        let sample = parse_metrics(&body);
        if sample.is_empty() {
            return Err(ProbeError::Malformed(
                "no llamacpp counters in /metrics".to_string(),
            ));
        }
        Ok(sample)
    }
}

/// Extract the counters we report from Prometheus exposition text.
pub fn parse_metrics(body: &str) -> MetricsSample {
    let mut sample = MetricsSample::default();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        // Drop labels, if any
        let name = name.split('{').next().unwrap_or(name);
        let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            continue;
        };

        match name {
            "llamacpp:prompt_tokens_seconds" => sample.prompt_speed = Some(value),
            "llamacpp:predicted_tokens_seconds" => sample.gen_speed = Some(value),
            "llamacpp:tokens_predicted_total" => sample.total_tokens = Some(as_count(value)),
            "llamacpp:kv_cache_tokens" => sample.ctx_used = Some(as_count(value)),
            _ => {}
        }
    }
    sample
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: f64) -> u64 {
    value.max(0.0).round() as u64
}
