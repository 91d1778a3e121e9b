//! Control-plane DTOs (`/api/*`).

use chrono::{DateTime, Utc};
use llamaswitch_core::{CrashReport, ModelConfig, SessionPhase, SessionStats, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /api/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub model_key: String,
    /// Context size; the configured default when absent.
    #[serde(default)]
    pub ctx: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// Always `"started"`.
    pub status: String,
    pub port: u16,
    pub command: String,
}

/// `{"status": "..."}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Response of `GET /api/config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub models: BTreeMap<String, ModelConfig>,
    pub default_ctx: u32,
}

/// Stats block of the status response. Zeros when nothing is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsDto {
    pub ctx_used: u64,
    pub ctx_limit: u64,
    pub gen_speed: f64,
    pub prompt_speed: f64,
    pub total_tokens: u64,
}

impl From<SessionStats> for StatsDto {
    fn from(stats: SessionStats) -> Self {
        Self {
            ctx_used: stats.ctx_used,
            ctx_limit: stats.ctx_limit,
            gen_speed: stats.gen_speed,
            prompt_speed: stats.prompt_speed,
            total_tokens: stats.total_tokens,
        }
    }
}

/// Response of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub phase: SessionPhase,
    pub ready: bool,
    pub model: Option<String>,
    pub ctx: Option<u32>,
    pub port: Option<u16>,
    pub host: String,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: Option<i64>,
    pub stats: StatsDto,
    pub last_crash: Option<CrashReport>,
}

impl From<StatusSnapshot> for StatusResponse {
    fn from(snap: StatusSnapshot) -> Self {
        let uptime_secs = snap.uptime_secs(Utc::now());
        Self {
            running: snap.running,
            phase: snap.phase,
            ready: snap.ready,
            model: snap.model,
            ctx: snap.ctx,
            port: snap.port,
            host: snap.host,
            pid: snap.pid,
            started_at: snap.started_at,
            uptime_secs,
            stats: snap.stats.map(StatsDto::from).unwrap_or_default(),
            last_crash: snap.last_crash,
        }
    }
}
