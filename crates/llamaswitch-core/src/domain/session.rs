//! Session lifecycle types.
//!
//! A session is one run of the inference server, from the start request to
//! its termination. These types describe it without owning any OS
//! resources; the runtime crate holds the actual process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ports::MetricsSample;

/// Monotonic identity of a session.
///
/// Background tasks carry the id they were spawned for and drop their
/// results when it no longer matches the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discrete state of a session in the controller's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Process spawned, readiness not yet observed.
    Starting,
    /// Health endpoint answered successfully.
    Ready,
    /// Termination in progress.
    Stopping,
    /// No session.
    Stopped,
    /// Process exited on its own while starting or ready.
    Crashed,
}

impl SessionPhase {
    /// Phases in which a session owns a live process slot.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Ready | Self::Stopping)
    }

    /// Phases in which an unexpected exit counts as a crash.
    pub const fn is_crashable(self) -> bool {
        matches!(self, Self::Starting | Self::Ready)
    }
}

/// Performance counters observed for the running session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Context tokens in use by the last processed request.
    pub ctx_used: u64,
    /// Context window of the session (0 until first observed).
    pub ctx_limit: u64,
    /// Generated tokens accumulated over the session.
    pub total_tokens: u64,
    /// Prompt processing throughput (tokens/sec).
    pub prompt_speed: f64,
    /// Generation throughput (tokens/sec).
    pub gen_speed: f64,
}

impl SessionStats {
    /// Merge a metrics scrape. Fields the server did not report keep their
    /// previous value.
    pub fn apply_metrics(&mut self, sample: &MetricsSample) {
        if let Some(v) = sample.prompt_speed {
            self.prompt_speed = v;
        }
        if let Some(v) = sample.gen_speed {
            self.gen_speed = v;
        }
        if let Some(v) = sample.total_tokens {
            self.total_tokens = v;
        }
        if let Some(v) = sample.ctx_used {
            self.ctx_used = v;
        }
    }
}

/// Why the most recent session ended without being asked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
    /// Model that was running.
    pub model: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Human-readable reason (exit status, signal, startup timeout).
    pub reason: String,
    /// When the crash was detected.
    pub at: DateTime<Utc>,
}

/// Immutable point-in-time view of the controller.
///
/// Built fresh on every query; safe to hand to any number of readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub phase: SessionPhase,
    pub model: Option<String>,
    pub port: Option<u16>,
    pub host: String,
    pub ctx: Option<u32>,
    pub ready: bool,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub stats: Option<SessionStats>,
    pub last_crash: Option<CrashReport>,
}

impl StatusSnapshot {
    /// Snapshot for an idle controller.
    pub fn stopped(host: impl Into<String>, last_crash: Option<CrashReport>) -> Self {
        Self {
            running: false,
            phase: SessionPhase::Stopped,
            model: None,
            port: None,
            host: host.into(),
            ctx: None,
            ready: false,
            pid: None,
            started_at: None,
            stats: None,
            last_crash,
        }
    }

    /// Seconds since the session was started, if one is running.
    pub fn uptime_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at.map(|t| (now - t).num_seconds().max(0))
    }
}
