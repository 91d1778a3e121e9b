//! Runtime settings for the session controller.
//!
//! Defaults live here; the CLI overrides them from flags and environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Context size used when a start request does not specify one.
pub const DEFAULT_CONTEXT_SIZE: u32 = 4096;

/// Time a server gets to exit after SIGTERM before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Interval between readiness/stats probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Lines of server output kept per session.
pub const DEFAULT_LOG_CAPACITY: usize = 2000;

/// How a port is chosen for a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PortPolicy {
    /// Let the OS pick a free port.
    #[default]
    Ephemeral,
    /// Always use this port.
    Fixed { port: u16 },
    /// First free port in `start..=end`.
    Range { start: u16, end: u16 },
}

impl fmt::Display for PortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::Fixed { port } => write!(f, "{port}"),
            Self::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

impl FromStr for PortPolicy {
    type Err = String;

    /// Parses `auto`/`ephemeral`, a single port, or an inclusive `A-B` range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.eq_ignore_ascii_case("ephemeral") {
            return Ok(Self::Ephemeral);
        }
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| format!("invalid port '{p}': {e}"))
        };
        match s.split_once('-') {
            Some((a, b)) => {
                let (start, end) = (parse(a)?, parse(b)?);
                if start == 0 || start > end {
                    return Err(format!("invalid port range '{s}'"));
                }
                Ok(Self::Range { start, end })
            }
            None => match parse(s)? {
                0 => Ok(Self::Ephemeral),
                port => Ok(Self::Fixed { port }),
            },
        }
    }
}

/// Settings for the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Host substituted for `${HOST}` and reported on the status endpoint.
    pub host: String,
    /// Host used to reach the child for probing and proxying.
    pub probe_host: String,
    /// Context size when a start request omits it.
    pub default_ctx: u32,
    pub port_policy: PortPolicy,
    /// SIGTERM → SIGKILL escalation delay.
    pub grace_period: Duration,
    pub probe_interval: Duration,
    /// Stop a session that has not become ready within this long.
    pub startup_timeout: Option<Duration>,
    pub log_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            probe_host: "127.0.0.1".to_string(),
            default_ctx: DEFAULT_CONTEXT_SIZE,
            port_policy: PortPolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            startup_timeout: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Host to probe for a given bind host. Wildcard binds are probed on
    /// loopback.
    pub fn probe_host_for(host: &str) -> String {
        match host {
            "0.0.0.0" | "::" | "[::]" | "" => "127.0.0.1".to_string(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self.probe_host = Self::probe_host_for(&self.host);
        self
    }

    #[must_use]
    pub const fn with_port_policy(mut self, policy: PortPolicy) -> Self {
        self.port_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub const fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }
}
