//! Command-line definition for the `llamaswitch` binary.
//!
//! Every flag has an environment fallback so the server can be configured
//! from a `.env` file as well.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use llamaswitch_axum::{CorsConfig, ServerConfig};
use llamaswitch_core::{
    ControllerConfig, DEFAULT_CONTEXT_SIZE, DEFAULT_LOG_CAPACITY, PortPolicy,
};

/// Run one llama-server at a time behind a control API and an
/// OpenAI-compatible proxy.
#[derive(Debug, Parser)]
#[command(name = "llamaswitch")]
#[command(about = "Start, stop and switch llama-server models from one endpoint")]
#[command(version)]
pub struct Cli {
    /// Interface to bind; also substituted for ${HOST} in model commands
    #[arg(short = 'H', long, env = "LLAMASWITCH_HOST", default_value = "localhost")]
    pub host: String,

    /// Port for the control API and dashboard
    #[arg(short = 'p', long, env = "LLAMASWITCH_PORT", default_value_t = 11435)]
    pub port: u16,

    /// Context size used when a start request does not give one
    #[arg(
        short = 'c',
        long = "ctx",
        env = "LLAMASWITCH_CTX",
        default_value_t = DEFAULT_CONTEXT_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub default_ctx: u32,

    /// Model catalog (YAML)
    #[arg(short = 'f', long, env = "LLAMASWITCH_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Reload the catalog when it changes on disk
    #[arg(short = 'w', long, env = "LLAMASWITCH_WATCH")]
    pub watch: bool,

    /// Seconds between SIGTERM and SIGKILL when stopping a model
    #[arg(long, env = "LLAMASWITCH_GRACE_SECS", default_value_t = 5)]
    pub grace_secs: u64,

    /// Milliseconds between readiness and stats probes
    #[arg(long, env = "LLAMASWITCH_PROBE_INTERVAL_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(10..))]
    pub probe_interval_ms: u64,

    /// Fixed port for llama-server
    #[arg(long, env = "LLAMASWITCH_LLAMA_PORT", conflicts_with = "llama_port_range")]
    pub llama_port: Option<u16>,

    /// Inclusive port range for llama-server, e.g. 11500-11599
    #[arg(long, env = "LLAMASWITCH_LLAMA_PORT_RANGE")]
    pub llama_port_range: Option<PortPolicy>,

    /// Lines of server output kept for the logs endpoint
    #[arg(long, env = "LLAMASWITCH_LOG_LINES", default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_lines: usize,

    /// Stop a model that has not become ready within this many seconds
    #[arg(long, env = "LLAMASWITCH_STARTUP_TIMEOUT_SECS")]
    pub startup_timeout_secs: Option<u64>,

    /// Seconds a proxied request waits for its model to load
    #[arg(long, env = "LLAMASWITCH_LOAD_TIMEOUT_SECS", default_value_t = 60)]
    pub load_timeout_secs: u64,

    /// Directory with the dashboard's static files
    #[arg(long, env = "LLAMASWITCH_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Port policy from `--llama-port` / `--llama-port-range`.
    pub fn port_policy(&self) -> PortPolicy {
        match (self.llama_port, self.llama_port_range) {
            (Some(0), _) | (None, None) => PortPolicy::Ephemeral,
            (Some(port), _) => PortPolicy::Fixed { port },
            (None, Some(range)) => range,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::default()
            .with_host(&self.host)
            .with_port_policy(self.port_policy())
            .with_grace_period(Duration::from_secs(self.grace_secs))
            .with_probe_interval(Duration::from_millis(self.probe_interval_ms));
        config.default_ctx = self.default_ctx;
        config.log_capacity = self.log_lines.max(1);
        config.startup_timeout = self.startup_timeout_secs.map(Duration::from_secs);
        config
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
            cors: CorsConfig::AllowAll,
            load_timeout: Duration::from_secs(self.load_timeout_secs),
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
