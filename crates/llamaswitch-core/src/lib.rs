//! Core domain types and port definitions for llamaswitch.
//!
//! This crate holds everything that does not touch the OS or the network:
//! the model catalog, session/status types, the command templater and the
//! traits (ports) that the runtime implements.

pub mod catalog;
pub mod domain;
pub mod ports;
pub mod settings;
pub mod template;

// Re-export commonly used types for convenience
pub use catalog::{CatalogError, ModelCatalog};
pub use domain::{
    CrashReport, ModelConfig, SessionId, SessionPhase, SessionStats, StatusSnapshot,
};
pub use ports::{
    MetricsSample, ModelCatalogPort, ProbeError, ServerProbe, SessionError, StartOutcome,
};
pub use settings::{
    ControllerConfig, DEFAULT_CONTEXT_SIZE, DEFAULT_GRACE_PERIOD, DEFAULT_LOG_CAPACITY,
    DEFAULT_PROBE_INTERVAL, PortPolicy,
};
pub use template::{ExpandedCommand, TemplateVars, expand_command, split_args};
