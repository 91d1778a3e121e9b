//! Process runtime and session control for llamaswitch.
//!
//! # Structure
//!
//! - `process` - Spawning, output capture, two-phase termination, ports
//! - `logs` - Bounded per-session output buffer
//! - `log_stats` - Performance counters parsed from server output
//! - `probe` - HTTP readiness and metrics probe
//! - `session` - The session controller that ties it all together
//! - `catalog_watch` - Reload the model catalog when its file changes

#![deny(unsafe_code)]

pub mod catalog_watch;
pub mod log_stats;
pub mod logs;
pub mod probe;
pub mod process;
pub mod session;

pub use catalog_watch::{CATALOG_POLL_INTERVAL, watch_catalog};
pub use logs::LogRingBuffer;
pub use probe::HttpServerProbe;
pub use process::{OutputSink, ProcessExit, ProcessHandle, StreamKind};
pub use session::SessionController;
