//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (processes, sockets, HTTP).
//!
//! # Structure
//!
//! - `model` - Configured models (`ModelConfig`)
//! - `session` - Session phases, stats and the published `StatusSnapshot`

mod model;
mod session;

pub use model::ModelConfig;
pub use session::{CrashReport, SessionId, SessionPhase, SessionStats, StatusSnapshot};
