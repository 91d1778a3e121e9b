//! Session control.
//!
//! - `controller` - `SessionController`, the single-slot state machine
//! - `state` - The published snapshot, fenced by session id
//! - `tasks` - Output sink, exit watcher and readiness/stats prober

mod controller;
mod state;
mod tasks;

pub use controller::SessionController;
