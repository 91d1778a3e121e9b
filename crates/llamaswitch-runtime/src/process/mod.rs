//! Process management for the inference server.
//!
//! # Structure
//!
//! - `ProcessHandle` - One spawned child: pid, exit detection, termination
//! - `stream` - Lossy line readers forwarding output to an `OutputSink`
//! - `shutdown` - SIGTERM → SIGKILL signalling of the child's process group
//! - `ports` - Port allocation policies

mod handle;
mod ports;
mod shutdown;
mod stream;

pub use handle::{ProcessExit, ProcessHandle};
pub use ports::{allocate_port, is_port_available};
pub use stream::{OutputSink, StreamKind, spawn_stream_reader};
