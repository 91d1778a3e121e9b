//! Port allocation for spawned servers.

use llamaswitch_core::{PortPolicy, SessionError};
use std::net::TcpListener;
use tracing::debug;

/// Check whether a port can be bound on loopback right now.
pub fn is_port_available(port: u16) -> bool {
    match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Pick a port for a new session according to `policy`.
///
/// The port is released again before returning, so there is a small window
/// in which another process could take it. The spawned server then fails to
/// bind and shows up as a crash.
pub fn allocate_port(policy: PortPolicy) -> Result<u16, SessionError> {
    match policy {
        PortPolicy::Ephemeral => {
            let listener = TcpListener::bind(("127.0.0.1", 0))
                .map_err(|e| SessionError::PortUnavailable(e.to_string()))?;
            let port = listener
                .local_addr()
                .map_err(|e| SessionError::PortUnavailable(e.to_string()))?
                .port();
            debug!(port, "Allocated ephemeral port");
            Ok(port)
        }
        PortPolicy::Fixed { port } => {
            if port < 1024 {
                return Err(SessionError::PortUnavailable(format!(
                    "port {port} is privileged"
                )));
            }
            if !is_port_available(port) {
                return Err(SessionError::PortUnavailable(format!(
                    "port {port} is in use"
                )));
            }
            Ok(port)
        }
        PortPolicy::Range { start, end } => {
            for port in start.max(1024)..=end {
                if is_port_available(port) {
                    debug!(port, "Allocated port from range");
                    return Ok(port);
                }
                debug!(port, "Port unavailable on system, skipping");
            }
            Err(SessionError::PortUnavailable(format!(
                "no free port in range {start}-{end}"
            )))
        }
    }
}
