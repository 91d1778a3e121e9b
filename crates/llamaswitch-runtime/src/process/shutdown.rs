//! Signalling for graceful shutdown with SIGTERM → SIGKILL escalation.
//!
//! The server runs in its own process group, so signals go to the whole
//! group and reach any helpers it forked.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Ask the process group led by `pid` to exit.
///
/// Returns `Ok(false)` if the group no longer exists.
#[cfg(unix)]
pub(crate) fn request_stop(pid: u32) -> io::Result<bool> {
    send_group(pid, Signal::SIGTERM)
}

/// Kill the process group led by `pid`.
#[cfg(unix)]
pub(crate) fn force_kill(pid: u32) -> io::Result<bool> {
    send_group(pid, Signal::SIGKILL)
}

#[cfg(unix)]
fn send_group(pid: u32, sig: Signal) -> io::Result<bool> {
    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    match signal::killpg(Pid::from_raw(raw), sig) {
        Ok(()) => Ok(true),
        // Already gone
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(io::Error::other(e)),
    }
}

// Windows has no SIGTERM equivalent; the handle kills the child directly.
#[cfg(not(unix))]
pub(crate) fn request_stop(_pid: u32) -> io::Result<bool> {
    Ok(false)
}

#[cfg(not(unix))]
pub(crate) fn force_kill(_pid: u32) -> io::Result<bool> {
    Ok(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_signal_to_missing_group_reports_gone() {
        // PID 999999 should not exist
        assert!(!request_stop(999_999).unwrap());
        assert!(!force_kill(999_999).unwrap());
    }
}
