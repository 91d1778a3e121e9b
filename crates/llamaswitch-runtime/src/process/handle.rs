//! Handle to one spawned server process.
//!
//! The `Child` itself is owned by a waiter task, which reaps it and
//! publishes the exit on a watch channel. The handle only keeps the pid,
//! the exit receiver and a token to request a hard kill, so any number of
//! tasks can observe or terminate the process without sharing `&mut Child`.

use chrono::{DateTime, Utc};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::shutdown::{force_kill, request_stop};
use super::stream::{OutputSink, StreamKind, spawn_stream_reader};

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the process exited rather than being killed by a signal.
    pub code: Option<i32>,
    /// Display form, e.g. `exit status: 1` or `signal: 9 (SIGKILL)`.
    pub description: String,
}

impl ProcessExit {
    fn from_wait(result: io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => Self {
                code: status.code(),
                description: status.to_string(),
            },
            Err(e) => Self {
                code: None,
                description: format!("wait failed: {e}"),
            },
        }
    }

    fn unknown() -> Self {
        Self {
            code: None,
            description: "exit status unknown".to_string(),
        }
    }
}

/// A running (or finished) child process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
    kill: CancellationToken,
}

impl ProcessHandle {
    /// Spawn `argv[0]` with the remaining arguments.
    ///
    /// stdout and stderr are forwarded line by line to `sink` until EOF or
    /// `cancel`. On unix the child leads its own process group so that
    /// termination reaches anything it forks.
    pub fn spawn(
        argv: &[String],
        sink: Arc<dyn OutputSink>,
        cancel: CancellationToken,
    ) -> io::Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(
                stdout,
                StreamKind::Stdout,
                pid,
                Arc::clone(&sink),
                cancel.clone(),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, StreamKind::Stderr, pid, sink, cancel);
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let kill = CancellationToken::new();
        let kill_requested = kill.clone();
        tokio::spawn(async move {
            let waited = tokio::select! {
                status = child.wait() => Some(status),
                () = kill_requested.cancelled() => None,
            };
            let status = match waited {
                Some(status) => status,
                None => {
                    if let Err(e) = child.start_kill() {
                        debug!(?pid, error = %e, "start_kill failed (process likely gone)");
                    }
                    child.wait().await
                }
            };
            let exit = ProcessExit::from_wait(status);
            debug!(?pid, exit = %exit.description, "Process exited");
            exit_tx.send_replace(Some(exit));
        });

        info!(?pid, program = %program, "Spawned process");
        Ok(Self {
            pid,
            started_at: Utc::now(),
            exit_rx,
            kill,
        })
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True until the process has terminated, by any means.
    pub fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// The exit, if the process has already terminated.
    pub fn exit(&self) -> Option<ProcessExit> {
        self.exit_rx.borrow().clone()
    }

    /// Wait until the process has exited.
    ///
    /// Meant for background watchers; request paths should use
    /// [`is_alive`](Self::is_alive).
    pub async fn wait_exit(&self) -> ProcessExit {
        let mut rx = self.exit_rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone().unwrap_or_else(ProcessExit::unknown),
            // The waiter task is gone without reporting (runtime shutdown).
            Err(_) => ProcessExit::unknown(),
        }
    }

    /// Stop the process: SIGTERM, then SIGKILL if it is still running after
    /// `grace`. Always returns once the process has been reaped.
    ///
    /// Calling this on an exited process returns its exit immediately.
    pub async fn terminate(&self, grace: Duration) -> ProcessExit {
        if let Some(exit) = self.exit() {
            return exit;
        }

        let Some(pid) = self.pid else {
            self.kill.cancel();
            return self.wait_exit().await;
        };

        match request_stop(pid) {
            Ok(true) => debug!(pid, "Sent SIGTERM"),
            Ok(false) => debug!(pid, "Process group already gone"),
            Err(e) => warn!(pid, error = %e, "Failed to send SIGTERM"),
        }

        if cfg!(unix) {
            if let Ok(exit) = timeout(grace, self.wait_exit()).await {
                return exit;
            }
            warn!(pid, grace_secs = grace.as_secs_f64(), "Process ignored SIGTERM, killing");
        }

        if let Err(e) = force_kill(pid) {
            warn!(pid, error = %e, "Failed to SIGKILL process group");
        }
        self.kill.cancel();
        self.wait_exit().await
    }
}
