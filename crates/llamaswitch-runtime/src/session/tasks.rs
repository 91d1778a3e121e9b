//! Per-session background work: output sink, exit watcher and prober.

use chrono::Utc;
use llamaswitch_core::{CrashReport, ServerProbe, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::state::SessionBoard;
use crate::log_stats::LogStat;
use crate::logs::LogRingBuffer;
use crate::process::{OutputSink, ProcessExit, ProcessHandle, StreamKind};

/// Receives the output of one session.
///
/// Lines go into the buffer the session was started with, never into
/// whatever buffer happens to be current.
pub(crate) struct SessionSink {
    id: SessionId,
    ctx: u32,
    buffer: Arc<LogRingBuffer>,
    board: Arc<SessionBoard>,
}

impl SessionSink {
    pub fn new(
        id: SessionId,
        ctx: u32,
        buffer: Arc<LogRingBuffer>,
        board: Arc<SessionBoard>,
    ) -> Self {
        Self {
            id,
            ctx,
            buffer,
            board,
        }
    }
}

impl OutputSink for SessionSink {
    fn append(&self, stream: StreamKind, line: String) {
        debug!(target: "llamaswitch::child", session_id = %self.id, %stream, "{line}");
        if let Some(stat) = LogStat::parse(&line) {
            let ctx = self.ctx;
            self.board.update_stats(self.id, |stats| stat.apply(stats, ctx));
        }
        self.buffer.append(line);
    }
}

pub(crate) fn crash_report(model_key: &str, exit: &ProcessExit) -> CrashReport {
    CrashReport {
        model: model_key.to_string(),
        exit_code: exit.code,
        reason: format!("process exited unexpectedly ({})", exit.description),
        at: Utc::now(),
    }
}

/// Publish a crash as soon as the process exits on its own.
pub(crate) fn spawn_exit_watcher(
    id: SessionId,
    model_key: String,
    process: Arc<ProcessHandle>,
    board: Arc<SessionBoard>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let exit = tokio::select! {
            () = cancel.cancelled() => return,
            exit = process.wait_exit() => exit,
        };
        if board.mark_crashed(id, crash_report(&model_key, &exit)) {
            warn!(
                session_id = %id,
                model_key = %model_key,
                exit = %exit.description,
                "Model server exited unexpectedly"
            );
        }
    });
}

/// How a prober loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProberExit {
    Cancelled,
    /// The session is gone or no longer probe-able.
    SessionEnded,
    /// Still not ready after the configured startup limit.
    StartupTimeout(Duration),
}

pub(crate) struct Prober {
    pub id: SessionId,
    pub model_key: String,
    pub port: u16,
    pub process: Arc<ProcessHandle>,
    pub probe: Arc<dyn ServerProbe>,
    pub board: Arc<SessionBoard>,
    pub interval: Duration,
    pub startup_timeout: Option<Duration>,
}

impl Prober {
    /// Poll readiness until the server is ready, then scrape stats on every
    /// tick. Returns when cancelled or when the session stops being current.
    pub async fn run(self, cancel: CancellationToken) -> ProberExit {
        let started = Instant::now();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ready = false;

        debug!(session_id = %self.id, port = self.port, "Starting prober");

        loop {
            tokio::select! {
                () = cancel.cancelled() => return ProberExit::Cancelled,
                _ = ticker.tick() => {}
            }

            if let Some(exit) = self.process.exit() {
                self.board
                    .mark_crashed(self.id, crash_report(&self.model_key, &exit));
                return ProberExit::SessionEnded;
            }
            match self.board.phase_of(self.id) {
                Some(phase) if phase.is_crashable() => {}
                _ => return ProberExit::SessionEnded,
            }

            if ready {
                let scraped = tokio::select! {
                    () = cancel.cancelled() => return ProberExit::Cancelled,
                    scraped = self.probe.scrape_stats(self.port) => scraped,
                };
                match scraped {
                    Ok(sample) => {
                        self.board
                            .update_stats(self.id, |stats| stats.apply_metrics(&sample));
                    }
                    Err(e) => trace!(session_id = %self.id, error = %e, "Stats scrape failed"),
                }
                continue;
            }

            let checked = tokio::select! {
                () = cancel.cancelled() => return ProberExit::Cancelled,
                checked = self.probe.check_ready(self.port) => checked,
            };
            match checked {
                Ok(()) => {
                    if self.board.mark_ready(self.id) {
                        info!(
                            session_id = %self.id,
                            model_key = %self.model_key,
                            port = self.port,
                            "Model server is ready"
                        );
                    }
                    ready = true;
                }
                Err(e) => {
                    debug!(session_id = %self.id, port = self.port, error = %e, "Not ready yet");
                    if let Some(limit) = self.startup_timeout {
                        if started.elapsed() >= limit {
                            return ProberExit::StartupTimeout(limit);
                        }
                    }
                }
            }
        }
    }
}
