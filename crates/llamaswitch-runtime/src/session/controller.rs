//! The session controller.
//!
//! Owns the single model-server slot. `start` and `stop` are serialized by
//! an async mutex held for the whole transition, including the wait for the
//! previous process to exit. Reads (`status`, `logs`) never touch that
//! mutex; they go through the published [`SessionBoard`] instead.

use chrono::Utc;
use llamaswitch_core::{
    ControllerConfig, CrashReport, ModelCatalogPort, ServerProbe, SessionError, SessionId,
    SessionPhase, SessionStats, StartOutcome, StatusSnapshot, TemplateVars, expand_command,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{LiveSession, SessionBoard};
use super::tasks::{Prober, ProberExit, SessionSink, spawn_exit_watcher};
use crate::logs::LogRingBuffer;
use crate::probe::HttpServerProbe;
use crate::process::{ProcessHandle, allocate_port};

/// What the controller keeps about the session it owns.
struct ActiveSession {
    id: SessionId,
    model_key: String,
    process: Arc<ProcessHandle>,
    cancel: CancellationToken,
}

struct Inner {
    config: ControllerConfig,
    catalog: Arc<dyn ModelCatalogPort>,
    probe: Arc<dyn ServerProbe>,
    board: Arc<SessionBoard>,
    slot: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

/// Supervises at most one model server at a time.
///
/// Cheap to clone; all clones share the same slot.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        config: ControllerConfig,
        catalog: Arc<dyn ModelCatalogPort>,
        probe: Arc<dyn ServerProbe>,
    ) -> Self {
        let board = Arc::new(SessionBoard::new(config.host.clone(), config.log_capacity));
        Self {
            inner: Arc::new(Inner {
                config,
                catalog,
                probe,
                board,
                slot: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Controller probing servers over HTTP on `config.probe_host`.
    pub fn with_http_probe(config: ControllerConfig, catalog: Arc<dyn ModelCatalogPort>) -> Self {
        let probe = Arc::new(HttpServerProbe::new(config.probe_host.clone()));
        Self::new(config, catalog, probe)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &Arc<dyn ModelCatalogPort> {
        &self.inner.catalog
    }

    /// Start `model_key`, replacing any running session.
    ///
    /// Returns as soon as the process is spawned; readiness shows up in
    /// [`status`](Self::status). `ctx` defaults to the configured context
    /// size.
    pub async fn start(&self, model_key: &str, ctx: Option<i64>) -> Result<StartOutcome, SessionError> {
        let inner = Arc::clone(&self.inner);
        let key = model_key.to_string();
        // Run detached so that a dropped caller cannot leave the slot
        // half-transitioned.
        tokio::spawn(async move {
            let mut slot = inner.slot.lock().await;
            inner.start_locked(&mut slot, &key, ctx).await
        })
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))?
    }

    /// Stop the running session, if any. Idempotent.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut slot = inner.slot.lock().await;
            if let Some(active) = slot.take() {
                inner.retire(active, None).await;
            }
        })
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))
    }

    /// Make sure `model_key` is the live session, starting it if needed.
    ///
    /// Returns `None` when it was already running.
    pub async fn ensure_running(&self, model_key: &str) -> Result<Option<StartOutcome>, SessionError> {
        let inner = Arc::clone(&self.inner);
        let key = model_key.to_string();
        tokio::spawn(async move {
            let mut slot = inner.slot.lock().await;
            if inner.is_running(slot.as_ref(), &key) {
                return Ok(None);
            }
            inner.start_locked(&mut slot, &key, None).await.map(Some)
        })
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))?
    }

    /// Wait until the current session is ready and return its port.
    ///
    /// Fails with `NotRunning` if the session goes away first (crash, stop,
    /// or nothing running) and with `ReadyTimeout` after `timeout`.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<u16, SessionError> {
        let mut rx = self.inner.board.subscribe();
        // Crashed is always followed by Stopped with the report attached.
        let settled = rx.wait_for(|p| {
            p.current.as_ref().is_none_or(|s| {
                !matches!(s.phase, SessionPhase::Starting | SessionPhase::Crashed)
            })
        });
        let published = match tokio::time::timeout(timeout, settled).await {
            Err(_) => return Err(SessionError::ReadyTimeout(timeout)),
            Ok(Err(_)) => return Err(SessionError::Internal("status channel closed".to_string())),
            Ok(Ok(published)) => published,
        };
        match &published.current {
            Some(s) if s.phase == SessionPhase::Ready => Ok(s.port),
            Some(s) => Err(SessionError::NotRunning(format!(
                "{} is {:?}",
                s.model_key, s.phase
            ))),
            None => Err(SessionError::NotRunning(
                published
                    .last_crash
                    .as_ref()
                    .map_or_else(|| "no model loaded".to_string(), |c| c.reason.clone()),
            )),
        }
    }

    /// Point-in-time status. Never waits on a transition.
    pub fn status(&self) -> StatusSnapshot {
        self.inner.board.snapshot()
    }

    /// Output of the current or most recently stopped session.
    pub fn logs(&self) -> Vec<String> {
        self.inner.board.logs().snapshot()
    }

    pub fn clear_logs(&self) {
        self.inner.board.logs().clear();
    }

    /// Stop the running session before the process exits.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Failed to stop model server during shutdown");
        }
    }
}

impl Inner {
    fn is_running(&self, active: Option<&ActiveSession>, model_key: &str) -> bool {
        active.is_some_and(|a| {
            a.model_key == model_key
                && a.process.is_alive()
                && self
                    .board
                    .phase_of(a.id)
                    .is_some_and(SessionPhase::is_crashable)
        })
    }

    fn resolve_ctx(&self, ctx: Option<i64>) -> Result<u32, SessionError> {
        match ctx {
            None => Ok(self.config.default_ctx),
            Some(n) => u32::try_from(n)
                .ok()
                .filter(|&n| n > 0)
                .ok_or(SessionError::InvalidContextSize(n)),
        }
    }

    async fn start_locked(
        self: &Arc<Self>,
        slot: &mut Option<ActiveSession>,
        model_key: &str,
        ctx: Option<i64>,
    ) -> Result<StartOutcome, SessionError> {
        let model = self
            .catalog
            .get(model_key)
            .ok_or_else(|| SessionError::ModelNotFound(model_key.to_string()))?;
        let ctx = self.resolve_ctx(ctx)?;

        if let Some(active) = slot.take() {
            self.retire(active, None).await;
        }

        let port = allocate_port(self.config.port_policy)?;
        let expanded = expand_command(
            &model.cmd,
            &TemplateVars {
                port,
                ctx,
                host: &self.config.host,
            },
        );
        if expanded.argv.is_empty() {
            return Err(SessionError::EmptyCommand(model_key.to_string()));
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let cancel = CancellationToken::new();
        let buffer = Arc::new(LogRingBuffer::new(self.config.log_capacity));
        let sink = Arc::new(SessionSink::new(
            id,
            ctx,
            Arc::clone(&buffer),
            Arc::clone(&self.board),
        ));

        info!(session_id = %id, model_key, port, ctx, command = %expanded.command, "Starting model server");
        let process = ProcessHandle::spawn(&expanded.argv, sink, cancel.clone()).map_err(|e| {
            warn!(model_key, error = %e, "Failed to spawn model server");
            SessionError::Spawn {
                command: expanded.command.clone(),
                reason: e.to_string(),
            }
        })?;
        let process = Arc::new(process);

        self.board.replace_logs(buffer);
        self.board.publish_starting(LiveSession {
            id,
            model_key: model_key.to_string(),
            port,
            ctx,
            phase: SessionPhase::Starting,
            pid: process.pid(),
            started_at: process.started_at(),
            stats: SessionStats {
                ctx_limit: u64::from(ctx),
                ..Default::default()
            },
        });

        spawn_exit_watcher(
            id,
            model_key.to_string(),
            Arc::clone(&process),
            Arc::clone(&self.board),
            cancel.clone(),
        );
        self.spawn_prober(id, model_key, port, Arc::clone(&process), cancel.clone());

        *slot = Some(ActiveSession {
            id,
            model_key: model_key.to_string(),
            process,
            cancel,
        });

        Ok(StartOutcome {
            port,
            command: expanded.command,
        })
    }

    fn spawn_prober(
        self: &Arc<Self>,
        id: SessionId,
        model_key: &str,
        port: u16,
        process: Arc<ProcessHandle>,
        cancel: CancellationToken,
    ) {
        let prober = Prober {
            id,
            model_key: model_key.to_string(),
            port,
            process,
            probe: Arc::clone(&self.probe),
            board: Arc::clone(&self.board),
            interval: self.config.probe_interval,
            startup_timeout: self.config.startup_timeout,
        };
        let controller: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            if let ProberExit::StartupTimeout(limit) = prober.run(cancel).await {
                if let Some(inner) = controller.upgrade() {
                    inner.abort_if_starting(id, limit).await;
                }
            }
        });
    }

    /// Stop a session that is still starting after `limit`.
    async fn abort_if_starting(&self, id: SessionId, limit: Duration) {
        let mut slot = self.slot.lock().await;
        if self.board.phase_of(id) != Some(SessionPhase::Starting) {
            return;
        }
        let Some(active) = slot.take_if(|a| a.id == id) else {
            return;
        };
        warn!(
            session_id = %id,
            model_key = %active.model_key,
            limit_secs = limit.as_secs(),
            "Model server not ready in time, stopping it"
        );
        let report = CrashReport {
            model: active.model_key.clone(),
            exit_code: None,
            reason: format!("not ready within {}s", limit.as_secs()),
            at: Utc::now(),
        };
        self.retire(active, Some(report)).await;
    }

    /// Terminate `active` and clear it from the published state, attaching
    /// `failure` as the last crash if given.
    async fn retire(&self, active: ActiveSession, failure: Option<CrashReport>) {
        info!(session_id = %active.id, model_key = %active.model_key, "Stopping model server");
        self.board.mark_stopping(active.id);
        let exit = active.process.terminate(self.config.grace_period).await;
        active.cancel.cancel();
        self.board.clear(active.id, failure);
        debug!(session_id = %active.id, exit = %exit.description, "Model server stopped");
    }
}
