//! Published session state.
//!
//! Every transition goes through [`SessionBoard`], which owns the watch
//! channel readers subscribe to. Updates carry the id of the session they
//! are about, and are dropped when that session is no longer current or is
//! in a phase the update does not apply to.

use chrono::{DateTime, Utc};
use llamaswitch_core::{CrashReport, SessionId, SessionPhase, SessionStats, StatusSnapshot};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use crate::logs::LogRingBuffer;

/// The session currently occupying the slot, as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LiveSession {
    pub id: SessionId,
    pub model_key: String,
    pub port: u16,
    pub ctx: u32,
    pub phase: SessionPhase,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub stats: SessionStats,
}

/// Value carried by the watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Published {
    pub current: Option<LiveSession>,
    pub last_crash: Option<CrashReport>,
}

impl Published {
    fn session_mut(&mut self, id: SessionId) -> Option<&mut LiveSession> {
        self.current.as_mut().filter(|s| s.id == id)
    }
}

#[derive(Debug)]
pub(crate) struct SessionBoard {
    host: String,
    tx: watch::Sender<Published>,
    logs: RwLock<Arc<LogRingBuffer>>,
}

impl SessionBoard {
    pub fn new(host: impl Into<String>, log_capacity: usize) -> Self {
        let (tx, _) = watch::channel(Published::default());
        Self {
            host: host.into(),
            tx,
            logs: RwLock::new(Arc::new(LogRingBuffer::new(log_capacity))),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let published = self.tx.borrow();
        let Some(session) = &published.current else {
            return StatusSnapshot::stopped(self.host.clone(), published.last_crash.clone());
        };
        StatusSnapshot {
            running: session.phase.is_live(),
            phase: session.phase,
            model: Some(session.model_key.clone()),
            port: Some(session.port),
            host: self.host.clone(),
            ctx: Some(session.ctx),
            ready: session.phase == SessionPhase::Ready,
            pid: session.pid,
            started_at: Some(session.started_at),
            stats: Some(session.stats.clone()),
            last_crash: published.last_crash.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.tx.subscribe()
    }

    pub fn phase_of(&self, id: SessionId) -> Option<SessionPhase> {
        self.tx
            .borrow()
            .current
            .as_ref()
            .filter(|s| s.id == id)
            .map(|s| s.phase)
    }

    /// Publish a freshly spawned session. Clears the previous crash report.
    pub fn publish_starting(&self, session: LiveSession) {
        self.tx.send_replace(Published {
            current: Some(session),
            last_crash: None,
        });
    }

    /// `Starting` → `Ready`. Returns false if `id` is not starting.
    pub fn mark_ready(&self, id: SessionId) -> bool {
        self.tx.send_if_modified(|p| match p.session_mut(id) {
            Some(s) if s.phase == SessionPhase::Starting => {
                s.phase = SessionPhase::Ready;
                true
            }
            _ => false,
        })
    }

    pub fn mark_stopping(&self, id: SessionId) {
        self.tx.send_if_modified(|p| match p.session_mut(id) {
            Some(s) if s.phase.is_live() && s.phase != SessionPhase::Stopping => {
                s.phase = SessionPhase::Stopping;
                true
            }
            _ => false,
        });
    }

    /// Remove `id` from the slot, publishing `Stopped` together with
    /// `failure` when the session was stopped for failing.
    pub fn clear(&self, id: SessionId, failure: Option<CrashReport>) {
        self.tx.send_if_modified(|p| {
            if p.session_mut(id).is_none() {
                return false;
            }
            p.current = None;
            if failure.is_some() {
                p.last_crash = failure;
            }
            true
        });
    }

    /// Record an unexpected exit of `id`.
    ///
    /// Only applies while the session is starting or ready; an exit during
    /// `Stopping` is the expected outcome of a stop. Publishes `Crashed`,
    /// then `Stopped` with the report attached.
    pub fn mark_crashed(&self, id: SessionId, report: CrashReport) -> bool {
        let crashed = self.tx.send_if_modified(|p| match p.session_mut(id) {
            Some(s) if s.phase.is_crashable() => {
                s.phase = SessionPhase::Crashed;
                true
            }
            _ => false,
        });
        if crashed {
            self.tx.send_modify(|p| {
                if p.current.as_ref().is_some_and(|s| s.id == id) {
                    p.current = None;
                }
                p.last_crash = Some(report);
            });
        }
        crashed
    }

    /// Apply `f` to the stats of `id` while it is starting or ready.
    pub fn update_stats(&self, id: SessionId, f: impl FnOnce(&mut SessionStats)) -> bool {
        self.tx.send_if_modified(|p| match p.session_mut(id) {
            Some(s) if s.phase.is_crashable() => {
                f(&mut s.stats);
                true
            }
            _ => false,
        })
    }

    /// Buffer of the current (or most recently stopped) session.
    pub fn logs(&self) -> Arc<LogRingBuffer> {
        Arc::clone(&self.logs.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn replace_logs(&self, buffer: Arc<LogRingBuffer>) {
        *self.logs.write().unwrap_or_else(|e| e.into_inner()) = buffer;
    }
}
