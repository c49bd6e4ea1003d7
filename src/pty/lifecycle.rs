//! PTY lifecycle coordination.
//!
//! Views mount and unmount constantly; the backend process for a session must
//! still be created at most once. Each initialization claims the session id
//! in the init lock table before its first await, and any concurrent
//! initialization of the same id waits for that claim to resolve instead of
//! issuing its own create request.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backend::{BackendError, PtyBackend};
use crate::session::{MountToken, PooledInstance, SessionId, SessionPool};

/// What to run for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub id: SessionId,
    pub cwd: PathBuf,
    pub command: Option<String>,
}

impl Launch {
    pub fn new(id: impl Into<SessionId>, cwd: impl Into<PathBuf>, command: Option<String>) -> Self {
        Self {
            id: id.into(),
            cwd: cwd.into(),
            command,
        }
    }
}

/// How an initialization request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call created the backend process.
    Created,
    /// The backend already had a process for the id; it was adopted.
    Adopted,
    /// Another initialization was in flight; this call waited for it.
    Joined,
    /// The session was already ready.
    AlreadyReady,
    /// Creation failed; a diagnostic was written into the engine.
    Failed,
    /// The mount that asked went away; UI effects were skipped.
    Stale,
    /// The session was closed before initialization finished. Any process
    /// started for it was killed.
    Closed,
}

enum Claim {
    Wait(watch::Receiver<bool>),
    Ready,
    Owner(InFlight),
}

/// Marker for an initialization in progress. Dropping it releases the id and
/// wakes every waiter, even if the owning task is cancelled.
struct InFlight {
    table: Arc<Mutex<HashMap<SessionId, watch::Receiver<bool>>>>,
    id: SessionId,
    done: watch::Sender<bool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.table.lock().remove(&self.id);
        self.done.send_replace(true);
    }
}

/// Serializes backend process creation per session id.
pub struct PtyCoordinator {
    pool: Arc<SessionPool>,
    backend: Arc<dyn PtyBackend>,
    in_flight: Arc<Mutex<HashMap<SessionId, watch::Receiver<bool>>>>,
}

impl PtyCoordinator {
    pub fn new(pool: Arc<SessionPool>, backend: Arc<dyn PtyBackend>) -> Self {
        Self {
            pool,
            backend,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    pub fn backend(&self) -> &Arc<dyn PtyBackend> {
        &self.backend
    }

    /// Whether an initialization for `id` is currently in flight.
    pub fn is_initializing(&self, id: &str) -> bool {
        self.in_flight.lock().contains_key(id)
    }

    /// Make sure the backend process for `launch.id` exists and the session is
    /// ready, on behalf of the view mount identified by `mount`.
    ///
    /// Backend-facing work always runs to completion. Focus and diagnostic
    /// text are applied only while `mount` is still the current mount. A
    /// session that is not pooled, or is disposed before its process comes
    /// up, resolves to [`InitOutcome::Closed`] and any process started for it
    /// is killed.
    pub async fn initialize(&self, launch: &Launch, mount: &MountToken) -> InitOutcome {
        let id = launch.id.as_str();
        let Some(instance) = self.pool.get(id) else {
            debug!(session = %id, "skipping initialization of a closed session");
            return InitOutcome::Closed;
        };

        let claim = {
            let mut table = self.in_flight.lock();
            if let Some(pending) = table.get(id) {
                Claim::Wait(pending.clone())
            } else if self.pool.is_ready(id) {
                Claim::Ready
            } else {
                let (done, pending) = watch::channel(false);
                table.insert(id.to_string(), pending);
                Claim::Owner(InFlight {
                    table: Arc::clone(&self.in_flight),
                    id: id.to_string(),
                    done,
                })
            }
        };

        match claim {
            Claim::Wait(mut pending) => {
                // An Err here means the owner was dropped; its guard still
                // released the id, so there is nothing left to wait for.
                let _ = pending.wait_for(|done| *done).await;
                if !self.pool.has(id) {
                    return InitOutcome::Closed;
                }
                if !self.pool.is_current(mount) {
                    return InitOutcome::Stale;
                }
                if !self.pool.is_ready(id) {
                    return InitOutcome::Failed;
                }
                self.sync_size(id).await;
                self.focus(&instance);
                InitOutcome::Joined
            }
            Claim::Ready => {
                if !self.pool.is_current(mount) {
                    return InitOutcome::Stale;
                }
                self.sync_size(id).await;
                self.focus(&instance);
                InitOutcome::AlreadyReady
            }
            Claim::Owner(guard) => {
                let outcome = match self.start_backend(launch).await {
                    Ok(created) => {
                        if !created {
                            self.replay_scrollback(id, &instance).await;
                        }
                        if !self.pool.mark_ready(id) {
                            self.kill_orphan(id).await;
                            return InitOutcome::Closed;
                        }
                        self.sync_size(id).await;
                        if created {
                            InitOutcome::Created
                        } else {
                            InitOutcome::Adopted
                        }
                    }
                    Err(err) => {
                        warn!(session = %id, error = %err, "failed to start PTY session");
                        if self.pool.is_current(mount) {
                            instance.with_engine(|engine| {
                                engine.write(diagnostic(&err).as_bytes());
                            });
                        }
                        InitOutcome::Failed
                    }
                };
                drop(guard);

                if !self.pool.is_current(mount) {
                    return InitOutcome::Stale;
                }
                if outcome != InitOutcome::Failed {
                    self.focus(&instance);
                }
                outcome
            }
        }
    }

    /// Forward the engine's current grid size to the backend.
    ///
    /// Sessions that are not ready yet are skipped: the size sent right after
    /// creation is the authoritative one.
    pub async fn sync_size(&self, id: &str) {
        let Some(instance) = self.pool.get(id) else {
            return;
        };
        let (cols, rows) = instance.with_engine(|engine| (engine.cols(), engine.rows()));
        self.request_resize(id, cols, rows).await;
    }

    /// Best-effort resize. Dropped before readiness, errors ignored after.
    pub async fn request_resize(&self, id: &str, cols: u16, rows: u16) {
        if !self.pool.is_ready(id) {
            debug!(session = %id, cols, rows, "dropping resize before session is ready");
            return;
        }
        if let Err(e) = self.backend.resize(id, cols, rows).await {
            debug!(session = %id, error = %e, "ignoring resize failure");
        }
    }

    async fn start_backend(&self, launch: &Launch) -> Result<bool, BackendError> {
        if self.backend.session_exists(&launch.id).await? {
            debug!(session = %launch.id, "adopting existing PTY session");
            return Ok(false);
        }
        self.backend
            .create_session(&launch.id, &launch.cwd, launch.command.as_deref())
            .await?;
        info!(session = %launch.id, "PTY session ready");
        Ok(true)
    }

    /// Feed output the backend kept for an adopted process into an engine
    /// that has not shown anything yet.
    async fn replay_scrollback(&self, id: &str, instance: &PooledInstance) {
        let history = match self.backend.scrollback(id).await {
            Ok(history) => history,
            Err(e) => {
                debug!(session = %id, error = %e, "no scrollback to replay");
                return;
            }
        };
        if history.is_empty() {
            return;
        }
        instance.with_engine(|engine| {
            if engine.contents().trim().is_empty() {
                engine.write(&history);
            }
        });
        debug!(session = %id, len = history.len(), "replayed scrollback");
    }

    async fn kill_orphan(&self, id: &str) {
        info!(session = %id, "session closed during startup; killing its process");
        if let Err(e) = self.backend.kill(id).await {
            warn!(session = %id, error = %e, "failed to kill orphaned PTY session");
        }
    }

    fn focus(&self, instance: &PooledInstance) {
        if instance.surface().is_attached() {
            instance.with_engine(|engine| engine.focus());
        }
    }
}

fn diagnostic(err: &BackendError) -> String {
    format!("\r\n\x1b[31mFailed to start session: {err}\x1b[0m\r\n")
}
