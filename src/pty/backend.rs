//! Boundary to the process that owns the real PTYs.
//!
//! Requests are async and id-tagged. Output and exit notifications for every
//! session arrive on one shared event stream, which can be taken exactly once.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::session::SessionId;

/// Errors reported by a PTY backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("PTY session '{0}' not found")]
    NotFound(SessionId),

    #[error("PTY session '{0}' already exists")]
    AlreadyExists(SessionId),

    #[error("failed to spawn shell: {0}")]
    Spawn(String),

    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Inbound notification from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Bytes produced by a session's process, in emission order.
    Output { id: SessionId, data: Vec<u8> },
    /// The session's process ended. Sent exactly once per created session.
    Exit { id: SessionId },
}

impl BackendEvent {
    pub fn id(&self) -> &str {
        match self {
            BackendEvent::Output { id, .. } | BackendEvent::Exit { id } => id,
        }
    }
}

pub type BackendEvents = UnboundedReceiver<BackendEvent>;

/// Requests the workspace core issues to the PTY owner.
#[async_trait]
pub trait PtyBackend: Send + Sync {
    /// Spawn a PTY process for `id` running `command` (or the default shell)
    /// in `cwd`.
    async fn create_session(
        &self,
        id: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<(), BackendError>;

    async fn session_exists(&self, id: &str) -> Result<bool, BackendError>;

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), BackendError>;

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), BackendError>;

    /// Terminate a session's process. Used by host teardown, and by the
    /// coordinator for a process whose session was closed while it started.
    async fn kill(&self, id: &str) -> Result<(), BackendError>;

    /// Recent raw output retained for `id`, oldest first. Replayed into a
    /// fresh engine when an existing process is adopted.
    async fn scrollback(&self, _id: &str) -> Result<Vec<u8>, BackendError> {
        Ok(Vec::new())
    }

    /// Take the shared event stream. Returns `None` after the first call.
    fn take_events(&self) -> Option<BackendEvents>;
}
