//! Session and panel records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::layout::PanelId;
use crate::session::SessionId;

/// Title a session carries until its process reports one.
pub const UNTITLED: &str = "Untitled";

/// Generate a fresh, never reused identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One interactive shell or command instance (a tab).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Identifier of the backend PTY process. Equal to `id` for sessions
    /// created here.
    pub pty_id: SessionId,
    pub title: String,
    /// Program to run instead of the default shell.
    pub command: Option<String>,
    /// Set once the user renamed the session; process titles no longer apply.
    #[serde(default)]
    pub renamed: bool,
}

impl Session {
    pub fn new(command: Option<String>) -> Self {
        let id = new_id();
        Self {
            pty_id: id.clone(),
            id,
            title: UNTITLED.to_string(),
            command,
            renamed: false,
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == UNTITLED
    }
}

/// A region holding one or more sessions as tabs, one of them active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub id: PanelId,
    /// Never empty.
    pub sessions: Vec<Session>,
    pub active_session_id: SessionId,
    /// Pinned to the shared strip instead of the layout tree.
    pub is_shared: bool,
    /// Working directory for sessions created in this panel.
    pub cwd: PathBuf,
}

impl Panel {
    /// A panel holding a single fresh session.
    pub fn new(cwd: PathBuf, command: Option<String>) -> Self {
        let session = Session::new(command);
        Self {
            id: new_id(),
            active_session_id: session.id.clone(),
            sessions: vec![session],
            is_shared: false,
            cwd,
        }
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.session(&self.active_session_id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }
}
