//! Workspace state: panels, their sessions, the layout tree and the shared
//! strip.
//!
//! Everything here is plain data manipulation. Engines, PTYs and screen
//! surfaces are handled by [`binding::ViewBinding`], which reads this state.

pub mod binding;
pub mod model;

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::layout::{LayoutNode, PanelId, SplitDirection};
use crate::session::SessionId;

pub use binding::{Reconcile, View, ViewBinding};
pub use model::{Panel, Session, UNTITLED};

/// Result of closing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub session_id: SessionId,
    pub pty_id: SessionId,
    /// The panel lost its last session and was removed.
    pub panel_closed: bool,
}

#[derive(Debug, Default)]
pub struct Workspace {
    panels: HashMap<PanelId, Panel>,
    layout: Option<LayoutNode>,
    /// Pinned panels, in display order. Never also in `layout`.
    shared: Vec<PanelId>,
    focused: Option<PanelId>,
}

impl Workspace {
    /// A workspace with one panel running the default shell in `cwd`.
    pub fn new(cwd: PathBuf) -> Self {
        let mut workspace = Self::default();
        workspace.open_panel(cwd, None);
        workspace
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn layout(&self) -> Option<&LayoutNode> {
        self.layout.as_ref()
    }

    pub fn shared(&self) -> &[PanelId] {
        &self.shared
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.values()
    }

    /// Panels in display order: layout tree first, then the shared strip.
    pub fn visible_panel_ids(&self) -> Vec<PanelId> {
        let mut ids = self
            .layout
            .as_ref()
            .map(LayoutNode::panel_ids)
            .unwrap_or_default();
        ids.extend(self.shared.iter().cloned());
        ids
    }

    pub fn focused_panel_id(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn focused_panel(&self) -> Option<&Panel> {
        self.focused.as_deref().and_then(|id| self.panels.get(id))
    }

    /// Active session of the focused panel.
    pub fn focused_session(&self) -> Option<&Session> {
        self.focused_panel().and_then(Panel::active_session)
    }

    pub fn focus_panel(&mut self, id: &str) -> bool {
        if !self.panels.contains_key(id) {
            return false;
        }
        self.focused = Some(id.to_string());
        true
    }

    /// Move focus to the next visible panel, wrapping around.
    pub fn focus_next(&mut self) -> Option<&str> {
        let ids = self.visible_panel_ids();
        let next = match self.focused.as_deref() {
            Some(current) => ids
                .iter()
                .position(|id| id == current)
                .map(|pos| ids[(pos + 1) % ids.len()].clone()),
            None => None,
        };
        self.focused = next.or_else(|| ids.first().cloned());
        self.focused.as_deref()
    }

    /// Find a session and the panel that owns it.
    pub fn find_session(&self, session_id: &str) -> Option<(&Panel, &Session)> {
        self.panels
            .values()
            .find_map(|panel| panel.session(session_id).map(|s| (panel, s)))
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.panels
            .values_mut()
            .find_map(|panel| panel.session_mut(session_id))
    }

    /// Backend ids of every session in the workspace.
    pub fn pty_ids(&self) -> Vec<SessionId> {
        self.panels
            .values()
            .flat_map(|p| p.sessions.iter().map(|s| s.pty_id.clone()))
            .collect()
    }

    /// Open a new panel with one session. It becomes the root of an empty
    /// layout, or is split off the focused layout panel side by side.
    pub fn open_panel(&mut self, cwd: PathBuf, command: Option<String>) -> PanelId {
        let panel = Panel::new(cwd, command);
        let id = panel.id.clone();
        self.panels.insert(id.clone(), panel);
        self.insert_into_layout(&id, SplitDirection::Horizontal);
        self.focused = Some(id.clone());
        debug!(panel = %id, "opened panel");
        id
    }

    /// Split `panel_id` in `direction`, putting a fresh panel (inheriting the
    /// working directory) in the new half.
    ///
    /// Shared panels live outside the tree and cannot be split.
    pub fn split_panel(&mut self, panel_id: &str, direction: SplitDirection) -> Option<PanelId> {
        let cwd = self.panels.get(panel_id)?.cwd.clone();
        let layout = self.layout.take()?;
        if !layout.contains(panel_id) {
            self.layout = Some(layout);
            return None;
        }
        let panel = Panel::new(cwd, None);
        let id = panel.id.clone();
        self.layout = Some(layout.split(panel_id, direction, &id));
        self.panels.insert(id.clone(), panel);
        self.focused = Some(id.clone());
        debug!(panel = %panel_id, new_panel = %id, ?direction, "split panel");
        Some(id)
    }

    /// Add a session to `panel_id` and make it active.
    pub fn add_session(&mut self, panel_id: &str, command: Option<String>) -> Option<SessionId> {
        let panel = self.panels.get_mut(panel_id)?;
        let session = Session::new(command);
        let id = session.id.clone();
        panel.sessions.push(session);
        panel.active_session_id = id.clone();
        Some(id)
    }

    /// Remove a session from its panel. Closing the last session closes the
    /// panel too.
    pub fn close_session(&mut self, panel_id: &str, session_id: &str) -> Option<ClosedSession> {
        let panel = self.panels.get_mut(panel_id)?;
        let pos = panel.position(session_id)?;
        let session = panel.sessions.remove(pos);

        if panel.sessions.is_empty() {
            self.remove_panel(panel_id);
            return Some(ClosedSession {
                session_id: session.id,
                pty_id: session.pty_id,
                panel_closed: true,
            });
        }

        if panel.active_session_id == session.id {
            let next = pos.min(panel.sessions.len() - 1);
            panel.active_session_id = panel.sessions[next].id.clone();
        }
        Some(ClosedSession {
            session_id: session.id,
            pty_id: session.pty_id,
            panel_closed: false,
        })
    }

    fn remove_panel(&mut self, panel_id: &str) {
        self.panels.remove(panel_id);
        if let Some(pos) = self.shared.iter().position(|id| id == panel_id) {
            self.shared.remove(pos);
        } else {
            self.layout = self.layout.take().and_then(|tree| tree.remove(panel_id));
        }
        if self.focused.as_deref() == Some(panel_id) {
            self.focused = self.visible_panel_ids().into_iter().next();
        }
        debug!(panel = %panel_id, "closed panel");
    }

    /// Make `session_id` the active tab of `panel_id`.
    pub fn switch_session(&mut self, panel_id: &str, session_id: &str) -> bool {
        let Some(panel) = self.panels.get_mut(panel_id) else {
            return false;
        };
        if panel.session(session_id).is_none() {
            return false;
        }
        panel.active_session_id = session_id.to_string();
        true
    }

    /// Activate the next (or previous) tab of `panel_id`, wrapping around.
    pub fn cycle_session(&mut self, panel_id: &str, forward: bool) -> Option<&str> {
        let panel = self.panels.get_mut(panel_id)?;
        let len = panel.sessions.len();
        let pos = panel.position(&panel.active_session_id).unwrap_or(0);
        let next = if forward {
            (pos + 1) % len
        } else {
            (pos + len - 1) % len
        };
        panel.active_session_id = panel.sessions[next].id.clone();
        Some(panel.active_session_id.as_str())
    }

    /// Set a user-chosen title. Later process titles are ignored.
    pub fn rename_session(&mut self, session_id: &str, title: &str) -> bool {
        let Some(session) = self.session_mut(session_id) else {
            return false;
        };
        session.title = title.to_string();
        session.renamed = true;
        true
    }

    /// Apply a title reported by the session's process. Only a session still
    /// carrying the default title takes it.
    pub fn apply_backend_title(&mut self, session_id: &str, title: &str) -> bool {
        let Some(session) = self.session_mut(session_id) else {
            return false;
        };
        if session.renamed || !session.has_default_title() || title.is_empty() {
            return false;
        }
        session.title = title.to_string();
        true
    }

    /// Move a panel between the layout tree and the shared strip. Returns the
    /// panel's new shared state.
    pub fn toggle_shared(&mut self, panel_id: &str) -> Option<bool> {
        let shared = !self.panels.get(panel_id)?.is_shared;
        if shared {
            self.layout = self.layout.take().and_then(|tree| tree.remove(panel_id));
            self.shared.push(panel_id.to_string());
        } else {
            self.shared.retain(|id| id != panel_id);
            self.insert_into_layout(panel_id, SplitDirection::Horizontal);
        }
        if let Some(panel) = self.panels.get_mut(panel_id) {
            panel.is_shared = shared;
        }
        Some(shared)
    }

    /// Put `panel_id` into the layout tree: as root, or split off the
    /// focused tree panel (falling back to the last one).
    fn insert_into_layout(&mut self, panel_id: &str, direction: SplitDirection) {
        self.layout = Some(match self.layout.take() {
            None => LayoutNode::leaf(panel_id),
            Some(tree) => {
                let anchor = self
                    .focused
                    .clone()
                    .filter(|id| tree.contains(id))
                    .or_else(|| tree.panel_ids().pop());
                match anchor {
                    Some(anchor) => tree.split(&anchor, direction, panel_id),
                    None => tree,
                }
            }
        });
    }
}
