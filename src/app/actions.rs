//! Workspace commands triggered from the prefix key.

use tracing::{debug, warn};

use super::*;
use crate::input::Command;
use crate::layout::SplitDirection;

impl App {
    pub fn execute(&mut self, command: Command) {
        debug!(command = command.label(), "executing command");
        match command {
            Command::SplitHorizontal => self.split_focused(SplitDirection::Horizontal),
            Command::SplitVertical => self.split_focused(SplitDirection::Vertical),
            Command::NewTab => self.new_tab(),
            Command::CloseTab => self.close_focused_session(),
            Command::NextTab => self.cycle_tab(true),
            Command::PrevTab => self.cycle_tab(false),
            Command::FocusNext => {
                self.clear_selection();
                self.workspace.focus_next();
            }
            Command::ToggleShared => self.toggle_shared(),
            Command::Rename => {
                if let Some(title) = self.workspace.focused_session().map(|s| s.title.clone()) {
                    self.router.begin_rename(&title);
                }
            }
            Command::ToggleAutoCopy => self.toggle_auto_copy(),
            Command::Quit => self.should_quit = true,
            Command::SendPrefix => self.send_to_focused(&[0x01]),
        }
    }

    fn split_focused(&mut self, direction: SplitDirection) {
        let Some(panel_id) = self.workspace.focused_panel_id().map(str::to_string) else {
            return;
        };
        self.clear_selection();
        if self.workspace.split_panel(&panel_id, direction).is_none() {
            self.set_message("Pinned panels cannot be split");
        }
    }

    fn new_tab(&mut self) {
        let Some(panel_id) = self.workspace.focused_panel_id().map(str::to_string) else {
            return;
        };
        self.clear_selection();
        self.workspace.add_session(&panel_id, None);
    }

    fn cycle_tab(&mut self, forward: bool) {
        let Some(panel_id) = self.workspace.focused_panel_id().map(str::to_string) else {
            return;
        };
        self.clear_selection();
        self.workspace.cycle_session(&panel_id, forward);
    }

    /// Close the focused panel's active session and terminate its process.
    pub fn close_focused_session(&mut self) {
        let Some((panel_id, session_id)) = self
            .workspace
            .focused_panel()
            .map(|p| (p.id.clone(), p.active_session_id.clone()))
        else {
            return;
        };
        self.drag = None;
        let Some(closed) = self.workspace.close_session(&panel_id, &session_id) else {
            return;
        };

        self.binding.close(&closed.pty_id);
        let backend = Arc::clone(&self.backend);
        let pty_id = closed.pty_id;
        tokio::spawn(async move {
            if let Err(e) = backend.kill(&pty_id).await {
                warn!(id = %pty_id, error = %e, "failed to kill closed session");
            }
        });

        if self.workspace.is_empty() {
            self.should_quit = true;
        }
    }

    fn toggle_shared(&mut self) {
        let Some(panel_id) = self.workspace.focused_panel_id().map(str::to_string) else {
            return;
        };
        match self.workspace.toggle_shared(&panel_id) {
            Some(true) => self.set_message("Panel pinned"),
            Some(false) => self.set_message("Panel unpinned"),
            None => {}
        }
    }

    pub fn toggle_auto_copy(&mut self) {
        let enabled = !self.demux.auto_copy();
        self.demux.set_auto_copy(enabled);
        self.config.terminal.auto_copy = enabled;
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "failed to save config");
            }
        }
        self.set_message(if enabled {
            "Auto-copy on"
        } else {
            "Auto-copy off"
        });
    }

    pub(super) fn rename_focused(&mut self, title: &str) {
        let Some(session_id) = self.focused_session_id() else {
            return;
        };
        self.workspace.rename_session(&session_id, title);
    }
}
