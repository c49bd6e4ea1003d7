//! Mouse handling: click-to-focus, drag selection and wheel scrolling.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use super::*;
use crate::session::GridPosition;

const SCROLL_LINES: usize = 3;

/// Selection being dragged in a panel, not yet handed to the engine.
#[derive(Debug, Clone)]
pub(super) struct Drag {
    pub(super) panel_id: PanelId,
    pub(super) session_id: SessionId,
    pub(super) selection: Selection,
}

impl App {
    /// Map screen coordinates to a grid position inside `panel_id`, clamping
    /// to the panel's content area.
    fn grid_position(&self, panel_id: &str, col: u16, row: u16) -> Option<GridPosition> {
        let area = self.layout.content_of(panel_id)?;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        let col = col.clamp(area.x, area.x + area.width - 1);
        let row = row.clamp(area.y, area.y + area.height - 1);
        Some(GridPosition {
            row: row - area.y,
            col: col - area.x,
        })
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.clear_selection();
                let Some(panel_id) = self.layout.panel_at(mouse.column, mouse.row).cloned() else {
                    return;
                };
                self.workspace.focus_panel(&panel_id);

                let Some(session_id) = self
                    .workspace
                    .panel(&panel_id)
                    .map(|p| p.active_session_id.clone())
                else {
                    return;
                };
                if let Some(pos) = self.grid_position(&panel_id, mouse.column, mouse.row) {
                    self.drag = Some(Drag {
                        panel_id,
                        session_id,
                        selection: Selection::new(pos, pos),
                    });
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(panel_id) = self.drag.as_ref().map(|d| d.panel_id.clone()) else {
                    return;
                };
                let pos = self.grid_position(&panel_id, mouse.column, mouse.row);
                if let (Some(drag), Some(pos)) = (self.drag.as_mut(), pos) {
                    drag.selection.cursor = pos;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(drag) = self.drag.take() else {
                    return;
                };
                if drag.selection.is_empty() {
                    return;
                }
                if let Some(instance) = self.pool.get(&drag.session_id) {
                    instance.with_engine(|engine| engine.select(Some(drag.selection)));
                    if self.demux.auto_copy() {
                        self.set_message("Copied selection");
                    }
                }
            }
            MouseEventKind::ScrollUp => {
                self.scroll_at(mouse.column, mouse.row, true);
            }
            MouseEventKind::ScrollDown => {
                self.scroll_at(mouse.column, mouse.row, false);
            }
            _ => {}
        }
    }

    fn scroll_at(&mut self, col: u16, row: u16, up: bool) {
        let Some(session_id) = self
            .layout
            .panel_at(col, row)
            .and_then(|panel_id| self.workspace.panel(panel_id))
            .map(|panel| panel.active_session_id.clone())
        else {
            return;
        };
        if let Some(instance) = self.pool.get(&session_id) {
            instance.with_engine(|engine| {
                if up {
                    engine.scroll_up(SCROLL_LINES);
                } else {
                    engine.scroll_down(SCROLL_LINES);
                }
            });
        }
    }

    /// Drop the in-progress drag and the focused session's selection.
    pub(crate) fn clear_selection(&mut self) {
        self.drag = None;
        if let Some(instance) = self.focused_instance() {
            instance.with_engine(|engine| {
                if engine.selection().is_some() {
                    engine.select(None);
                }
            });
        }
    }
}
