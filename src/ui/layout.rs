use ratatui::layout::Rect;

use super::terminal_pane::pane_inner;
use crate::layout::{hit_test, panel_rects, strip_rects, workspace_areas, PanelId};
use crate::workspace::Workspace;

/// Where everything goes on screen for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    /// Status line at the top
    pub status: Rect,
    /// Outer rectangle of every visible panel: layout tree first, then the
    /// shared strip.
    pub panels: Vec<(PanelId, Rect)>,
}

impl ScreenLayout {
    pub fn compute(workspace: &Workspace, area: Rect) -> Self {
        let shared = workspace.shared();
        let (status, main, strip) = workspace_areas(area, !shared.is_empty());

        let mut panels = workspace
            .layout()
            .map(|tree| panel_rects(tree, main))
            .unwrap_or_default();
        if let Some(strip) = strip {
            panels.extend(
                shared
                    .iter()
                    .cloned()
                    .zip(strip_rects(strip, shared.len())),
            );
        }

        Self { status, panels }
    }

    /// Terminal grid area of every panel.
    pub fn content_rects(&self) -> Vec<(PanelId, Rect)> {
        self.panels
            .iter()
            .map(|(id, area)| (id.clone(), pane_inner(*area)))
            .collect()
    }

    pub fn panel_at(&self, col: u16, row: u16) -> Option<&PanelId> {
        hit_test(&self.panels, col, row)
    }

    pub fn content_of(&self, panel_id: &str) -> Option<Rect> {
        self.panels
            .iter()
            .find(|(id, _)| id == panel_id)
            .map(|(_, area)| pane_inner(*area))
    }
}
