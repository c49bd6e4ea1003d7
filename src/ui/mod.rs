//! Terminal UI components: terminal panes, screen layout and the status line.

pub mod layout;
pub mod status;
pub mod terminal_pane;

use ratatui::Frame;

pub use layout::ScreenLayout;
pub use status::StatusLine;
pub use terminal_pane::{pane_inner, TabLabel, TerminalPane};

use crate::app::App;

/// Draw the whole workspace for one frame.
pub fn draw(f: &mut Frame, app: &App, layout: &ScreenLayout) {
    f.render_widget(app.status_line(), layout.status);

    let focused = app.workspace().focused_panel_id();
    for (panel_id, area) in &layout.panels {
        let Some(panel) = app.workspace().panel(panel_id) else {
            continue;
        };
        let tabs: Vec<TabLabel> = panel
            .sessions
            .iter()
            .map(|s| TabLabel {
                title: s.title.clone(),
                active: s.id == panel.active_session_id,
            })
            .collect();

        let instance = app.pool().get(&panel.active_session_id);
        let mut screen = instance.as_ref().map(|i| i.with_engine(|e| e.snapshot()));
        // A drag in progress wins over the engine's settled selection.
        if let (Some(screen), Some(dragged)) = (screen.as_mut(), app.selection_for(panel_id)) {
            screen.select(Some(dragged));
        }

        let pane = TerminalPane::new(screen.as_ref(), &tabs, focused == Some(panel_id.as_str()))
            .shared(panel.is_shared);
        f.render_widget(pane, *area);
    }
}
