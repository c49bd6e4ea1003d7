//! Renderable terminal screen snapshots.
//!
//! An engine captures everything a pane needs in one value: styled cells,
//! where the cursor should be drawn, how far the view is scrolled back and
//! which cells are selected. Widgets never touch emulator state directly.

use ratatui::style::{Color, Modifier, Style};

use super::engine::Selection;

/// Unique identifier for a session (and its backing PTY).
pub type SessionId = String;

/// Scrollback position of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Lines scrolled back from the live bottom (0 = live).
    pub offset: usize,
    /// New output keeps the view where it is instead of following it.
    pub locked: bool,
}

impl ScrollState {
    pub fn is_live(&self) -> bool {
        self.offset == 0
    }
}

/// A single styled cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenCell {
    /// Grapheme shown in the cell; empty for blanks and wide-char tails.
    pub symbol: String,
    pub style: Style,
    pub selected: bool,
}

/// Everything needed to draw one session's screen.
#[derive(Debug, Clone, Default)]
pub struct ScreenState {
    pub rows: Vec<Vec<ScreenCell>>,
    /// Cursor cell (row, col), present only when the program shows it and
    /// the view is live.
    pub cursor: Option<(u16, u16)>,
    pub scroll: ScrollState,
    pub selection: Option<Selection>,
}

impl ScreenState {
    /// Capture the visible part of `screen`.
    pub fn capture(screen: &vt100::Screen, scroll: ScrollState, selection: Option<Selection>) -> Self {
        let (rows, cols) = screen.size();
        let rows = (0..rows)
            .map(|row| {
                (0..cols)
                    .filter_map(|col| screen.cell(row, col))
                    .map(|cell| ScreenCell {
                        symbol: cell.contents(),
                        style: cell_style(cell),
                        selected: false,
                    })
                    .collect()
            })
            .collect();

        let cursor = (scroll.is_live() && !screen.hide_cursor()).then(|| screen.cursor_position());
        let mut state = Self {
            rows,
            cursor,
            scroll,
            selection: None,
        };
        state.select(selection);
        state
    }

    /// Replace the highlighted selection.
    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection.filter(|s| !s.is_empty());
        for (row, cells) in self.rows.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                cell.selected = self
                    .selection
                    .is_some_and(|s| s.contains(row as u16, col as u16));
            }
        }
    }

    /// Text of one row, blanks rendered as spaces.
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| if c.symbol.is_empty() { " " } else { c.symbol.as_str() })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut modifier = Modifier::empty();
    for (on, bit) in [
        (cell.bold(), Modifier::BOLD),
        (cell.italic(), Modifier::ITALIC),
        (cell.underline(), Modifier::UNDERLINED),
        (cell.inverse(), Modifier::REVERSED),
    ] {
        if on {
            modifier |= bit;
        }
    }
    Style::default()
        .fg(color(cell.fgcolor()))
        .bg(color(cell.bgcolor()))
        .add_modifier(modifier)
}

fn color(color: vt100::Color) -> Color {
    match color {
        vt100::Color::Default => Color::Reset,
        vt100::Color::Idx(idx) => Color::Indexed(idx),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}
