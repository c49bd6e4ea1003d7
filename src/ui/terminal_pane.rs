use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::session::ScreenState;

/// One tab label in a pane's title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLabel {
    pub title: String,
    pub active: bool,
}

/// Terminal pane widget: a bordered panel showing the active session's
/// screen, with the panel's tabs in the top border.
pub struct TerminalPane<'a> {
    screen: Option<&'a ScreenState>,
    tabs: &'a [TabLabel],
    focused: bool,
    shared: bool,
}

impl<'a> TerminalPane<'a> {
    pub fn new(screen: Option<&'a ScreenState>, tabs: &'a [TabLabel], focused: bool) -> Self {
        Self {
            screen,
            tabs,
            focused,
            shared: false,
        }
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    fn title(&self) -> Line<'static> {
        let mut spans = vec![Span::raw(" ")];
        if self.shared {
            spans.push(Span::styled("[pinned] ", Style::default().fg(Color::Yellow)));
        }
        for (i, tab) in self.tabs.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
            }
            let style = if tab.active {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(format!("{}:{}", i + 1, tab.title), style));
        }
        if let Some(offset) = self.screen.map(|s| s.scroll.offset).filter(|o| *o > 0) {
            spans.push(Span::styled(
                format!(" [SCROLLED: -{offset}]"),
                Style::default().fg(Color::Yellow),
            ));
        }
        spans.push(Span::raw(" "));
        Line::from(spans)
    }
}

/// Content area of a pane drawn in `area`.
pub fn pane_inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

impl<'a> Widget for TerminalPane<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .title(self.title())
            .borders(Borders::ALL)
            .border_style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        match self.screen {
            Some(screen) => {
                render_screen_state(screen, inner_area, buf, self.focused);
            }
            None => {
                let placeholder = "Starting session...";
                let x =
                    inner_area.x + (inner_area.width.saturating_sub(placeholder.len() as u16)) / 2;
                let y = inner_area.y + inner_area.height / 2;
                if y < inner_area.y + inner_area.height && x < inner_area.x + inner_area.width {
                    buf.set_string(x, y, placeholder, Style::default().fg(Color::DarkGray));
                }
            }
        }
    }
}

fn render_screen_state(screen: &ScreenState, area: Rect, buf: &mut Buffer, focused: bool) {
    for (row_idx, cells) in screen.rows.iter().enumerate().take(area.height as usize) {
        let y = area.y + row_idx as u16;
        for (col_idx, cell) in cells.iter().enumerate().take(area.width as usize) {
            let x = area.x + col_idx as u16;
            if !cell.symbol.is_empty() {
                let style = if cell.selected {
                    cell.style.add_modifier(Modifier::REVERSED)
                } else {
                    cell.style
                };
                buf.set_string(x, y, &cell.symbol, style);
            } else if cell.selected {
                // Empty selected cell: show visible highlight
                if let Some(buf_cell) = buf.cell_mut((x, y)) {
                    buf_cell.set_char(' ');
                    buf_cell.set_style(Style::default().bg(Color::White).fg(Color::Black));
                }
            }
        }
    }

    // Only the focused pane shows a cursor, and not over a selection
    let Some((cursor_row, cursor_col)) = screen.cursor else {
        return;
    };
    if focused && screen.selection.is_none() {
        let cursor_x = area.x + cursor_col;
        let cursor_y = area.y + cursor_row;
        if cursor_y < area.y + area.height && cursor_x < area.x + area.width {
            if let Some(cell) = buf.cell_mut((cursor_x, cursor_y)) {
                cell.set_style(Style::default().bg(Color::White).fg(Color::Black));
            }
        }
    }
}
