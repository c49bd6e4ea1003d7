use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::input::{InputMode, HINTS};

/// Top status line: mode, focused session, auto-copy flag and transient
/// messages.
pub struct StatusLine<'a> {
    mode: &'a InputMode,
    session_title: Option<&'a str>,
    auto_copy: bool,
    message: Option<&'a str>,
}

impl<'a> StatusLine<'a> {
    pub fn new(mode: &'a InputMode, session_title: Option<&'a str>, auto_copy: bool) -> Self {
        Self {
            mode,
            session_title,
            auto_copy,
            message: None,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    fn mode_indicator(&self) -> Span<'static> {
        let bg = match self.mode {
            InputMode::Passthrough => Color::Blue,
            InputMode::Prefix { .. } => Color::Yellow,
            InputMode::Rename { .. } => Color::Green,
        };
        Span::styled(
            format!(" {} ", self.mode.display_name()),
            Style::default().fg(Color::Black).bg(bg),
        )
    }

    fn line(&self) -> Line<'static> {
        let mut spans = vec![self.mode_indicator(), Span::raw(" ")];
        match self.mode {
            InputMode::Prefix { .. } => {
                for (key, command) in HINTS {
                    spans.push(Span::styled(key.to_string(), Style::default().fg(Color::Yellow)));
                    spans.push(Span::raw(format!(" {}  ", command.label())));
                }
            }
            InputMode::Rename { buffer } => {
                spans.push(Span::raw(format!("Title: {buffer}")));
                spans.push(Span::styled("_", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(
                    "  (Enter to apply, Esc to cancel)",
                    Style::default().fg(Color::Gray),
                ));
            }
            InputMode::Passthrough => {
                if let Some(title) = self.session_title {
                    spans.push(Span::raw(title.to_string()));
                }
                if self.auto_copy {
                    spans.push(Span::styled(
                        "  [auto-copy]",
                        Style::default().fg(Color::Green),
                    ));
                }
                if let Some(message) = self.message {
                    spans.push(Span::styled(
                        format!("  {message}"),
                        Style::default().fg(Color::Yellow),
                    ));
                }
                spans.push(Span::styled(
                    "  C-a: commands",
                    Style::default().fg(Color::Gray),
                ));
            }
        }
        Line::from(spans)
    }
}

impl<'a> Widget for StatusLine<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line())
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
    }
}
