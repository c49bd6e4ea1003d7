pub use crossterm::event::{Event as CrosstermEvent, KeyEvent, MouseEvent};

use crate::pty::SessionSignal;

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick for regular updates
    Tick,
    /// Keyboard input
    Key(KeyEvent),
    /// Mouse input
    Mouse(MouseEvent),
    /// Bracketed paste
    Paste(String),
    /// Terminal resize
    Resize(u16, u16),
    /// Title change or exit reported for a session
    Session(SessionSignal),
}

impl From<CrosstermEvent> for Event {
    fn from(event: CrosstermEvent) -> Self {
        match event {
            CrosstermEvent::Key(key) => Event::Key(key),
            CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
            CrosstermEvent::Paste(text) => Event::Paste(text),
            CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
            _ => Event::Tick,
        }
    }
}

impl From<SessionSignal> for Event {
    fn from(signal: SessionSignal) -> Self {
        Event::Session(signal)
    }
}
