//! Clipboard sinks for selection auto-copy.

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Something that can receive copied text.
pub trait ClipboardSink: Send + Sync {
    fn copy(&self, text: &str) -> Result<()>;
}

/// The system clipboard, via arboard.
///
/// A new handle is opened per copy; holding one open for the life of the
/// process keeps X11 selection ownership busy.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("failed to open clipboard")?;
        clipboard
            .set_text(text.to_string())
            .context("failed to set clipboard text")
    }
}

/// In-memory clipboard holding the last copied text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl ClipboardSink for MemoryClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        *self.last.lock() = Some(text.to_string());
        Ok(())
    }
}
