//! Terminal engines and their observer hooks.
//!
//! A `TerminalEngine` is the opaque emulator behind one session: it absorbs
//! backend output, raises local input/title/selection events to subscribers,
//! and exposes a screen snapshot for rendering. `Vt100Engine` is the
//! production implementation.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::types::{ScreenState, ScrollState};

/// Default scrollback history retained per engine.
pub const SCROLLBACK_LINES: usize = 10000;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

struct ListenerTable<T: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// A set of callbacks for one kind of engine event.
pub struct Listeners<T: ?Sized> {
    table: Arc<Mutex<ListenerTable<T>>>,
}

impl<T: ?Sized + 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// subscription is disposed or dropped.
    pub fn subscribe(&self, callback: Callback<T>) -> Subscription {
        let id = {
            let mut table = self.table.lock();
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, callback));
            id
        };
        let weak: Weak<Mutex<ListenerTable<T>>> = Arc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = weak.upgrade() {
                table.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    pub fn emit(&self, value: &T) {
        let mut table = self.table.lock();
        for (_, callback) in table.entries.iter_mut() {
            callback(value);
        }
    }

    pub fn clear(&self) {
        self.table.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposable handle for a registered callback.
///
/// Dropping the handle unregisters the callback.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn dispose(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A position within the terminal content grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: u16,
    pub col: u16,
}

/// Stream selection in a terminal (anchor = mouse down, cursor = drag position).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: GridPosition,
    pub cursor: GridPosition,
}

impl Selection {
    pub fn new(anchor: GridPosition, cursor: GridPosition) -> Self {
        Self { anchor, cursor }
    }

    /// Return (start, end) sorted top-left to bottom-right
    pub fn ordered(&self) -> (GridPosition, GridPosition) {
        if self.anchor.row < self.cursor.row
            || (self.anchor.row == self.cursor.row && self.anchor.col <= self.cursor.col)
        {
            (self.anchor, self.cursor)
        } else {
            (self.cursor, self.anchor)
        }
    }

    /// Check if a cell is within the selection (standard terminal stream selection)
    pub fn contains(&self, row: u16, col: u16) -> bool {
        let (start, end) = self.ordered();
        if start.row == end.row {
            row == start.row && col >= start.col && col <= end.col
        } else if row == start.row {
            col >= start.col
        } else if row == end.row {
            col <= end.col
        } else {
            row > start.row && row < end.row
        }
    }

    /// True when anchor and cursor are the same position (no real selection)
    pub fn is_empty(&self) -> bool {
        self.anchor == self.cursor
    }
}

pub type DataCallback = Callback<[u8]>;
pub type TextCallback = Callback<str>;

/// Capability surface of one terminal emulator instance.
pub trait TerminalEngine: Send {
    /// Feed backend output into the emulator.
    fn write(&mut self, bytes: &[u8]);

    /// Local input (keystrokes, paste). Raised to `on_data` subscribers.
    fn input(&mut self, bytes: &[u8]);

    /// Update the current selection. Raised to `on_selection_change`
    /// subscribers with the selected text.
    fn select(&mut self, selection: Option<Selection>);

    fn selection(&self) -> Option<Selection>;

    fn on_data(&mut self, callback: DataCallback) -> Subscription;

    fn on_title_change(&mut self, callback: TextCallback) -> Subscription;

    fn on_selection_change(&mut self, callback: TextCallback) -> Subscription;

    /// Refit the emulator grid to a host region of `cols` x `rows` cells.
    /// Returns true if the grid size changed.
    fn resize_to_fit(&mut self, cols: u16, rows: u16) -> bool;

    fn focus(&mut self);

    fn blur(&mut self);

    fn is_focused(&self) -> bool;

    /// Tear down the emulator. Further writes are ignored.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    fn cols(&self) -> u16;

    fn rows(&self) -> u16;

    /// Plain-text contents of the visible screen.
    fn contents(&self) -> String;

    fn snapshot(&self) -> ScreenState;

    fn scroll_up(&mut self, lines: usize);

    fn scroll_down(&mut self, lines: usize);
}

/// vt100-backed terminal engine.
pub struct Vt100Engine {
    parser: vt100::Parser,
    title: String,
    selection: Option<Selection>,
    focused: bool,
    disposed: bool,
    /// Current scroll offset (0 = live/bottom, positive = lines scrolled up)
    scroll_offset: usize,
    /// Whether scroll is locked (user has scrolled up)
    scroll_locked: bool,
    data_listeners: Listeners<[u8]>,
    title_listeners: Listeners<str>,
    selection_listeners: Listeners<str>,
}

impl Vt100Engine {
    pub fn new(rows: u16, cols: u16, scrollback_lines: usize) -> Self {
        Self {
            parser: vt100::Parser::new(rows.max(1), cols.max(1), scrollback_lines),
            title: String::new(),
            selection: None,
            focused: false,
            disposed: false,
            scroll_offset: 0,
            scroll_locked: false,
            data_listeners: Listeners::new(),
            title_listeners: Listeners::new(),
            selection_listeners: Listeners::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Move the viewport `offset` lines into history. The offset is bounded
    /// by the retained history and by the grid height, which is as far as
    /// vt100 can render back.
    fn set_scroll_offset(&mut self, offset: usize) {
        let offset = offset.min(usize::from(self.rows()));
        self.parser.set_scrollback(offset);
        self.scroll_offset = self.parser.screen().scrollback();
        if self.scroll_offset == 0 {
            self.scroll_locked = false;
        }
    }

    fn selected_text(&self, selection: &Selection) -> String {
        let (start, end) = selection.ordered();
        self.parser.screen().contents_between(
            start.row,
            start.col,
            end.row,
            end.col.saturating_add(1),
        )
    }
}

impl Default for Vt100Engine {
    fn default() -> Self {
        Self::new(24, 80, SCROLLBACK_LINES)
    }
}

impl TerminalEngine for Vt100Engine {
    fn write(&mut self, bytes: &[u8]) {
        if self.disposed {
            return;
        }
        self.parser.process(bytes);

        // Auto-scroll to bottom when new output arrives, unless scroll is locked
        let offset = if self.scroll_locked { self.scroll_offset } else { 0 };
        // process() resets scrollback, so re-apply the tracked position
        self.set_scroll_offset(offset);

        let title = self.parser.screen().title();
        if !title.is_empty() && title != self.title {
            self.title = title.to_string();
            self.title_listeners.emit(&self.title);
        }
    }

    fn input(&mut self, bytes: &[u8]) {
        if self.disposed || bytes.is_empty() {
            return;
        }
        if self.scroll_locked {
            self.set_scroll_offset(0);
        }
        self.data_listeners.emit(bytes);
    }

    fn select(&mut self, selection: Option<Selection>) {
        if self.disposed {
            return;
        }
        self.selection = selection.filter(|s| !s.is_empty());
        if let Some(selection) = self.selection {
            let text = self.selected_text(&selection);
            if !text.is_empty() {
                self.selection_listeners.emit(&text);
            }
        }
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn on_data(&mut self, callback: DataCallback) -> Subscription {
        self.data_listeners.subscribe(callback)
    }

    fn on_title_change(&mut self, callback: TextCallback) -> Subscription {
        self.title_listeners.subscribe(callback)
    }

    fn on_selection_change(&mut self, callback: TextCallback) -> Subscription {
        self.selection_listeners.subscribe(callback)
    }

    fn resize_to_fit(&mut self, cols: u16, rows: u16) -> bool {
        let (cols, rows) = (cols.max(1), rows.max(1));
        if self.disposed || (cols == self.cols() && rows == self.rows()) {
            return false;
        }
        self.parser.set_size(rows, cols);
        self.set_scroll_offset(self.scroll_offset);
        self.selection = None;
        true
    }

    fn focus(&mut self) {
        self.focused = !self.disposed;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.focused = false;
        self.selection = None;
        self.data_listeners.clear();
        self.title_listeners.clear();
        self.selection_listeners.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn cols(&self) -> u16 {
        self.parser.screen().size().1
    }

    fn rows(&self) -> u16 {
        self.parser.screen().size().0
    }

    fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    fn snapshot(&self) -> ScreenState {
        let scroll = ScrollState {
            offset: self.scroll_offset,
            locked: self.scroll_locked,
        };
        ScreenState::capture(self.parser.screen(), scroll, self.selection)
    }

    fn scroll_up(&mut self, lines: usize) {
        self.set_scroll_offset(self.scroll_offset.saturating_add(lines));
        if self.scroll_offset > 0 {
            self.scroll_locked = true;
        }
    }

    fn scroll_down(&mut self, lines: usize) {
        self.set_scroll_offset(self.scroll_offset.saturating_sub(lines));
    }
}
