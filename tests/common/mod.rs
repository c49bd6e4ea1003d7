//! Shared fixtures for the workspace integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use parking_lot::Mutex;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use panedeck::app::App;
use panedeck::clipboard::MemoryClipboard;
use panedeck::config::Config;
use panedeck::event::Event;
use panedeck::pty::{BackendError, BackendEvent, BackendEvents, PtyBackend, SessionSignal};
use panedeck::ui;

pub const WIDTH: u16 = 100;
pub const HEIGHT: u16 = 30;

/// Initialize a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
struct Recorded {
    existing: HashSet<String>,
    creates: Vec<String>,
    writes: Vec<(String, Vec<u8>)>,
    kills: Vec<String>,
    create_delay: Option<Duration>,
}

/// Backend that records every request and never spawns a process.
pub struct RecordingBackend {
    recorded: Mutex<Recorded>,
    events_tx: UnboundedSender<BackendEvent>,
    events_rx: Mutex<Option<BackendEvents>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            recorded: Mutex::new(Recorded::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.recorded.lock().create_delay = Some(delay);
    }

    pub fn output(&self, id: &str, data: &[u8]) {
        let _ = self.events_tx.send(BackendEvent::Output {
            id: id.to_string(),
            data: data.to_vec(),
        });
    }

    pub fn exit(&self, id: &str) {
        let _ = self.events_tx.send(BackendEvent::Exit { id: id.to_string() });
    }

    pub fn creates(&self) -> Vec<String> {
        self.recorded.lock().creates.clone()
    }

    pub fn kills(&self) -> Vec<String> {
        self.recorded.lock().kills.clone()
    }

    /// Ids with a live process, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.recorded.lock().existing.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Everything written to `id`, concatenated.
    pub fn written_to(&self, id: &str) -> Vec<u8> {
        self.recorded
            .lock()
            .writes
            .iter()
            .filter(|(target, _)| target == id)
            .flat_map(|(_, data)| data.iter().copied())
            .collect()
    }
}

#[async_trait]
impl PtyBackend for RecordingBackend {
    async fn create_session(
        &self,
        id: &str,
        _cwd: &Path,
        _command: Option<&str>,
    ) -> Result<(), BackendError> {
        let delay = {
            let mut recorded = self.recorded.lock();
            recorded.creates.push(id.to_string());
            recorded.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.recorded.lock().existing.insert(id.to_string());
        Ok(())
    }

    async fn session_exists(&self, id: &str) -> Result<bool, BackendError> {
        Ok(self.recorded.lock().existing.contains(id))
    }

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), BackendError> {
        self.recorded
            .lock()
            .writes
            .push((id.to_string(), data.to_vec()));
        Ok(())
    }

    async fn resize(&self, _id: &str, _cols: u16, _rows: u16) -> Result<(), BackendError> {
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<(), BackendError> {
        let mut recorded = self.recorded.lock();
        recorded.kills.push(id.to_string());
        recorded.existing.remove(id);
        Ok(())
    }

    fn take_events(&self) -> Option<BackendEvents> {
        self.events_rx.lock().take()
    }
}

/// An [`App`] wired to a [`RecordingBackend`], drawn into a ratatui test
/// backend. Backend events and session signals are pumped by hand.
pub struct Harness {
    pub app: App,
    pub backend: Arc<RecordingBackend>,
    pub clipboard: Arc<MemoryClipboard>,
    events: BackendEvents,
    signals: UnboundedReceiver<SessionSignal>,
    terminal: Terminal<TestBackend>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(RecordingBackend::new())
    }

    pub fn with_backend(backend: Arc<RecordingBackend>) -> Self {
        init_tracing();
        let clipboard = Arc::new(MemoryClipboard::default());
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let app = App::new(
            Config::default(),
            None,
            backend.clone(),
            clipboard.clone(),
            signals_tx,
            PathBuf::from("/tmp"),
        );
        let events = app
            .demux()
            .subscribe_backend()
            .expect("event stream available");
        let terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).expect("test terminal");
        Self {
            app,
            backend,
            clipboard,
            events,
            signals,
            terminal,
        }
    }

    pub fn area() -> Rect {
        Rect::new(0, 0, WIDTH, HEIGHT)
    }

    /// Reconcile views and wait for every PTY initialization to finish.
    pub async fn settle(&mut self) {
        self.app.sync_views(Self::area()).settle().await;
    }

    /// Route queued backend events, then queued session signals.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.app.demux().dispatch(event);
        }
        while let Ok(signal) = self.signals.try_recv() {
            self.app.handle_event(Event::Session(signal));
        }
    }

    /// Deliver queued input to the backend.
    pub async fn flush(&self) {
        self.app.demux().flush_outbound().await;
    }

    pub fn focused_session(&self) -> String {
        self.app
            .workspace()
            .focused_session()
            .map(|s| s.id.clone())
            .expect("a focused session")
    }

    pub fn key(&mut self, code: KeyCode) {
        self.app
            .handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.key(KeyCode::Char(c));
        }
    }

    /// Press the prefix key followed by `c`.
    pub fn command(&mut self, c: char) {
        self.app.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('a'),
            KeyModifiers::CONTROL,
        )));
        self.key(KeyCode::Char(c));
    }

    pub fn mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
        self.app.handle_event(Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }));
    }

    /// Drag a left-button selection from one screen cell to another.
    pub fn drag(&mut self, from: (u16, u16), to: (u16, u16)) {
        self.mouse(MouseEventKind::Down(MouseButton::Left), from.0, from.1);
        self.mouse(MouseEventKind::Drag(MouseButton::Left), to.0, to.1);
        self.mouse(MouseEventKind::Up(MouseButton::Left), to.0, to.1);
    }

    /// Draw a frame and return the screen as text, one line per row.
    pub fn render(&mut self) -> String {
        let app = &self.app;
        self.terminal
            .draw(|f| ui::draw(f, app, app.layout()))
            .expect("draw");
        let buffer = self.terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
