//! Application state for panedeck.
//!
//! [`App`] owns the workspace model and the shared runtime pieces (pool,
//! backend, demultiplexer, view binding) and turns terminal events into
//! workspace changes. Drawing reads it through a few accessors.

mod actions;
mod mouse;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyEvent, KeyEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::clipboard::ClipboardSink;
use crate::config::Config;
use crate::event::Event;
use crate::input::{KeyOutcome, KeyRouter};
use crate::layout::PanelId;
use crate::pty::{IoDemux, PtyBackend, PtyCoordinator, SessionSignal};
use crate::session::{PooledInstance, Selection, SessionId, SessionPool};
use crate::ui::{ScreenLayout, StatusLine};
use crate::workspace::{binding, Reconcile, ViewBinding, Workspace};

use mouse::Drag;

/// How long a status message stays visible.
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct App {
    config: Config,
    /// Where toggled settings are persisted. `None` keeps them in memory.
    config_path: Option<PathBuf>,
    workspace: Workspace,
    pool: Arc<SessionPool>,
    backend: Arc<dyn PtyBackend>,
    demux: Arc<IoDemux>,
    binding: ViewBinding,
    router: KeyRouter,
    /// Layout of the last frame, used for mouse hit testing
    layout: ScreenLayout,
    drag: Option<Drag>,
    message: Option<(String, Instant)>,
    pub should_quit: bool,
}

impl App {
    /// Build the application around `backend` with one panel running the
    /// default shell in `cwd`.
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        backend: Arc<dyn PtyBackend>,
        clipboard: Arc<dyn ClipboardSink>,
        signals: UnboundedSender<SessionSignal>,
        cwd: PathBuf,
    ) -> Self {
        let pool = Arc::new(SessionPool::with_vt100(config.terminal.scrollback_lines));
        let coordinator = Arc::new(PtyCoordinator::new(Arc::clone(&pool), Arc::clone(&backend)));
        let demux = Arc::new(IoDemux::new(
            Arc::clone(&pool),
            Arc::clone(&backend),
            clipboard,
            config.terminal.auto_copy,
            signals,
        ));
        let binding = ViewBinding::new(coordinator, Arc::clone(&demux));
        info!(cwd = %cwd.display(), "starting workspace");

        Self {
            config,
            config_path,
            workspace: Workspace::new(cwd),
            pool,
            backend,
            demux,
            binding,
            router: KeyRouter::new(),
            layout: ScreenLayout::default(),
            drag: None,
            message: None,
            should_quit: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    pub fn demux(&self) -> &Arc<IoDemux> {
        &self.demux
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn status_line(&self) -> StatusLine<'_> {
        StatusLine::new(
            self.router.mode(),
            self.workspace.focused_session().map(|s| s.title.as_str()),
            self.demux.auto_copy(),
        )
        .message(self.message())
    }

    /// Selection being dragged in `panel_id`, if any.
    pub fn selection_for(&self, panel_id: &str) -> Option<Selection> {
        self.drag
            .as_ref()
            .filter(|drag| drag.panel_id == panel_id)
            .map(|drag| drag.selection)
    }

    /// Lay out the workspace in `area` and bring the mounted views in line
    /// with it. Must run inside the tokio runtime.
    pub fn sync_views(&mut self, area: Rect) -> Reconcile {
        self.layout = ScreenLayout::compute(&self.workspace, area);
        let views = binding::views(&self.workspace, &self.layout.content_rects());
        self.binding
            .reconcile(&views, self.workspace.focused_panel_id())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.tick(),
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Paste(text) => self.send_to_focused(text.as_bytes()),
            // Picked up by the next sync_views
            Event::Resize(..) => {}
            Event::Session(signal) => self.handle_signal(signal),
        }
    }

    /// Expire the prefix key and stale status messages.
    pub fn tick(&mut self) {
        self.router.check_timeout();
        if self
            .message
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= MESSAGE_TIMEOUT)
        {
            self.message = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.router.handle(key) {
            KeyOutcome::Forward(bytes) => {
                self.clear_selection();
                self.send_to_focused(&bytes);
            }
            KeyOutcome::Command(command) => self.execute(command),
            KeyOutcome::Rename(title) => self.rename_focused(&title),
            KeyOutcome::Consumed => {}
        }
    }

    pub fn handle_signal(&mut self, signal: SessionSignal) {
        match signal {
            SessionSignal::TitleChanged { id, title } => {
                self.workspace.apply_backend_title(&id, &title);
            }
            SessionSignal::Exited { id } => {
                if let Some((_, session)) = self.workspace.find_session(&id) {
                    let text = format!("{} exited", session.title);
                    self.set_message(&text);
                }
            }
        }
    }

    /// Feed local input to the focused session's engine. The engine raises
    /// it to the demultiplexer, which forwards it once the PTY is ready.
    pub fn send_to_focused(&mut self, bytes: &[u8]) {
        if let Some(instance) = self.focused_instance() {
            instance.with_engine(|engine| engine.input(bytes));
        }
    }

    /// Unmount every view and terminate every session process.
    pub async fn shutdown(&mut self) {
        self.binding.unmount_all();
        for id in self.workspace.pty_ids() {
            if let Err(e) = self.backend.kill(&id).await {
                tracing::debug!(id = %id, error = %e, "kill on shutdown failed");
            }
        }
        info!("workspace closed");
    }

    fn focused_instance(&self) -> Option<Arc<PooledInstance>> {
        let session = self.workspace.focused_session()?;
        self.pool.get(&session.pty_id)
    }

    fn focused_session_id(&self) -> Option<SessionId> {
        self.workspace.focused_session().map(|s| s.id.clone())
    }

    fn set_message(&mut self, text: &str) {
        self.message = Some((text.to_string(), Instant::now()));
    }
}
