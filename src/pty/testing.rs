//! Recording backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};

use super::backend::{BackendError, BackendEvent, BackendEvents, PtyBackend};

#[derive(Default)]
struct FakeState {
    existing: HashSet<String>,
    creates: Vec<String>,
    writes: Vec<(String, Vec<u8>)>,
    resizes: Vec<(String, u16, u16)>,
    kills: Vec<String>,
    create_delay: Option<Duration>,
    create_error: Option<String>,
    scrollback: HashMap<String, Vec<u8>>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
    events_tx: UnboundedSender<BackendEvent>,
    events_rx: Mutex<Option<BackendEvents>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(FakeState::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.state.lock().create_delay = Some(delay);
    }

    pub fn fail_creates(&self, message: &str) {
        self.state.lock().create_error = Some(message.to_string());
    }

    pub fn insert_existing(&self, id: &str) {
        self.state.lock().existing.insert(id.to_string());
    }

    pub fn set_scrollback(&self, id: &str, history: &[u8]) {
        self.state
            .lock()
            .scrollback
            .insert(id.to_string(), history.to_vec());
    }

    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.state.lock().creates.clone()
    }

    pub fn write_calls(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    pub fn resize_calls(&self) -> Vec<(String, u16, u16)> {
        self.state.lock().resizes.clone()
    }

    pub fn kill_calls(&self) -> Vec<String> {
        self.state.lock().kills.clone()
    }
}

#[async_trait]
impl PtyBackend for FakeBackend {
    async fn create_session(
        &self,
        id: &str,
        _cwd: &Path,
        _command: Option<&str>,
    ) -> Result<(), BackendError> {
        let (delay, error) = {
            let mut state = self.state.lock();
            state.creates.push(id.to_string());
            (state.create_delay, state.create_error.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = error {
            return Err(BackendError::Unavailable(message));
        }
        self.state.lock().existing.insert(id.to_string());
        Ok(())
    }

    async fn session_exists(&self, id: &str) -> Result<bool, BackendError> {
        Ok(self.state.lock().existing.contains(id))
    }

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.writes.push((id.to_string(), data.to_vec()));
        if state.existing.contains(id) {
            Ok(())
        } else {
            Err(BackendError::NotFound(id.to_string()))
        }
    }

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), BackendError> {
        self.state.lock().resizes.push((id.to_string(), cols, rows));
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.kills.push(id.to_string());
        state.existing.remove(id);
        Ok(())
    }

    async fn scrollback(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        let state = self.state.lock();
        if !state.existing.contains(id) {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(state.scrollback.get(id).cloned().unwrap_or_default())
    }

    fn take_events(&self) -> Option<BackendEvents> {
        self.events_rx.lock().take()
    }
}
