//! In-process PTY backend.
//!
//! Spawns shells through portable-pty, runs one reader thread per session and
//! multiplexes every session's output and exit onto a single event channel.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use super::backend::{BackendError, BackendEvent, BackendEvents, PtyBackend};
use crate::session::SessionId;

/// Maximum replay buffer size per session (256KB)
pub const SCROLLBACK_MAX_BYTES: usize = 256 * 1024;

const READ_CHUNK: usize = 16 * 1024;

struct LocalSession {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    running: Arc<AtomicBool>,
}

type Replay = Arc<Mutex<HashMap<SessionId, VecDeque<u8>>>>;

/// PTY backend living in the same process as the UI.
pub struct LocalPtyBackend {
    shell: Option<String>,
    sessions: Arc<Mutex<HashMap<SessionId, LocalSession>>>,
    replay: Replay,
    events_tx: UnboundedSender<BackendEvent>,
    events_rx: Mutex<Option<BackendEvents>>,
}

impl LocalPtyBackend {
    /// Create a backend. `shell` overrides `$SHELL`.
    pub fn new(shell: Option<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            shell,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            replay: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Kill every running session.
    fn shutdown(&self) {
        let ids: Vec<SessionId> = self.sessions.lock().keys().cloned().collect();
        for id in ids {
            self.terminate(&id);
        }
    }

    fn terminate(&self, id: &str) -> bool {
        let Some(mut session) = self.sessions.lock().remove(id) else {
            return false;
        };
        session.running.store(false, Ordering::SeqCst);
        if let Err(e) = session.child.kill() {
            debug!(session = %id, error = %e, "kill on already exited PTY child");
        }
        true
    }
}

/// Handles of a freshly spawned PTY child.
struct Spawned {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
}

/// Open a PTY and start `cmd` on it. Blocks on fork/exec.
fn spawn_pty(cmd: CommandBuilder) -> Result<Spawned, BackendError> {
    let pair = native_pty_system()
        .openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| BackendError::Spawn(format!("failed to open PTY: {e}")))?;

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| BackendError::Spawn(e.to_string()))?;
    // The slave end belongs to the child now.
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| BackendError::Spawn(format!("failed to clone reader: {e}")))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| BackendError::Spawn(format!("failed to take writer: {e}")))?;

    Ok(Spawned {
        master: pair.master,
        child,
        reader,
        writer,
    })
}

fn build_command(shell: &str, cwd: &Path, command: Option<&str>) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(shell);
    if let Some(command) = command {
        cmd.arg("-c");
        cmd.arg(command);
    }
    cmd.cwd(cwd);
    cmd.env("TERM", "xterm-256color");
    cmd.env("COLORTERM", "truecolor");
    cmd.env("PANEDECK_TERMINAL", "1");
    cmd
}

impl Default for LocalPtyBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Drop for LocalPtyBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl PtyBackend for LocalPtyBackend {
    async fn create_session(
        &self,
        id: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<(), BackendError> {
        if self.sessions.lock().contains_key(id) {
            return Err(BackendError::AlreadyExists(id.to_string()));
        }

        let shell = resolve_shell(self.shell.as_deref());
        let cmd = build_command(&shell, cwd, command);
        let Spawned {
            master,
            child,
            reader,
            writer,
        } = tokio::task::spawn_blocking(move || spawn_pty(cmd))
            .await
            .map_err(|e| BackendError::Spawn(format!("spawn task failed: {e}")))??;

        let running = Arc::new(AtomicBool::new(true));
        {
            let mut sessions = self.sessions.lock();
            if sessions.contains_key(id) {
                // Lost a race with another create for the same id.
                drop(sessions);
                let mut child = child;
                let _ = child.kill();
                return Err(BackendError::AlreadyExists(id.to_string()));
            }
            self.replay
                .lock()
                .insert(id.to_string(), VecDeque::with_capacity(READ_CHUNK));
            sessions.insert(
                id.to_string(),
                LocalSession {
                    master,
                    writer,
                    child,
                    running: Arc::clone(&running),
                },
            );
        }

        let session_id = id.to_string();
        let sessions = Arc::clone(&self.sessions);
        let replay = Arc::clone(&self.replay);
        let events = self.events_tx.clone();
        thread::spawn(move || {
            read_loop(&session_id, reader, &running, &replay, &events);
            sessions.lock().remove(&session_id);
            replay.lock().remove(&session_id);
            let _ = events.send(BackendEvent::Exit { id: session_id });
        });

        info!(session = %id, cwd = %cwd.display(), command = ?command, "spawned PTY session");
        Ok(())
    }

    async fn session_exists(&self, id: &str) -> Result<bool, BackendError> {
        Ok(self.sessions.lock().contains_key(id))
    }

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), BackendError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        session.writer.write_all(data)?;
        session.writer.flush()?;
        Ok(())
    }

    async fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), BackendError> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        session
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| BackendError::Io(std::io::Error::other(e.to_string())))
    }

    async fn kill(&self, id: &str) -> Result<(), BackendError> {
        if self.terminate(id) {
            Ok(())
        } else {
            Err(BackendError::NotFound(id.to_string()))
        }
    }

    async fn scrollback(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        if !self.sessions.lock().contains_key(id) {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(self
            .replay
            .lock()
            .get(id)
            .map(|ring| ring.iter().copied().collect())
            .unwrap_or_default())
    }

    fn take_events(&self) -> Option<BackendEvents> {
        self.events_rx.lock().take()
    }
}

/// Background reader loop - runs in a dedicated thread per session.
fn read_loop(
    id: &str,
    mut reader: Box<dyn Read + Send>,
    running: &AtomicBool,
    replay: &Replay,
    events: &UnboundedSender<BackendEvent>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    while running.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let data = buf[..n].to_vec();
                if let Some(ring) = replay.lock().get_mut(id) {
                    push_replay(ring, &data, SCROLLBACK_MAX_BYTES);
                }
                if events
                    .send(BackendEvent::Output {
                        id: id.to_string(),
                        data,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                if running.load(Ordering::Relaxed) {
                    warn!(session = %id, error = %e, "PTY read error");
                }
                break;
            }
        }
    }
}

/// Append `data` to a bounded ring, discarding the oldest bytes.
fn push_replay(ring: &mut VecDeque<u8>, data: &[u8], max: usize) {
    let data = if data.len() > max {
        &data[data.len() - max..]
    } else {
        data
    };
    let overflow = (ring.len() + data.len()).saturating_sub(max);
    if overflow > 0 {
        ring.drain(..overflow);
    }
    ring.extend(data);
}

fn resolve_shell(configured: Option<&str>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "/bin/sh".to_string())
}
