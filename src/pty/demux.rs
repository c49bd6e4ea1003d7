//! I/O demultiplexer.
//!
//! One inbound event stream from the backend fans out to the pooled engines
//! by session id; every engine's local input funnels into one outbound
//! command queue, tagged with its id. Title changes and exits are surfaced to
//! the application as [`SessionSignal`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace};

use super::backend::{BackendEvent, BackendEvents, PtyBackend};
use crate::clipboard::ClipboardSink;
use crate::session::{PooledInstance, SessionId, SessionPool, Subscription};

const EXIT_NOTICE: &str = "\r\n\x1b[2m[process exited]\x1b[0m\r\n";

/// Outbound, id-tagged request produced by local engine events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Write { id: SessionId, data: Vec<u8> },
}

/// Session-level notification for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The engine reported a new title.
    TitleChanged { id: SessionId, title: String },
    /// The backing process ended.
    Exited { id: SessionId },
}

pub struct IoDemux {
    pool: Arc<SessionPool>,
    backend: Arc<dyn PtyBackend>,
    clipboard: Arc<dyn ClipboardSink>,
    auto_copy: AtomicBool,
    outbound_tx: UnboundedSender<Outbound>,
    outbound_rx: AsyncMutex<UnboundedReceiver<Outbound>>,
    signals: UnboundedSender<SessionSignal>,
}

impl IoDemux {
    pub fn new(
        pool: Arc<SessionPool>,
        backend: Arc<dyn PtyBackend>,
        clipboard: Arc<dyn ClipboardSink>,
        auto_copy: bool,
        signals: UnboundedSender<SessionSignal>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            pool,
            backend,
            clipboard,
            auto_copy: AtomicBool::new(auto_copy),
            outbound_tx,
            outbound_rx: AsyncMutex::new(outbound_rx),
            signals,
        }
    }

    /// Take the backend's shared event stream. Only the first caller
    /// process-wide gets it.
    pub fn subscribe_backend(&self) -> Option<BackendEvents> {
        self.backend.take_events()
    }

    /// Wire a pooled engine's local events to the outbound queue and the
    /// application. Calling it again for the same instance is a no-op.
    pub fn bind(&self, instance: &PooledInstance) {
        let mut io = instance.io();
        if io.is_bound() {
            return;
        }
        let id = instance.id().to_string();

        let ready = self.pool.readiness();
        let outbound = self.outbound_tx.clone();
        let data_id = id.clone();
        io.data = Some(instance.with_engine(|engine| {
            engine.on_data(Box::new(move |bytes: &[u8]| {
                if ready.contains(&data_id) {
                    let _ = outbound.send(Outbound::Write {
                        id: data_id.clone(),
                        data: bytes.to_vec(),
                    });
                } else {
                    debug!(session = %data_id, len = bytes.len(), "dropping input before session is ready");
                }
            }))
        }));

        let signals = self.signals.clone();
        let title_id = id;
        io.title = Some(instance.with_engine(|engine| {
            engine.on_title_change(Box::new(move |title: &str| {
                let _ = signals.send(SessionSignal::TitleChanged {
                    id: title_id.clone(),
                    title: title.to_string(),
                });
            }))
        }));

        if self.auto_copy() {
            io.selection = Some(self.selection_subscription(instance));
        }
    }

    pub fn auto_copy(&self) -> bool {
        self.auto_copy.load(Ordering::SeqCst)
    }

    /// Turn selection mirroring to the clipboard on or off for every pooled
    /// engine.
    pub fn set_auto_copy(&self, enabled: bool) {
        self.auto_copy.store(enabled, Ordering::SeqCst);
        for instance in self.pool.instances() {
            let mut io = instance.io();
            if !io.is_bound() {
                continue;
            }
            io.selection = None;
            if enabled {
                io.selection = Some(self.selection_subscription(&instance));
            }
        }
        debug!(enabled, "auto-copy reconfigured");
    }

    fn selection_subscription(&self, instance: &PooledInstance) -> Subscription {
        let clipboard = Arc::clone(&self.clipboard);
        let id = instance.id().to_string();
        instance.with_engine(|engine| {
            engine.on_selection_change(Box::new(move |text: &str| {
                if let Err(e) = clipboard.copy(text) {
                    debug!(session = %id, error = %e, "auto-copy failed");
                }
            }))
        })
    }

    /// Route one backend event to its engine.
    pub fn dispatch(&self, event: BackendEvent) {
        match event {
            BackendEvent::Output { id, data } => match self.pool.get(&id) {
                Some(instance) => instance.with_engine(|engine| engine.write(&data)),
                None => trace!(session = %id, len = data.len(), "output for unknown session"),
            },
            BackendEvent::Exit { id } => {
                self.pool.clear_ready(&id);
                let Some(instance) = self.pool.get(&id) else {
                    trace!(session = %id, "exit for unknown session");
                    return;
                };
                instance.with_engine(|engine| engine.write(EXIT_NOTICE.as_bytes()));
                let _ = self.signals.send(SessionSignal::Exited { id });
            }
        }
    }

    /// Dispatch backend events until the stream closes.
    pub async fn run_inbound(&self, mut events: BackendEvents) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        debug!("backend event stream closed");
    }

    /// Deliver outbound commands until the demux is dropped.
    pub async fn run_outbound(&self) {
        let mut rx = self.outbound_rx.lock().await;
        while let Some(command) = rx.recv().await {
            self.deliver(command).await;
        }
    }

    /// Deliver every queued outbound command. Returns how many were sent.
    pub async fn flush_outbound(&self) -> usize {
        let mut rx = self.outbound_rx.lock().await;
        let mut sent = 0;
        while let Ok(command) = rx.try_recv() {
            self.deliver(command).await;
            sent += 1;
        }
        sent
    }

    async fn deliver(&self, command: Outbound) {
        match command {
            Outbound::Write { id, data } => {
                if let Err(e) = self.backend.write(&id, &data).await {
                    debug!(session = %id, error = %e, "ignoring write failure");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::pty::testing::FakeBackend;

    struct Harness {
        pool: Arc<SessionPool>,
        backend: Arc<FakeBackend>,
        clipboard: Arc<MemoryClipboard>,
        demux: IoDemux,
        signals: UnboundedReceiver<SessionSignal>,
    }

    fn harness(auto_copy: bool) -> Harness {
        let pool = Arc::new(SessionPool::with_vt100(100));
        let backend = Arc::new(FakeBackend::new());
        let clipboard = Arc::new(MemoryClipboard::default());
        let (tx, signals) = mpsc::unbounded_channel();
        let demux = IoDemux::new(
            Arc::clone(&pool),
            backend.clone(),
            clipboard.clone(),
            auto_copy,
            tx,
        );
        Harness {
            pool,
            backend,
            clipboard,
            demux,
            signals,
        }
    }

    fn select_all_of_first_row(instance: &PooledInstance, len: u16) {
        use crate::session::{GridPosition, Selection};
        instance.with_engine(|e| {
            e.select(Some(Selection::new(
                GridPosition { row: 0, col: 0 },
                GridPosition {
                    row: 0,
                    col: len - 1,
                },
            )));
        });
    }

    #[tokio::test]
    async fn output_is_routed_by_id() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        let b = h.pool.get_or_create("b");

        h.demux.dispatch(BackendEvent::Output {
            id: "a".into(),
            data: b"for a".to_vec(),
        });
        h.demux.dispatch(BackendEvent::Output {
            id: "ghost".into(),
            data: b"nobody".to_vec(),
        });

        assert!(a.with_engine(|e| e.contents()).contains("for a"));
        assert!(!b.with_engine(|e| e.contents()).contains("for a"));
    }

    #[tokio::test]
    async fn output_reaches_detached_engine() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        h.pool.detach("a");

        h.demux.dispatch(BackendEvent::Output {
            id: "a".into(),
            data: b"while hidden".to_vec(),
        });

        assert!(a.with_engine(|e| e.contents()).contains("while hidden"));
    }

    #[tokio::test]
    async fn input_before_ready_is_dropped() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        h.demux.bind(&a);
        h.backend.insert_existing("a");

        a.with_engine(|e| e.input(b"early"));
        h.pool.mark_ready("a");
        a.with_engine(|e| e.input(b"late"));
        h.demux.flush_outbound().await;

        assert_eq!(h.backend.write_calls(), vec![("a".to_string(), b"late".to_vec())]);
    }

    #[tokio::test]
    async fn bind_is_idempotent() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        h.pool.mark_ready("a");
        h.demux.bind(&a);
        h.demux.bind(&a);

        a.with_engine(|e| e.input(b"x"));
        assert_eq!(h.demux.flush_outbound().await, 1);
    }

    #[tokio::test]
    async fn writes_keep_order_per_session() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        h.pool.mark_ready("a");
        h.demux.bind(&a);

        for chunk in [b"1".as_slice(), b"2", b"3"] {
            a.with_engine(|e| e.input(chunk));
        }
        h.demux.flush_outbound().await;

        let data: Vec<Vec<u8>> = h.backend.write_calls().into_iter().map(|(_, d)| d).collect();
        assert_eq!(data, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
    }

    #[tokio::test]
    async fn title_changes_are_signalled() {
        let mut h = harness(false);
        let a = h.pool.get_or_create("a");
        h.demux.bind(&a);

        h.demux.dispatch(BackendEvent::Output {
            id: "a".into(),
            data: b"\x1b]2;vim\x07".to_vec(),
        });

        assert_eq!(
            h.signals.try_recv().ok(),
            Some(SessionSignal::TitleChanged {
                id: "a".into(),
                title: "vim".into()
            })
        );
    }

    #[tokio::test]
    async fn exit_clears_readiness_and_signals() {
        let mut h = harness(false);
        let a = h.pool.get_or_create("a");
        h.pool.mark_ready("a");

        h.demux.dispatch(BackendEvent::Exit { id: "a".into() });

        assert!(!h.pool.is_ready("a"));
        assert!(a.with_engine(|e| e.contents()).contains("[process exited]"));
        assert_eq!(
            h.signals.try_recv().ok(),
            Some(SessionSignal::Exited { id: "a".into() })
        );
    }

    #[tokio::test]
    async fn auto_copy_toggle_reconfigures_all_engines() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        let b = h.pool.get_or_create("b");
        h.demux.bind(&a);
        h.demux.bind(&b);
        a.with_engine(|e| e.write(b"alpha"));
        b.with_engine(|e| e.write(b"bravo"));

        h.demux.set_auto_copy(true);
        select_all_of_first_row(&a, 5);
        assert_eq!(h.clipboard.contents().as_deref(), Some("alpha"));

        h.demux.set_auto_copy(false);
        select_all_of_first_row(&b, 5);
        assert_eq!(h.clipboard.contents().as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn engines_bound_while_enabled_copy_selections() {
        let h = harness(true);
        let a = h.pool.get_or_create("a");
        h.demux.bind(&a);
        a.with_engine(|e| e.write(b"hello"));

        select_all_of_first_row(&a, 5);
        assert_eq!(h.clipboard.contents().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn backend_stream_is_taken_once() {
        let h = harness(false);
        assert!(h.demux.subscribe_backend().is_some());
        assert!(h.demux.subscribe_backend().is_none());
    }

    #[tokio::test]
    async fn run_inbound_drains_stream() {
        let h = harness(false);
        let a = h.pool.get_or_create("a");
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(BackendEvent::Output {
            id: "a".into(),
            data: b"streamed".to_vec(),
        })
        .unwrap();
        tx.send(BackendEvent::Exit { id: "a".into() }).unwrap();
        drop(tx);

        h.demux.run_inbound(events).await;
        let contents = a.with_engine(|e| e.contents());
        assert!(contents.contains("streamed"));
        assert!(contents.contains("[process exited]"));
    }
}
