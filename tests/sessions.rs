//! Session lifetime across view changes: creation, input gating, hidden
//! output and teardown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Harness, RecordingBackend};
use crossterm::event::KeyCode;
use panedeck::pty::{InitOutcome, Launch, PtyCoordinator};
use panedeck::session::SessionPool;

#[tokio::test]
async fn first_frame_starts_one_shell() {
    let mut h = Harness::new();
    h.settle().await;
    h.settle().await;

    assert_eq!(h.backend.creates(), vec![h.focused_session()]);
    assert!(h.app.pool().is_ready(&h.focused_session()));
}

#[tokio::test]
async fn concurrent_initialization_creates_once() {
    let pool = Arc::new(SessionPool::with_vt100(100));
    let backend = RecordingBackend::new();
    backend.set_create_delay(Duration::from_millis(20));
    let coordinator = PtyCoordinator::new(Arc::clone(&pool), backend.clone());
    let launch = Launch::new("s1", "/tmp", None);
    pool.get_or_create("s1");
    let token = pool.mount("s1");

    let (a, b) = tokio::join!(
        coordinator.initialize(&launch, &token),
        coordinator.initialize(&launch, &token)
    );

    let mut outcomes = vec![a, b];
    outcomes.sort_by_key(|o| *o == InitOutcome::Joined);
    assert_eq!(outcomes, vec![InitOutcome::Created, InitOutcome::Joined]);
    assert_eq!(backend.creates(), vec!["s1".to_string()]);
    assert!(!coordinator.is_initializing("s1"));
}

#[tokio::test]
async fn input_waits_for_readiness() {
    let backend = RecordingBackend::new();
    backend.set_create_delay(Duration::from_millis(20));
    let mut h = Harness::with_backend(backend);

    let pending = h.app.sync_views(Harness::area());
    let id = h.focused_session();
    h.type_text("early");
    h.flush().await;
    assert!(h.backend.written_to(&id).is_empty());

    pending.settle().await;
    h.type_text("late");
    h.flush().await;
    assert_eq!(h.backend.written_to(&id), b"late");
}

#[tokio::test]
async fn output_for_hidden_tab_is_kept() {
    let mut h = Harness::new();
    h.settle().await;
    let first = h.focused_session();

    h.command('c');
    h.settle().await;
    let second = h.focused_session();
    assert_ne!(first, second);

    h.backend.output(&first, b"built while hidden");
    h.pump();
    assert!(!h.render().contains("built while hidden"));

    h.command('p');
    h.settle().await;
    assert_eq!(h.focused_session(), first);
    assert!(h.render().contains("built while hidden"));
    assert_eq!(h.backend.creates().len(), 2);
}

#[tokio::test]
async fn paste_reaches_the_focused_session() {
    let mut h = Harness::new();
    h.settle().await;
    let id = h.focused_session();

    h.app
        .handle_event(panedeck::event::Event::Paste("echo hi".into()));
    h.key(KeyCode::Enter);
    h.flush().await;

    assert_eq!(h.backend.written_to(&id), b"echo hi\r");
}

#[tokio::test]
async fn exit_is_reported_and_input_stops() {
    let mut h = Harness::new();
    h.settle().await;
    let id = h.focused_session();

    h.backend.exit(&id);
    h.pump();
    assert_eq!(h.app.message(), Some("Untitled exited"));
    assert!(h.render().contains("[process exited]"));

    h.type_text("ignored");
    h.flush().await;
    assert!(h.backend.written_to(&id).is_empty());
}

#[tokio::test]
async fn closing_a_tab_kills_only_that_session() {
    let mut h = Harness::new();
    h.settle().await;
    let first = h.focused_session();
    h.command('c');
    h.settle().await;
    let second = h.focused_session();

    h.command('x');
    tokio::task::yield_now().await;
    h.settle().await;

    assert_eq!(h.backend.kills(), vec![second.clone()]);
    assert!(!h.app.pool().has(&second));
    assert!(h.app.pool().has(&first));
    assert_eq!(h.focused_session(), first);
    assert!(!h.app.should_quit);
}

#[tokio::test]
async fn closing_a_tab_while_its_shell_starts_leaves_no_process() {
    let backend = RecordingBackend::new();
    let mut h = Harness::with_backend(backend);
    h.settle().await;
    let first = h.focused_session();
    h.backend.set_create_delay(Duration::from_millis(20));

    h.command('c');
    let pending = h.app.sync_views(Harness::area());
    let second = h.focused_session();
    tokio::time::sleep(Duration::from_millis(2)).await;
    h.command('x');
    let outcomes = pending.settle().await;
    h.settle().await;

    assert!(outcomes.contains(&InitOutcome::Closed));
    assert!(!h.app.pool().has(&second));
    assert_eq!(h.backend.creates(), vec![first.clone(), second]);
    assert_eq!(h.backend.running(), vec![first]);
}

#[tokio::test]
async fn shutdown_kills_every_session() {
    let mut h = Harness::new();
    h.command('|');
    h.command('c');
    h.settle().await;

    h.app.shutdown().await;

    let mut killed = h.backend.kills();
    killed.sort();
    let mut expected = h.app.workspace().pty_ids();
    expected.sort();
    assert_eq!(killed.len(), 3);
    assert_eq!(killed, expected);
}
