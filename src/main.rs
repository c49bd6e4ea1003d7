use panedeck::app::App;
use panedeck::clipboard::SystemClipboard;
use panedeck::config::Config;
use panedeck::event::Event;
use panedeck::pty::{LocalPtyBackend, SessionSignal};
use panedeck::{logging, ui};

use std::io::{self, IsTerminal, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        poll, read, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Redraw interval while no input arrives; picks up PTY output.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

const INPUT_POLL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    // Check if we're in a proper terminal
    if !io::stdin().is_terminal() {
        anyhow::bail!("panedeck must be run in an interactive terminal");
    }

    if let Err(e) = logging::default_log_path().and_then(|path| logging::init(&path)) {
        eprintln!("panedeck: logging disabled: {e:#}");
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    });
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode - are you in a terminal?")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )
    .context("Failed to setup terminal")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;

    let result = runtime.block_on(async {
        let backend = Arc::new(LocalPtyBackend::new(config.terminal.shell.clone()));
        let (signals_tx, mut signals_rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            config,
            Config::config_path().ok(),
            backend,
            Arc::new(SystemClipboard),
            signals_tx,
            cwd,
        );

        let events = app
            .demux()
            .subscribe_backend()
            .context("Backend event stream already taken")?;
        let inbound = Arc::clone(app.demux());
        tokio::spawn(async move { inbound.run_inbound(events).await });
        let outbound = Arc::clone(app.demux());
        tokio::spawn(async move { outbound.run_outbound().await });

        let result = run_app(&mut terminal, &mut app, &mut signals_rx).await;
        app.shutdown().await;
        result
    });

    // Restore terminal (always try to restore even on error)
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    );
    let _ = terminal.show_cursor();

    runtime.shutdown_timeout(Duration::from_millis(500));
    info!("panedeck exited");
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    signals: &mut UnboundedReceiver<SessionSignal>,
) -> Result<()> {
    let mut input = spawn_input_reader();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        app.tick();

        let size = terminal.size().context("Failed to get terminal size")?;
        app.sync_views(Rect::new(0, 0, size.width, size.height));

        let view: &App = app;
        terminal.draw(|f| ui::draw(f, view, view.layout()))?;

        tokio::select! {
            event = input.recv() => match event {
                Some(event) => app.handle_event(event),
                None => break,
            },
            Some(signal) = signals.recv() => app.handle_signal(signal),
            _ = frames.tick() => {}
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Read terminal events on a dedicated thread. The thread stops once the
/// receiver is dropped or the terminal reports an error.
fn spawn_input_reader() -> UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        let event = match poll(INPUT_POLL) {
            Ok(true) => read(),
            Ok(false) => continue,
            Err(e) => Err(e),
        };
        match event {
            Ok(event) => {
                if tx.send(Event::from(event)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "terminal input failed");
                break;
            }
        }
    });
    rx
}
