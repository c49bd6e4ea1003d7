//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI, so logs go to a file. `RUST_LOG` overrides
//! the default filter.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "panedeck=info";

/// Default log file location: `<data_local_dir>/panedeck/panedeck.log`.
pub fn default_log_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir().context("Could not find local data directory")?;
    Ok(dir.join("panedeck").join("panedeck.log"))
}

/// Install the global subscriber, truncating the log file at `path`.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    build_subscriber(file, filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "panedeck logging initialized");
    Ok(())
}

/// File-backed subscriber shared by [`init`] and tests.
pub fn build_subscriber(log_file: File, filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .compact();

    tracing_subscriber::registry().with(filter).with(fmt_layer)
}
