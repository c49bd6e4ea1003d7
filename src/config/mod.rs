//! Configuration management for panedeck.
//!
//! Handles persistence and loading of user preferences, including the global
//! selection auto-copy flag.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::engine::SCROLLBACK_LINES;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Terminal configuration
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Config {
    /// Load configuration from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.terminal.validate();

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;

        Ok(config_dir.join("panedeck").join("config.json"))
    }
}

/// Terminal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Mirror every selection to the system clipboard
    #[serde(default)]
    pub auto_copy: bool,

    /// Shell to spawn instead of `$SHELL`
    #[serde(default)]
    pub shell: Option<String>,

    /// Lines of history kept per session (100-100000)
    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: usize,
}

fn default_scrollback_lines() -> usize {
    SCROLLBACK_LINES
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            auto_copy: false,
            shell: None,
            scrollback_lines: SCROLLBACK_LINES,
        }
    }
}

impl TerminalConfig {
    /// Validate and clamp scrollback to valid range (100-100000)
    pub fn validate(&mut self) {
        self.scrollback_lines = self.scrollback_lines.clamp(100, 100_000);
        if self.shell.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.shell = None;
        }
    }
}
