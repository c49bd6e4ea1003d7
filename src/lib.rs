//! panedeck library crate.
//!
//! This library provides the core functionality for panedeck, including:
//! - A pool of terminal engines that outlive the views showing them
//! - PTY lifecycle coordination and I/O demultiplexing
//! - The pane layout tree and the workspace model built on it
//! - Terminal UI components

pub mod app;
pub mod clipboard;
pub mod config;
pub mod event;
pub mod input;
pub mod layout;
pub mod logging;
pub mod pty;
pub mod session;
pub mod ui;
pub mod workspace;
