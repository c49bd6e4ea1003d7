//! Terminal session instances.
//!
//! This module provides:
//! - `SessionPool` - owns one terminal engine per session id, independent of views
//! - `TerminalEngine` / `Vt100Engine` - the emulator capability behind a session
//! - Surfaces, host regions and mount generations used to bind engines to views

pub mod engine;
pub mod mount;
pub mod pool;
pub mod surface;
pub mod types;

pub use engine::{GridPosition, Listeners, Selection, Subscription, TerminalEngine, Vt100Engine};
pub use mount::MountToken;
pub use pool::{PooledInstance, ReadinessSet, SessionPool};
pub use surface::{HostRegion, RenderSurface};
pub use types::{ScreenCell, ScreenState, ScrollState, SessionId};
