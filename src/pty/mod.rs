//! PTY plumbing.
//!
//! - `PtyBackend` - async, id-tagged requests to whatever owns the real PTYs
//! - `LocalPtyBackend` - in-process backend built on portable-pty
//! - `PtyCoordinator` - creates each session's process at most once
//! - `IoDemux` - routes one shared event stream to many engines and back

pub mod backend;
pub mod demux;
pub mod lifecycle;
pub mod local;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendError, BackendEvent, BackendEvents, PtyBackend};
pub use demux::{IoDemux, Outbound, SessionSignal};
pub use lifecycle::{InitOutcome, Launch, PtyCoordinator};
pub use local::LocalPtyBackend;
