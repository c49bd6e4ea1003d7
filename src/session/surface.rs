//! Rendering surfaces and the host regions they can be bound to.
//!
//! A surface is the drawable half of a pooled instance. Binding it to a host
//! region is an O(1) handle swap; the engine behind it is never touched.

use ratatui::layout::Rect;

/// A visible region of the screen that can host one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRegion {
    /// Stable key of the region (the owning panel id).
    pub id: String,
    /// Cell area available to the terminal grid.
    pub area: Rect,
}

impl HostRegion {
    pub fn new(id: impl Into<String>, area: Rect) -> Self {
        Self {
            id: id.into(),
            area,
        }
    }
}

/// Detachable rendering surface of a pooled engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSurface {
    host: Option<HostRegion>,
    released: bool,
}

impl RenderSurface {
    /// A fresh surface with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Option<&HostRegion> {
        self.host.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Rebind to `host`. Returns false if the surface was already bound to
    /// an identical region.
    pub fn bind(&mut self, host: &HostRegion) -> bool {
        if self.released || self.host.as_ref() == Some(host) {
            return false;
        }
        self.host = Some(host.clone());
        true
    }

    pub fn unbind(&mut self) -> Option<HostRegion> {
        self.host.take()
    }

    /// Remove the surface permanently.
    pub fn release(&mut self) {
        self.host = None;
        self.released = true;
    }
}
