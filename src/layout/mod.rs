//! Pane layout: the split tree and how it maps onto the screen.

pub mod geometry;
pub mod tree;

pub use geometry::{hit_test, panel_rects, strip_rects, workspace_areas};
pub use tree::{LayoutNode, PanelId, SplitDirection};
