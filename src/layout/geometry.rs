//! Screen geometry for layout trees.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use super::tree::{LayoutNode, PanelId, SplitDirection};

/// Rows reserved for the shared (pinned) panel strip.
pub const SHARED_STRIP_HEIGHT: u16 = 12;

/// Compute the rectangle of every panel in `tree` within `area`.
///
/// Each split halves its area; the second child takes the odd cell.
pub fn panel_rects(tree: &LayoutNode, area: Rect) -> Vec<(PanelId, Rect)> {
    let mut rects = Vec::with_capacity(tree.leaf_count());
    collect(tree, area, &mut rects);
    rects
}

fn collect(node: &LayoutNode, area: Rect, out: &mut Vec<(PanelId, Rect)>) {
    match node {
        LayoutNode::Leaf { panel_id } => out.push((panel_id.clone(), area)),
        LayoutNode::Split {
            direction,
            first,
            second,
        } => {
            let (a, b) = halve(area, *direction);
            collect(first, a, out);
            collect(second, b, out);
        }
    }
}

fn halve(area: Rect, direction: SplitDirection) -> (Rect, Rect) {
    match direction {
        SplitDirection::Horizontal => {
            let w = area.width / 2;
            (
                Rect::new(area.x, area.y, w, area.height),
                Rect::new(area.x + w, area.y, area.width - w, area.height),
            )
        }
        SplitDirection::Vertical => {
            let h = area.height / 2;
            (
                Rect::new(area.x, area.y, area.width, h),
                Rect::new(area.x, area.y + h, area.width, area.height - h),
            )
        }
    }
}

/// Split the screen into tab bar, main layout area and (optionally) the
/// shared strip at the bottom.
pub fn workspace_areas(area: Rect, has_shared: bool) -> (Rect, Rect, Option<Rect>) {
    let strip = if has_shared {
        SHARED_STRIP_HEIGHT.min(area.height.saturating_sub(2) / 2)
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(strip),
        ])
        .split(area);

    let shared = (has_shared && strip > 0).then_some(chunks[2]);
    (chunks[0], chunks[1], shared)
}

/// Lay `count` panels out side by side; the last one takes the remainder.
pub fn strip_rects(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return vec![];
    }
    let width = area.width / count as u16;
    (0..count)
        .map(|i| {
            let x = area.x + i as u16 * width;
            let w = if i == count - 1 {
                area.width - i as u16 * width
            } else {
                width
            };
            Rect::new(x, area.y, w, area.height)
        })
        .collect()
}

/// The panel whose rectangle contains the cell (`col`, `row`).
pub fn hit_test(rects: &[(PanelId, Rect)], col: u16, row: u16) -> Option<&PanelId> {
    rects
        .iter()
        .find(|(_, r)| col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height)
        .map(|(id, _)| id)
}
