//! Pane layout tree.
//!
//! A strict binary tree of leaves (one panel each) and splits. Every
//! operation consumes the tree and returns a new one, so no subtree can ever
//! be reachable from two places.

use serde::{Deserialize, Serialize};

/// Identifier of a panel referenced from a leaf.
pub type PanelId = String;

/// How a split arranges its two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Side-by-side (left/right)
    Horizontal,
    /// Stacked (top/bottom)
    Vertical,
}

/// A node of the layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    Leaf {
        panel_id: PanelId,
    },
    Split {
        direction: SplitDirection,
        first: Box<LayoutNode>,
        second: Box<LayoutNode>,
    },
}

impl LayoutNode {
    pub fn leaf(panel_id: impl Into<PanelId>) -> Self {
        LayoutNode::Leaf {
            panel_id: panel_id.into(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, LayoutNode::Leaf { .. })
    }

    /// Replace the leaf for `target` with a split holding it first and a new
    /// leaf for `new_panel_id` second.
    ///
    /// Returns the tree unchanged when `target` is absent, or when
    /// `new_panel_id` is already present (a panel may appear only once).
    pub fn split(self, target: &str, direction: SplitDirection, new_panel_id: &str) -> Self {
        if !self.contains(target) || self.contains(new_panel_id) {
            return self;
        }
        self.split_at(target, direction, new_panel_id)
    }

    fn split_at(self, target: &str, direction: SplitDirection, new_panel_id: &str) -> Self {
        match self {
            LayoutNode::Leaf { panel_id } if panel_id == target => LayoutNode::Split {
                direction,
                first: Box::new(LayoutNode::Leaf { panel_id }),
                second: Box::new(LayoutNode::leaf(new_panel_id)),
            },
            LayoutNode::Leaf { .. } => self,
            LayoutNode::Split {
                direction: own,
                first,
                second,
            } => LayoutNode::Split {
                direction: own,
                first: Box::new(first.split_at(target, direction, new_panel_id)),
                second: Box::new(second.split_at(target, direction, new_panel_id)),
            },
        }
    }

    /// Delete the leaf for `target`. A split left with a single branch is
    /// replaced by that branch. Returns `None` when nothing remains.
    ///
    /// An absent `target` leaves the tree unchanged.
    pub fn remove(self, target: &str) -> Option<Self> {
        if !self.contains(target) {
            return Some(self);
        }
        self.remove_at(target)
    }

    fn remove_at(self, target: &str) -> Option<Self> {
        match self {
            LayoutNode::Leaf { ref panel_id } if panel_id == target => None,
            LayoutNode::Leaf { .. } => Some(self),
            LayoutNode::Split {
                direction,
                first,
                second,
            } => match (first.remove_at(target), second.remove_at(target)) {
                (Some(first), Some(second)) => Some(LayoutNode::Split {
                    direction,
                    first: Box::new(first),
                    second: Box::new(second),
                }),
                (Some(survivor), None) | (None, Some(survivor)) => Some(survivor),
                (None, None) => None,
            },
        }
    }

    /// Panel ids in reading order (first before second, depth-first).
    pub fn panel_ids(&self) -> Vec<PanelId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<PanelId>) {
        match self {
            LayoutNode::Leaf { panel_id } => ids.push(panel_id.clone()),
            LayoutNode::Split { first, second, .. } => {
                first.collect_ids(ids);
                second.collect_ids(ids);
            }
        }
    }

    pub fn contains(&self, panel_id: &str) -> bool {
        match self {
            LayoutNode::Leaf { panel_id: id } => id == panel_id,
            LayoutNode::Split { first, second, .. } => {
                first.contains(panel_id) || second.contains(panel_id)
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            LayoutNode::Leaf { .. } => 1,
            LayoutNode::Split { first, second, .. } => first.leaf_count() + second.leaf_count(),
        }
    }

    /// The panel that follows `panel_id` in reading order, wrapping around.
    pub fn next_panel(&self, panel_id: &str) -> Option<PanelId> {
        let ids = self.panel_ids();
        let pos = ids.iter().position(|id| id == panel_id)?;
        ids.get((pos + 1) % ids.len()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use SplitDirection::{Horizontal, Vertical};

    fn split(direction: SplitDirection, first: LayoutNode, second: LayoutNode) -> LayoutNode {
        LayoutNode::Split {
            direction,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    #[test]
    fn split_single_leaf() {
        let tree = LayoutNode::leaf("P1").split("P1", Vertical, "P2");
        assert_eq!(
            tree,
            split(Vertical, LayoutNode::leaf("P1"), LayoutNode::leaf("P2"))
        );
    }

    #[test]
    fn remove_collapses_parent_split() {
        let tree = LayoutNode::leaf("P1").split("P1", Vertical, "P2");
        assert_eq!(tree.remove("P1"), Some(LayoutNode::leaf("P2")));
    }

    #[test]
    fn remove_last_leaf_empties_tree() {
        assert_eq!(LayoutNode::leaf("P1").remove("P1"), None);
    }

    #[test]
    fn split_nested_leaf_keeps_siblings() {
        let tree = LayoutNode::leaf("P1")
            .split("P1", Horizontal, "P2")
            .split("P2", Vertical, "P3");
        assert_eq!(
            tree,
            split(
                Horizontal,
                LayoutNode::leaf("P1"),
                split(Vertical, LayoutNode::leaf("P2"), LayoutNode::leaf("P3")),
            )
        );
    }

    #[test]
    fn remove_inner_leaf_collapses_only_its_parent() {
        let tree = LayoutNode::leaf("P1")
            .split("P1", Horizontal, "P2")
            .split("P2", Vertical, "P3");
        assert_eq!(
            tree.remove("P3"),
            Some(split(
                Horizontal,
                LayoutNode::leaf("P1"),
                LayoutNode::leaf("P2")
            ))
        );
    }

    #[test]
    fn unknown_target_is_a_no_op() {
        let tree = LayoutNode::leaf("P1").split("P1", Vertical, "P2");
        assert_eq!(tree.clone().split("missing", Horizontal, "P9"), tree);
        assert_eq!(tree.clone().remove("missing"), Some(tree));
    }

    #[test]
    fn duplicate_new_panel_is_rejected() {
        let tree = LayoutNode::leaf("P1").split("P1", Vertical, "P2");
        assert_eq!(tree.clone().split("P1", Horizontal, "P2"), tree);
    }

    #[test]
    fn repeated_splits_keep_ids_unique() {
        let mut tree = LayoutNode::leaf("P0");
        let mut used = vec!["P0".to_string()];
        for i in 1..12 {
            let target = used[(i * 7) % used.len()].clone();
            let direction = if i % 2 == 0 { Horizontal } else { Vertical };
            let id = format!("P{i}");
            tree = tree.split(&target, direction, &id);
            used.push(id);
        }

        let mut ids = tree.panel_ids();
        assert_eq!(ids.len(), used.len());
        ids.sort();
        used.sort();
        assert_eq!(ids, used);
        assert_eq!(tree.leaf_count(), 12);
    }

    #[test]
    fn next_panel_wraps() {
        let tree = LayoutNode::leaf("a")
            .split("a", Horizontal, "b")
            .split("b", Vertical, "c");
        assert_eq!(tree.next_panel("a").as_deref(), Some("b"));
        assert_eq!(tree.next_panel("c").as_deref(), Some("a"));
        assert_eq!(tree.next_panel("zzz"), None);
    }

    #[test]
    fn serializes_as_tagged_nodes() {
        let tree = LayoutNode::leaf("P1").split("P1", Horizontal, "P2");
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "split");
        assert_eq!(json["direction"], "horizontal");
        assert_eq!(json["first"]["panel_id"], "P1");
        let back: LayoutNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
