//! Visible ordering
//!
//! The visible order is derived, never stored: a pre-order walk below a view
//! root that does not descend into collapsed nodes. Collapse state is passed in
//! explicitly so several views of one document can collapse different nodes
//! without touching the persisted `collapsed` flags.

use super::Tree;
use crate::models::NodeId;
use std::collections::HashSet;

/// One window's view of a document: optional zoom root plus its own collapse set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleView {
    pub zoom: Option<NodeId>,
    pub collapsed: HashSet<NodeId>,
}

impl VisibleView {
    /// View seeded from the tree's persisted collapse flags
    pub fn seeded(tree: &Tree, zoom: Option<NodeId>) -> Self {
        Self {
            zoom,
            collapsed: tree.persisted_collapse_set(),
        }
    }

    pub fn toggle(&mut self, id: NodeId) -> bool {
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
            true
        } else {
            false
        }
    }
}

/// One row of a visible listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleEntry {
    pub id: NodeId,
    /// Depth relative to the view root (its children are depth 0)
    pub depth: usize,
}

impl Tree {
    /// Pre-order ids below `root` whose ancestor chain up to `root` holds no
    /// member of `collapsed`
    ///
    /// `root` itself is not emitted and its own collapse state is ignored, so a
    /// zoomed-in view always shows the zoom target's children. Deterministic for
    /// a fixed tree and collapse set.
    pub fn flatten_visible(&self, root: NodeId, collapsed: &HashSet<NodeId>) -> Vec<NodeId> {
        self.visible_entries(root, collapsed)
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Like [`Tree::flatten_visible`] but with each row's relative depth
    pub fn visible_entries(&self, root: NodeId, collapsed: &HashSet<NodeId>) -> Vec<VisibleEntry> {
        let mut out = Vec::new();
        let mut stack: Vec<VisibleEntry> = self
            .children_of(root)
            .iter()
            .rev()
            .map(|id| VisibleEntry { id: *id, depth: 0 })
            .collect();

        while let Some(entry) = stack.pop() {
            out.push(entry);
            if collapsed.contains(&entry.id) {
                continue;
            }
            stack.extend(self.children_of(entry.id).iter().rev().map(|id| VisibleEntry {
                id: *id,
                depth: entry.depth + 1,
            }));
        }
        out
    }

    /// Visible rows for `view`, rooted at its zoom node (falling back to the
    /// root if the zoom node is gone)
    pub fn visible_in(&self, view: &VisibleView) -> Vec<VisibleEntry> {
        let root = view
            .zoom
            .filter(|id| self.is_attached(*id))
            .unwrap_or(self.root_id());
        self.visible_entries(root, &view.collapsed)
    }

    /// Ids whose persisted `collapsed` flag is set
    ///
    /// Seed for a new view's collapse set.
    pub fn persisted_collapse_set(&self) -> HashSet<NodeId> {
        self.descendants(self.root_id())
            .into_iter()
            .filter(|id| self.get(*id).map(|n| n.collapsed).unwrap_or(false))
            .collect()
    }
}
