//! Structural commands on the focused node
//!
//! Each command validates against the active window's focus (and the
//! selection, for the block-moving ones), applies its edits as one batch and
//! records a single undo action. Expected refusals come back as
//! [`CommandOutcome::Unchanged`].

use super::edits::Destination;
use super::{CommandOutcome, Document, FocusChange};
use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId};
use std::collections::HashMap;

/// Where a new node goes relative to the focused one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePosition {
    Below,
    Above,
    FirstChild,
}

impl Document {
    pub fn create_sibling_below(&mut self) -> OutlineResult<CommandOutcome> {
        self.create_node(CreatePosition::Below, "")
    }

    pub fn create_sibling_above(&mut self) -> OutlineResult<CommandOutcome> {
        self.create_node(CreatePosition::Above, "")
    }

    /// New first child of the focused node; expands it if collapsed
    pub fn create_child(&mut self) -> OutlineResult<CommandOutcome> {
        self.create_node(CreatePosition::FirstChild, "")
    }

    /// Insert a fresh node next to (or under) the focused node and focus it
    ///
    /// A focused node without a parent falls back to appending at the end of
    /// the document root.
    pub fn create_node(
        &mut self,
        position: CreatePosition,
        title: impl Into<String>,
    ) -> OutlineResult<CommandOutcome> {
        let Some(focus) = self.focus() else {
            return Ok(CommandOutcome::Unchanged);
        };
        let root = self.tree.root_id();
        let placement = self
            .tree
            .placement_of(focus.node)
            .filter(|_| self.tree.is_attached(focus.node));
        let (parent, index) = match (position, placement) {
            (CreatePosition::FirstChild, Some(_)) => (focus.node, 0),
            (CreatePosition::Below, Some(at)) => (at.parent, at.index + 1),
            (CreatePosition::Above, Some(at)) => (at.parent, at.index),
            (_, None) => (root, self.tree.children_of(root).len()),
        };
        let expand = parent == focus.node;

        let node = Node::with_title(title);
        let id = node.id;
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            if expand {
                batch.set_collapsed(tree, parent, false)?;
            }
            batch.insert_node(tree, parent, index, node)?;
            Ok(())
        })?;
        Ok(self.commit("Create node", batch, before, FocusChange::To(id), None))
    }

    /// Make the focused node (or each selected sibling run) the last child of
    /// its preceding sibling
    pub fn indent(&mut self) -> OutlineResult<CommandOutcome> {
        let runs = self.target_runs();
        if runs.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            for run in &runs {
                let Some(new_parent) = tree.previous_sibling(run[0]) else {
                    continue;
                };
                batch.set_collapsed(tree, new_parent, false)?;
                for id in run {
                    batch.move_to(tree, *id, Destination::LastChildOf(new_parent))?;
                }
            }
            Ok(())
        })?;
        Ok(self.commit("Indent", batch, before, FocusChange::Keep, None))
    }

    /// Make the focused node (or selected runs) the sibling right after its
    /// former parent
    pub fn outdent(&mut self) -> OutlineResult<CommandOutcome> {
        self.outdent_within(None)
    }

    /// Outdent, refusing to move anything out of `zoom_boundary`
    ///
    /// The document's own zoom root is always a boundary as well.
    pub fn outdent_within(&mut self, zoom_boundary: Option<NodeId>) -> OutlineResult<CommandOutcome> {
        let runs = self.target_runs();
        if runs.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        let root = self.tree.root_id();
        let zoom = self.zoom;
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            // Runs leaving the same parent land after each other, in order
            let mut anchors: HashMap<NodeId, NodeId> = HashMap::new();
            for run in &runs {
                let Some(parent) = tree.parent_of(run[0]) else {
                    continue;
                };
                if parent == root || Some(parent) == zoom_boundary || Some(parent) == zoom {
                    continue;
                }
                let mut anchor = anchors.get(&parent).copied().unwrap_or(parent);
                for id in run {
                    batch.move_to(tree, *id, Destination::After(anchor))?;
                    anchor = *id;
                }
                anchors.insert(parent, anchor);
            }
            Ok(())
        })?;
        Ok(self.commit("Outdent", batch, before, FocusChange::Keep, None))
    }

    /// Swap the focused node (or each selected run) with its previous sibling
    pub fn move_up(&mut self) -> OutlineResult<CommandOutcome> {
        let runs = self.target_runs();
        if runs.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            for run in &runs {
                let Some(previous) = tree.previous_sibling(run[0]) else {
                    continue;
                };
                let last = run[run.len() - 1];
                batch.move_to(tree, previous, Destination::After(last))?;
            }
            Ok(())
        })?;
        Ok(self.commit("Move up", batch, before, FocusChange::Keep, None))
    }

    /// Swap the focused node (or each selected run) with its next sibling
    pub fn move_down(&mut self) -> OutlineResult<CommandOutcome> {
        let runs = self.target_runs();
        if runs.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            for run in runs.iter().rev() {
                let last = run[run.len() - 1];
                let Some(next) = tree.next_sibling(last) else {
                    continue;
                };
                batch.move_to(tree, next, Destination::Before(run[0]))?;
            }
            Ok(())
        })?;
        Ok(self.commit("Move down", batch, before, FocusChange::Keep, None))
    }

    /// Delete the focused leaf
    ///
    /// Nodes with children are left alone (see
    /// [`Document::delete_with_descendants`]). When the node is the only one
    /// visible its text is cleared instead, so the view never goes empty.
    /// Focus moves to the previous visible node, else the next, with the
    /// cursor hint at the end of its title.
    pub fn delete_focused(&mut self) -> OutlineResult<CommandOutcome> {
        let Some(id) = self.focused_node() else {
            return Ok(CommandOutcome::Unchanged);
        };
        let Some(node) = self.tree.find_by_id(id) else {
            return Ok(CommandOutcome::Unchanged);
        };
        if node.has_children() {
            return Ok(CommandOutcome::Unchanged);
        }

        let visible = self.visible_nodes();
        let before = self.view_state();
        if visible.iter().all(|v| *v == id) {
            let batch = self.mutate(|tree, batch| {
                batch.set_title(tree, id, String::new())?;
                batch.set_body(tree, id, String::new())
            })?;
            return Ok(self.commit("Clear node", batch, before, FocusChange::Keep, Some(0)));
        }

        let position = visible.iter().position(|v| *v == id);
        let target = position
            .and_then(|p| p.checked_sub(1))
            .map(|p| visible[p])
            .or_else(|| position.and_then(|p| visible.get(p + 1).copied()));
        if let Some(target) = target {
            if !self.can_focus(target) {
                return Ok(CommandOutcome::Unchanged);
            }
        }
        let cursor = target.and_then(|t| self.title_len(t));
        let batch = self.mutate(|tree, batch| batch.remove(tree, id, true).map(|_| ()))?;
        let focus = target.map_or(FocusChange::Clear, FocusChange::To);
        Ok(self.commit("Delete", batch, before, focus, cursor))
    }

    /// Delete the focused node and its whole subtree
    ///
    /// Focus moves to the next sibling, else the previous sibling, else the
    /// parent. If nothing would remain in the view, the node is cleared and
    /// its children removed instead.
    pub fn delete_with_descendants(&mut self) -> OutlineResult<CommandOutcome> {
        let Some(id) = self.focused_node() else {
            return Ok(CommandOutcome::Unchanged);
        };
        let Some(at) = self
            .tree
            .placement_of(id)
            .filter(|_| self.tree.is_attached(id))
        else {
            return Ok(CommandOutcome::Unchanged);
        };
        let view_root = self.view_root();
        let root = self.tree.root_id();
        let target = self
            .tree
            .next_sibling(id)
            .or_else(|| self.tree.previous_sibling(id))
            .or_else(|| Some(at.parent).filter(|p| *p != view_root && *p != root));
        let before = self.view_state();

        let Some(target) = target else {
            let children = self.tree.children_of(id).to_vec();
            let batch = self.mutate(|tree, batch| {
                for child in &children {
                    batch.remove(tree, *child, true)?;
                }
                batch.set_title(tree, id, String::new())?;
                batch.set_body(tree, id, String::new())
            })?;
            return Ok(self.commit("Clear node", batch, before, FocusChange::Keep, Some(0)));
        };

        if !self.can_focus(target) {
            return Ok(CommandOutcome::Unchanged);
        }
        let cursor = self.title_len(target);
        let batch = self.mutate(|tree, batch| batch.remove(tree, id, true).map(|_| ()))?;
        Ok(self.commit(
            "Delete with descendants",
            batch,
            before,
            FocusChange::To(target),
            cursor,
        ))
    }

    /// Backspace at the start of a line: append the focused node's text to
    /// the previous visible node and remove the focused node
    ///
    /// The focused node's children take its place. Focus moves to the
    /// previous node with the cursor hint at the former end of its title.
    pub fn merge_with_previous(&mut self) -> OutlineResult<CommandOutcome> {
        let Some(id) = self.focused_node() else {
            return Ok(CommandOutcome::Unchanged);
        };
        let visible = self.visible_nodes();
        let Some(position) = visible.iter().position(|v| *v == id) else {
            return Ok(CommandOutcome::Unchanged);
        };
        let Some(previous) = position.checked_sub(1).map(|p| visible[p]) else {
            return Ok(CommandOutcome::Unchanged);
        };
        if !self.can_focus(previous) {
            return Ok(CommandOutcome::Unchanged);
        }

        let (node, target) = (self.tree.node(id)?, self.tree.node(previous)?);
        let cursor = target.title.chars().count();
        let title = format!("{}{}", target.title, node.title);
        let body = match (target.body.is_empty(), node.body.is_empty()) {
            (_, true) => target.body.clone(),
            (true, false) => node.body.clone(),
            (false, false) => format!("{}\n{}", target.body, node.body),
        };
        let children = node.children().to_vec();

        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            let mut anchor = id;
            for child in &children {
                batch.move_to(tree, *child, Destination::After(anchor))?;
                anchor = *child;
            }
            batch.set_title(tree, previous, title)?;
            batch.set_body(tree, previous, body)?;
            batch.remove(tree, id, false)?;
            Ok(())
        })?;
        Ok(self.commit(
            "Merge with previous",
            batch,
            before,
            FocusChange::To(previous),
            Some(cursor),
        ))
    }

    /// Take a trashed subtree back and append it to the current view
    pub fn restore_from_trash(&mut self, id: NodeId) -> OutlineResult<CommandOutcome> {
        let entry = self.trash.take(id).ok_or_else(|| OutlineError::not_found(id))?;
        let parent = self.view_root();
        let index = self.tree.children_of(parent).len();
        let before = self.view_state();
        let subtree = entry.to_subtree();
        match self.mutate(|tree, batch| {
            batch
                .insert_subtree(tree, parent, index, subtree, true)
                .map(|_| ())
        }) {
            Ok(batch) => {
                tracing::info!("Restored '{}' from trash", id);
                Ok(self.commit("Restore from trash", batch, before, FocusChange::Keep, None))
            }
            Err(e) => {
                self.trash.put(entry);
                Err(e)
            }
        }
    }

    fn title_len(&self, id: NodeId) -> Option<usize> {
        self.tree.get(id).map(|n| n.title.chars().count())
    }
}
