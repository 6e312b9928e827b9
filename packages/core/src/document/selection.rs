//! Multi-selection
//!
//! The selection is a set of ids. Whenever it drives a structural command it
//! is normalized first: ids whose ancestor is also selected are dropped (they
//! travel with that ancestor), the rest are sorted into document order and
//! grouped into runs of adjacent siblings that move as one block.
//!
//! Selection changes are view state: they emit `SelectionChanged` but never
//! bump the structure version or enter the undo history.

use super::edits::Destination;
use super::{CommandOutcome, Document, DocumentEvent, FocusChange};
use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId};
use std::collections::HashSet;

impl Document {
    /// Selected ids in document order
    pub fn selection(&self) -> Vec<NodeId> {
        self.document_order(self.selection.iter().copied())
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Replace the selection; unknown ids and the root are ignored
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let root = self.tree.root_id();
        let selection: HashSet<NodeId> = ids
            .into_iter()
            .filter(|id| *id != root && self.tree.is_attached(*id))
            .collect();
        self.replace_selection(selection);
    }

    pub fn select(&mut self, id: NodeId) {
        let mut selection = self.selection.clone();
        if id != self.tree.root_id() && self.tree.is_attached(id) {
            selection.insert(id);
        }
        self.replace_selection(selection);
    }

    pub fn deselect(&mut self, id: NodeId) {
        let mut selection = self.selection.clone();
        selection.remove(&id);
        self.replace_selection(selection);
    }

    pub fn clear_selection(&mut self) {
        self.replace_selection(HashSet::new());
    }

    fn replace_selection(&mut self, selection: HashSet<NodeId>) {
        if selection != self.selection {
            self.selection = selection;
            self.emit(DocumentEvent::SelectionChanged {
                count: self.selection.len(),
            });
        }
    }

    /// Drop selected ids that are no longer attached
    pub(crate) fn prune_selection(&mut self) {
        let attached: HashSet<NodeId> = self
            .selection
            .iter()
            .copied()
            .filter(|id| self.tree.is_attached(*id))
            .collect();
        self.replace_selection(attached);
    }

    /// Selected nodes without a selected ancestor, in document order
    pub fn selected_roots(&self) -> Vec<NodeId> {
        let roots = self.selection.iter().copied().filter(|id| {
            let mut current = self.tree.parent_of(*id);
            while let Some(parent) = current {
                if self.selection.contains(&parent) {
                    return false;
                }
                current = self.tree.parent_of(parent);
            }
            true
        });
        self.document_order(roots)
    }

    /// Group document-ordered ids into runs of adjacent siblings
    fn sibling_runs(&self, ids: &[NodeId]) -> Vec<Vec<NodeId>> {
        let mut runs: Vec<Vec<NodeId>> = Vec::new();
        for id in ids {
            if let Some(run) = runs.last_mut() {
                let last = run[run.len() - 1];
                if self.tree.next_sibling(last) == Some(*id) {
                    run.push(*id);
                    continue;
                }
            }
            runs.push(vec![*id]);
        }
        runs
    }

    /// Blocks a structural command acts on: the selection's sibling runs, or
    /// the focused node alone when nothing is selected
    pub(crate) fn target_runs(&self) -> Vec<Vec<NodeId>> {
        if !self.selection.is_empty() {
            return self.sibling_runs(&self.selected_roots());
        }
        match self.focused_node() {
            Some(id) if id != self.tree.root_id() && self.tree.is_attached(id) => vec![vec![id]],
            _ => Vec::new(),
        }
    }

    /// Grow the selection one level
    ///
    /// The first call selects the focused node's sibling group (with all
    /// descendants). Each later call takes the shallowest selected node (the
    /// earliest one on ties) and selects its parent's sibling group instead.
    /// Stops at the top level of the current view.
    pub fn expand_selection(&mut self) -> CommandOutcome {
        let view_root = self.view_root();
        let root = self.tree.root_id();
        let group_parent = if self.selection.is_empty() {
            let Some(id) = self.focused_node().filter(|id| self.tree.is_attached(*id)) else {
                return CommandOutcome::Unchanged;
            };
            self.tree.parent_of(id)
        } else {
            let Some(shallowest) = self.shallowest_selected() else {
                return CommandOutcome::Unchanged;
            };
            match self.tree.parent_of(shallowest) {
                Some(parent) if parent != view_root && parent != root => self.tree.parent_of(parent),
                _ => None,
            }
        };
        let Some(group_parent) = group_parent else {
            return CommandOutcome::Unchanged;
        };

        let mut expanded = HashSet::new();
        for child in self.tree.children_of(group_parent) {
            expanded.insert(*child);
            expanded.extend(self.tree.descendants(*child));
        }
        if expanded == self.selection {
            return CommandOutcome::Unchanged;
        }
        tracing::debug!("Selection expanded to {} node(s)", expanded.len());
        self.replace_selection(expanded);
        CommandOutcome::Applied
    }

    fn shallowest_selected(&self) -> Option<NodeId> {
        self.selection()
            .into_iter()
            .filter_map(|id| self.tree.depth(id).map(|depth| (depth, id)))
            .min_by_key(|(depth, _)| *depth)
            .map(|(_, id)| id)
    }

    /// Text-format copy of the selection (or the focused node)
    pub fn copy_selection(&self) -> String {
        let mut roots = self.selected_roots();
        if roots.is_empty() {
            roots.extend(self.focused_node().filter(|id| self.tree.is_attached(*id)));
        }
        self.codec.serialize_nodes(&self.tree, &roots)
    }

    /// Delete every selected subtree as one undoable action
    ///
    /// Focus moves to the visible survivor before the first removed node,
    /// else the first survivor after it. If the view would go empty a blank
    /// node is inserted in the same action.
    pub fn delete_selection(&mut self) -> OutlineResult<CommandOutcome> {
        let roots = self.selected_roots();
        if roots.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        let mut removed: HashSet<NodeId> = HashSet::new();
        for id in &roots {
            removed.insert(*id);
            removed.extend(self.tree.descendants(*id));
        }

        let target = self.nearest_visible_outside(&removed);
        if let Some(target) = target {
            if !self.can_focus(target) {
                return Ok(CommandOutcome::Unchanged);
            }
        }
        let view_root = self.view_root();
        let blank_parent = if removed.contains(&view_root) {
            self.tree.root_id()
        } else {
            view_root
        };
        let blank = self
            .tree
            .children_of(blank_parent)
            .iter()
            .all(|c| removed.contains(c))
            .then(Node::new);
        let blank_id = blank.as_ref().map(|n| n.id);

        let before = self.view_state();
        self.selection.clear();
        let result = self.mutate(|tree, batch| {
            for id in &roots {
                batch.remove(tree, *id, true)?;
            }
            if let Some(node) = blank {
                let index = tree.children_of(blank_parent).len();
                batch.insert_node(tree, blank_parent, index, node)?;
            }
            Ok(())
        });
        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                self.selection = before.selection.iter().copied().collect();
                return Err(e);
            }
        };
        self.emit(DocumentEvent::SelectionChanged { count: 0 });

        let focus = match target.or(blank_id) {
            Some(id) => FocusChange::To(id),
            None => FocusChange::Clear,
        };
        let cursor = target.and_then(|t| self.tree.get(t)).map(|n| n.title.chars().count());
        Ok(self.commit("Delete selection", batch, before, focus, cursor))
    }

    /// Move the selected subtrees, in document order, to sit right after
    /// `target`
    ///
    /// Fails with `InvalidStructure` when `target` is selected or inside a
    /// selected subtree.
    pub fn move_selection_after(&mut self, target: NodeId) -> OutlineResult<CommandOutcome> {
        if self.tree.find_by_id(target).is_none() {
            return Err(OutlineError::not_found(target));
        }
        if target == self.tree.root_id() {
            return Err(OutlineError::invalid_structure("nothing can follow the root"));
        }
        let roots = self.selected_roots();
        if roots.is_empty() {
            return Ok(CommandOutcome::Unchanged);
        }
        if roots
            .iter()
            .any(|r| *r == target || self.tree.is_ancestor(*r, target))
        {
            return Err(OutlineError::invalid_structure(
                "cannot move a selection after a node inside it",
            ));
        }

        let before = self.view_state();
        let batch = self.mutate(|tree, batch| {
            let mut anchor = target;
            for id in &roots {
                batch.move_to(tree, *id, Destination::After(anchor))?;
                anchor = *id;
            }
            Ok(())
        })?;
        Ok(self.commit("Move selection", batch, before, FocusChange::Keep, None))
    }
}
