//! Reversible tree edits
//!
//! Every structural command is expressed as a list of [`TreeEdit`]s applied
//! through an [`EditBatch`]. Each edit knows its inverse, so the same records
//! drive rollback of a half-applied command, undo and redo.
//!
//! [`TreeEdit::apply`] returns the edit *as it actually happened*: removals
//! carry the live snapshot taken at that moment, title edits the text that was
//! really replaced. Replaying the returned records therefore restores content
//! typed after the command was first recorded.

use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId, Subtree, TaskState};
use crate::tree::{Placement, Tree};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TreeEdit {
    /// Re-create `subtree` at `at`; `via_trash` withdraws it from the trash
    Insert {
        at: Placement,
        subtree: Subtree,
        via_trash: bool,
    },
    /// Drop the subtree at `at`; `via_trash` hands it to the trash
    Remove {
        at: Placement,
        subtree: Subtree,
        via_trash: bool,
    },
    /// `to.index` is the index after `node` left `from`
    Move {
        node: NodeId,
        from: Placement,
        to: Placement,
    },
    Title {
        node: NodeId,
        before: String,
        after: String,
    },
    Body {
        node: NodeId,
        before: String,
        after: String,
    },
    Collapsed {
        node: NodeId,
        before: bool,
        after: bool,
    },
    Task {
        node: NodeId,
        before: TaskState,
        after: TaskState,
    },
}

impl TreeEdit {
    pub(crate) fn inverse(&self) -> TreeEdit {
        match self.clone() {
            TreeEdit::Insert {
                at,
                subtree,
                via_trash,
            } => TreeEdit::Remove {
                at,
                subtree,
                via_trash,
            },
            TreeEdit::Remove {
                at,
                subtree,
                via_trash,
            } => TreeEdit::Insert {
                at,
                subtree,
                via_trash,
            },
            TreeEdit::Move { node, from, to } => TreeEdit::Move {
                node,
                from: to,
                to: from,
            },
            TreeEdit::Title { node, before, after } => TreeEdit::Title {
                node,
                before: after,
                after: before,
            },
            TreeEdit::Body { node, before, after } => TreeEdit::Body {
                node,
                before: after,
                after: before,
            },
            TreeEdit::Collapsed { node, before, after } => TreeEdit::Collapsed {
                node,
                before: after,
                after: before,
            },
            TreeEdit::Task { node, before, after } => TreeEdit::Task {
                node,
                before: after,
                after: before,
            },
        }
    }

    /// Nodes whose persisted state this edit changes (removed nodes excluded)
    pub(crate) fn touched(&self) -> Vec<NodeId> {
        match self {
            TreeEdit::Insert { subtree, .. } => subtree.ids(),
            TreeEdit::Remove { .. } => Vec::new(),
            TreeEdit::Move { node, .. }
            | TreeEdit::Title { node, .. }
            | TreeEdit::Body { node, .. }
            | TreeEdit::Collapsed { node, .. }
            | TreeEdit::Task { node, .. } => vec![*node],
        }
    }

    /// Apply to `tree`, returning the edit as actually performed
    ///
    /// Fails without touching the tree when a referenced node is missing or
    /// the edit would break a structural invariant.
    pub(crate) fn apply(&self, tree: &mut Tree) -> OutlineResult<TreeEdit> {
        match self {
            TreeEdit::Insert {
                at,
                subtree,
                via_trash,
            } => {
                let id = tree.insert_subtree(at.parent, Some(at.index), subtree)?;
                let index = tree.index_in_parent(id).unwrap_or(at.index);
                Ok(TreeEdit::Insert {
                    at: Placement {
                        parent: at.parent,
                        index,
                    },
                    subtree: subtree.clone(),
                    via_trash: *via_trash,
                })
            }
            TreeEdit::Remove {
                subtree, via_trash, ..
            } => {
                let id = subtree.id();
                let at = tree
                    .placement_of(id)
                    .filter(|_| tree.is_attached(id))
                    .ok_or_else(|| OutlineError::not_found(id))?;
                let live = tree.purge(id)?;
                Ok(TreeEdit::Remove {
                    at,
                    subtree: live,
                    via_trash: *via_trash,
                })
            }
            TreeEdit::Move { node, to, .. } => {
                let from = tree
                    .remove_from_parent(*node)
                    .ok_or_else(|| OutlineError::not_found(*node))?;
                match tree.insert_child(to.parent, *node, Some(to.index)) {
                    Ok(index) => Ok(TreeEdit::Move {
                        node: *node,
                        from,
                        to: Placement {
                            parent: to.parent,
                            index,
                        },
                    }),
                    Err(e) => {
                        // Put it back where it was; this cannot cycle.
                        let _ = tree.insert_child(from.parent, *node, Some(from.index));
                        Err(e)
                    }
                }
            }
            TreeEdit::Title { node, after, .. } => {
                let target = tree.node_mut(*node)?;
                let before = std::mem::replace(&mut target.title, after.clone());
                Ok(TreeEdit::Title {
                    node: *node,
                    before,
                    after: after.clone(),
                })
            }
            TreeEdit::Body { node, after, .. } => {
                let target = tree.node_mut(*node)?;
                let before = std::mem::replace(&mut target.body, after.clone());
                Ok(TreeEdit::Body {
                    node: *node,
                    before,
                    after: after.clone(),
                })
            }
            TreeEdit::Collapsed { node, after, .. } => {
                let target = tree.node_mut(*node)?;
                let before = std::mem::replace(&mut target.collapsed, *after);
                Ok(TreeEdit::Collapsed {
                    node: *node,
                    before,
                    after: *after,
                })
            }
            TreeEdit::Task { node, after, .. } => {
                let target = tree.node_mut(*node)?;
                let before = std::mem::replace(&mut target.task, *after);
                Ok(TreeEdit::Task {
                    node: *node,
                    before,
                    after: *after,
                })
            }
        }
    }
}

/// Where a moved node should land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destination {
    LastChildOf(NodeId),
    After(NodeId),
    Before(NodeId),
}

/// Edits applied so far by one command
///
/// If any step fails the command calls [`EditBatch::rollback`], so a command
/// is either applied whole or not at all.
#[derive(Debug, Default)]
pub(crate) struct EditBatch {
    edits: Vec<TreeEdit>,
}

impl EditBatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub(crate) fn into_edits(self) -> Vec<TreeEdit> {
        self.edits
    }

    fn push(&mut self, tree: &mut Tree, edit: TreeEdit) -> OutlineResult<TreeEdit> {
        let applied = edit.apply(tree)?;
        self.edits.push(applied.clone());
        Ok(applied)
    }

    pub(crate) fn insert_node(
        &mut self,
        tree: &mut Tree,
        parent: NodeId,
        index: usize,
        node: Node,
    ) -> OutlineResult<NodeId> {
        self.insert_subtree(tree, parent, index, Subtree::leaf(node), false)
    }

    pub(crate) fn insert_subtree(
        &mut self,
        tree: &mut Tree,
        parent: NodeId,
        index: usize,
        subtree: Subtree,
        via_trash: bool,
    ) -> OutlineResult<NodeId> {
        let id = subtree.id();
        self.push(
            tree,
            TreeEdit::Insert {
                at: Placement { parent, index },
                subtree,
                via_trash,
            },
        )?;
        Ok(id)
    }

    /// Remove a node with its descendants, returning what was removed
    pub(crate) fn remove(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        via_trash: bool,
    ) -> OutlineResult<Subtree> {
        let at = tree.placement_of(id).ok_or_else(|| OutlineError::not_found(id))?;
        let applied = self.push(
            tree,
            TreeEdit::Remove {
                at,
                subtree: Subtree::leaf(Node::with_id(id)),
                via_trash,
            },
        )?;
        match applied {
            TreeEdit::Remove { subtree, .. } => Ok(subtree),
            _ => Err(OutlineError::invalid_structure("removal applied as another edit")),
        }
    }

    /// Move `node` (with its subtree); a no-op when it is already there
    pub(crate) fn move_to(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        destination: Destination,
    ) -> OutlineResult<()> {
        let from = tree
            .placement_of(node)
            .ok_or_else(|| OutlineError::not_found(node))?;
        let to = match destination {
            Destination::LastChildOf(parent) => {
                let len = tree.children_of(parent).len();
                Placement {
                    parent,
                    index: if from.parent == parent { len - 1 } else { len },
                }
            }
            Destination::After(anchor) | Destination::Before(anchor) => {
                if anchor == node {
                    return Err(OutlineError::invalid_structure(
                        "a node cannot be placed relative to itself",
                    ));
                }
                let at = tree
                    .placement_of(anchor)
                    .ok_or_else(|| OutlineError::not_found(anchor))?;
                let mut index = at.index;
                if matches!(destination, Destination::After(_)) {
                    index += 1;
                }
                if at.parent == from.parent && from.index < index {
                    index -= 1;
                }
                Placement {
                    parent: at.parent,
                    index,
                }
            }
        };
        if to == from {
            return Ok(());
        }
        self.push(tree, TreeEdit::Move { node, from, to })?;
        Ok(())
    }

    pub(crate) fn set_title(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        title: String,
    ) -> OutlineResult<()> {
        if tree.node(node)?.title == title {
            return Ok(());
        }
        self.push(
            tree,
            TreeEdit::Title {
                node,
                before: String::new(),
                after: title,
            },
        )?;
        Ok(())
    }

    pub(crate) fn set_body(&mut self, tree: &mut Tree, node: NodeId, body: String) -> OutlineResult<()> {
        if tree.node(node)?.body == body {
            return Ok(());
        }
        self.push(
            tree,
            TreeEdit::Body {
                node,
                before: String::new(),
                after: body,
            },
        )?;
        Ok(())
    }

    pub(crate) fn set_collapsed(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        collapsed: bool,
    ) -> OutlineResult<()> {
        if tree.node(node)?.collapsed == collapsed {
            return Ok(());
        }
        self.push(
            tree,
            TreeEdit::Collapsed {
                node,
                before: !collapsed,
                after: collapsed,
            },
        )?;
        Ok(())
    }

    pub(crate) fn set_task(&mut self, tree: &mut Tree, node: NodeId, task: TaskState) -> OutlineResult<()> {
        if tree.node(node)?.task == task {
            return Ok(());
        }
        self.push(
            tree,
            TreeEdit::Task {
                node,
                before: task,
                after: task,
            },
        )?;
        Ok(())
    }

    /// Undo everything this batch applied, newest first
    pub(crate) fn rollback(self, tree: &mut Tree) {
        for edit in self.edits.into_iter().rev() {
            if let Err(e) = edit.inverse().apply(tree) {
                tracing::warn!("Rollback step failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root → [a[a1], b, c]
    fn tree() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root_id();
        let mut ids = Vec::new();
        for title in ["a", "b", "c"] {
            let id = tree.add_detached(Node::with_title(title)).unwrap();
            tree.insert_child(root, id, None).unwrap();
            ids.push(id);
        }
        let a1 = tree.add_detached(Node::with_title("a1")).unwrap();
        tree.insert_child(ids[0], a1, None).unwrap();
        (tree, ids[0], ids[1], ids[2], a1)
    }

    #[test]
    fn test_move_after_in_same_parent() {
        let (mut tree, a, b, c, _) = tree();
        let mut batch = EditBatch::new();
        batch.move_to(&mut tree, a, Destination::After(c)).unwrap();
        assert_eq!(tree.children_of(tree.root_id()), &[b, c, a]);

        batch.rollback(&mut tree);
        assert_eq!(tree.children_of(tree.root_id()), &[a, b, c]);
        tree.check_integrity().unwrap();
    }

    #[test]
    fn test_move_before_and_last_child() {
        let (mut tree, a, b, c, a1) = tree();
        let mut batch = EditBatch::new();
        batch.move_to(&mut tree, c, Destination::Before(a)).unwrap();
        assert_eq!(tree.children_of(tree.root_id()), &[c, a, b]);

        batch.move_to(&mut tree, b, Destination::LastChildOf(a)).unwrap();
        assert_eq!(tree.children_of(a), &[a1, b]);

        // Already last child: nothing recorded
        let mut noop = EditBatch::new();
        noop.move_to(&mut tree, b, Destination::LastChildOf(a)).unwrap();
        assert!(noop.is_empty());
    }

    #[test]
    fn test_move_into_own_subtree_fails_and_restores() {
        let (mut tree, a, _, _, a1) = tree();
        let mut batch = EditBatch::new();
        let err = batch.move_to(&mut tree, a, Destination::LastChildOf(a1)).unwrap_err();
        assert!(err.is_invalid_structure());
        assert_eq!(tree.index_in_parent(a), Some(0));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_remove_and_inverse_restore_identity() {
        let (mut tree, a, b, _, a1) = tree();
        let mut batch = EditBatch::new();
        let removed = batch.remove(&mut tree, a, true).unwrap();
        assert_eq!(removed.ids(), vec![a, a1]);
        assert!(tree.get(a1).is_none());

        batch.rollback(&mut tree);
        assert_eq!(tree.children_of(tree.root_id())[..2], [a, b]);
        assert_eq!(tree.children_of(a), &[a1]);
    }

    #[test]
    fn test_apply_reports_live_values() {
        let (mut tree, a, _, _, _) = tree();
        let mut batch = EditBatch::new();
        batch.set_title(&mut tree, a, "renamed".to_string()).unwrap();
        batch.set_task(&mut tree, a, TaskState::Open).unwrap();
        let edits = batch.into_edits();
        assert_eq!(
            edits[0],
            TreeEdit::Title {
                node: a,
                before: "a".to_string(),
                after: "renamed".to_string()
            }
        );
        assert_eq!(
            edits[1],
            TreeEdit::Task {
                node: a,
                before: TaskState::Plain,
                after: TaskState::Open
            }
        );
    }

    #[test]
    fn test_unchanged_values_record_nothing() {
        let (mut tree, a, _, _, _) = tree();
        let mut batch = EditBatch::new();
        batch.set_title(&mut tree, a, "a".to_string()).unwrap();
        batch.set_collapsed(&mut tree, a, false).unwrap();
        assert!(batch.is_empty());
    }
}
