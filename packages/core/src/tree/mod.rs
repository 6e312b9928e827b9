//! Arena-backed outline tree
//!
//! All nodes live in one flat table keyed by [`NodeId`]; parent/child links are
//! id lists. This keeps deep copies, serialization and undo snapshots free of
//! reference-cycle hazards. The operations here are pure structure: no undo,
//! locking, focus or event awareness. Those belong to
//! [`crate::document::Document`].
//!
//! # Invariants
//!
//! - a node appears in at most one child list
//! - no node is its own ancestor
//! - exactly one invisible root, created with the tree and never detached
//! - sibling sort indices are unique at the moment they are assigned

mod visible;

pub use visible::{VisibleEntry, VisibleView};

use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId, SortIndexCalculator, Subtree};
use std::collections::HashMap;

/// Where a node sits: its parent and its index in that parent's child list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub parent: NodeId,
    pub index: usize,
}

/// The outline: an invisible root plus every node reachable (or temporarily
/// detached) beneath it
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    ordering: SortIndexCalculator,
    /// Siblings whose sort index a rebalance rewrote since the last drain
    renumbered: Vec<NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Empty tree holding only the invisible root
    pub fn new() -> Self {
        Self::with_ordering(SortIndexCalculator::default())
    }

    pub fn with_ordering(ordering: SortIndexCalculator) -> Self {
        let root = Node::new();
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            ordering,
            renumbered: Vec::new(),
        }
    }

    /// Build a tree whose top-level items are `forest`, keeping every field
    /// (sort indices included) exactly as given
    pub fn from_forest(ordering: SortIndexCalculator, forest: &[Subtree]) -> OutlineResult<Self> {
        let mut tree = Self::with_ordering(ordering);
        let mut seen = std::collections::HashSet::new();
        for id in forest.iter().flat_map(Subtree::ids) {
            if !seen.insert(id) || id == tree.root {
                return Err(OutlineError::invalid_structure(format!(
                    "node '{}' appears more than once",
                    id
                )));
            }
        }
        for subtree in forest {
            tree.materialize(subtree);
            let index = tree.children_of(tree.root).len();
            tree.link(tree.root, subtree.id(), index);
        }
        Ok(tree)
    }

    /// Deep copies of every top-level item, in order
    pub fn forest(&self) -> Vec<Subtree> {
        self.children_of(self.root)
            .iter()
            .filter_map(|id| self.deep_copy(*id).ok())
            .collect()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Node {
        // The root is inserted at construction and never purged.
        &self.nodes[&self.root]
    }

    pub fn ordering(&self) -> SortIndexCalculator {
        self.ordering
    }

    /// Arena lookup: attached or detached
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Arena lookup that reports a missing node as [`OutlineError::NotFound`]
    pub fn node(&self, id: NodeId) -> OutlineResult<&Node> {
        self.nodes.get(&id).ok_or_else(|| OutlineError::not_found(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> OutlineResult<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| OutlineError::not_found(id))
    }

    /// Look up a node that is attached to the tree
    ///
    /// Detached nodes (mid-move, or removed by a caller) are reported as
    /// absent.
    pub fn find_by_id(&self, id: NodeId) -> Option<&Node> {
        if self.is_attached(id) {
            self.nodes.get(&id)
        } else {
            None
        }
    }

    /// True when the node's ancestor chain reaches the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes.get(&current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Number of user-visible nodes attached under the root
    pub fn len(&self) -> usize {
        self.descendants(self.root).len()
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|c| *c == id)
    }

    pub fn placement_of(&self, id: NodeId) -> Option<Placement> {
        let parent = self.parent_of(id)?;
        let index = self.index_in_parent(id)?;
        Some(Placement { parent, index })
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let Placement { parent, index } = self.placement_of(id)?;
        index
            .checked_sub(1)
            .map(|i| self.children_of(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let Placement { parent, index } = self.placement_of(id)?;
        self.children_of(parent).get(index + 1).copied()
    }

    /// True when `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent_of(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// Depth below the root (top-level items are depth 1)
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        if !self.is_attached(id) {
            return None;
        }
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Ordered ancestor chain, root first, inclusive of `id`
    pub fn path_from_root(&self, id: NodeId) -> OutlineResult<Vec<NodeId>> {
        if !self.is_attached(id) {
            return Err(OutlineError::not_found(id));
        }
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// All descendants of `id` in pre-order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).iter().rev().copied());
        }
        out
    }

    /// Add a fresh, unlinked node to the arena
    pub fn add_detached(&mut self, node: Node) -> OutlineResult<NodeId> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(OutlineError::invalid_structure(format!(
                "node '{}' already exists",
                id
            )));
        }
        let mut node = node;
        node.parent = None;
        node.children.clear();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Attach `child` under `parent` at `index` (append when `None`)
    ///
    /// Fails with [`OutlineError::InvalidStructure`] if `child` already has a
    /// parent, is the root, or is `parent` itself or one of its ancestors. The
    /// tree is untouched on failure. A fresh sort index is assigned between the
    /// new neighbours, rebalancing the sibling list if the gap is exhausted.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> OutlineResult<usize> {
        self.check_insertable(parent, child)?;
        let siblings = &self.node(parent)?.children;
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        self.link(parent, child, index);
        self.assign_sort_index(parent, index);
        Ok(index)
    }

    /// Attach `child` under `parent` at the position dictated by its existing
    /// sort index (after any sibling with an equal index)
    pub fn insert_child_by_sort_index(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> OutlineResult<usize> {
        self.check_insertable(parent, child)?;
        let key = self.node(child)?.sort_index;
        let index = self
            .children_of(parent)
            .iter()
            .position(|c| self.nodes.get(c).map(|n| n.sort_index > key).unwrap_or(false))
            .unwrap_or_else(|| self.children_of(parent).len());
        self.link(parent, child, index);
        Ok(index)
    }

    /// Detach a node (with its whole subtree) from its parent
    ///
    /// Returns where it was; `None` (no-op) if it was already detached.
    pub fn remove_from_parent(&mut self, id: NodeId) -> Option<Placement> {
        let placement = self.placement_of(id)?;
        if let Some(parent) = self.nodes.get_mut(&placement.parent) {
            parent.children.remove(placement.index);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        Some(placement)
    }

    /// Detach a node and drop it and its descendants from the arena
    ///
    /// Returns the deep copy of what was removed.
    pub fn purge(&mut self, id: NodeId) -> OutlineResult<Subtree> {
        if id == self.root {
            return Err(OutlineError::invalid_structure("the root cannot be removed"));
        }
        let snapshot = self.deep_copy(id)?;
        self.remove_from_parent(id);
        for gone in snapshot.ids() {
            self.nodes.remove(&gone);
        }
        Ok(snapshot)
    }

    /// Recursive clone of a node and its descendants, preserving identity
    pub fn deep_copy(&self, id: NodeId) -> OutlineResult<Subtree> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|c| self.deep_copy(*c))
            .collect::<OutlineResult<Vec<_>>>()?;
        Ok(Subtree {
            node: node.detached_copy(),
            children,
        })
    }

    /// Re-create a deep copy under `parent` at `index`
    ///
    /// Every id in the subtree must be absent from the arena; otherwise the call
    /// fails with [`OutlineError::InvalidStructure`] and nothing changes.
    pub fn insert_subtree(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        subtree: &Subtree,
    ) -> OutlineResult<NodeId> {
        self.node(parent)?;
        if let Some(dup) = subtree.ids().into_iter().find(|id| self.nodes.contains_key(id)) {
            return Err(OutlineError::invalid_structure(format!(
                "node '{}' already exists",
                dup
            )));
        }
        self.materialize(subtree);
        let root = subtree.id();
        if let Err(e) = self.insert_child(parent, root, index) {
            for id in subtree.ids() {
                self.nodes.remove(&id);
            }
            return Err(e);
        }
        Ok(root)
    }

    fn materialize(&mut self, subtree: &Subtree) {
        let mut node = subtree.node.detached_copy();
        node.children = subtree.children.iter().map(Subtree::id).collect();
        let id = node.id;
        self.nodes.insert(id, node);
        for child in &subtree.children {
            self.materialize(child);
            if let Some(c) = self.nodes.get_mut(&child.id()) {
                c.parent = Some(id);
            }
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> OutlineResult<()> {
        self.node(parent)?;
        let node = self.node(child)?;
        if child == self.root {
            return Err(OutlineError::invalid_structure("the root cannot be re-parented"));
        }
        if node.parent.is_some() {
            return Err(OutlineError::invalid_structure(format!(
                "node '{}' already has a parent; remove it first",
                child
            )));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(OutlineError::invalid_structure(format!(
                "node '{}' would become its own ancestor",
                child
            )));
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
    }

    fn assign_sort_index(&mut self, parent: NodeId, index: usize) {
        let siblings = self.children_of(parent).to_vec();
        let key = |i: usize| self.nodes.get(&siblings[i]).map(|n| n.sort_index);
        let prev = index.checked_sub(1).and_then(key);
        let next = siblings.get(index + 1).and_then(|_| key(index + 1));

        match self.ordering.between(prev, next) {
            Some(value) => {
                if let Some(node) = self.nodes.get_mut(&siblings[index]) {
                    node.sort_index = value;
                }
            }
            None => {
                tracing::debug!(
                    "Rebalancing {} sort indices under '{}'",
                    siblings.len(),
                    parent
                );
                for (id, value) in siblings.iter().zip(self.ordering.rebalance(siblings.len())) {
                    if let Some(node) = self.nodes.get_mut(id) {
                        if node.sort_index != value {
                            node.sort_index = value;
                            self.renumbered.push(*id);
                        }
                    }
                }
            }
        }
    }

    /// Drain the ids renumbered by sibling rebalancing since the last call
    ///
    /// Their new sort indices are persisted state the remote store has not
    /// seen yet.
    pub fn take_renumbered(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.renumbered)
    }

    /// Verify parent links, child lists and acyclicity
    ///
    /// Cheap enough for tests and debug assertions on user-scale documents.
    pub fn check_integrity(&self) -> OutlineResult<()> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(OutlineError::invalid_structure(format!(
                    "node '{}' is reachable twice",
                    id
                )));
            }
            for child in self.children_of(id) {
                let node = self.node(*child)?;
                if node.parent != Some(id) {
                    return Err(OutlineError::invalid_structure(format!(
                        "node '{}' has a stale parent link",
                        child
                    )));
                }
                stack.push(*child);
            }
        }
        Ok(())
    }
}
