//! Remote Merge Reconciler
//!
//! Applies a batch of changes from the external sync store onto the live
//! tree while a user may be typing into it.
//!
//! ## Merge Rules
//!
//! 1. The last change per node wins within one batch
//! 2. Deletions run first; every window focused inside a deleted subtree
//!    moves to the previous visible node, else the next, else nowhere
//! 3. Upserts update every field, except that the title of a node any window
//!    is editing (focused or locked) is left alone so in-flight keystrokes
//!    survive
//! 4. New or re-parented nodes are placed among their declared parent's
//!    children by sort index; a missing parent (or one that would create a
//!    cycle) falls back to the root
//! 5. The whole batch bumps the structure version once, records nothing in
//!    the undo history and nothing in the outbound change list

use crate::document::{Document, DocumentEvent};
use crate::models::{Node, NodeId, TaskState};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node as the remote store describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNode {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// `None` means top level
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub sort_index: i64,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub task: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
}

impl RemoteNode {
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: String::new(),
            parent: None,
            sort_index: 0,
            collapsed: false,
            task: TaskState::Plain,
            sync_token: None,
        }
    }

    /// Describe an attached node of `tree`
    pub fn capture(tree: &Tree, id: NodeId) -> Option<Self> {
        let node = tree.find_by_id(id)?;
        Some(Self {
            id,
            title: node.title.clone(),
            body: node.body.clone(),
            parent: node.parent().filter(|p| *p != tree.root_id()),
            sort_index: node.sort_index,
            collapsed: node.collapsed,
            task: node.task,
            sync_token: node.sync_token.clone(),
        })
    }

    fn apply_to(&self, node: &mut Node, keep_title: bool) {
        if !keep_title {
            node.title = self.title.clone();
        }
        node.body = self.body.clone();
        node.collapsed = self.collapsed;
        node.task = self.task;
        node.sort_index = self.sort_index;
        node.sync_token = self.sync_token.clone();
    }
}

/// One externally produced change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RemoteChange {
    Upsert(RemoteNode),
    Delete { id: NodeId },
}

impl RemoteChange {
    pub fn id(&self) -> NodeId {
        match self {
            RemoteChange::Upsert(node) => node.id,
            RemoteChange::Delete { id } => *id,
        }
    }
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub deleted: usize,
    /// Changes ignored (unknown delete targets, the root)
    pub skipped: usize,
    /// Upserts whose parent could not be used and went to the root
    pub fallbacks: usize,
}

impl MergeReport {
    /// True when the tree was touched
    pub fn changed(&self) -> bool {
        self.created + self.updated + self.moved + self.deleted > 0
    }
}

struct PendingUpsert {
    remote: RemoteNode,
    created: bool,
    previous_sort_index: Option<i64>,
}

impl Document {
    /// Merge a batch of remote changes into the live tree
    pub fn apply_remote_batch(&mut self, changes: Vec<RemoteChange>) -> MergeReport {
        let mut report = MergeReport::default();
        self.set_applying_remote(true);

        let root = self.tree().root_id();

        // Keep only the last change per id, in first-seen order
        let mut order: Vec<NodeId> = Vec::new();
        let mut latest: HashMap<NodeId, RemoteChange> = HashMap::new();
        for change in changes {
            let id = change.id();
            if latest.insert(id, change).is_none() {
                order.push(id);
            }
        }
        let changes: Vec<RemoteChange> = order.iter().filter_map(|id| latest.remove(id)).collect();

        for change in &changes {
            if let RemoteChange::Delete { id } = change {
                if *id == root || !self.tree().is_attached(*id) {
                    report.skipped += 1;
                    continue;
                }
                if self.remove_untracked(*id) {
                    report.deleted += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }

        // Pass 1: create missing nodes detached, update existing fields
        let mut pending = Vec::new();
        for change in changes {
            let RemoteChange::Upsert(remote) = change else {
                continue;
            };
            if remote.id == root {
                report.skipped += 1;
                continue;
            }
            let editing = self.is_being_edited(remote.id);
            let tree = self.tree_mut();
            let (created, previous_sort_index) = match tree.get_mut(remote.id) {
                Some(node) => {
                    let previous = node.sort_index;
                    if editing {
                        tracing::debug!("Keeping local title of '{}' (being edited)", remote.id);
                    }
                    remote.apply_to(node, editing);
                    report.updated += 1;
                    (false, Some(previous))
                }
                None => {
                    let mut node = Node::with_id(remote.id);
                    remote.apply_to(&mut node, false);
                    if tree.add_detached(node).is_err() {
                        report.skipped += 1;
                        continue;
                    }
                    report.created += 1;
                    (true, None)
                }
            };
            pending.push(PendingUpsert {
                remote,
                created,
                previous_sort_index,
            });
        }

        // Pass 2: place new nodes and re-position moved ones
        for PendingUpsert {
            remote,
            created,
            previous_sort_index,
        } in pending
        {
            let id = remote.id;
            let tree = self.tree_mut();
            let parent = match remote.parent {
                Some(p) if p != id && tree.get(p).is_some() => p,
                Some(p) => {
                    tracing::warn!("Remote parent '{}' of '{}' unknown; using root", p, id);
                    report.fallbacks += 1;
                    root
                }
                None => root,
            };
            let in_place = tree.parent_of(id) == Some(parent);
            if !created && in_place && previous_sort_index == Some(remote.sort_index) {
                continue;
            }
            tree.remove_from_parent(id);
            if let Err(e) = tree.insert_child_by_sort_index(parent, id) {
                tracing::warn!("Cannot place '{}' under '{}' ({}); using root", id, parent, e);
                report.fallbacks += 1;
                if let Err(e) = tree.insert_child_by_sort_index(root, id) {
                    tracing::warn!("Dropping remote node '{}': {}", id, e);
                    report.skipped += 1;
                    continue;
                }
            }
            if !created {
                report.moved += 1;
            }
        }

        self.ensure_not_empty();
        self.prune_selection();
        self.fix_zoom();
        self.set_applying_remote(false);

        if report.changed() {
            self.bump_version();
        }
        tracing::info!(
            "Remote batch merged: {} created, {} updated, {} moved, {} deleted, {} skipped",
            report.created,
            report.updated,
            report.moved,
            report.deleted,
            report.skipped
        );
        self.emit(DocumentEvent::RemoteBatchApplied(report.clone()));
        report
    }
}

#[cfg(test)]
#[path = "remote_merge_test.rs"]
mod remote_merge_test;
