//! Soft-delete storage
//!
//! Every local structural deletion hands a serializable snapshot of the
//! removed subtree to a [`TrashStore`]. Restoring takes the entry back out and
//! re-inserts it through the normal tree insertion path.

use crate::models::{Node, NodeId, Subtree, TaskState};
use crate::utils::PeriodKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of a deleted node and its descendants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    pub id: NodeId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub task: TaskState,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub children: Vec<Subtree>,
    pub deleted_at: DateTime<Utc>,
    /// Week the node was deleted from, when the document knows it
    pub period: Option<PeriodKey>,
}

impl TrashEntry {
    pub fn from_subtree(subtree: Subtree, period: Option<PeriodKey>) -> Self {
        let Subtree { node, children } = subtree;
        Self {
            id: node.id,
            title: node.title,
            body: node.body,
            task: node.task,
            collapsed: node.collapsed,
            children,
            deleted_at: Utc::now(),
            period,
        }
    }

    /// Rebuild the subtree with its original identity
    pub fn to_subtree(&self) -> Subtree {
        let mut node = Node::with_id(self.id);
        node.title = self.title.clone();
        node.body = self.body.clone();
        node.task = self.task;
        node.collapsed = self.collapsed;
        Subtree {
            node,
            children: self.children.clone(),
        }
    }
}

/// External sink for deleted subtrees
pub trait TrashStore: Send + Sync {
    fn put(&self, entry: TrashEntry);

    /// Remove and return the entry for `id`
    fn take(&self, id: NodeId) -> Option<TrashEntry>;

    /// Entries, most recently deleted last
    fn list(&self) -> Vec<TrashEntry>;
}

/// In-process trash, the default for documents without an external store
#[derive(Debug, Default)]
pub struct MemoryTrashStore {
    entries: Mutex<Vec<TrashEntry>>,
}

impl MemoryTrashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl TrashStore for MemoryTrashStore {
    fn put(&self, entry: TrashEntry) {
        let mut entries = self.entries.lock();
        entries.retain(|e| e.id != entry.id);
        entries.push(entry);
    }

    fn take(&self, id: NodeId) -> Option<TrashEntry> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(index))
    }

    fn list(&self) -> Vec<TrashEntry> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Subtree {
        let mut parent = Node::with_title("parent");
        parent.body = "notes".to_string();
        parent.task = TaskState::Open;
        Subtree {
            node: parent,
            children: vec![Subtree::leaf(Node::with_title("child"))],
        }
    }

    #[test]
    fn test_entry_keeps_identity_and_children() {
        let subtree = sample();
        let id = subtree.id();
        let entry = TrashEntry::from_subtree(subtree.clone(), Some(PeriodKey::current()));
        assert_eq!(entry.id, id);
        assert_eq!(entry.body, "notes");
        assert_eq!(entry.children.len(), 1);

        let rebuilt = entry.to_subtree();
        assert_eq!(rebuilt.ids(), subtree.ids());
        assert_eq!(rebuilt.node.task, TaskState::Open);
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = TrashEntry::from_subtree(sample(), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("deletedAt").is_some());
        assert_eq!(json["title"], "parent");
        let back: TrashEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_memory_store_put_take() {
        let store = MemoryTrashStore::new();
        let entry = TrashEntry::from_subtree(sample(), None);
        let id = entry.id;
        store.put(entry.clone());
        store.put(entry);
        assert_eq!(store.len(), 1, "same id replaces the older entry");

        assert_eq!(store.take(id).map(|e| e.id), Some(id));
        assert!(store.take(id).is_none());
        assert!(store.is_empty());
    }
}
