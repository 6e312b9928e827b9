//! Node Data Structures
//!
//! This module defines the outline [`Node`], its stable [`NodeId`], the
//! tri-state [`TaskState`], and [`Subtree`], the owned deep copy used for undo
//! snapshots, trash entries and clipboard copies.
//!
//! # Architecture
//!
//! - **Arena storage**: nodes live in a flat table owned by [`crate::tree::Tree`]
//! - **Id links**: parent/child relationships are `NodeId`s, never references
//! - **Stable identity**: ids survive undo/redo, deep copies and reloads
//!
//! # Examples
//!
//! ```rust
//! use outliner_core::models::{Node, TaskState};
//!
//! let mut node = Node::with_title("Buy milk");
//! node.task = TaskState::Open;
//! assert!(node.task.is_task());
//! assert!(node.children().is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Globally unique, immutable node identifier
///
/// Never reused, even after the node is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Task marker of a node: plain item, open task, or completed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Plain,
    Open,
    Completed,
}

impl TaskState {
    /// Next state in the Plain → Open → Completed → Plain cycle
    pub fn cycle(self) -> Self {
        match self {
            TaskState::Plain => TaskState::Open,
            TaskState::Open => TaskState::Completed,
            TaskState::Completed => TaskState::Plain,
        }
    }

    pub fn is_task(self) -> bool {
        !matches!(self, TaskState::Plain)
    }

    pub fn is_completed(self) -> bool {
        matches!(self, TaskState::Completed)
    }
}

/// A single outline item
///
/// # Fields
///
/// - `id`: Stable identity (see [`NodeId`])
/// - `title`: Single logical line of text
/// - `body`: Optional multi-line notes under the title (empty means none)
/// - `collapsed`: Persisted default for hiding descendants in new views
/// - `task`: Plain / open / completed marker
/// - `sort_index`: Sparse ordering key among siblings, used by remote merge
/// - `last_modified_locally`: Timestamp of the last local edit
/// - `sync_token`: Opaque token handed back by the external sync store
///
/// The parent link is a non-owning back-reference; the parent's child list is
/// the only ownership relation. Both are maintained exclusively by
/// [`crate::tree::Tree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    #[serde(default)]
    pub collapsed: bool,

    #[serde(default)]
    pub task: TaskState,

    #[serde(default)]
    pub sort_index: i64,

    pub last_modified_locally: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,

    #[serde(skip)]
    pub(crate) parent: Option<NodeId>,

    #[serde(skip)]
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    /// Create an empty node with a fresh identity
    pub fn new() -> Self {
        Self::with_id(NodeId::new())
    }

    /// Create an empty node with an explicit identity
    ///
    /// Used when reconstructing nodes whose ids come from persisted metadata
    /// or a remote store.
    pub fn with_id(id: NodeId) -> Self {
        Self {
            id,
            title: String::new(),
            body: String::new(),
            collapsed: false,
            task: TaskState::Plain,
            sort_index: 0,
            last_modified_locally: Utc::now(),
            sync_token: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a node with a fresh identity and the given title
    pub fn with_title(title: impl Into<String>) -> Self {
        let mut node = Self::new();
        node.title = title.into();
        node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// True when neither title nor body carry any text
    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }

    /// Record a local modification
    pub fn touch(&mut self) {
        self.last_modified_locally = Utc::now();
    }

    /// Copy of this node's fields without its structural links
    pub(crate) fn detached_copy(&self) -> Node {
        Node {
            parent: None,
            children: Vec::new(),
            ..self.clone()
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned deep copy of a node and all of its descendants
///
/// Identity and every field are preserved, so a subtree can be re-inserted to
/// restore exactly what was removed. `node` never carries structural links;
/// the shape lives in `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtree {
    pub node: Node,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Subtree>,
}

impl Subtree {
    /// Single-node subtree
    pub fn leaf(node: Node) -> Self {
        Self {
            node: node.detached_copy(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Subtree::node_count).sum::<usize>()
    }

    /// Every id in pre-order
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node_count());
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.push(self.node.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// True when this node and every descendant carry no text
    pub fn is_blank(&self) -> bool {
        self.node.is_blank() && self.children.iter().all(Subtree::is_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let a = Node::new();
        let b = Node::new();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_node_id_parse_roundtrip() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_task_state_cycle() {
        assert_eq!(TaskState::Plain.cycle(), TaskState::Open);
        assert_eq!(TaskState::Open.cycle(), TaskState::Completed);
        assert_eq!(TaskState::Completed.cycle(), TaskState::Plain);
        assert!(TaskState::Open.is_task());
        assert!(!TaskState::Open.is_completed());
        assert!(TaskState::Completed.is_completed());
    }

    #[test]
    fn test_blank_detection() {
        let mut node = Node::new();
        assert!(node.is_blank());
        node.body = "notes".to_string();
        assert!(!node.is_blank());
    }

    #[test]
    fn test_node_serialization_skips_links() {
        let mut node = Node::with_title("Hello");
        node.children.push(NodeId::new());
        node.parent = Some(NodeId::new());

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["title"], "Hello");
        assert!(json.get("children").is_none());
        assert!(json.get("parent").is_none());
        assert!(json.get("body").is_none(), "empty body is omitted");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, node.id);
        assert!(back.children().is_empty());
        assert_eq!(back.parent(), None);
    }

    #[test]
    fn test_subtree_ids_preorder() {
        let a = Node::with_title("a");
        let b = Node::with_title("b");
        let c = Node::with_title("c");
        let subtree = Subtree {
            node: a.clone(),
            children: vec![
                Subtree {
                    node: b.clone(),
                    children: vec![Subtree::leaf(c.clone())],
                },
            ],
        };
        assert_eq!(subtree.node_count(), 3);
        assert_eq!(subtree.ids(), vec![a.id, b.id, c.id]);
        assert!(!subtree.is_blank());
    }
}
