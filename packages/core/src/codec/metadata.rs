//! Metadata sidecar
//!
//! The text format carries titles, bodies and shape only. Identity, collapse
//! and task flags, sort indices and sync tokens travel next to it in a JSON
//! sidecar listing every node in pre-order. On load the sidecar is applied
//! positionally, and only if it still lines up with the text (same node count,
//! same titles); otherwise the text wins and fresh ids are kept.

use crate::error::OutlineResult;
use crate::models::{NodeId, Subtree, TaskState};
use crate::tree::Tree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current sidecar format version
pub const METADATA_VERSION: u32 = 1;

/// Per-node fields the text format does not encode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub id: NodeId,
    /// Used only to verify the positional match
    pub title: String,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub task: TaskState,
    #[serde(default)]
    pub sort_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    pub last_modified_locally: DateTime<Utc>,
}

/// Sidecar document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineMetadata {
    pub version: u32,
    pub nodes: Vec<NodeMetadata>,
}

impl OutlineMetadata {
    /// Capture metadata for every attached node in pre-order
    pub fn capture(tree: &Tree) -> Self {
        let nodes = tree
            .descendants(tree.root_id())
            .into_iter()
            .filter_map(|id| tree.get(id))
            .map(|node| NodeMetadata {
                id: node.id,
                title: node.title.clone(),
                collapsed: node.collapsed,
                task: node.task,
                sort_index: node.sort_index,
                sync_token: node.sync_token.clone(),
                last_modified_locally: node.last_modified_locally,
            })
            .collect();
        Self {
            version: METADATA_VERSION,
            nodes,
        }
    }

    pub fn to_json(&self) -> OutlineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> OutlineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild `tree` with this metadata applied
    ///
    /// Returns `None` when the sidecar does not describe the same outline.
    pub fn apply(&self, tree: &Tree) -> Option<Tree> {
        if self.version != METADATA_VERSION {
            tracing::warn!(
                "Ignoring outline metadata version {} (expected {})",
                self.version,
                METADATA_VERSION
            );
            return None;
        }

        let mut forest = tree.forest();
        let count: usize = forest.iter().map(Subtree::node_count).sum();
        if count != self.nodes.len() {
            tracing::warn!(
                "Outline metadata lists {} nodes but text has {}; keeping fresh ids",
                self.nodes.len(),
                count
            );
            return None;
        }

        let mut entries = self.nodes.iter();
        for subtree in &mut forest {
            if !overlay(subtree, &mut entries) {
                tracing::warn!("Outline metadata titles diverge from text; keeping fresh ids");
                return None;
            }
        }

        match Tree::from_forest(tree.ordering(), &forest) {
            Ok(rebuilt) => Some(rebuilt),
            Err(e) => {
                tracing::warn!("Outline metadata rejected: {}", e);
                None
            }
        }
    }
}

fn overlay<'a>(subtree: &mut Subtree, entries: &mut impl Iterator<Item = &'a NodeMetadata>) -> bool {
    let Some(meta) = entries.next() else {
        return false;
    };
    if meta.title != subtree.node.title {
        return false;
    }
    let node = &mut subtree.node;
    node.id = meta.id;
    node.collapsed = meta.collapsed;
    node.task = meta.task;
    node.sort_index = meta.sort_index;
    node.sync_token = meta.sync_token.clone();
    node.last_modified_locally = meta.last_modified_locally;

    subtree
        .children
        .iter_mut()
        .all(|child| overlay(child, entries))
}
