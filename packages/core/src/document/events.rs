//! Document Events
//!
//! Every window observing a [`Document`](super::Document) subscribes to a
//! tokio broadcast channel and re-reads whatever derived state the event names.
//! Events describe what changed, never how: a window that only renders the
//! visible list can ignore everything except `StructureChanged` and
//! `ContentChanged`.
//!
//! # Event Flow
//!
//! 1. A command mutates the document under the shared mutex
//! 2. The matching event is broadcast (sends never block; lagging receivers
//!    skip ahead)
//! 3. Subscribers such as [`Autosave`](crate::services::Autosave) react

use super::trash::TrashEntry;
use crate::models::NodeId;
use crate::services::{MergeReport, OwnerToken};
use serde::Serialize;

/// Events emitted by a document
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentEvent {
    /// Tree shape or persisted flags changed; `version` is the new
    /// structure version
    StructureChanged { version: u64 },

    /// A node's title or body changed (no version bump)
    #[serde(rename_all = "camelCase")]
    ContentChanged { node_id: NodeId },

    /// `owner`'s focus moved; `None` when it no longer edits anything
    #[serde(rename_all = "camelCase")]
    FocusChanged {
        owner: OwnerToken,
        node_id: Option<NodeId>,
    },

    SelectionChanged { count: usize },

    #[serde(rename_all = "camelCase")]
    ZoomChanged { node_id: Option<NodeId> },

    /// A locally deleted subtree was handed to the trash store
    NodeTrashed(TrashEntry),

    /// A remote batch finished merging
    RemoteBatchApplied(MergeReport),
}

impl DocumentEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DocumentEvent::StructureChanged { .. } => "structure:changed",
            DocumentEvent::ContentChanged { .. } => "content:changed",
            DocumentEvent::FocusChanged { .. } => "focus:changed",
            DocumentEvent::SelectionChanged { .. } => "selection:changed",
            DocumentEvent::ZoomChanged { .. } => "zoom:changed",
            DocumentEvent::NodeTrashed(_) => "node:trashed",
            DocumentEvent::RemoteBatchApplied(_) => "remote:applied",
        }
    }

    /// True when the persisted text or sidecar may now be stale
    pub fn affects_persistence(&self) -> bool {
        matches!(
            self,
            DocumentEvent::StructureChanged { .. }
                | DocumentEvent::ContentChanged { .. }
                | DocumentEvent::RemoteBatchApplied(_)
        )
    }
}
