//! Per-node edit locks shared by every window viewing a document
//!
//! Only one owner (window/session) may edit a node's text at a time. Other
//! owners see the node as read-only until the holder releases it. All state
//! sits behind one mutex, so acquisition and release are strictly sequenced
//! per node: two owners can never both believe they hold the same lock.

use crate::error::{OutlineError, OutlineResult};
use crate::models::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identity of one window/session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(Uuid);

impl OwnerToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Map from node to the owner currently editing it
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<NodeId, OwnerToken>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant the lock if the node is free or already held by `owner`
    pub fn try_acquire(&self, node: NodeId, owner: OwnerToken) -> bool {
        let mut locks = self.locks.lock();
        match locks.get(&node) {
            Some(holder) if *holder != owner => {
                tracing::debug!("Lock on '{}' denied to {} (held by {})", node, owner, holder);
                false
            }
            _ => {
                locks.insert(node, owner);
                true
            }
        }
    }

    /// [`LockRegistry::try_acquire`] reporting refusal as [`OutlineError::LockDenied`]
    pub fn acquire(&self, node: NodeId, owner: OwnerToken) -> OutlineResult<()> {
        if self.try_acquire(node, owner) {
            Ok(())
        } else {
            Err(OutlineError::lock_denied(node))
        }
    }

    /// Clear the lock only if `owner` holds it; returns whether it did
    pub fn release(&self, node: NodeId, owner: OwnerToken) -> bool {
        let mut locks = self.locks.lock();
        if locks.get(&node) == Some(&owner) {
            locks.remove(&node);
            true
        } else {
            false
        }
    }

    /// Release every lock held by `owner` (window/session closing)
    pub fn release_all(&self, owner: OwnerToken) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, holder| *holder != owner);
        let released = before - locks.len();
        if released > 0 {
            tracing::debug!("Released {} lock(s) held by {}", released, owner);
        }
        released
    }

    /// Move `owner`'s editing lock onto `node`
    ///
    /// Acquires `node` first and only then drops every other lock `owner`
    /// holds. If `node` belongs to someone else nothing changes and `false` is
    /// returned, so the caller keeps its previous focus.
    pub fn transfer_focus(&self, node: NodeId, owner: OwnerToken) -> bool {
        let mut locks = self.locks.lock();
        if matches!(locks.get(&node), Some(holder) if *holder != owner) {
            return false;
        }
        locks.insert(node, owner);
        locks.retain(|id, holder| *holder != owner || *id == node);
        true
    }

    pub fn owner_of(&self, node: NodeId) -> Option<OwnerToken> {
        self.locks.lock().get(&node).copied()
    }

    /// True when the node is locked by an owner other than `owner`
    ///
    /// Editors should present such nodes as read-only.
    pub fn is_locked_for(&self, node: NodeId, owner: OwnerToken) -> bool {
        matches!(self.owner_of(node), Some(holder) if holder != owner)
    }

    /// True when `owner` could acquire the node right now
    pub fn can_acquire(&self, node: NodeId, owner: OwnerToken) -> bool {
        !self.is_locked_for(node, owner)
    }

    /// Nodes currently held by `owner`
    pub fn held_by(&self, owner: OwnerToken) -> Vec<NodeId> {
        self.locks
            .lock()
            .iter()
            .filter(|(_, holder)| **holder == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Drop locks on nodes that no longer exist
    pub fn forget(&self, node: NodeId) {
        self.locks.lock().remove(&node);
    }
}
