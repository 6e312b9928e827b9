//! Error types for the outline engine
//!
//! Every fallible operation in this crate returns [`OutlineError`]. User-facing
//! document commands swallow the "expected" failures (stale ids, refused locks)
//! and report [`crate::document::CommandOutcome::Unchanged`] instead, so these
//! errors mostly reach programmatic callers: explicit-id APIs, persistence and
//! configuration loading.

use crate::models::NodeId;
use thiserror::Error;

/// Errors that can occur while operating on an outline
///
/// # Examples
///
/// ```rust
/// use outliner_core::{NodeId, OutlineError};
///
/// let err = OutlineError::not_found(NodeId::new());
/// assert!(err.is_not_found());
///
/// let err = OutlineError::invalid_structure("node would become its own ancestor");
/// assert!(matches!(err, OutlineError::InvalidStructure { .. }));
/// ```
#[derive(Error, Debug)]
pub enum OutlineError {
    /// Attempted cycle creation or re-parenting an already-parented node
    ///
    /// Always raised before any mutation happens; the tree is unchanged.
    #[error("Invalid structure: {reason}")]
    InvalidStructure { reason: String },

    /// Referenced node does not exist (or is no longer attached to the tree)
    #[error("Node '{node_id}' does not exist")]
    NotFound { node_id: NodeId },

    /// Another owner holds the edit lock on this node
    #[error("Node '{node_id}' is locked by another session")]
    LockDenied { node_id: NodeId },

    /// Writing or reading persisted state failed
    ///
    /// In-memory state is never rolled back because of this error.
    #[error("Persistence failure: {context}")]
    PersistenceFailure {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A line of persisted text could not be interpreted
    ///
    /// The parser records these and keeps going; only strict parsing turns
    /// them into a hard error.
    #[error("Malformed outline text at line {line}: {reason}")]
    CodecParseAnomaly { line: usize, reason: String },

    /// Configuration value out of range or unreadable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metadata (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutlineError {
    /// Create an InvalidStructure error
    pub fn invalid_structure(reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(node_id: NodeId) -> Self {
        Self::NotFound { node_id }
    }

    /// Create a LockDenied error
    pub fn lock_denied(node_id: NodeId) -> Self {
        Self::LockDenied { node_id }
    }

    /// Create a PersistenceFailure without an underlying io error
    pub fn persistence(context: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            context: context.into(),
            source: None,
        }
    }

    /// Create a PersistenceFailure wrapping an io error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::PersistenceFailure {
            context: context.into(),
            source: Some(source),
        }
    }

    /// Create a CodecParseAnomaly error
    pub fn parse_anomaly(line: usize, reason: impl Into<String>) -> Self {
        Self::CodecParseAnomaly {
            line,
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_lock_denied(&self) -> bool {
        matches!(self, Self::LockDenied { .. })
    }

    pub fn is_invalid_structure(&self) -> bool {
        matches!(self, Self::InvalidStructure { .. })
    }
}

/// Convenience alias used throughout the crate
pub type OutlineResult<T> = Result<T, OutlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_structure_error() {
        let err = OutlineError::invalid_structure("cycle");
        assert!(err.is_invalid_structure());
        assert_eq!(format!("{}", err), "Invalid structure: cycle");
    }

    #[test]
    fn test_not_found_error() {
        let id = NodeId::new();
        let err = OutlineError::not_found(id);
        assert!(err.is_not_found());
        assert_eq!(format!("{}", err), format!("Node '{}' does not exist", id));
    }

    #[test]
    fn test_lock_denied_error() {
        let id = NodeId::new();
        let err = OutlineError::lock_denied(id);
        assert!(err.is_lock_denied());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_persistence_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = OutlineError::io("writing outline", io);
        assert_eq!(format!("{}", err), "Persistence failure: writing outline");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parse_anomaly_error() {
        let err = OutlineError::parse_anomaly(7, "orphaned body line");
        assert_eq!(
            format!("{}", err),
            "Malformed outline text at line 7: orphaned body line"
        );
    }
}
