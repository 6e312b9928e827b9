//! Outliner Core Engine
//!
//! This crate provides the document engine behind a keyboard-driven outliner:
//! a tree of titled nodes edited through structural commands, with undo, edit
//! locks shared between windows, a plain-text persistence format and merging
//! of changes made elsewhere.
//!
//! # Architecture
//!
//! - **Arena tree**: nodes live in one id-keyed table, links are id lists
//! - **Reversible edits**: every command is a batch of invertible tree edits,
//!   recorded as one undo action
//! - **Shared state**: windows share one [`Document`] behind a mutex; each
//!   window owns a token that locks the node it edits
//! - **Text first**: the outline persists as indented `- ` bullets, with a
//!   JSON sidecar for collapse and task state
//!
//! # Modules
//!
//! - [`models`] - Node, NodeId, Subtree and sort indices
//! - [`tree`] - Arena tree and visible-row flattening
//! - [`codec`] - Text format parser/serializer and metadata sidecar
//! - [`document`] - Commands, selection, undo, trash and events
//! - [`services`] - Locks, sessions, persistence, autosave and remote sync
//! - [`config`] - Engine tunables
//! - [`logging`] - Tracing subscriber setup for hosts

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod tree;
pub mod utils;

// Re-export commonly used types
pub use codec::{OutlineCodec, OutlineMetadata, ParseAnomaly};
pub use config::EngineConfig;
pub use document::{CommandOutcome, CreatePosition, Document, DocumentEvent, SharedDocument};
pub use error::{OutlineError, OutlineResult};
pub use models::{Node, NodeId, Subtree, TaskState};
pub use services::{LockRegistry, OwnerToken, RemoteChange, Session};
pub use tree::{Tree, VisibleView};
pub use utils::PeriodKey;
