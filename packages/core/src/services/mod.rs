//! Services
//!
//! Everything around a [`crate::document::Document`] that is not a command:
//!
//! - `LockRegistry` - per-node edit locks shared by all windows
//! - `Session` - one window's owner token and view
//! - `DocumentStore` / `FileStore` - loading and atomically saving outlines
//! - `Autosave` - debounced background saves driven by document events
//! - `RemoteSync` - pulling remote batches into the tree and pushing local
//!   changes back
//!
//! Services hold a [`crate::document::SharedDocument`] and take its lock only
//! for short snapshot or merge steps; all I/O happens outside it.

pub mod autosave;
pub mod lock_registry;
pub mod remote_merge;
pub mod remote_sync;
pub mod session;
pub mod store;

pub use autosave::{Autosave, AutosaveWatcher};
pub use lock_registry::{LockRegistry, OwnerToken};
pub use remote_merge::{MergeReport, RemoteChange, RemoteNode};
pub use remote_sync::{RemoteSource, RemoteSync};
pub use session::Session;
pub use store::{DocumentStore, FileStore, StoredOutline};
