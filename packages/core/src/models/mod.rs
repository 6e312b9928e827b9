//! Data Models
//!
//! - `Node` / `NodeId` - the outline item and its stable identity
//! - `Subtree` - owned deep copy used for undo, trash and clipboard
//! - `SortIndexCalculator` - sparse sibling ordering keys

mod node;
mod sort_index;

pub use node::{Node, NodeId, Subtree, TaskState};
pub use sort_index::{SortIndexCalculator, DEFAULT_SORT_INDEX_STEP, MAX_SORT_INDEX_STEP};
