//! Document Controller
//!
//! A [`Document`] owns one outline [`Tree`] together with the state every
//! window shares: zoom, selection, the undo history and a monotonic structure
//! version. Focus is kept per window ([`OwnerToken`]); structural commands act
//! for the *active* window, the one that last focused a node or was activated
//! with [`Document::activate`]. All mutation goes through it; nothing outside
//! this module touches child lists or parent links.
//!
//! # Architecture
//!
//! - **Commands** (`commands.rs`, `selection.rs`): validate against focus,
//!   selection and locks, then apply reversible edits through an edit batch
//! - **History** (`history.rs`): one undo action per command, replayed in
//!   reverse on undo
//! - **Events** (`events.rs`): broadcast after every change so windows and
//!   the autosave task can react
//! - **Trash** (`trash.rs`): every local structural deletion is handed to an
//!   injected [`TrashStore`]
//!
//! # Concurrency
//!
//! Windows in one process share a document as [`SharedDocument`]. Commands are
//! synchronous and never block on I/O; persistence and remote fetches live in
//! [`crate::services`] and only take the mutex for short snapshot/merge steps.
//!
//! # Examples
//!
//! ```rust
//! use outliner_core::document::Document;
//! use outliner_core::services::{LockRegistry, OwnerToken};
//! use std::sync::Arc;
//!
//! let locks = Arc::new(LockRegistry::new());
//! let (mut doc, _) = Document::from_text("- A\n- B\n- C\n", locks, Default::default());
//! let window = OwnerToken::new();
//!
//! let b = doc.visible_nodes()[1];
//! doc.focus_node(window, b).unwrap();
//! doc.indent().unwrap();
//! assert_eq!(doc.to_text(), "- A\n    - B\n\n- C\n\n");
//!
//! doc.undo();
//! assert_eq!(doc.to_text(), "- A\n\n- B\n\n- C\n\n");
//! ```

mod commands;
mod edits;
pub mod events;
pub mod history;
mod selection;
pub mod trash;

pub use commands::CreatePosition;
pub use events::DocumentEvent;
pub use history::{UndoAction, UndoHistory, ViewState};
pub use trash::{MemoryTrashStore, TrashEntry, TrashStore};

use crate::codec::{OutlineCodec, OutlineMetadata, ParseAnomaly};
use crate::config::EngineConfig;
use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId, TaskState};
use crate::services::{LockRegistry, OwnerToken, RemoteChange, RemoteNode, StoredOutline};
use crate::tree::{Tree, VisibleEntry, VisibleView};
use crate::utils::PeriodKey;
use edits::{EditBatch, TreeEdit};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A document shared by every window of one process
pub type SharedDocument = Arc<Mutex<Document>>;

/// Result of a user-facing command
///
/// `Unchanged` is the silent no-op: nothing focused, no preceding sibling,
/// lock held elsewhere, and so on. Nothing was recorded and the structure
/// version did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Unchanged,
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

/// The node a window is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub node: NodeId,
    pub owner: OwnerToken,
}

/// What a committed command does with focus
#[derive(Debug, Clone, Copy)]
pub(crate) enum FocusChange {
    Keep,
    To(NodeId),
    Clear,
}

/// Local changes not yet pushed to the remote store
#[derive(Debug, Default)]
struct Outbound {
    upserts: HashSet<NodeId>,
    deletions: HashSet<NodeId>,
}

pub struct Document {
    tree: Tree,
    codec: OutlineCodec,
    config: EngineConfig,
    locks: Arc<LockRegistry>,
    trash: Arc<dyn TrashStore>,
    events: broadcast::Sender<DocumentEvent>,
    history: UndoHistory,
    focus: HashMap<OwnerToken, NodeId>,
    active: Option<OwnerToken>,
    cursor_hint: Option<usize>,
    zoom: Option<NodeId>,
    zoom_placeholder: Option<NodeId>,
    selection: HashSet<NodeId>,
    structure_version: u64,
    applying_remote: bool,
    outbound: Outbound,
    period: Option<PeriodKey>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.len())
            .field("focus", &self.focus)
            .field("active", &self.active)
            .field("zoom", &self.zoom)
            .field("selection", &self.selection.len())
            .field("structure_version", &self.structure_version)
            .field("period", &self.period)
            .finish()
    }
}

impl Document {
    /// Wrap a tree with default configuration
    pub fn new(tree: Tree, locks: Arc<LockRegistry>) -> Self {
        Self::with_config(tree, locks, EngineConfig::default())
    }

    /// Wrap a tree; an empty tree gets one blank node
    pub fn with_config(tree: Tree, locks: Arc<LockRegistry>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let mut document = Self {
            tree,
            codec: OutlineCodec::from_config(&config),
            history: UndoHistory::new(config.undo_limit),
            config,
            locks,
            trash: Arc::new(MemoryTrashStore::new()),
            events,
            focus: HashMap::new(),
            active: None,
            cursor_hint: None,
            zoom: None,
            zoom_placeholder: None,
            selection: HashSet::new(),
            structure_version: 0,
            applying_remote: false,
            outbound: Outbound::default(),
            period: None,
        };
        if document.ensure_not_empty().is_some() {
            tracing::debug!("Empty outline seeded with a blank node");
        }
        document.tree.take_renumbered();
        document
    }

    /// Parse text into a document, returning the recovered anomalies
    pub fn from_text(
        text: &str,
        locks: Arc<LockRegistry>,
        config: EngineConfig,
    ) -> (Self, Vec<ParseAnomaly>) {
        let parsed = OutlineCodec::from_config(&config).parse(text);
        (Self::with_config(parsed.tree, locks, config), parsed.anomalies)
    }

    /// Rebuild a document from persisted text plus its optional sidecar
    pub fn from_stored(
        stored: &StoredOutline,
        locks: Arc<LockRegistry>,
        config: EngineConfig,
    ) -> (Self, Vec<ParseAnomaly>) {
        let parsed = OutlineCodec::from_config(&config).parse(&stored.text);
        let tree = match &stored.metadata {
            Some(metadata) => metadata.apply(&parsed.tree).unwrap_or(parsed.tree),
            None => parsed.tree,
        };
        tracing::info!("Loaded outline with {} node(s)", tree.len());
        (Self::with_config(tree, locks, config), parsed.anomalies)
    }

    pub fn with_trash(mut self, trash: Arc<dyn TrashStore>) -> Self {
        self.trash = trash;
        self
    }

    pub fn with_period(mut self, period: PeriodKey) -> Self {
        self.period = Some(period);
        self
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locks(&self) -> Arc<LockRegistry> {
        self.locks.clone()
    }

    pub fn period(&self) -> Option<&PeriodKey> {
        self.period.as_ref()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Incremented exactly once per structural mutation
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Serialize to the persisted text format
    pub fn to_text(&self) -> String {
        self.codec.serialize(&self.tree)
    }

    /// Text plus sidecar, ready for a [`crate::services::DocumentStore`]
    pub fn snapshot(&self) -> StoredOutline {
        StoredOutline {
            text: self.to_text(),
            metadata: Some(OutlineMetadata::capture(&self.tree)),
        }
    }

    // ----- view -----

    pub fn zoom(&self) -> Option<NodeId> {
        self.zoom
    }

    /// Node the current view is rooted at
    pub fn view_root(&self) -> NodeId {
        self.zoom.unwrap_or(self.tree.root_id())
    }

    /// Visible order of the shared view: current zoom, persisted collapse flags
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.tree
            .flatten_visible(self.view_root(), &self.tree.persisted_collapse_set())
    }

    /// Visible rows for a window's own view
    pub fn visible_in(&self, view: &VisibleView) -> Vec<VisibleEntry> {
        self.tree.visible_in(view)
    }

    /// A fresh window view seeded from persisted collapse flags
    pub fn default_view(&self) -> VisibleView {
        VisibleView::seeded(&self.tree, self.zoom)
    }

    // ----- focus -----

    /// Focus of the active window
    pub fn focus(&self) -> Option<Focus> {
        let owner = self.active?;
        self.focus_of(owner).map(|node| Focus { node, owner })
    }

    pub fn focused_node(&self) -> Option<NodeId> {
        self.focus().map(|f| f.node)
    }

    /// Node `owner` is editing, if any
    pub fn focus_of(&self, owner: OwnerToken) -> Option<NodeId> {
        self.focus.get(&owner).copied()
    }

    /// Window the structural commands currently act for
    pub fn active_owner(&self) -> Option<OwnerToken> {
        self.active
    }

    /// Make `owner` the window structural commands act for
    pub fn activate(&mut self, owner: OwnerToken) {
        self.active = Some(owner);
    }

    /// True when some window has `id` focused or holds its lock
    pub fn is_being_edited(&self, id: NodeId) -> bool {
        self.focus.values().any(|node| *node == id) || self.locks.owner_of(id).is_some()
    }

    /// Caret position suggested by the last delete/merge, in characters
    pub fn cursor_hint(&self) -> Option<usize> {
        self.cursor_hint
    }

    /// Give `owner` focus on `id`, taking its edit lock, and make it the
    /// active window
    ///
    /// The new lock is acquired before the old one is released; if another
    /// owner holds `id` nothing changes and `LockDenied` is returned.
    pub fn focus_node(&mut self, owner: OwnerToken, id: NodeId) -> OutlineResult<()> {
        if self.tree.find_by_id(id).is_none() || id == self.tree.root_id() {
            return Err(OutlineError::not_found(id));
        }
        if !self.locks.transfer_focus(id, owner) {
            return Err(OutlineError::lock_denied(id));
        }
        let previous = self.focus.insert(owner, id);
        self.active = Some(owner);
        self.cursor_hint = None;
        if previous != Some(id) {
            self.emit(DocumentEvent::FocusChanged {
                owner,
                node_id: Some(id),
            });
        }
        Ok(())
    }

    /// Drop `owner`'s focus and release the lock on the node it was editing
    pub fn blur(&mut self, owner: OwnerToken) {
        if let Some(node) = self.focus.remove(&owner) {
            self.locks.release(node, owner);
            self.emit(DocumentEvent::FocusChanged {
                owner,
                node_id: None,
            });
        }
    }

    /// Window/session closing: blur and release every lock it held
    pub fn release_owner(&mut self, owner: OwnerToken) {
        self.blur(owner);
        self.locks.release_all(owner);
        if self.active == Some(owner) {
            self.active = None;
        }
    }

    /// True when `owner` may edit the node's text
    pub fn is_editable_by(&self, id: NodeId, owner: OwnerToken) -> bool {
        !self.locks.is_locked_for(id, owner)
    }

    /// True when the active window could move its focus to `id`
    pub(crate) fn can_focus(&self, id: NodeId) -> bool {
        match self.active {
            Some(owner) => self.locks.can_acquire(id, owner),
            None => true,
        }
    }

    pub(crate) fn move_focus(&mut self, target: Option<NodeId>) {
        self.move_focus_for(self.active, target);
    }

    fn move_focus_for(&mut self, owner: Option<OwnerToken>, target: Option<NodeId>) {
        let Some(owner) = owner else {
            return;
        };
        let previous = self.focus_of(owner);
        match target {
            Some(id) if self.tree.find_by_id(id).is_some() => {
                if self.locks.transfer_focus(id, owner) {
                    self.focus.insert(owner, id);
                } else {
                    tracing::debug!("Focus move to '{}' refused: locked elsewhere", id);
                    if previous.map_or(false, |p| self.tree.find_by_id(p).is_none()) {
                        self.clear_focus(owner);
                    }
                }
            }
            _ => self.clear_focus(owner),
        }
        let current = self.focus_of(owner);
        if current != previous {
            self.emit(DocumentEvent::FocusChanged {
                owner,
                node_id: current,
            });
        }
    }

    fn clear_focus(&mut self, owner: OwnerToken) {
        if let Some(node) = self.focus.remove(&owner) {
            self.locks.release(node, owner);
        }
    }

    /// Owners whose focused node is in `nodes`
    fn owners_focusing(&self, nodes: &HashSet<NodeId>) -> Vec<OwnerToken> {
        self.focus
            .iter()
            .filter(|(_, node)| nodes.contains(*node))
            .map(|(owner, _)| *owner)
            .collect()
    }

    /// Clear the focus of every window whose node is no longer attached
    fn drop_stale_focus(&mut self) {
        let stale: Vec<OwnerToken> = self
            .focus
            .iter()
            .filter(|(_, node)| !self.tree.is_attached(**node))
            .map(|(owner, _)| *owner)
            .collect();
        for owner in stale {
            self.move_focus_for(Some(owner), None);
        }
    }

    // ----- content editing -----

    fn check_editable(&self, owner: OwnerToken, id: NodeId) -> OutlineResult<()> {
        if self.tree.find_by_id(id).is_none() || id == self.tree.root_id() {
            return Err(OutlineError::not_found(id));
        }
        if self.locks.is_locked_for(id, owner) {
            return Err(OutlineError::lock_denied(id));
        }
        Ok(())
    }

    /// Replace a node's title (keystroke-level edit, not undoable)
    pub fn set_title(&mut self, owner: OwnerToken, id: NodeId, title: impl Into<String>) -> OutlineResult<()> {
        self.check_editable(owner, id)?;
        self.tree.node_mut(id)?.title = title.into();
        self.mark_dirty(id);
        self.emit(DocumentEvent::ContentChanged { node_id: id });
        Ok(())
    }

    /// Replace a node's body (keystroke-level edit, not undoable)
    pub fn set_body(&mut self, owner: OwnerToken, id: NodeId, body: impl Into<String>) -> OutlineResult<()> {
        self.check_editable(owner, id)?;
        self.tree.node_mut(id)?.body = body.into();
        self.mark_dirty(id);
        self.emit(DocumentEvent::ContentChanged { node_id: id });
        Ok(())
    }

    /// Cycle plain → open task → completed task → plain
    pub fn toggle_task(&mut self, owner: OwnerToken, id: NodeId) -> OutlineResult<CommandOutcome> {
        let next = self.tree.node(id)?.task.cycle();
        self.set_task(owner, id, next)
    }

    pub fn set_task(&mut self, owner: OwnerToken, id: NodeId, task: TaskState) -> OutlineResult<CommandOutcome> {
        self.check_editable(owner, id)?;
        let before = self.view_state();
        let batch = self.mutate(|tree, batch| batch.set_task(tree, id, task))?;
        Ok(self.commit("Toggle task", batch, before, FocusChange::Keep, self.cursor_hint))
    }

    /// Persist a node's default collapse flag (presentation state, not undoable)
    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> OutlineResult<CommandOutcome> {
        if self.tree.find_by_id(id).is_none() {
            return Err(OutlineError::not_found(id));
        }
        let node = self.tree.node_mut(id)?;
        if node.collapsed == collapsed {
            return Ok(CommandOutcome::Unchanged);
        }
        node.collapsed = collapsed;
        self.mark_dirty(id);
        self.bump_version();
        Ok(CommandOutcome::Applied)
    }

    // ----- zoom -----

    /// Display `id` as if it were the root
    ///
    /// A childless target gets one blank child so there is always a row to
    /// edit; that placeholder is removed again on zoom-out if it stayed empty.
    /// Returns the first child of the new view.
    pub fn zoom_in(&mut self, id: NodeId) -> OutlineResult<NodeId> {
        if self.tree.find_by_id(id).is_none() || id == self.tree.root_id() {
            return Err(OutlineError::not_found(id));
        }
        if self.zoom != Some(id) {
            if let Some(placeholder) = self.zoom_placeholder.take() {
                if placeholder != id && !self.tree.is_ancestor(placeholder, id) {
                    self.delete_if_empty(placeholder);
                }
            }
        }
        if !self.tree.node(id)?.has_children() {
            let placeholder = self.tree.add_detached(Node::new())?;
            self.tree.insert_child(id, placeholder, None)?;
            self.mark_dirty(placeholder);
            self.mark_renumbered();
            self.zoom_placeholder = Some(placeholder);
            self.bump_version();
        }
        self.set_zoom(Some(id));
        self.tree
            .children_of(id)
            .first()
            .copied()
            .ok_or_else(|| OutlineError::not_found(id))
    }

    /// Zoom out one level; returns the new zoom root (`None` when unzoomed)
    pub fn zoom_out(&mut self) -> Option<NodeId> {
        let current = self.zoom?;
        if let Some(placeholder) = self.zoom_placeholder.take() {
            self.delete_if_empty(placeholder);
        }
        let parent = self
            .tree
            .parent_of(current)
            .filter(|p| *p != self.tree.root_id());
        self.set_zoom(parent);
        parent
    }

    fn set_zoom(&mut self, zoom: Option<NodeId>) {
        if self.zoom != zoom {
            self.zoom = zoom;
            self.clear_selection();
            self.emit(DocumentEvent::ZoomChanged { node_id: zoom });
        }
    }

    /// Remove `id` if it and all its descendants carry no text
    ///
    /// Cleanup for auto-created nodes: no undo entry, nothing trashed. Never
    /// removes the last node of the document.
    pub fn delete_if_empty(&mut self, id: NodeId) -> bool {
        if self.tree.find_by_id(id).is_none() || id == self.tree.root_id() {
            return false;
        }
        let Ok(snapshot) = self.tree.deep_copy(id) else {
            return false;
        };
        if !snapshot.is_blank() || snapshot.node_count() >= self.tree.len() {
            return false;
        }
        self.remove_untracked(id);
        self.bump_version();
        tracing::debug!("Removed empty node '{}'", id);
        true
    }

    /// Structurally remove a subtree outside the undo history
    ///
    /// Focus inside the subtree moves to the previous visible survivor, else
    /// the next, else nowhere. Zoom inside it moves up to the removed node's
    /// parent.
    pub(crate) fn remove_untracked(&mut self, id: NodeId) -> bool {
        let Ok(snapshot) = self.tree.deep_copy(id) else {
            return false;
        };
        let removed: HashSet<NodeId> = snapshot.ids().into_iter().collect();
        let displaced = self.owners_focusing(&removed);
        let fallback = if displaced.is_empty() {
            None
        } else {
            self.nearest_visible_outside(&removed)
        };
        let parent = self.tree.parent_of(id);

        if self.tree.purge(id).is_err() {
            return false;
        }
        for gone in &removed {
            self.record_deletion(*gone);
            self.selection.remove(gone);
        }
        for owner in displaced {
            self.move_focus_for(Some(owner), fallback);
        }
        for gone in &removed {
            self.locks.forget(*gone);
        }
        if self.zoom.map_or(false, |z| removed.contains(&z)) {
            let up = parent.filter(|p| *p != self.tree.root_id());
            self.set_zoom(up);
        }
        if self.zoom_placeholder.map_or(false, |p| removed.contains(&p)) {
            self.zoom_placeholder = None;
        }
        true
    }

    /// Previous visible node not in `excluded`, else the next one
    fn nearest_visible_outside(&self, excluded: &HashSet<NodeId>) -> Option<NodeId> {
        let visible = self.visible_nodes();
        let first = visible.iter().position(|id| excluded.contains(id));
        let before = first.and_then(|p| visible[..p].iter().rev().find(|id| !excluded.contains(id)));
        before
            .or_else(|| visible.iter().find(|id| !excluded.contains(id)))
            .copied()
    }

    // ----- undo / redo -----

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reverse the most recent command, restoring its prior focus/selection
    pub fn undo(&mut self) -> CommandOutcome {
        let Some(mut action) = self.history.take_undo() else {
            return CommandOutcome::Unchanged;
        };
        let mut applied = Vec::with_capacity(action.edits.len());
        for edit in action.edits.iter().rev() {
            match edit.inverse().apply(&mut self.tree) {
                Ok(done) => applied.push(done),
                Err(e) => tracing::debug!("Skipping undo step of '{}': {}", action.label, e),
            }
        }
        self.settle(&applied);
        action.edits = applied.iter().rev().map(TreeEdit::inverse).collect();
        self.restore_view(&action.before);
        tracing::debug!("Undid '{}'", action.label);
        self.history.push_redo(action);
        self.after_replay();
        CommandOutcome::Applied
    }

    /// Re-apply the most recently undone command
    pub fn redo(&mut self) -> CommandOutcome {
        let Some(mut action) = self.history.take_redo() else {
            return CommandOutcome::Unchanged;
        };
        let mut applied = Vec::with_capacity(action.edits.len());
        for edit in &action.edits {
            match edit.apply(&mut self.tree) {
                Ok(done) => applied.push(done),
                Err(e) => tracing::debug!("Skipping redo step of '{}': {}", action.label, e),
            }
        }
        self.settle(&applied);
        action.edits = applied;
        self.restore_view(&action.after);
        tracing::debug!("Redid '{}'", action.label);
        self.history.push_undo(action);
        self.after_replay();
        CommandOutcome::Applied
    }

    fn after_replay(&mut self) {
        self.drop_stale_focus();
        self.ensure_not_empty();
        self.fix_zoom();
        self.bump_version();
    }

    pub(crate) fn view_state(&self) -> ViewState {
        ViewState {
            focus: self.focused_node(),
            owner: self.active,
            selection: self.selection(),
            cursor_hint: self.cursor_hint,
        }
    }

    fn restore_view(&mut self, state: &ViewState) {
        let owner = self.active.or(state.owner);
        self.move_focus_for(owner, state.focus);
        self.cursor_hint = state.cursor_hint;
        let selection: HashSet<NodeId> = state
            .selection
            .iter()
            .copied()
            .filter(|id| self.tree.is_attached(*id))
            .collect();
        if selection != self.selection {
            self.selection = selection;
            self.emit(DocumentEvent::SelectionChanged {
                count: self.selection.len(),
            });
        }
    }

    // ----- command plumbing -----

    /// Run `f` against the tree, rolling back everything it applied on error
    pub(crate) fn mutate<F>(&mut self, f: F) -> OutlineResult<EditBatch>
    where
        F: FnOnce(&mut Tree, &mut EditBatch) -> OutlineResult<()>,
    {
        let mut batch = EditBatch::new();
        if let Err(e) = f(&mut self.tree, &mut batch) {
            batch.rollback(&mut self.tree);
            return Err(e);
        }
        Ok(batch)
    }

    /// Record a successful command: side effects, focus, one undo action and
    /// one version bump
    pub(crate) fn commit(
        &mut self,
        label: &'static str,
        batch: EditBatch,
        before: ViewState,
        focus: FocusChange,
        cursor_hint: Option<usize>,
    ) -> CommandOutcome {
        if batch.is_empty() {
            return CommandOutcome::Unchanged;
        }
        let edits = batch.into_edits();
        self.settle(&edits);
        match focus {
            FocusChange::Keep => {}
            FocusChange::To(id) => self.move_focus(Some(id)),
            FocusChange::Clear => self.move_focus(None),
        }
        self.drop_stale_focus();
        self.cursor_hint = cursor_hint;
        self.prune_selection();
        self.fix_zoom();
        let after = self.view_state();
        tracing::debug!("{} ({} edit(s))", label, edits.len());
        self.history.record(UndoAction {
            label,
            edits,
            before,
            after,
        });
        self.bump_version();
        CommandOutcome::Applied
    }

    /// Side effects of applied edits: trash, outbound tracking, stale locks
    fn settle(&mut self, edits: &[TreeEdit]) {
        for edit in edits {
            match edit {
                TreeEdit::Remove {
                    subtree, via_trash, ..
                } => {
                    for id in subtree.ids() {
                        self.record_deletion(id);
                        if !self.focus.values().any(|node| *node == id) {
                            self.locks.forget(id);
                        }
                    }
                    if *via_trash {
                        let entry = TrashEntry::from_subtree(subtree.clone(), self.period.clone());
                        self.trash.put(entry.clone());
                        self.emit(DocumentEvent::NodeTrashed(entry));
                    }
                }
                TreeEdit::Insert {
                    subtree, via_trash, ..
                } => {
                    if *via_trash {
                        self.trash.take(subtree.id());
                    }
                }
                _ => {}
            }
            for id in edit.touched() {
                self.mark_dirty(id);
            }
        }
        self.mark_renumbered();
    }

    /// Queue siblings renumbered by a sort-index rebalance for sync
    pub(crate) fn mark_renumbered(&mut self) {
        for id in self.tree.take_renumbered() {
            if self.tree.is_attached(id) {
                self.mark_dirty(id);
            }
        }
    }

    pub(crate) fn bump_version(&mut self) {
        self.structure_version += 1;
        self.emit(DocumentEvent::StructureChanged {
            version: self.structure_version,
        });
    }

    pub(crate) fn emit(&self, event: DocumentEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Insert a blank top-level node if the document has none
    ///
    /// Not recorded in the undo history.
    pub(crate) fn ensure_not_empty(&mut self) -> Option<NodeId> {
        if !self.tree.is_empty() {
            return None;
        }
        let id = self.tree.add_detached(Node::new()).ok()?;
        self.tree.insert_child(self.tree.root_id(), id, None).ok()?;
        self.mark_dirty(id);
        self.mark_renumbered();
        Some(id)
    }

    /// Drop a zoom whose root is no longer attached
    pub(crate) fn fix_zoom(&mut self) {
        if let Some(zoom) = self.zoom {
            if !self.tree.is_attached(zoom) {
                self.set_zoom(None);
            }
        }
        if let Some(placeholder) = self.zoom_placeholder {
            if !self.tree.is_attached(placeholder) {
                self.zoom_placeholder = None;
            }
        }
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    // ----- trash -----

    pub fn trash_entries(&self) -> Vec<TrashEntry> {
        self.trash.list()
    }

    // ----- outbound sync -----

    pub(crate) fn set_applying_remote(&mut self, applying: bool) {
        self.applying_remote = applying;
    }

    pub fn is_applying_remote(&self) -> bool {
        self.applying_remote
    }

    fn mark_dirty(&mut self, id: NodeId) {
        if self.applying_remote {
            return;
        }
        self.outbound.deletions.remove(&id);
        self.outbound.upserts.insert(id);
        if let Some(node) = self.tree.get_mut(id) {
            node.touch();
        }
    }

    fn record_deletion(&mut self, id: NodeId) {
        if self.applying_remote {
            return;
        }
        self.outbound.upserts.remove(&id);
        self.outbound.deletions.insert(id);
    }

    pub fn has_outbound_changes(&self) -> bool {
        !self.outbound.upserts.is_empty() || !self.outbound.deletions.is_empty()
    }

    /// Drain local changes for the remote store: upserts in document order,
    /// then deletions
    pub fn take_outbound_changes(&mut self) -> Vec<RemoteChange> {
        let outbound = std::mem::take(&mut self.outbound);
        let mut changes: Vec<RemoteChange> = self
            .document_order(outbound.upserts)
            .into_iter()
            .filter_map(|id| RemoteNode::capture(&self.tree, id))
            .map(RemoteChange::Upsert)
            .collect();
        let mut deletions: Vec<NodeId> = outbound.deletions.into_iter().collect();
        deletions.sort();
        changes.extend(deletions.into_iter().map(|id| RemoteChange::Delete { id }));
        changes
    }

    /// Put back changes a failed push could not deliver
    ///
    /// Anything touched again since is already tracked and wins.
    pub fn requeue_outbound(&mut self, changes: Vec<RemoteChange>) {
        for change in changes {
            match change {
                RemoteChange::Upsert(node) => {
                    if !self.outbound.deletions.contains(&node.id) {
                        self.outbound.upserts.insert(node.id);
                    }
                }
                RemoteChange::Delete { id } => {
                    if !self.outbound.upserts.contains(&id) {
                        self.outbound.deletions.insert(id);
                    }
                }
            }
        }
    }

    /// Sort attached ids into full pre-order, dropping unknown ones
    pub(crate) fn document_order(&self, ids: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        let order: HashMap<NodeId, usize> = self
            .tree
            .descendants(self.tree.root_id())
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let mut out: Vec<NodeId> = ids.into_iter().filter(|id| order.contains_key(id)).collect();
        out.sort_by_key(|id| order[id]);
        out.dedup();
        out
    }
}


#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;
