//! Editing sessions
//!
//! Each window (or other editor surface) gets a [`Session`] with its own
//! [`OwnerToken`]. Sessions share one document and one lock registry, but each
//! keeps its own focus; a session's commands activate it on the document and
//! run against its focus under a single lock acquisition. When a session is
//! dropped its focus and every lock it held are released, so a closed window
//! never leaves nodes read-only for the others.

use crate::document::{CommandOutcome, Document, SharedDocument};
use crate::error::OutlineResult;
use crate::models::NodeId;
use crate::services::OwnerToken;
use crate::tree::VisibleView;

pub struct Session {
    owner: OwnerToken,
    document: SharedDocument,
    view: VisibleView,
}

impl Session {
    /// Open a session on a shared document with a fresh owner token and a
    /// view seeded from the persisted collapse flags
    pub fn open(document: SharedDocument) -> Self {
        let view = document.lock().default_view();
        let owner = OwnerToken::new();
        tracing::debug!("Opened session {}", owner);
        Self {
            owner,
            document,
            view,
        }
    }

    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// This window's collapse/zoom view, independent of other windows
    pub fn view(&self) -> &VisibleView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut VisibleView {
        &mut self.view
    }

    /// Run `f` with this session as the document's active window
    fn run<T>(&self, f: impl FnOnce(&mut Document) -> T) -> T {
        let mut document = self.document.lock();
        document.activate(self.owner);
        f(&mut *document)
    }

    /// Focus `id` for this session, taking its edit lock
    pub fn focus(&self, id: NodeId) -> OutlineResult<()> {
        self.document.lock().focus_node(self.owner, id)
    }

    /// Node this session is editing
    pub fn focused(&self) -> Option<NodeId> {
        self.document.lock().focus_of(self.owner)
    }

    pub fn blur(&self) {
        self.document.lock().blur(self.owner);
    }

    /// True when another session is editing `id`
    pub fn is_read_only(&self, id: NodeId) -> bool {
        !self.document.lock().is_editable_by(id, self.owner)
    }

    pub fn set_title(&self, id: NodeId, title: impl Into<String>) -> OutlineResult<()> {
        self.document.lock().set_title(self.owner, id, title)
    }

    pub fn set_body(&self, id: NodeId, body: impl Into<String>) -> OutlineResult<()> {
        self.document.lock().set_body(self.owner, id, body)
    }

    pub fn toggle_task(&self, id: NodeId) -> OutlineResult<CommandOutcome> {
        self.run(|doc| doc.toggle_task(self.owner, id))
    }

    pub fn create_sibling_below(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::create_sibling_below)
    }

    pub fn create_sibling_above(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::create_sibling_above)
    }

    pub fn create_child(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::create_child)
    }

    pub fn indent(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::indent)
    }

    /// Outdent, never past this window's own zoom root
    pub fn outdent(&self) -> OutlineResult<CommandOutcome> {
        let boundary = self.view.zoom;
        self.run(|doc| doc.outdent_within(boundary))
    }

    pub fn move_up(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::move_up)
    }

    pub fn move_down(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::move_down)
    }

    pub fn delete_focused(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::delete_focused)
    }

    pub fn delete_with_descendants(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::delete_with_descendants)
    }

    pub fn merge_with_previous(&self) -> OutlineResult<CommandOutcome> {
        self.run(Document::merge_with_previous)
    }

    /// Undo the document's most recent command; focus is restored for this
    /// session
    pub fn undo(&self) -> CommandOutcome {
        self.run(Document::undo)
    }

    pub fn redo(&self) -> CommandOutcome {
        self.run(Document::redo)
    }

    /// Explicit close; same as dropping the session
    pub fn close(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.document.lock().release_owner(self.owner);
        tracing::debug!("Closed session {}", self.owner);
    }
}
