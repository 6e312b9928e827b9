//! Undo/Redo Engine
//!
//! One linear history per document, shared by every window. Each entry is an
//! [`UndoAction`]: the edits one command applied plus the view state (focus,
//! selection, cursor hint) before and after it. Composite commands record a
//! single action, so one undo reverses all of their sub-steps.
//!
//! The history only stores records; replaying them against the tree is the
//! document's job (see `Document::undo`).

use super::edits::TreeEdit;
use crate::models::NodeId;
use crate::services::OwnerToken;
use std::collections::VecDeque;

/// Focus, selection and cursor hint captured around a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub focus: Option<NodeId>,
    /// Owner whose focus this was
    pub owner: Option<OwnerToken>,
    /// Selected ids in document order
    pub selection: Vec<NodeId>,
    pub cursor_hint: Option<usize>,
}

/// One reversible command
#[derive(Debug, Clone)]
pub struct UndoAction {
    pub label: &'static str,
    pub(crate) edits: Vec<TreeEdit>,
    pub before: ViewState,
    pub after: ViewState,
}

impl UndoAction {
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Bounded undo stack plus redo stack
#[derive(Debug)]
pub struct UndoHistory {
    undo: VecDeque<UndoAction>,
    redo: Vec<UndoAction>,
    limit: usize,
}

impl UndoHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a freshly performed command; clears the redo stack
    pub fn record(&mut self, action: UndoAction) {
        self.redo.clear();
        self.push_undo(action);
    }

    /// Push onto the undo stack without touching redo (used by redo itself)
    pub(crate) fn push_undo(&mut self, action: UndoAction) {
        self.undo.push_back(action);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub(crate) fn push_redo(&mut self, action: UndoAction) {
        self.redo.push(action);
    }

    pub(crate) fn take_undo(&mut self) -> Option<UndoAction> {
        self.undo.pop_back()
    }

    pub(crate) fn take_redo(&mut self) -> Option<UndoAction> {
        self.redo.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the action `undo` would reverse
    pub fn undo_label(&self) -> Option<&'static str> {
        self.undo.back().map(|a| a.label)
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.redo.last().map(|a| a.label)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
