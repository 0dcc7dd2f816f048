//! Contract with the document engine that owns the tree, the selection and
//! the transaction model.
//!
//! The table menu never holds on to tree data between calls: it asks the
//! engine for a fresh snapshot through [`DocumentEngine::read`] and mutates
//! only inside [`DocumentEngine::update`]. [`EditorCore`](crate::EditorCore)
//! is the in-memory implementation used by the bindings and the tests.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::doc::{Doc, NodeKey};
use crate::host::ElementId;
use crate::ops::TableOp;
use crate::selection::Selection;

/// What a transaction sees: the tree plus the logical selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorState {
    pub doc: Doc,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl EditorState {
    /// The cell enclosing the anchor of a range selection. Table and node
    /// selections never resolve to a single cell.
    pub fn selected_cell(&self) -> Option<NodeKey> {
        let anchor = self.selection.as_ref()?.anchor()?;
        self.doc.enclosing_cell(anchor.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("editor state is locked by a transaction in progress")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type Listener = Rc<dyn Fn()>;

pub trait DocumentEngine {
    /// Run `f` against a consistent read-only snapshot.
    fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> Result<R, EngineError>;

    /// Run `f` inside one atomic, undoable transaction. Listeners fire after
    /// the transaction commits, never while `f` runs.
    fn update<R>(&self, f: impl FnOnce(&mut EditorState) -> R) -> Result<R, EngineError>;

    /// The editing surface's root element, once it is mounted.
    fn root_element(&self) -> Option<ElementId>;

    /// Live on-screen element for `key`; `None` when not rendered or detached.
    fn element_by_key(&self, key: NodeKey) -> Option<ElementId>;

    /// Fires after every transaction that changed the state.
    fn on_change(&self, listener: Listener) -> ListenerId;

    /// Fires whenever the selection changed.
    fn on_selection_change(&self, listener: Listener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);

    /// Ask the engine to run one of its built-in table primitives against
    /// `cell`. Returns whether the tree changed.
    fn dispatch_structural_command(&self, op: TableOp, cell: NodeKey) -> Result<bool, EngineError>;
}
