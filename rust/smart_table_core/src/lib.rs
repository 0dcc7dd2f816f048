pub mod config;
pub mod doc;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod host;
pub mod menu;
pub mod mount;
pub mod ops;
pub mod overlay;
pub mod selection;
pub mod subscription;
pub mod tracker;

#[cfg(test)]
mod testing;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use doc::{Node, NodeKey};
use engine::{DocumentEngine, EngineError, Listener, ListenerId};
use history::History;
use host::ElementId;
use ops::TableOp;
use selection::Selection;

pub use config::OverlayConfig;
pub use engine::EditorState;
pub use error::{Error, Result};
pub use menu::{ActionMenu, InvokeOutcome, MenuEntry, TableAction};
pub use overlay::TableActionOverlay;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    reconcilers: Vec<(ListenerId, Listener)>,
    change: Vec<(ListenerId, Listener)>,
    selection: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    fn next(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    fn remove(&mut self, id: ListenerId) {
        self.reconcilers.retain(|(l, _)| *l != id);
        self.change.retain(|(l, _)| *l != id);
        self.selection.retain(|(l, _)| *l != id);
    }
}

fn snapshot(slot: &[(ListenerId, Listener)]) -> Vec<Listener> {
    slot.iter().map(|(_, l)| l.clone()).collect()
}

/// In-memory document engine: the tree, the selection, snapshot undo/redo
/// and the key to element map a renderer keeps current.
#[derive(Default)]
pub struct EditorCore {
    state: RefCell<EditorState>,
    history: RefCell<History>,
    root: Cell<Option<ElementId>>,
    elements: RefCell<HashMap<NodeKey, ElementId>>,
    listeners: RefCell<Listeners>,
}

impl fmt::Debug for EditorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorCore")
            .field("state", &self.state)
            .field("root", &self.root.get())
            .field("elements", &self.elements.borrow().len())
            .finish_non_exhaustive()
    }
}

impl EditorCore {
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut state: EditorState = serde_json::from_str(json)?;
        state.doc.validate()?;
        state.doc.repair_key_counter();
        let dangling = state.selection.as_ref().is_some_and(|sel| match sel {
            Selection::Range { anchor, focus } => {
                !state.doc.is_attached(anchor.key) || !state.doc.is_attached(focus.key)
            }
            Selection::Table { table, .. } => !state.doc.is_attached(*table),
            Selection::Node { keys } => keys.iter().any(|k| !state.doc.is_attached(*k)),
        });
        if dangling {
            log::debug!("dropping selection that points outside the loaded document");
            state.selection = None;
        }
        Ok(Self { state: RefCell::new(state), ..Self::default() })
    }

    pub fn to_json(&self) -> String {
        match self.read(serde_json::to_string) {
            Ok(Ok(json)) => json,
            Ok(Err(err)) => {
                log::error!("could not serialize editor state: {err}");
                "{}".to_string()
            }
            Err(err) => {
                log::error!("could not serialize editor state: {err}");
                "{}".to_string()
            }
        }
    }

    pub fn snapshot(&self) -> Result<EditorState, EngineError> {
        self.read(EditorState::clone)
    }

    // Document helpers
    pub fn insert_paragraph(&self, text: &str) -> Result<NodeKey, EngineError> {
        self.update(|s| s.doc.push_paragraph(text))
    }

    pub fn insert_table(&self, rows: usize, cols: usize) -> Result<NodeKey, EngineError> {
        self.insert_table_at(None, rows, cols)
    }

    pub fn insert_table_at(&self, at: Option<usize>, rows: usize, cols: usize) -> Result<NodeKey, EngineError> {
        self.update(|s| s.doc.insert_table(at, rows, cols))
    }

    /// Key of the cell at `row`/`col` of the `table`-th table.
    pub fn cell_key(&self, table: usize, row: usize, col: usize) -> Option<NodeKey> {
        self.read(|s| {
            let index = s.doc.nth_table_index(table)?;
            s.doc.table(index)?.cell(row, col).map(|c| c.key)
        })
        .ok()
        .flatten()
    }

    // Selection helpers
    pub fn set_selection(&self, selection: Option<Selection>) -> Result<(), EngineError> {
        self.update(|s| s.selection = selection)
    }

    /// Collapse the caret into a cell. `None` when there is no such cell.
    pub fn select_cell(&self, table: usize, row: usize, col: usize) -> Result<Option<NodeKey>, EngineError> {
        let Some(cell) = self.cell_key(table, row, col) else {
            return Ok(None);
        };
        self.set_selection(Some(Selection::caret(cell, 0)))?;
        Ok(Some(cell))
    }

    pub fn select_start(&self) -> Result<(), EngineError> {
        self.update(|s| s.selection = Some(selection::document_start(&mut s.doc)))
    }

    // Rendering hooks
    pub fn set_root_element(&self, root: Option<ElementId>) {
        self.root.set(root);
    }

    pub fn mount_element(&self, key: NodeKey, element: ElementId) {
        self.elements.borrow_mut().insert(key, element);
    }

    pub fn unmount_element(&self, key: NodeKey) -> Option<ElementId> {
        self.elements.borrow_mut().remove(&key)
    }

    /// Renderers run after every commit, before change listeners, so the
    /// element map is current by the time anyone reacts to the change.
    pub fn register_reconciler(&self, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next();
        listeners.reconcilers.push((id, listener));
        id
    }

    // History
    pub fn undo(&self) -> bool {
        self.step_history(History::undo)
    }

    pub fn redo(&self) -> bool {
        self.step_history(History::redo)
    }

    pub fn undo_depth(&self) -> usize {
        self.history.borrow().undo_stack.len()
    }

    pub fn clear_history(&self) {
        self.history.borrow_mut().clear();
    }

    fn step_history(&self, step: impl FnOnce(&mut History, &mut EditorState) -> bool) -> bool {
        let changed = match self.state.try_borrow_mut() {
            Ok(mut state) => step(&mut self.history.borrow_mut(), &mut state),
            Err(_) => {
                log::warn!("history step skipped: {}", EngineError::Busy);
                false
            }
        };
        if changed {
            self.commit(true);
        }
        changed
    }

    fn prune_elements(&self) {
        let Ok(state) = self.state.try_borrow() else {
            return;
        };
        self.elements.borrow_mut().retain(|key, _| state.doc.is_attached(*key));
    }

    fn commit(&self, selection_changed: bool) {
        self.prune_elements();
        let (reconcilers, change, selection) = {
            let listeners = self.listeners.borrow();
            (snapshot(&listeners.reconcilers), snapshot(&listeners.change), snapshot(&listeners.selection))
        };
        for listener in reconcilers.iter().chain(&change) {
            listener();
        }
        if selection_changed {
            for listener in &selection {
                listener();
            }
        }
    }
}

impl DocumentEngine for EditorCore {
    fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> Result<R, EngineError> {
        let state = self.state.try_borrow().map_err(|_| EngineError::Busy)?;
        Ok(f(&state))
    }

    fn update<R>(&self, f: impl FnOnce(&mut EditorState) -> R) -> Result<R, EngineError> {
        let (result, doc_changed, selection_changed) = {
            let mut state = self.state.try_borrow_mut().map_err(|_| EngineError::Busy)?;
            let before = state.clone();
            let result = f(&mut state);
            let doc_changed = state.doc != before.doc;
            let selection_changed = state.selection != before.selection;
            if doc_changed {
                self.history.borrow_mut().record_before_change(before);
            }
            (result, doc_changed, selection_changed)
        };
        if doc_changed || selection_changed {
            self.commit(selection_changed);
        }
        Ok(result)
    }

    fn root_element(&self) -> Option<ElementId> {
        self.root.get()
    }

    fn element_by_key(&self, key: NodeKey) -> Option<ElementId> {
        self.elements.borrow().get(&key).copied()
    }

    fn on_change(&self, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next();
        listeners.change.push((id, listener));
        id
    }

    fn on_selection_change(&self, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next();
        listeners.selection.push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(id);
    }

    fn dispatch_structural_command(&self, op: TableOp, cell: NodeKey) -> Result<bool, EngineError> {
        match self.update(|state| ops::apply(state, op, cell))? {
            Ok(()) => Ok(true),
            Err(err) => {
                log::debug!("{op:?} skipped: {err}");
                Ok(false)
            }
        }
    }
}

impl EditorCore {
    /// Number of root-level nodes; paragraphs and tables alike.
    pub fn node_count(&self) -> usize {
        self.read(|s| s.doc.nodes.len()).unwrap_or(0)
    }

    pub fn table_count(&self) -> usize {
        self.read(|s| s.doc.nodes.iter().filter(|n| matches!(n, Node::Table(_))).count()).unwrap_or(0)
    }

    /// Registered change and selection listeners, reconcilers excluded.
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.borrow();
        listeners.change.len() + listeners.selection.len()
    }
}
