//! Simple undo/redo history for the editor state.

use crate::engine::EditorState;

#[derive(Debug, Default, Clone)]
pub struct History {
    pub undo_stack: Vec<EditorState>,
    pub redo_stack: Vec<EditorState>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Record the state as it was before a committed transaction.
    pub fn record_before_change(&mut self, before: EditorState) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
    }

    /// Undo into the provided state. Returns true if a change occurred.
    pub fn undo(&mut self, state: &mut EditorState) -> bool {
        if let Some(prev) = self.undo_stack.pop() {
            let next = std::mem::replace(state, prev);
            self.redo_stack.push(next);
            true
        } else {
            false
        }
    }

    /// Redo into the provided state. Returns true if a change occurred.
    pub fn redo(&mut self, state: &mut EditorState) -> bool {
        if let Some(next) = self.redo_stack.pop() {
            let prev = std::mem::replace(state, next);
            self.undo_stack.push(prev);
            true
        } else {
            false
        }
    }
}
