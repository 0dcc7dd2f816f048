//! Which table cell holds the caret, and which element paints it.

use crate::doc::NodeKey;
use crate::engine::DocumentEngine;
use crate::host::{ElementId, HostSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackedCell {
    #[default]
    None,
    Active { cell: NodeKey, element: ElementId },
}

impl TrackedCell {
    pub fn cell(&self) -> Option<NodeKey> {
        match self {
            TrackedCell::Active { cell, .. } => Some(*cell),
            TrackedCell::None => None,
        }
    }

    pub fn element(&self) -> Option<ElementId> {
        match self {
            TrackedCell::Active { element, .. } => Some(*element),
            TrackedCell::None => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TrackedCell::Active { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: TrackedCell,
    pub current: TrackedCell,
}

impl Transition {
    /// The cell identity changed, as opposed to only its element being
    /// re-rendered.
    pub fn cell_changed(&self) -> bool {
        self.previous.cell() != self.current.cell()
    }
}

#[derive(Debug, Default)]
pub struct SelectionTracker {
    current: TrackedCell,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> TrackedCell {
        self.current
    }

    /// Derive the tracked cell from the engine's selection and the host's
    /// rendered elements. Anything that does not resolve cleanly is `None`.
    pub fn resolve<E: DocumentEngine, H: HostSurface>(engine: &E, host: &H) -> TrackedCell {
        if !host.has_native_selection() {
            return TrackedCell::None;
        }
        let Some(root) = engine.root_element() else {
            return TrackedCell::None;
        };
        let cell = match engine.read(|state| state.selected_cell()) {
            Ok(Some(cell)) => cell,
            Ok(None) => return TrackedCell::None,
            Err(err) => {
                log::warn!("could not read selection: {err}");
                return TrackedCell::None;
            }
        };
        match engine.element_by_key(cell) {
            Some(element) if host.contains(root, element) => TrackedCell::Active { cell, element },
            Some(element) => {
                log::debug!("cell {cell} element {element} is outside the editing root");
                TrackedCell::None
            }
            None => TrackedCell::None,
        }
    }

    /// Re-resolve and report the change, if any.
    pub fn refresh<E: DocumentEngine, H: HostSurface>(&mut self, engine: &E, host: &H) -> Option<Transition> {
        self.set(Self::resolve(engine, host))
    }

    pub fn reset(&mut self) -> Option<Transition> {
        self.set(TrackedCell::None)
    }

    fn set(&mut self, next: TrackedCell) -> Option<Transition> {
        if next == self.current {
            return None;
        }
        let transition = Transition { previous: self.current, current: next };
        log::debug!("tracked cell {:?} -> {:?}", transition.previous, transition.current);
        self.current = next;
        Some(transition)
    }
}
