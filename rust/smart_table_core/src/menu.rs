//! Table action menu: ordered entries, per-item enablement, dispatch.
//!
//! The controller is host-agnostic. It only needs a [`DocumentEngine`]; the
//! overlay renders its entries and forwards clicks.

use serde::Serialize;

use crate::doc::NodeKey;
use crate::engine::DocumentEngine;
use crate::ops::{self, Side, TableOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableAction {
    InsertRowAbove,
    InsertRowBelow,
    InsertColumnLeft,
    InsertColumnRight,
    DeleteColumn,
    DeleteRow,
    DeleteTable,
    ToggleRowHeader,
    ToggleColumnHeader,
}

impl TableAction {
    pub const ALL: [TableAction; 9] = [
        TableAction::InsertRowAbove,
        TableAction::InsertRowBelow,
        TableAction::InsertColumnLeft,
        TableAction::InsertColumnRight,
        TableAction::DeleteColumn,
        TableAction::DeleteRow,
        TableAction::DeleteTable,
        TableAction::ToggleRowHeader,
        TableAction::ToggleColumnHeader,
    ];

    /// Stable numeric id, 1-based, used in element ids and the bindings.
    pub fn id(self) -> u8 {
        match self {
            TableAction::InsertRowAbove => 1,
            TableAction::InsertRowBelow => 2,
            TableAction::InsertColumnLeft => 3,
            TableAction::InsertColumnRight => 4,
            TableAction::DeleteColumn => 5,
            TableAction::DeleteRow => 6,
            TableAction::DeleteTable => 7,
            TableAction::ToggleRowHeader => 8,
            TableAction::ToggleColumnHeader => 9,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            TableAction::InsertRowAbove => "Insert row above",
            TableAction::InsertRowBelow => "Insert row below",
            TableAction::InsertColumnLeft => "Insert column left",
            TableAction::InsertColumnRight => "Insert column right",
            TableAction::DeleteColumn => "Delete column",
            TableAction::DeleteRow => "Delete row",
            TableAction::DeleteTable => "Delete table",
            TableAction::ToggleRowHeader => "Toggle row header",
            TableAction::ToggleColumnHeader => "Toggle column header",
        }
    }

    pub fn test_id(self) -> &'static str {
        match self {
            TableAction::InsertRowAbove => "table-insert-row-above",
            TableAction::InsertRowBelow => "table-insert-row-below",
            TableAction::InsertColumnLeft => "table-insert-column-left",
            TableAction::InsertColumnRight => "table-insert-column-right",
            TableAction::DeleteColumn => "table-delete-column",
            TableAction::DeleteRow => "table-delete-row",
            TableAction::DeleteTable => "table-delete-table",
            TableAction::ToggleRowHeader => "table-toggle-row-header",
            TableAction::ToggleColumnHeader => "table-toggle-column-header",
        }
    }

    pub fn dom_id(self) -> String {
        format!("table-actions-{}", self.id())
    }

    pub fn op(self) -> TableOp {
        match self {
            TableAction::InsertRowAbove => TableOp::InsertRow(Side::Before),
            TableAction::InsertRowBelow => TableOp::InsertRow(Side::After),
            TableAction::InsertColumnLeft => TableOp::InsertColumn(Side::Before),
            TableAction::InsertColumnRight => TableOp::InsertColumn(Side::After),
            TableAction::DeleteColumn => TableOp::DeleteColumn,
            TableAction::DeleteRow => TableOp::DeleteRow,
            TableAction::DeleteTable => TableOp::DeleteTable,
            TableAction::ToggleRowHeader => TableOp::ToggleRowHeader,
            TableAction::ToggleColumnHeader => TableOp::ToggleColumnHeader,
        }
    }

    pub fn is_column_insert(self) -> bool {
        matches!(self, TableAction::InsertColumnLeft | TableAction::InsertColumnRight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub action: TableAction,
    pub id: u8,
    pub label: &'static str,
    pub test_id: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuEntry {
    Action(ActionDescriptor),
    Divider,
}

impl MenuEntry {
    pub fn descriptor(&self) -> Option<&ActionDescriptor> {
        match self {
            MenuEntry::Action(d) => Some(d),
            MenuEntry::Divider => None,
        }
    }
}

const LAYOUT: [Option<TableAction>; 12] = [
    Some(TableAction::InsertRowAbove),
    Some(TableAction::InsertRowBelow),
    None,
    Some(TableAction::InsertColumnLeft),
    Some(TableAction::InsertColumnRight),
    None,
    Some(TableAction::DeleteColumn),
    Some(TableAction::DeleteRow),
    Some(TableAction::DeleteTable),
    None,
    Some(TableAction::ToggleRowHeader),
    Some(TableAction::ToggleColumnHeader),
];

/// Menu contents for a table with `column_count` columns. An unknown count
/// disables the column inserts.
pub fn build_entries(column_count: Option<usize>, max_columns: usize) -> Vec<MenuEntry> {
    let can_insert_column = column_count.is_some_and(|n| n < max_columns);
    LAYOUT
        .iter()
        .map(|slot| match slot {
            Some(action) => MenuEntry::Action(ActionDescriptor {
                action: *action,
                id: action.id(),
                label: action.label(),
                test_id: action.test_id(),
                enabled: !action.is_column_insert() || can_insert_column,
            }),
            None => MenuEntry::Divider,
        })
        .collect()
}

/// Column count of the table owning `cell`; `None` when detached or when the
/// engine cannot be read.
pub fn column_count<E: DocumentEngine>(engine: &E, cell: NodeKey) -> Option<usize> {
    match engine.read(|state| state.doc.table_of(cell).map(|t| t.column_count())) {
        Ok(count) => count,
        Err(err) => {
            log::error!("could not read table shape for cell {cell}: {err}");
            None
        }
    }
}

pub fn render_html(entries: &[MenuEntry]) -> String {
    let mut out = String::new();
    out.push_str(concat!(
        "<div class=\"table-actions-dropdown\" id=\"table-actions\" ",
        "role=\"menu\" aria-label=\"Table actions\">\n",
    ));
    for entry in entries {
        match entry {
            MenuEntry::Divider => out.push_str("  <hr aria-orientation=\"horizontal\"/>\n"),
            MenuEntry::Action(d) => {
                let class = if d.enabled { "item" } else { "item-disabled" };
                let disabled = if d.enabled { "" } else { " disabled" };
                out.push_str(&format!(
                    concat!(
                        "  <button type=\"button\" class=\"{}\" id=\"{}\" role=\"menuitem\" ",
                        "aria-label=\"{}\" data-test-id=\"{}\"{}><span class=\"text\">{}</span></button>\n",
                    ),
                    class,
                    d.action.dom_id(),
                    html_escape::encode_double_quoted_attribute(d.label),
                    html_escape::encode_double_quoted_attribute(d.test_id),
                    disabled,
                    html_escape::encode_text(d.label),
                ));
            }
        }
    }
    out.push_str("</div>");
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    Open { cell: NodeKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Toggled,
    Escape,
    OutsideClick,
    CellChanged,
    Dispatched,
    Stale,
    Unmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The transaction ran and changed the tree.
    Applied,
    /// The transaction ran but left the tree as it was.
    Unchanged,
    /// The action is disabled for the current table shape.
    Disabled,
    /// The active cell is gone from the tree.
    Stale,
    NotOpen,
    Failed,
}

#[derive(Debug)]
pub struct ActionMenu {
    state: MenuState,
    max_columns: usize,
}

impl ActionMenu {
    pub fn new(max_columns: usize) -> Self {
        Self { state: MenuState::Closed, max_columns }
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Open { .. })
    }

    pub fn open_cell(&self) -> Option<NodeKey> {
        match self.state {
            MenuState::Open { cell } => Some(cell),
            MenuState::Closed => None,
        }
    }

    pub fn open(&mut self, cell: NodeKey) {
        log::debug!("table menu opened for cell {cell}");
        self.state = MenuState::Open { cell };
    }

    /// Open for `cell` when closed, close when open. Without a cell the menu
    /// can only close. Returns whether the menu is open afterwards.
    pub fn toggle(&mut self, cell: Option<NodeKey>) -> bool {
        match (self.state, cell) {
            (MenuState::Open { .. }, _) => {
                self.close(CloseReason::Toggled);
            }
            (MenuState::Closed, Some(cell)) => self.open(cell),
            (MenuState::Closed, None) => {}
        }
        self.is_open()
    }

    /// Returns whether the menu was open.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if !self.is_open() {
            return false;
        }
        log::debug!("table menu closed: {reason:?}");
        self.state = MenuState::Closed;
        true
    }

    /// Close when the tracked cell is no longer the one the menu opened for.
    pub fn on_cell_changed(&mut self, cell: Option<NodeKey>) -> bool {
        match self.state {
            MenuState::Open { cell: open } if Some(open) != cell => self.close(CloseReason::CellChanged),
            _ => false,
        }
    }

    /// Fresh entries for the cell the menu is open for; empty when closed.
    pub fn entries<E: DocumentEngine>(&self, engine: &E) -> Vec<MenuEntry> {
        match self.open_cell() {
            Some(cell) => build_entries(column_count(engine, cell), self.max_columns),
            None => Vec::new(),
        }
    }

    pub fn is_enabled<E: DocumentEngine>(&self, engine: &E, cell: NodeKey, action: TableAction) -> bool {
        if !action.is_column_insert() {
            return true;
        }
        column_count(engine, cell).is_some_and(|n| n < self.max_columns)
    }

    /// Run `action` against the cell the menu is open for. Enablement and
    /// attachment are checked again here since the tree may have moved on
    /// since the entries were built.
    pub fn invoke<E: DocumentEngine>(&mut self, engine: &E, action: TableAction) -> InvokeOutcome {
        let Some(cell) = self.open_cell() else {
            return InvokeOutcome::NotOpen;
        };
        match engine.read(|state| state.doc.is_attached(cell)) {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("ignoring {action:?}: cell {cell} is detached");
                self.close(CloseReason::Stale);
                return InvokeOutcome::Stale;
            }
            Err(err) => {
                log::error!("ignoring {action:?}: {err}");
                self.close(CloseReason::Stale);
                return InvokeOutcome::Failed;
            }
        }
        if !self.is_enabled(engine, cell, action) {
            log::debug!("ignoring disabled {action:?} on cell {cell}");
            return InvokeOutcome::Disabled;
        }

        let op = action.op();
        let result = if op.is_engine_native() {
            engine.dispatch_structural_command(op, cell)
        } else {
            engine.update(|state| match ops::apply(state, op, cell) {
                Ok(()) => true,
                Err(err) => {
                    log::debug!("{action:?} skipped: {err}");
                    false
                }
            })
        };
        self.close(CloseReason::Dispatched);
        match result {
            Ok(true) => InvokeOutcome::Applied,
            Ok(false) => InvokeOutcome::Unchanged,
            Err(err) => {
                log::error!("{action:?} failed: {err}");
                InvokeOutcome::Failed
            }
        }
    }
}
