//! Structural table operations.
//!
//! Every function here runs against the mutable [`EditorState`] handed out by
//! a [`DocumentEngine::update`](crate::engine::DocumentEngine::update)
//! transaction. Each one first re-resolves the active cell; a cell that is no
//! longer in the tree yields [`TableOpError::Detached`] and leaves the state
//! untouched. Rows stay the same length after every operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::doc::{CellPath, Doc, HeaderState, NodeKey, Table, TableCell, TableRow};
use crate::engine::EditorState;
use crate::selection::{document_start, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableOp {
    InsertRow(Side),
    InsertColumn(Side),
    DeleteRow,
    DeleteColumn,
    DeleteTable,
    ToggleRowHeader,
    ToggleColumnHeader,
}

impl TableOp {
    /// Row and column inserts/deletes, the primitives document engines
    /// usually provide themselves.
    pub fn is_engine_native(self) -> bool {
        matches!(
            self,
            TableOp::InsertRow(_) | TableOp::InsertColumn(_) | TableOp::DeleteRow | TableOp::DeleteColumn
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableOpError {
    #[error("cell {0} is not attached to the document")]
    Detached(NodeKey),
}

pub fn apply(state: &mut EditorState, op: TableOp, cell: NodeKey) -> Result<(), TableOpError> {
    match op {
        TableOp::InsertRow(side) => insert_row(state, cell, side),
        TableOp::InsertColumn(side) => insert_column(state, cell, side),
        TableOp::DeleteRow => delete_row(state, cell),
        TableOp::DeleteColumn => delete_column(state, cell),
        TableOp::DeleteTable => delete_table(state, cell),
        TableOp::ToggleRowHeader => toggle_row_header(state, cell),
        TableOp::ToggleColumnHeader => toggle_column_header(state, cell),
    }
}

fn resolve(doc: &Doc, cell: NodeKey) -> Result<CellPath, TableOpError> {
    doc.cell_path(cell).ok_or(TableOpError::Detached(cell))
}

fn table_mut(doc: &mut Doc, path: CellPath, cell: NodeKey) -> Result<&mut Table, TableOpError> {
    doc.table_mut(path.table).ok_or(TableOpError::Detached(cell))
}

fn place_caret(state: &mut EditorState, key: Option<NodeKey>) {
    state.selection = match key {
        Some(key) => Some(Selection::caret(key, 0)),
        None => Some(document_start(&mut state.doc)),
    };
}

/// New row next to the active cell's row. New cells carry the column-header
/// flag of the cell they line up with so column headers stay uniform.
pub fn insert_row(state: &mut EditorState, cell: NodeKey, side: Side) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let headers: Vec<HeaderState> = state
        .doc
        .table(path.table)
        .and_then(|t| t.rows.get(path.row))
        .map(|r| r.cells.iter().map(|c| HeaderState { row: false, column: c.header.column }).collect())
        .ok_or(TableOpError::Detached(cell))?;

    let doc = &mut state.doc;
    let row_key = doc.new_key();
    let cells: Vec<TableCell> = headers.into_iter().map(|h| doc.new_cell(h)).collect();
    let focus = cells.get(path.col).or(cells.first()).map(|c| c.key);
    let at = match side {
        Side::Before => path.row,
        Side::After => path.row + 1,
    };
    table_mut(doc, path, cell)?.rows.insert(at, TableRow { key: row_key, cells });
    place_caret(state, focus);
    Ok(())
}

/// New cell at the active column index in every row. Each new cell takes the
/// row-header flag of its row.
pub fn insert_column(state: &mut EditorState, cell: NodeKey, side: Side) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let row_flags: Vec<bool> = state
        .doc
        .table(path.table)
        .map(|t| {
            t.rows
                .iter()
                .map(|r| r.cells.get(path.col).map(|c| c.header.row).unwrap_or(false))
                .collect()
        })
        .ok_or(TableOpError::Detached(cell))?;

    let doc = &mut state.doc;
    let new_cells: Vec<TableCell> =
        row_flags.into_iter().map(|row| doc.new_cell(HeaderState { row, column: false })).collect();
    let at = match side {
        Side::Before => path.col,
        Side::After => path.col + 1,
    };
    let mut focus = None;
    let table = table_mut(doc, path, cell)?;
    for (ri, (row, new_cell)) in table.rows.iter_mut().zip(new_cells).enumerate() {
        if ri == path.row {
            focus = Some(new_cell.key);
        }
        let at = at.min(row.cells.len());
        row.cells.insert(at, new_cell);
    }
    place_caret(state, focus);
    Ok(())
}

/// Remove the active cell's row. The last remaining row takes the table
/// with it.
pub fn delete_row(state: &mut EditorState, cell: NodeKey) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let table = table_mut(&mut state.doc, path, cell)?;
    if table.row_count() <= 1 {
        return delete_table(state, cell);
    }
    table.rows.remove(path.row);
    let row = path.row.min(table.row_count() - 1);
    let focus = table.rows.get(row).and_then(|r| {
        let col = path.col.min(r.cells.len().saturating_sub(1));
        r.cells.get(col).map(|c| c.key)
    });
    place_caret(state, focus);
    Ok(())
}

/// Remove the active cell's column from every row. The last remaining column
/// takes the table with it.
pub fn delete_column(state: &mut EditorState, cell: NodeKey) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let table = table_mut(&mut state.doc, path, cell)?;
    if table.column_count() <= 1 {
        return delete_table(state, cell);
    }
    for row in table.rows.iter_mut() {
        if path.col < row.cells.len() {
            row.cells.remove(path.col);
        }
    }
    let col = path.col.min(table.column_count().saturating_sub(1));
    let focus = table.cell(path.row, col).map(|c| c.key);
    place_caret(state, focus);
    Ok(())
}

/// Remove the whole table and park the caret at the start of the document.
pub fn delete_table(state: &mut EditorState, cell: NodeKey) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    state.doc.nodes.remove(path.table);
    place_caret(state, None);
    Ok(())
}

/// Flip the active cell's row-header flag and write the new value across the
/// whole row.
pub fn toggle_row_header(state: &mut EditorState, cell: NodeKey) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let table = table_mut(&mut state.doc, path, cell)?;
    let row = table.rows.get_mut(path.row).ok_or(TableOpError::Detached(cell))?;
    let flag = !row.cells.get(path.col).map(|c| c.header.row).unwrap_or(false);
    for c in row.cells.iter_mut() {
        c.header.row = flag;
    }
    place_caret(state, None);
    Ok(())
}

/// Flip the active cell's column-header flag and write the new value down
/// the whole column.
pub fn toggle_column_header(state: &mut EditorState, cell: NodeKey) -> Result<(), TableOpError> {
    let path = resolve(&state.doc, cell)?;
    let table = table_mut(&mut state.doc, path, cell)?;
    let flag = !table.cell(path.row, path.col).map(|c| c.header.column).unwrap_or(false);
    for row in table.rows.iter_mut() {
        if let Some(c) = row.cells.get_mut(path.col) {
            c.header.column = flag;
        }
    }
    place_caret(state, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_table(rows: usize, cols: usize) -> EditorState {
        let mut state = EditorState::default();
        state.doc.push_paragraph("before");
        state.doc.insert_table(None, rows, cols);
        state
    }

    fn cell_at(state: &EditorState, row: usize, col: usize) -> NodeKey {
        state.doc.table(1).unwrap().cell(row, col).unwrap().key
    }

    fn caret_key(state: &EditorState) -> NodeKey {
        state.selection.as_ref().and_then(|s| s.anchor()).unwrap().key
    }

    #[test]
    fn insert_row_above_then_delete_round_trips() {
        let mut state = state_with_table(2, 3);
        state.doc.table_mut(1).unwrap().rows[1].cells[2].text = "keep".into();
        let original = state.doc.nodes.clone();
        let active = cell_at(&state, 1, 2);

        insert_row(&mut state, active, Side::Before).unwrap();
        let t = state.doc.table(1).unwrap();
        assert_eq!(t.row_count(), 3);
        assert!(t.is_rectangular());
        // caret moved into the new row, same column
        let new_cell = cell_at(&state, 1, 2);
        assert_eq!(caret_key(&state), new_cell);

        delete_row(&mut state, new_cell).unwrap();
        assert_eq!(state.doc.nodes, original);
    }

    #[test]
    fn insert_row_below_appends_after_active_row() {
        let mut state = state_with_table(1, 2);
        let active = cell_at(&state, 0, 0);
        insert_row(&mut state, active, Side::After).unwrap();
        assert_eq!(cell_at(&state, 0, 0), active);
        assert_eq!(state.doc.table(1).unwrap().row_count(), 2);
        assert_eq!(caret_key(&state), cell_at(&state, 1, 0));
    }

    #[test]
    fn insert_column_adds_a_cell_to_every_row() {
        let mut state = state_with_table(3, 2);
        let active = cell_at(&state, 1, 0);
        insert_column(&mut state, active, Side::After).unwrap();
        let t = state.doc.table(1).unwrap();
        assert_eq!(t.column_count(), 3);
        assert!(t.is_rectangular());
        assert_eq!(t.cell(1, 0).unwrap().key, active);
        assert_eq!(caret_key(&state), cell_at(&state, 1, 1));

        insert_column(&mut state, active, Side::Before).unwrap();
        assert_eq!(state.doc.table(1).unwrap().column_count(), 4);
        assert_eq!(cell_at(&state, 1, 1), active);
    }

    #[test]
    fn new_cells_inherit_perpendicular_header_flags() {
        let mut state = state_with_table(2, 2);
        let corner = cell_at(&state, 0, 0);
        toggle_row_header(&mut state, corner).unwrap();
        toggle_column_header(&mut state, corner).unwrap();

        let target = cell_at(&state, 1, 0);
        insert_row(&mut state, target, Side::After).unwrap();
        let t = state.doc.table(1).unwrap();
        assert_eq!(t.cell(2, 0).unwrap().header, HeaderState { row: false, column: true });
        assert_eq!(t.cell(2, 1).unwrap().header, HeaderState::NONE);

        let target = cell_at(&state, 0, 1);
        insert_column(&mut state, target, Side::After).unwrap();
        let t = state.doc.table(1).unwrap();
        assert_eq!(t.cell(0, 2).unwrap().header, HeaderState { row: true, column: false });
        assert_eq!(t.cell(1, 2).unwrap().header, HeaderState::NONE);
    }

    #[test]
    fn delete_middle_row_keeps_caret_in_table() {
        let mut state = state_with_table(3, 2);
        let active = cell_at(&state, 1, 1);
        let below = cell_at(&state, 2, 1);
        delete_row(&mut state, active).unwrap();
        assert_eq!(state.doc.table(1).unwrap().row_count(), 2);
        assert!(!state.doc.is_attached(active));
        assert_eq!(caret_key(&state), below);
    }

    #[test]
    fn delete_last_row_moves_caret_up() {
        let mut state = state_with_table(2, 2);
        let active = cell_at(&state, 1, 0);
        let above = cell_at(&state, 0, 0);
        delete_row(&mut state, active).unwrap();
        assert_eq!(caret_key(&state), above);
    }

    #[test]
    fn delete_column_keeps_rows_even() {
        let mut state = state_with_table(2, 3);
        let active = cell_at(&state, 0, 2);
        delete_column(&mut state, active).unwrap();
        let t = state.doc.table(1).unwrap();
        assert_eq!(t.column_count(), 2);
        assert!(t.is_rectangular());
        assert_eq!(caret_key(&state), cell_at(&state, 0, 1));
    }

    #[test]
    fn deleting_only_row_removes_table() {
        let mut state = state_with_table(1, 3);
        let target = cell_at(&state, 0, 1);
        delete_row(&mut state, target).unwrap();
        assert_eq!(state.doc.tables().count(), 0);
        assert_eq!(caret_key(&state), state.doc.first_caret_key().unwrap());
    }

    #[test]
    fn deleting_only_column_removes_table() {
        let mut state = state_with_table(3, 1);
        let target = cell_at(&state, 2, 0);
        delete_column(&mut state, target).unwrap();
        assert_eq!(state.doc.tables().count(), 0);
    }

    #[test]
    fn delete_table_leaves_a_reselectable_document() {
        let mut state = EditorState::default();
        state.doc.insert_table(None, 2, 2);
        let cell = state.doc.table(0).unwrap().cell(1, 1).unwrap().key;
        delete_table(&mut state, cell).unwrap();
        assert_eq!(state.doc.nodes.len(), 1);
        let caret = caret_key(&state);
        assert!(state.doc.is_attached(caret));
    }

    #[test]
    fn toggle_row_header_twice_restores_flags() {
        let mut state = state_with_table(2, 3);
        let active = cell_at(&state, 1, 1);
        toggle_column_header(&mut state, active).unwrap();
        let before: Vec<HeaderState> =
            state.doc.table(1).unwrap().rows[1].cells.iter().map(|c| c.header).collect();

        toggle_row_header(&mut state, active).unwrap();
        let row = &state.doc.table(1).unwrap().rows[1];
        assert!(row.cells.iter().all(|c| c.header.row));
        // the column flag is left alone
        assert!(row.cells[1].header.column);
        assert!(!state.doc.table(1).unwrap().rows[0].cells[0].header.row);

        toggle_row_header(&mut state, active).unwrap();
        let after: Vec<HeaderState> =
            state.doc.table(1).unwrap().rows[1].cells.iter().map(|c| c.header).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn toggle_column_header_is_column_uniform() {
        let mut state = state_with_table(3, 2);
        let target = cell_at(&state, 2, 1);
        toggle_column_header(&mut state, target).unwrap();
        let t = state.doc.table(1).unwrap();
        assert!(t.rows.iter().all(|r| r.cells[1].header.column));
        assert!(t.rows.iter().all(|r| !r.cells[0].header.column));
    }

    #[test]
    fn detached_cell_is_a_no_op() {
        let mut state = state_with_table(2, 2);
        let gone = cell_at(&state, 0, 0);
        delete_column(&mut state, gone).unwrap();
        let snapshot = state.clone();
        for op in [
            TableOp::InsertRow(Side::After),
            TableOp::InsertColumn(Side::Before),
            TableOp::DeleteRow,
            TableOp::DeleteColumn,
            TableOp::DeleteTable,
            TableOp::ToggleRowHeader,
            TableOp::ToggleColumnHeader,
        ] {
            assert_eq!(apply(&mut state, op, gone), Err(TableOpError::Detached(gone)));
        }
        assert_eq!(state, snapshot);
    }
}
