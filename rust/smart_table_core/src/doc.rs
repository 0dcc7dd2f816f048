//! Document tree structures and helpers.
//!
//! Every node carries a stable [`NodeKey`]. Component state refers to nodes by
//! key only, so a key that no longer resolves is how detachment shows up.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub u64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Doc {
    pub nodes: Vec<Node>,
    /// Next key handed out by [`Doc::new_key`].
    #[serde(default)]
    next_key: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Paragraph { key: NodeKey, text: String },
    Table(Table),
}

impl Node {
    pub fn key(&self) -> NodeKey {
        match self {
            Node::Paragraph { key, .. } => *key,
            Node::Table(t) => t.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub key: NodeKey,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub key: NodeKey,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub key: NodeKey,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub header: HeaderState,
}

/// Row-header and column-header markers. The two flags are independent;
/// toggling one never touches the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderState {
    #[serde(default)]
    pub row: bool,
    #[serde(default)]
    pub column: bool,
}

impl HeaderState {
    pub const NONE: HeaderState = HeaderState { row: false, column: false };
}

/// Why a loaded document cannot be edited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("table {0} has no cells")]
    EmptyTable(NodeKey),
    #[error("row {row} of table {table} has {found} cells, expected {expected}")]
    Ragged { table: NodeKey, row: usize, expected: usize, found: usize },
    #[error("key {0} is used more than once")]
    DuplicateKey(NodeKey),
}

/// Position of a cell inside the document: root child index of its table,
/// then row and column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPath {
    pub table: usize,
    pub row: usize,
    pub col: usize,
}

/// Where a key currently lives in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Paragraph { index: usize },
    Table { table: usize },
    Row { table: usize, row: usize },
    Cell(CellPath),
}

impl Table {
    /// Cells per row. Rows are kept the same length, so the first row decides.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_rectangular(&self) -> bool {
        let cols = self.column_count();
        self.rows.iter().all(|r| r.cells.len() == cols)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }
}

impl Doc {
    pub fn new_key(&mut self) -> NodeKey {
        self.next_key += 1;
        NodeKey(self.next_key)
    }

    /// Bump the key counter past every key present in the tree. Needed after
    /// deserializing a document whose counter was missing or stale.
    pub fn repair_key_counter(&mut self) {
        let max = self.keys().map(|k| k.0).max().unwrap_or(0);
        if self.next_key < max {
            self.next_key = max;
        }
    }

    pub fn push_paragraph(&mut self, text: &str) -> NodeKey {
        let key = self.new_key();
        self.nodes.push(Node::Paragraph { key, text: text.to_string() });
        key
    }

    pub fn new_cell(&mut self, header: HeaderState) -> TableCell {
        TableCell { key: self.new_key(), text: String::new(), header }
    }

    pub fn new_table(&mut self, rows: usize, cols: usize) -> Table {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let key = self.new_key();
        let rows = (0..rows)
            .map(|_| {
                let row_key = self.new_key();
                let cells = (0..cols).map(|_| self.new_cell(HeaderState::NONE)).collect();
                TableRow { key: row_key, cells }
            })
            .collect();
        Table { key, rows }
    }

    /// Insert a `rows` x `cols` table at root index `at` (appended when out of
    /// range) and return its key.
    pub fn insert_table(&mut self, at: Option<usize>, rows: usize, cols: usize) -> NodeKey {
        let table = self.new_table(rows, cols);
        let key = table.key;
        let at = at.unwrap_or(self.nodes.len()).min(self.nodes.len());
        self.nodes.insert(at, Node::Table(table));
        key
    }

    pub fn locate(&self, key: NodeKey) -> Option<Located> {
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Paragraph { key: k, .. } if *k == key => {
                    return Some(Located::Paragraph { index });
                }
                Node::Paragraph { .. } => {}
                Node::Table(t) => {
                    if t.key == key {
                        return Some(Located::Table { table: index });
                    }
                    for (ri, row) in t.rows.iter().enumerate() {
                        if row.key == key {
                            return Some(Located::Row { table: index, row: ri });
                        }
                        if let Some(ci) = row.cells.iter().position(|c| c.key == key) {
                            return Some(Located::Cell(CellPath { table: index, row: ri, col: ci }));
                        }
                    }
                }
            }
        }
        None
    }

    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.locate(key).is_some()
    }

    pub fn cell_path(&self, key: NodeKey) -> Option<CellPath> {
        match self.locate(key)? {
            Located::Cell(path) => Some(path),
            _ => None,
        }
    }

    /// Walk up from `key` to the table cell that contains it. Content lives
    /// directly in cells, so a key inside a table is either the cell itself or
    /// a structural node (row/table) that has no enclosing cell.
    pub fn enclosing_cell(&self, key: NodeKey) -> Option<NodeKey> {
        self.cell_path(key).map(|_| key)
    }

    pub fn table(&self, index: usize) -> Option<&Table> {
        match self.nodes.get(index)? {
            Node::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        match self.nodes.get_mut(index)? {
            Node::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Root index of the `n`th table in document order.
    pub fn nth_table_index(&self, n: usize) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Table(_)))
            .nth(n)
            .map(|(i, _)| i)
    }

    pub fn cell(&self, path: CellPath) -> Option<&TableCell> {
        self.table(path.table)?.cell(path.row, path.col)
    }

    /// The table that owns `cell`, if the cell is attached.
    pub fn table_of(&self, cell: NodeKey) -> Option<&Table> {
        self.table(self.cell_path(cell)?.table)
    }

    /// First place a caret can sit: the first paragraph, or the first cell of a
    /// leading table.
    pub fn first_caret_key(&self) -> Option<NodeKey> {
        match self.nodes.first()? {
            Node::Paragraph { key, .. } => Some(*key),
            Node::Table(t) => t.cell(0, 0).map(|c| c.key),
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Check what the table ops rely on: every table has at least one cell,
    /// rows are the same length and no key appears twice.
    pub fn validate(&self) -> Result<(), ShapeError> {
        for table in self.tables() {
            let expected = table.column_count();
            if expected == 0 {
                return Err(ShapeError::EmptyTable(table.key));
            }
            if let Some((row, r)) = table.rows.iter().enumerate().find(|(_, r)| r.cells.len() != expected) {
                return Err(ShapeError::Ragged { table: table.key, row, expected, found: r.cells.len() });
            }
        }
        let mut seen = HashSet::new();
        match self.keys().find(|k| !seen.insert(*k)) {
            Some(key) => Err(ShapeError::DuplicateKey(key)),
            None => Ok(()),
        }
    }

    /// Every key in the tree, in document order.
    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.iter().flat_map(|node| {
            let mut keys = vec![node.key()];
            if let Node::Table(t) = node {
                for row in &t.rows {
                    keys.push(row.key);
                    keys.extend(row.cells.iter().map(|c| c.key));
                }
            }
            keys
        })
    }
}
