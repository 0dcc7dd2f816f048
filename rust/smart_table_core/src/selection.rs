//! Selection model keyed on stable node keys.

use serde::{Deserialize, Serialize};

use crate::doc::{Doc, NodeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selection {
    /// Caret or text range.
    Range { anchor: Point, focus: Point },
    /// Rectangular selection spanning several cells of one table.
    Table { table: NodeKey, anchor_cell: NodeKey, focus_cell: NodeKey },
    /// Whole nodes selected as blocks.
    Node { keys: Vec<NodeKey> },
}

impl Selection {
    pub fn caret(key: NodeKey, offset: usize) -> Self {
        let p = Point::new(key, offset);
        Selection::Range { anchor: p, focus: p }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Selection::Range { .. })
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Range { anchor, focus } => anchor == focus,
            _ => false,
        }
    }

    /// Anchor point of a range selection.
    pub fn anchor(&self) -> Option<Point> {
        match self {
            Selection::Range { anchor, .. } => Some(*anchor),
            _ => None,
        }
    }
}

/// Collapse the selection to the start of the document root. An empty
/// document gets an empty paragraph so the caret always has a home.
pub fn document_start(doc: &mut Doc) -> Selection {
    let key = match doc.first_caret_key() {
        Some(key) => key,
        None => doc.push_paragraph(""),
    };
    Selection::caret(key, 0)
}
