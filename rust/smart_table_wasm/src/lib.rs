use std::rc::Rc;

use smart_table_core::doc::NodeKey;
use smart_table_core::engine::DocumentEngine;
use smart_table_core::geometry::{place_dropdown, Rect, Viewport};
use smart_table_core::menu::render_html;
use smart_table_core::{ActionMenu, EditorCore, InvokeOutcome, OverlayConfig, TableAction};
use wasm_bindgen::prelude::*;

/// Engine-side half of the table action menu for JS hosts that render the
/// overlay themselves.
#[wasm_bindgen]
pub struct TableEditor {
    core: Rc<EditorCore>,
    menu: ActionMenu,
    config: OverlayConfig,
}

impl TableEditor {
    fn with_core(core: EditorCore, config: OverlayConfig) -> TableEditor {
        TableEditor { core: Rc::new(core), menu: ActionMenu::new(config.max_columns), config }
    }

    fn selected_cell(&self) -> Option<NodeKey> {
        self.core.read(|s| s.selected_cell()).ok().flatten()
    }
}

#[wasm_bindgen]
impl TableEditor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TableEditor {
        Self::with_core(EditorCore::new_empty(), OverlayConfig::default())
    }

    pub fn with_config(config_json: String) -> TableEditor {
        let config = OverlayConfig::from_json(&config_json).unwrap_or_default();
        Self::with_core(EditorCore::new_empty(), config)
    }

    pub fn from_json(json: String) -> TableEditor {
        let core = EditorCore::from_json(&json).unwrap_or_else(|_| EditorCore::new_empty());
        Self::with_core(core, OverlayConfig::default())
    }

    pub fn to_json(&self) -> String { self.core.to_json() }

    // Document
    pub fn insert_paragraph(&mut self, text: String) -> bool { self.core.insert_paragraph(&text).is_ok() }
    pub fn insert_table(&mut self, rows: u32, cols: u32) -> bool {
        self.core.insert_table(rows as usize, cols as usize).is_ok()
    }
    pub fn insert_table_at(&mut self, at: u32, rows: u32, cols: u32) -> bool {
        self.core.insert_table_at(Some(at as usize), rows as usize, cols as usize).is_ok()
    }
    pub fn table_count(&self) -> u32 { self.core.table_count() as u32 }

    // Selection
    pub fn select_cell(&mut self, table_idx: u32, r: u32, c: u32) -> bool {
        matches!(self.core.select_cell(table_idx as usize, r as usize, c as usize), Ok(Some(_)))
    }
    pub fn select_start(&mut self) -> bool { self.core.select_start().is_ok() }
    pub fn has_active_cell(&self) -> bool { self.selected_cell().is_some() }

    // Menu
    pub fn toggle_menu(&mut self) -> bool { let cell = self.selected_cell(); self.menu.toggle(cell) }
    pub fn is_menu_open(&self) -> bool { self.menu.is_open() }
    pub fn close_menu(&mut self) -> bool { self.menu.close(smart_table_core::menu::CloseReason::Escape) }
    pub fn menu_json(&self) -> String {
        serde_json::to_string(&self.menu.entries(&*self.core)).unwrap_or_else(|_| "[]".to_string())
    }
    pub fn menu_html(&self) -> String { render_html(&self.menu.entries(&*self.core)) }

    /// Run a menu action by its numeric id. Returns whether the document changed.
    pub fn run_action(&mut self, id: u8) -> bool {
        match TableAction::from_id(id) {
            Some(action) => self.menu.invoke(&*self.core, action) == InvokeOutcome::Applied,
            None => false,
        }
    }

    /// Dropdown position as `{"left":..,"top":..}`, or `null` while it cannot
    /// be placed.
    pub fn place_dropdown(&self, trigger_json: String, dropdown_json: String, viewport_json: String) -> String {
        let parsed = (
            serde_json::from_str::<Rect>(&trigger_json),
            serde_json::from_str::<Rect>(&dropdown_json),
            serde_json::from_str::<Viewport>(&viewport_json),
        );
        let position = match parsed {
            (Ok(trigger), Ok(dropdown), Ok(viewport)) => {
                place_dropdown(trigger, dropdown, &viewport, self.config.menu_margin)
            }
            _ => None,
        };
        serde_json::to_string(&position).unwrap_or_else(|_| "null".to_string())
    }

    // History
    pub fn undo(&mut self) -> bool { self.core.undo() }
    pub fn redo(&mut self) -> bool { self.core.redo() }
}

impl Default for TableEditor {
    fn default() -> Self { Self::new() }
}
