//! Overlay tuning knobs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column cap for the insert-column actions. Keeps table layout cost bounded.
pub const DEFAULT_MAX_COLUMNS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub max_columns: usize,
    /// Gap between the trigger and the dropdown, and the dropdown's minimum
    /// distance from the viewport edges.
    pub menu_margin: f32,
    /// Distance of the trigger from the cell's top and right edges.
    pub trigger_inset: f32,
    pub trigger_z_index: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { max_columns: DEFAULT_MAX_COLUMNS, menu_margin: 5.0, trigger_inset: 5.0, trigger_z_index: 10 }
    }
}

impl OverlayConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: OverlayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_columns == 0 {
            return Err(Error::Config("max_columns must be at least 1".into()));
        }
        if !(self.menu_margin >= 0.0) || !(self.trigger_inset >= 0.0) {
            return Err(Error::Config("margins must be non-negative numbers".into()));
        }
        Ok(())
    }
}
