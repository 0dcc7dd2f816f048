//! Placement of the cell trigger and the action dropdown.
//!
//! Inputs are viewport-relative rects as the host measures them; outputs are
//! page coordinates (viewport position plus scroll offset), ready to be
//! written as absolute `left`/`top`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Zero-area rects come from elements that have not been laid out yet.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub scroll_x: f32,
    #[serde(default)]
    pub scroll_y: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height, scroll_x: 0.0, scroll_y: 0.0 }
    }

    pub fn scrolled(self, scroll_x: f32, scroll_y: f32) -> Self {
        Self { scroll_x, scroll_y, ..self }
    }
}

/// Page coordinates of an element's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub left: f32,
    pub top: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutInput {
    pub trigger: Option<Rect>,
    pub dropdown: Option<Rect>,
    pub cell: Option<Rect>,
    pub viewport: Viewport,
    pub margin: f32,
    pub inset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub trigger: Option<Position>,
    pub dropdown: Option<Position>,
}

pub fn compute_layout(input: &LayoutInput) -> Layout {
    let trigger_width = input.trigger.map(|r| r.width).unwrap_or(0.0);
    let trigger = input.cell.and_then(|cell| place_trigger(cell, trigger_width, input.inset, &input.viewport));
    let dropdown = match (input.trigger, input.dropdown) {
        (Some(t), Some(d)) => place_dropdown(t, d, &input.viewport, input.margin),
        _ => None,
    };
    Layout { trigger, dropdown }
}

/// Top-right corner of `cell`, `inset` in from both edges.
pub fn place_trigger(cell: Rect, trigger_width: f32, inset: f32, viewport: &Viewport) -> Option<Position> {
    if cell.is_empty() {
        return None;
    }
    Some(Position {
        left: cell.right() - inset - trigger_width + viewport.scroll_x,
        top: cell.top() + inset + viewport.scroll_y,
    })
}

/// Right of the trigger, flipped to its left when that overflows, then kept
/// `margin` inside the viewport. Vertically aligned with the trigger and
/// pushed up when it would run off the bottom. `None` until the dropdown has
/// been measured.
pub fn place_dropdown(trigger: Rect, dropdown: Rect, viewport: &Viewport, margin: f32) -> Option<Position> {
    if dropdown.is_empty() {
        return None;
    }
    let (width, height) = (dropdown.width, dropdown.height);

    let mut left = trigger.right() + margin;
    if left + width > viewport.width {
        left = trigger.left() - width - margin;
    }
    let left = left.min(viewport.width - width - margin).max(margin);

    let mut top = trigger.top();
    if top + height > viewport.height {
        top = viewport.height - height - margin;
    }
    let top = top.max(margin);

    Some(Position { left: left + viewport.scroll_x, top: top + viewport.scroll_y })
}
