//! Contract with the on-screen element tree the overlay draws into (the DOM
//! in a browser build).
//!
//! Rects are viewport-relative, the way `getBoundingClientRect` reports them.
//! Styles written through [`HostSurface::set_style`] use page coordinates for
//! `left`/`top` on elements anchored outside the table, and insets for the
//! trigger anchored inside a cell.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Rect, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Resize,
    Scroll,
    Click,
    MouseDown,
    MouseUp,
    KeyDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub target: Option<ElementId>,
    /// Viewport coordinates.
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Resize,
    Scroll,
    Click(PointerEvent),
    MouseDown(PointerEvent),
    MouseUp(PointerEvent),
    KeyDown { key: String },
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Resize => HostEventKind::Resize,
            HostEvent::Scroll => HostEventKind::Scroll,
            HostEvent::Click(_) => HostEventKind::Click,
            HostEvent::MouseDown(_) => HostEventKind::MouseDown,
            HostEvent::MouseUp(_) => HostEventKind::MouseUp,
            HostEvent::KeyDown { .. } => HostEventKind::KeyDown,
        }
    }
}

pub type HostListener = Rc<dyn Fn(&HostEvent)>;
pub type MutationListener = Rc<dyn Fn()>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("element {0} does not exist")]
    Missing(ElementId),
    #[error("element {child} cannot be appended to {parent}")]
    InvalidParent { parent: ElementId, child: ElementId },
}

/// Static description of an element to create.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementSpec {
    pub tag: &'static str,
    pub id: Option<String>,
    pub class: Option<&'static str>,
    pub role: Option<&'static str>,
    pub aria_label: Option<String>,
    pub text: Option<String>,
    pub test_id: Option<&'static str>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    #[default]
    Static,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementStyle {
    pub position: Positioning,
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub opacity: f32,
    pub z_index: Option<i32>,
}

impl ElementStyle {
    /// Absolutely positioned at page coordinates.
    pub fn at(left: f32, top: f32) -> Self {
        Self { position: Positioning::Absolute, left: Some(left), top: Some(top), opacity: 1.0, ..Self::default() }
    }

    /// Pinned `inset` from the top-right corner of the positioned parent.
    pub fn top_right(inset: f32, z_index: i32) -> Self {
        Self {
            position: Positioning::Absolute,
            top: Some(inset),
            right: Some(inset),
            opacity: 1.0,
            z_index: Some(z_index),
            ..Self::default()
        }
    }

    pub fn hidden(self) -> Self {
        Self { opacity: 0.0, ..self }
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

pub trait HostSurface {
    /// Default anchor for detached overlays.
    fn body(&self) -> ElementId;

    fn viewport(&self) -> Viewport;

    /// `None` for elements that do not exist or are not connected.
    fn bounding_rect(&self, el: ElementId) -> Option<Rect>;

    /// Whether the platform currently reports a selection at all.
    fn has_native_selection(&self) -> bool;

    /// Inclusive: an element contains itself.
    fn contains(&self, ancestor: ElementId, el: ElementId) -> bool;

    fn parent(&self, el: ElementId) -> Option<ElementId>;

    /// Reachable from the body.
    fn is_connected(&self, el: ElementId) -> bool;

    fn create_element(&self, spec: ElementSpec) -> ElementId;

    /// Moves `child` under `parent`, detaching it from any previous parent.
    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError>;

    /// Detach from the current parent. Already-detached elements are left as is.
    fn remove(&self, el: ElementId) -> Result<(), HostError>;

    fn set_style(&self, el: ElementId, style: ElementStyle) -> Result<(), HostError>;

    fn add_event_listener(&self, kind: HostEventKind, listener: HostListener) -> HostListenerId;

    /// Watch `el`'s direct children for additions and removals. Notifications
    /// are delivered asynchronously.
    fn observe_children(&self, el: ElementId, listener: MutationListener) -> HostListenerId;

    /// Releases either an event listener or an observer.
    fn remove_listener(&self, id: HostListenerId);

    fn queue_microtask(&self, task: Box<dyn FnOnce()>);
}
