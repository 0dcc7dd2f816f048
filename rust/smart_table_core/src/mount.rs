//! The trigger button and the one place it is attached to.
//!
//! The trigger lives inside the tracked cell's element so it scrolls with the
//! table. Renderers are free to throw a cell's children away, so while
//! attached the cell is observed and the trigger put back when it goes
//! missing. With no cell tracked the trigger is parked, hidden, in the
//! overlay's anchor.

use std::mem;

use crate::host::{ElementId, ElementSpec, ElementStyle, HostListenerId, HostSurface, MutationListener};

pub const TRIGGER_ID: &str = "chevron-down";
pub const TRIGGER_CLASS: &str = "table-cell-action-button";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Parked,
    Cell { cell: ElementId, observer: HostListenerId },
}

#[derive(Debug)]
pub struct TriggerMount {
    anchor: ElementId,
    trigger: ElementId,
    owner: Owner,
}

impl TriggerMount {
    pub fn new<H: HostSurface>(host: &H, anchor: ElementId) -> Self {
        let trigger = host.create_element(ElementSpec {
            tag: "button",
            id: Some(TRIGGER_ID.to_string()),
            class: Some(TRIGGER_CLASS),
            aria_label: Some("Table actions".to_string()),
            ..Default::default()
        });
        let mut mount = Self { anchor, trigger, owner: Owner::Parked };
        mount.park(host);
        mount
    }

    pub fn trigger(&self) -> ElementId {
        self.trigger
    }

    /// Cell element currently owning the trigger.
    pub fn attached_to(&self) -> Option<ElementId> {
        match self.owner {
            Owner::Cell { cell, .. } => Some(cell),
            Owner::Parked => None,
        }
    }

    /// Move the trigger into `cell`, observing it with `on_mutation`.
    pub fn attach<H: HostSurface>(&mut self, host: &H, cell: ElementId, on_mutation: MutationListener) {
        if self.attached_to() == Some(cell) {
            self.reconcile(host);
            return;
        }
        self.release_owner(host);
        if let Err(err) = host.append_child(cell, self.trigger) {
            log::warn!("could not attach table trigger to {cell}: {err}");
            self.park(host);
            return;
        }
        let observer = host.observe_children(cell, on_mutation);
        log::debug!("table trigger attached to {cell}");
        self.owner = Owner::Cell { cell, observer };
    }

    pub fn park<H: HostSurface>(&mut self, host: &H) {
        self.release_owner(host);
        if host.parent(self.trigger) != Some(self.anchor) {
            if let Err(err) = host.append_child(self.anchor, self.trigger) {
                log::warn!("could not park table trigger in {}: {err}", self.anchor);
            }
        }
        if let Err(err) = host.set_style(self.trigger, ElementStyle::default().hidden()) {
            log::warn!("could not hide table trigger: {err}");
        }
    }

    /// Put the trigger back if it was taken out of a cell that is still on
    /// screen. Returns whether it was re-attached.
    pub fn reconcile<H: HostSurface>(&mut self, host: &H) -> bool {
        let Owner::Cell { cell, .. } = self.owner else {
            return false;
        };
        if host.parent(self.trigger) == Some(cell) || !host.is_connected(cell) {
            return false;
        }
        match host.append_child(cell, self.trigger) {
            Ok(()) => {
                log::debug!("table trigger re-attached to {cell}");
                true
            }
            Err(err) => {
                log::warn!("could not re-attach table trigger to {cell}: {err}");
                false
            }
        }
    }

    pub fn teardown<H: HostSurface>(&mut self, host: &H) {
        self.release_owner(host);
        if let Err(err) = host.remove(self.trigger) {
            log::warn!("could not remove table trigger: {err}");
        }
    }

    fn release_owner<H: HostSurface>(&mut self, host: &H) {
        if let Owner::Cell { cell, observer } = mem::replace(&mut self.owner, Owner::Parked) {
            host.remove_listener(observer);
            if host.parent(self.trigger) == Some(cell) {
                if let Err(err) = host.remove(self.trigger) {
                    log::warn!("could not detach table trigger from {cell}: {err}");
                }
            }
        }
    }
}
