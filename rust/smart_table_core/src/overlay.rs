//! Mountable table action overlay.
//!
//! Ties the pieces together: the [`SelectionTracker`] follows the caret, the
//! [`TriggerMount`] keeps the trigger button inside the tracked cell, the
//! [`ActionMenu`] owns the dropdown's state and dispatch, and the geometry
//! module places everything on screen. The overlay registers its own engine
//! and host listeners and releases them when dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::OverlayConfig;
use crate::engine::{DocumentEngine, Listener};
use crate::error::Result;
use crate::geometry::{compute_layout, Layout, LayoutInput};
use crate::host::{
    ElementId, ElementSpec, ElementStyle, HostError, HostEvent, HostEventKind, HostListener, HostSurface,
    PointerEvent,
};
use crate::menu::{ActionDescriptor, ActionMenu, CloseReason, InvokeOutcome, MenuEntry, TableAction};
use crate::mount::TriggerMount;
use crate::subscription::Subscriptions;
use crate::tracker::{SelectionTracker, TrackedCell};

pub const DROPDOWN_ID: &str = "table-actions";

#[derive(Debug)]
struct Dropdown {
    element: ElementId,
    items: Vec<(ElementId, ActionDescriptor)>,
}

#[derive(Debug)]
struct OverlayState {
    tracker: SelectionTracker,
    menu: ActionMenu,
    mount: TriggerMount,
    dropdown: Option<Dropdown>,
    layout: Layout,
}

/// What a pointer press landed on.
enum Hit {
    Trigger,
    Item(TableAction),
    DisabledItem,
    Dropdown,
    Outside,
}

struct Shared<E: DocumentEngine + 'static, H: HostSurface + 'static> {
    this: Weak<Shared<E, H>>,
    engine: Rc<E>,
    host: Rc<H>,
    config: OverlayConfig,
    anchor: ElementId,
    state: RefCell<OverlayState>,
    /// Set when a notification arrives while `state` is borrowed.
    stale: Cell<bool>,
    subscriptions: RefCell<Subscriptions>,
}

pub struct TableActionOverlay<E: DocumentEngine + 'static, H: HostSurface + 'static> {
    shared: Rc<Shared<E, H>>,
}

impl<E: DocumentEngine + 'static, H: HostSurface + 'static> TableActionOverlay<E, H> {
    /// Mount with the default config. `anchor` defaults to the host's body.
    pub fn mount(engine: Rc<E>, host: Rc<H>, anchor: Option<ElementId>) -> Result<Self> {
        Self::mount_with_config(engine, host, anchor, OverlayConfig::default())
    }

    pub fn mount_with_config(
        engine: Rc<E>,
        host: Rc<H>,
        anchor: Option<ElementId>,
        config: OverlayConfig,
    ) -> Result<Self> {
        config.validate()?;
        let anchor = anchor.unwrap_or_else(|| host.body());
        if !host.is_connected(anchor) {
            return Err(HostError::Missing(anchor).into());
        }
        let state = OverlayState {
            tracker: SelectionTracker::new(),
            menu: ActionMenu::new(config.max_columns),
            mount: TriggerMount::new(&*host, anchor),
            dropdown: None,
            layout: Layout::default(),
        };
        let shared = Rc::new_cyclic(|this| Shared {
            this: this.clone(),
            engine,
            host,
            config,
            anchor,
            state: RefCell::new(state),
            stale: Cell::new(false),
            subscriptions: RefCell::new(Subscriptions::new()),
        });
        shared.subscribe();
        shared.refresh();
        log::debug!("table action overlay mounted in {anchor}");
        Ok(Self { shared })
    }

    pub fn tracked(&self) -> TrackedCell {
        self.shared.state.try_borrow().map(|s| s.tracker.current()).unwrap_or_default()
    }

    pub fn is_menu_open(&self) -> bool {
        self.shared.state.try_borrow().map(|s| s.menu.is_open()).unwrap_or(false)
    }

    pub fn trigger_element(&self) -> Option<ElementId> {
        self.shared.state.try_borrow().ok().map(|s| s.mount.trigger())
    }

    pub fn dropdown_element(&self) -> Option<ElementId> {
        self.shared.state.try_borrow().ok().and_then(|s| s.dropdown.as_ref().map(|d| d.element))
    }

    /// Items currently rendered in the dropdown, in order.
    pub fn menu_entries(&self) -> Vec<ActionDescriptor> {
        self.shared
            .state
            .try_borrow()
            .ok()
            .and_then(|s| s.dropdown.as_ref().map(|d| d.items.iter().map(|(_, a)| a.clone()).collect()))
            .unwrap_or_default()
    }

    pub fn layout(&self) -> Layout {
        self.shared.state.try_borrow().map(|s| s.layout).unwrap_or_default()
    }

    /// Returns whether the menu is open afterwards.
    pub fn toggle_menu(&self) -> bool {
        self.shared.toggle_menu()
    }

    pub fn choose(&self, action: TableAction) -> InvokeOutcome {
        self.shared.with_state(|st| self.shared.invoke(st, action)).unwrap_or(InvokeOutcome::Failed)
    }

    pub fn close_menu(&self) -> bool {
        self.shared.with_state(|st| self.shared.close(st, CloseReason::Escape)).unwrap_or(false)
    }

    pub fn refresh(&self) {
        self.shared.refresh();
    }
}

impl<E: DocumentEngine + 'static, H: HostSurface + 'static> Drop for TableActionOverlay<E, H> {
    fn drop(&mut self) {
        self.shared.unmount();
    }
}

impl<E: DocumentEngine + 'static, H: HostSurface + 'static> Shared<E, H> {
    fn subscribe(&self) {
        let mut subs = self.subscriptions.borrow_mut();

        for id in [
            self.engine.on_change(self.callback(Self::refresh)),
            self.engine.on_selection_change(self.callback(Self::refresh)),
        ] {
            let engine = self.engine.clone();
            subs.push(move || engine.remove_listener(id));
        }

        let handlers: [(HostEventKind, fn(&Self, &HostEvent)); 6] = [
            (HostEventKind::Resize, Self::on_viewport_change),
            (HostEventKind::Scroll, Self::on_viewport_change),
            (HostEventKind::Click, Self::on_click),
            (HostEventKind::MouseDown, Self::on_mouse_down),
            (HostEventKind::MouseUp, Self::on_mouse_up),
            (HostEventKind::KeyDown, Self::on_key_down),
        ];
        for (kind, handler) in handlers {
            let id = self.host.add_event_listener(kind, self.host_callback(handler));
            let host = self.host.clone();
            subs.push(move || host.remove_listener(id));
        }
    }

    fn callback(&self, f: fn(&Self)) -> Listener {
        let this = self.this.clone();
        Rc::new(move || {
            if let Some(shared) = this.upgrade() {
                f(&shared);
            }
        })
    }

    fn host_callback(&self, f: fn(&Self, &HostEvent)) -> HostListener {
        let this = self.this.clone();
        Rc::new(move |event: &HostEvent| {
            if let Some(shared) = this.upgrade() {
                f(&shared, event);
            }
        })
    }

    /// Run `f` with exclusive access to the overlay state. A call that lands
    /// while the state is in use only marks it stale; the owner of the
    /// borrow refreshes once it is done.
    fn with_state<R>(&self, f: impl FnOnce(&mut OverlayState) -> R) -> Option<R> {
        let result = {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                self.stale.set(true);
                return None;
            };
            f(&mut state)
        };
        while self.stale.replace(false) {
            match self.state.try_borrow_mut() {
                Ok(mut state) => self.sync(&mut state),
                Err(_) => break,
            }
        }
        Some(result)
    }

    fn schedule_refresh(&self) {
        let this = self.this.clone();
        self.host.queue_microtask(Box::new(move || {
            if let Some(shared) = this.upgrade() {
                shared.refresh();
            }
        }));
    }

    fn refresh(&self) {
        self.with_state(|st| self.sync(st));
    }

    fn sync(&self, st: &mut OverlayState) {
        let host = &*self.host;
        match st.tracker.refresh(&*self.engine, host) {
            Some(transition) => {
                if transition.cell_changed() && st.menu.on_cell_changed(transition.current.cell()) {
                    self.remove_dropdown(st);
                }
                match transition.current {
                    TrackedCell::Active { element, .. } => {
                        st.mount.attach(host, element, self.callback(Self::on_cell_mutation))
                    }
                    TrackedCell::None => st.mount.park(host),
                }
            }
            None => {
                st.mount.reconcile(host);
            }
        }
        if st.menu.is_open() {
            let fresh = st.menu.entries(&*self.engine);
            let current = st.dropdown.as_ref().map(|d| d.items.iter().map(|(_, a)| a));
            let unchanged =
                current.is_some_and(|mut items| fresh.iter().filter_map(MenuEntry::descriptor).eq(&mut items));
            if !unchanged {
                self.render_dropdown(st, &fresh);
            }
        }
        self.reposition(st);
    }

    fn reposition(&self, st: &mut OverlayState) {
        let host = &*self.host;
        let trigger = st.mount.trigger();
        let tracked = st.tracker.current();

        let style = ElementStyle::top_right(self.config.trigger_inset, self.config.trigger_z_index);
        let style = if tracked.is_active() { style } else { style.hidden() };
        if let Err(err) = host.set_style(trigger, style) {
            log::warn!("could not style table trigger: {err}");
        }

        let input = LayoutInput {
            trigger: host.bounding_rect(trigger),
            dropdown: st.dropdown.as_ref().and_then(|d| host.bounding_rect(d.element)),
            cell: tracked.element().and_then(|el| host.bounding_rect(el)),
            viewport: host.viewport(),
            margin: self.config.menu_margin,
            inset: self.config.trigger_inset,
        };
        let layout = compute_layout(&input);
        if let Some(dropdown) = &st.dropdown {
            match layout.dropdown {
                Some(pos) => {
                    if let Err(err) = host.set_style(dropdown.element, ElementStyle::at(pos.left, pos.top)) {
                        log::warn!("could not position table menu: {err}");
                    }
                }
                None => log::trace!("table menu not measured yet; keeping its previous position"),
            }
        }
        st.layout = layout;
    }

    fn render_dropdown(&self, st: &mut OverlayState, entries: &[MenuEntry]) {
        self.remove_dropdown(st);
        let host = &*self.host;
        let element = host.create_element(ElementSpec {
            tag: "div",
            id: Some(DROPDOWN_ID.to_string()),
            class: Some("table-actions-dropdown"),
            role: Some("menu"),
            aria_label: Some("Table actions".to_string()),
            ..Default::default()
        });
        let mut items = Vec::new();
        for entry in entries {
            let child = match entry {
                MenuEntry::Divider => host.create_element(ElementSpec { tag: "hr", ..Default::default() }),
                MenuEntry::Action(d) => {
                    let el = host.create_element(ElementSpec {
                        tag: "button",
                        id: Some(d.action.dom_id()),
                        class: Some(if d.enabled { "item" } else { "item-disabled" }),
                        role: Some("menuitem"),
                        aria_label: Some(d.label.to_string()),
                        text: Some(d.label.to_string()),
                        test_id: Some(d.test_id),
                        disabled: !d.enabled,
                    });
                    items.push((el, d.clone()));
                    el
                }
            };
            if let Err(err) = host.append_child(element, child) {
                log::warn!("could not build table menu: {err}");
            }
        }
        if let Err(err) = host.set_style(element, ElementStyle::default().hidden()) {
            log::warn!("could not hide table menu: {err}");
        }
        if let Err(err) = host.append_child(self.anchor, element) {
            log::warn!("could not render table menu into {}: {err}", self.anchor);
        }
        st.dropdown = Some(Dropdown { element, items });
    }

    fn remove_dropdown(&self, st: &mut OverlayState) {
        if let Some(dropdown) = st.dropdown.take() {
            if let Err(err) = self.host.remove(dropdown.element) {
                log::warn!("could not remove table menu: {err}");
            }
        }
    }

    fn close(&self, st: &mut OverlayState, reason: CloseReason) -> bool {
        let closed = st.menu.close(reason);
        self.remove_dropdown(st);
        closed
    }

    fn toggle_menu(&self) -> bool {
        self.with_state(|st| {
            let open = st.menu.toggle(st.tracker.current().cell());
            if open {
                let entries = st.menu.entries(&*self.engine);
                self.render_dropdown(st, &entries);
            } else {
                self.remove_dropdown(st);
            }
            self.reposition(st);
            open
        })
        .unwrap_or(false)
    }

    fn invoke(&self, st: &mut OverlayState, action: TableAction) -> InvokeOutcome {
        let outcome = st.menu.invoke(&*self.engine, action);
        log::debug!("table action {action:?}: {outcome:?}");
        if !st.menu.is_open() {
            self.remove_dropdown(st);
        }
        if outcome == InvokeOutcome::Stale {
            st.tracker.reset();
            st.mount.park(&*self.host);
            self.stale.set(true);
        }
        outcome
    }

    fn hit(&self, st: &OverlayState, pointer: &PointerEvent) -> Hit {
        let host = &*self.host;
        let trigger = st.mount.trigger();
        if let Some(target) = pointer.target {
            if host.contains(trigger, target) {
                return Hit::Trigger;
            }
            if let Some(dropdown) = &st.dropdown {
                if let Some((_, d)) = dropdown.items.iter().find(|(el, _)| host.contains(*el, target)) {
                    return if d.enabled { Hit::Item(d.action) } else { Hit::DisabledItem };
                }
                if host.contains(dropdown.element, target) {
                    return Hit::Dropdown;
                }
            }
        }
        let on_dropdown = st
            .dropdown
            .as_ref()
            .and_then(|d| host.bounding_rect(d.element))
            .is_some_and(|r| r.contains(pointer.x, pointer.y));
        if on_dropdown {
            Hit::Dropdown
        } else {
            Hit::Outside
        }
    }

    fn on_viewport_change(&self, _event: &HostEvent) {
        self.with_state(|st| self.reposition(st));
    }

    fn on_click(&self, event: &HostEvent) {
        let HostEvent::Click(pointer) = event else {
            return;
        };
        let hit = self.state.try_borrow().map(|st| self.hit(&st, pointer)).unwrap_or(Hit::Dropdown);
        match hit {
            Hit::Trigger => {
                self.toggle_menu();
            }
            Hit::Item(action) => {
                self.with_state(|st| self.invoke(st, action));
            }
            Hit::DisabledItem | Hit::Dropdown | Hit::Outside => {}
        }
        self.schedule_refresh();
    }

    fn on_mouse_down(&self, event: &HostEvent) {
        let HostEvent::MouseDown(pointer) = event else {
            return;
        };
        self.with_state(|st| {
            if st.menu.is_open() && matches!(self.hit(st, pointer), Hit::Outside) {
                self.close(st, CloseReason::OutsideClick);
            }
        });
    }

    fn on_mouse_up(&self, _event: &HostEvent) {
        self.schedule_refresh();
    }

    fn on_key_down(&self, event: &HostEvent) {
        if matches!(event, HostEvent::KeyDown { key } if key == "Escape") {
            self.with_state(|st| self.close(st, CloseReason::Escape));
        }
    }

    fn on_cell_mutation(&self) {
        self.with_state(|st| {
            if st.mount.reconcile(&*self.host) {
                self.reposition(st);
            }
        });
    }

    fn unmount(&self) {
        self.subscriptions.borrow_mut().release();
        match self.state.try_borrow_mut() {
            Ok(mut st) => {
                st.menu.close(CloseReason::Unmount);
                self.remove_dropdown(&mut st);
                st.mount.teardown(&*self.host);
                st.tracker.reset();
            }
            Err(_) => log::warn!("table action overlay dropped while busy; elements left in place"),
        }
        log::debug!("table action overlay unmounted");
    }
}
