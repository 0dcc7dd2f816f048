//! In-memory host and a painter that renders table cells onto a fixed grid.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::doc::{Node, NodeKey};
use crate::engine::DocumentEngine;
use crate::geometry::{Rect, Viewport};
use crate::host::{
    ElementId, ElementSpec, ElementStyle, HostError, HostEvent, HostEventKind, HostListener, HostListenerId,
    HostSurface, MutationListener, PointerEvent, Positioning,
};
use crate::selection::Selection;
use crate::EditorCore;

const TRIGGER_SIZE: f32 = 20.0;
const MENU_WIDTH: f32 = 200.0;
const ITEM_HEIGHT: f32 = 30.0;
const DIVIDER_HEIGHT: f32 = 9.0;

struct FakeElement {
    spec: ElementSpec,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// Page coordinates set by the painter; wins over style and intrinsic size.
    rect: Option<Rect>,
    style: ElementStyle,
}

enum Task {
    Callback(Box<dyn FnOnce()>),
    Mutation(HostListenerId),
}

pub struct FakeHost {
    body: ElementId,
    next_id: Cell<u64>,
    elements: RefCell<BTreeMap<ElementId, FakeElement>>,
    viewport: Cell<Viewport>,
    native_selection: Cell<bool>,
    unmeasured: Cell<bool>,
    listeners: RefCell<Vec<(HostListenerId, HostEventKind, HostListener)>>,
    observers: RefCell<Vec<(HostListenerId, ElementId, MutationListener)>>,
    tasks: RefCell<VecDeque<Task>>,
}

impl FakeHost {
    pub fn new() -> Self {
        let body = ElementId(0);
        let mut elements = BTreeMap::new();
        elements.insert(
            body,
            FakeElement {
                spec: ElementSpec { tag: "body", ..Default::default() },
                parent: None,
                children: Vec::new(),
                rect: Some(Rect::new(0.0, 0.0, 1024.0, 2000.0)),
                style: ElementStyle::default(),
            },
        );
        Self {
            body,
            next_id: Cell::new(0),
            elements: RefCell::new(elements),
            viewport: Cell::new(Viewport::new(1024.0, 768.0)),
            native_selection: Cell::new(true),
            unmeasured: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            tasks: RefCell::new(VecDeque::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.set(self.next_id.get() + 1);
        self.next_id.get()
    }

    fn exists(&self, el: ElementId) -> bool {
        self.elements.borrow().contains_key(&el)
    }

    fn notify(&self, el: ElementId) {
        let observers = self.observers.borrow();
        let mut tasks = self.tasks.borrow_mut();
        for (id, _, _) in observers.iter().filter(|(_, target, _)| *target == el) {
            let pending = tasks.iter().any(|t| matches!(t, Task::Mutation(p) if p == id));
            if !pending {
                tasks.push_back(Task::Mutation(*id));
            }
        }
    }

    fn detach(&self, el: ElementId) -> Option<ElementId> {
        let mut elements = self.elements.borrow_mut();
        let parent = elements.get_mut(&el)?.parent.take()?;
        if let Some(p) = elements.get_mut(&parent) {
            p.children.retain(|c| *c != el);
        }
        Some(parent)
    }

    fn intrinsic_size(&self, el: ElementId) -> (f32, f32) {
        let elements = self.elements.borrow();
        let Some(node) = elements.get(&el) else {
            return (0.0, 0.0);
        };
        if node.spec.class == Some("table-cell-action-button") {
            return (TRIGGER_SIZE, TRIGGER_SIZE);
        }
        match (node.spec.tag, node.spec.role) {
            (_, Some("menu")) => {
                if self.unmeasured.get() {
                    return (0.0, 0.0);
                }
                let height = node
                    .children
                    .iter()
                    .filter_map(|c| elements.get(c))
                    .map(|c| if c.spec.tag == "hr" { DIVIDER_HEIGHT } else { ITEM_HEIGHT })
                    .sum();
                (MENU_WIDTH, height)
            }
            ("hr", _) => (MENU_WIDTH, DIVIDER_HEIGHT),
            (_, Some("menuitem")) => (MENU_WIDTH, ITEM_HEIGHT),
            _ => (0.0, 0.0),
        }
    }

    fn page_rect(&self, el: ElementId) -> Option<Rect> {
        let (rect, style, parent) = {
            let elements = self.elements.borrow();
            let node = elements.get(&el)?;
            (node.rect, node.style, node.parent)
        };
        if rect.is_some() {
            return rect;
        }
        let (w, h) = self.intrinsic_size(el);
        if style.position == Positioning::Absolute {
            if let (Some(left), Some(top)) = (style.left, style.top) {
                return Some(Rect::new(left, top, w, h));
            }
            if let (Some(right), Some(top)) = (style.right, style.top) {
                let p = self.page_rect(parent?)?;
                return Some(Rect::new(p.right() - right - w, p.top() + top, w, h));
            }
        }
        let origin = parent.and_then(|p| self.page_rect(p)).unwrap_or_default();
        Some(Rect::new(origin.x, origin.y, w, h))
    }

    // Test controls

    pub fn set_rect(&self, el: ElementId, rect: Rect) {
        if let Some(node) = self.elements.borrow_mut().get_mut(&el) {
            node.rect = Some(rect);
        }
    }

    pub fn page_rect_of(&self, el: ElementId) -> Option<Rect> {
        self.page_rect(el)
    }

    pub fn style(&self, el: ElementId) -> ElementStyle {
        self.elements.borrow().get(&el).map(|n| n.style).unwrap_or_default()
    }

    pub fn spec(&self, el: ElementId) -> Option<ElementSpec> {
        self.elements.borrow().get(&el).map(|n| n.spec.clone())
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.elements.borrow().get(&el).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn find_by_test_id(&self, test_id: &str) -> Option<ElementId> {
        self.elements
            .borrow()
            .iter()
            .find(|(_, n)| n.spec.test_id == Some(test_id) && n.parent.is_some())
            .map(|(id, _)| *id)
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }

    pub fn set_native_selection(&self, present: bool) {
        self.native_selection.set(present);
    }

    /// Dropdowns report a zero size until switched back.
    pub fn set_unmeasured(&self, unmeasured: bool) {
        self.unmeasured.set(unmeasured);
    }

    /// Drop every child of `el`, the way a framework re-render would.
    pub fn clear_children(&self, el: ElementId) {
        let children = {
            let mut elements = self.elements.borrow_mut();
            let Some(node) = elements.get_mut(&el) else {
                return;
            };
            std::mem::take(&mut node.children)
        };
        let mut elements = self.elements.borrow_mut();
        for child in children {
            if let Some(node) = elements.get_mut(&child) {
                node.parent = None;
            }
        }
        drop(elements);
        self.notify(el);
    }

    /// Live event listeners plus observers.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len() + self.observers.borrow().len()
    }

    pub fn dispatch(&self, event: &HostEvent) {
        let kind = event.kind();
        let listeners: Vec<HostListener> =
            self.listeners.borrow().iter().filter(|(_, k, _)| *k == kind).map(|(_, _, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn pointer_on(&self, el: ElementId) -> PointerEvent {
        let (x, y) = self
            .bounding_rect(el)
            .map(|r| (r.x + r.width / 2.0, r.y + r.height / 2.0))
            .unwrap_or((0.0, 0.0));
        PointerEvent { target: Some(el), x, y }
    }

    pub fn click(&self, el: ElementId) {
        let pointer = self.pointer_on(el);
        self.dispatch(&HostEvent::MouseDown(pointer));
        self.dispatch(&HostEvent::MouseUp(pointer));
        self.dispatch(&HostEvent::Click(pointer));
    }

    pub fn mouse_down_at(&self, target: Option<ElementId>, x: f32, y: f32) {
        self.dispatch(&HostEvent::MouseDown(PointerEvent { target, x, y }));
    }

    pub fn press(&self, key: &str) {
        self.dispatch(&HostEvent::KeyDown { key: key.to_string() });
    }

    pub fn run_microtasks(&self) {
        loop {
            let Some(task) = self.tasks.borrow_mut().pop_front() else {
                break;
            };
            match task {
                Task::Callback(f) => f(),
                Task::Mutation(id) => {
                    let listener =
                        self.observers.borrow().iter().find(|(o, _, _)| *o == id).map(|(_, _, l)| l.clone());
                    if let Some(listener) = listener {
                        listener();
                    }
                }
            }
        }
    }
}

impl HostSurface for FakeHost {
    fn body(&self) -> ElementId {
        self.body
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn bounding_rect(&self, el: ElementId) -> Option<Rect> {
        if !self.is_connected(el) {
            return None;
        }
        let rect = self.page_rect(el)?;
        let vp = self.viewport.get();
        Some(Rect::new(rect.x - vp.scroll_x, rect.y - vp.scroll_y, rect.width, rect.height))
    }

    fn has_native_selection(&self) -> bool {
        self.native_selection.get()
    }

    fn contains(&self, ancestor: ElementId, el: ElementId) -> bool {
        let mut cursor = Some(el);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.elements.borrow().get(&el).and_then(|n| n.parent)
    }

    fn is_connected(&self, el: ElementId) -> bool {
        self.exists(el) && self.contains(self.body, el)
    }

    fn create_element(&self, spec: ElementSpec) -> ElementId {
        let id = ElementId(self.next_id());
        self.elements.borrow_mut().insert(
            id,
            FakeElement { spec, parent: None, children: Vec::new(), rect: None, style: ElementStyle::default() },
        );
        id
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError> {
        if !self.exists(parent) {
            return Err(HostError::Missing(parent));
        }
        if !self.exists(child) {
            return Err(HostError::Missing(child));
        }
        if self.contains(child, parent) {
            return Err(HostError::InvalidParent { parent, child });
        }
        if let Some(old) = self.detach(child) {
            self.notify(old);
        }
        {
            let mut elements = self.elements.borrow_mut();
            if let Some(node) = elements.get_mut(&child) {
                node.parent = Some(parent);
            }
            if let Some(node) = elements.get_mut(&parent) {
                node.children.push(child);
            }
        }
        self.notify(parent);
        Ok(())
    }

    fn remove(&self, el: ElementId) -> Result<(), HostError> {
        if !self.exists(el) {
            return Err(HostError::Missing(el));
        }
        if let Some(old) = self.detach(el) {
            self.notify(old);
        }
        Ok(())
    }

    fn set_style(&self, el: ElementId, style: ElementStyle) -> Result<(), HostError> {
        let mut elements = self.elements.borrow_mut();
        let node = elements.get_mut(&el).ok_or(HostError::Missing(el))?;
        node.style = style;
        Ok(())
    }

    fn add_event_listener(&self, kind: HostEventKind, listener: HostListener) -> HostListenerId {
        let id = HostListenerId(self.next_id());
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    fn observe_children(&self, el: ElementId, listener: MutationListener) -> HostListenerId {
        let id = HostListenerId(self.next_id());
        self.observers.borrow_mut().push((id, el, listener));
        id
    }

    fn remove_listener(&self, id: HostListenerId) {
        self.listeners.borrow_mut().retain(|(l, _, _)| *l != id);
        self.observers.borrow_mut().retain(|(o, _, _)| *o != id);
    }

    fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
        self.tasks.borrow_mut().push_back(Task::Callback(task));
    }
}

/// Page rect of a painted cell: tables stacked 400px apart, 120x40 cells.
pub fn cell_rect(table: usize, row: usize, col: usize) -> Rect {
    Rect::new(100.0 + col as f32 * 120.0, 100.0 + table as f32 * 400.0 + row as f32 * 40.0, 120.0, 40.0)
}

fn paint(editor: &EditorCore, host: &FakeHost, root: ElementId, painted: &RefCell<HashMap<NodeKey, ElementId>>) {
    let Ok(cells) = editor.read(|s| {
        s.doc
            .tables()
            .enumerate()
            .flat_map(|(t, table)| {
                table.rows.iter().enumerate().flat_map(move |(r, row)| {
                    row.cells.iter().enumerate().map(move |(c, cell)| (cell.key, cell_rect(t, r, c)))
                })
            })
            .collect::<Vec<_>>()
    }) else {
        return;
    };
    let live: HashSet<NodeKey> = cells.iter().map(|(key, _)| *key).collect();
    let mut painted = painted.borrow_mut();
    painted.retain(|key, el| {
        let keep = live.contains(key);
        if !keep {
            let _ = host.remove(*el);
        }
        keep
    });
    for (key, rect) in cells {
        let el = match editor.element_by_key(key) {
            Some(el) => el,
            None => {
                let el = host.create_element(ElementSpec { tag: "td", ..Default::default() });
                host.append_child(root, el).unwrap();
                editor.mount_element(key, el);
                painted.insert(key, el);
                el
            }
        };
        host.set_rect(el, rect);
    }
}

/// An editor holding a paragraph followed by one table, painted into a
/// [`FakeHost`].
pub struct Fixture {
    pub editor: Rc<EditorCore>,
    pub host: Rc<FakeHost>,
    pub root: ElementId,
    painted: Rc<RefCell<HashMap<NodeKey, ElementId>>>,
}

impl Fixture {
    pub fn with_table(rows: usize, cols: usize) -> Self {
        let editor = Rc::new(EditorCore::new_empty());
        let host = Rc::new(FakeHost::new());
        let root = host.create_element(ElementSpec { tag: "div", class: Some("editor-root"), ..Default::default() });
        host.append_child(host.body(), root).unwrap();
        host.set_rect(root, Rect::new(0.0, 0.0, 1024.0, 2000.0));
        editor.set_root_element(Some(root));

        let painted = Rc::new(RefCell::new(HashMap::new()));
        let weak = Rc::downgrade(&editor);
        let (h, p) = (host.clone(), painted.clone());
        editor.register_reconciler(Rc::new(move || {
            if let Some(editor) = weak.upgrade() {
                paint(&editor, &h, root, &p);
            }
        }));

        editor.insert_paragraph("Intro").unwrap();
        editor.insert_table(rows, cols).unwrap();
        editor.clear_history();
        Self { editor, host, root, painted }
    }

    pub fn cell(&self, row: usize, col: usize) -> NodeKey {
        self.editor.cell_key(0, row, col).unwrap()
    }

    pub fn element(&self, row: usize, col: usize) -> ElementId {
        self.editor.element_by_key(self.cell(row, col)).unwrap()
    }

    pub fn select(&self, row: usize, col: usize) -> NodeKey {
        self.editor.select_cell(0, row, col).unwrap().unwrap()
    }

    pub fn select_paragraph(&self) {
        let paragraph = self
            .editor
            .read(|s| {
                s.doc.nodes.iter().find_map(|n| match n {
                    Node::Paragraph { key, .. } => Some(*key),
                    Node::Table(_) => None,
                })
            })
            .unwrap()
            .unwrap();
        self.editor.set_selection(Some(Selection::caret(paragraph, 0))).unwrap();
    }

    /// Shape of the first table, `(rows, columns)`.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.editor
            .read(|s| s.doc.tables().next().map(|t| (t.row_count(), t.column_count())))
            .unwrap()
    }

    /// Swap the cell's element for a fresh one at the same place.
    pub fn repaint_cell(&self, cell: NodeKey) -> ElementId {
        let old = self.editor.element_by_key(cell).unwrap();
        let rect = self.host.page_rect_of(old).unwrap();
        self.host.remove(old).unwrap();
        let el = self.host.create_element(ElementSpec { tag: "td", ..Default::default() });
        self.host.append_child(self.root, el).unwrap();
        self.host.set_rect(el, rect);
        self.editor.mount_element(cell, el);
        self.painted.borrow_mut().insert(cell, el);
        el
    }
}
