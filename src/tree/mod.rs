//! Component tree - arena of components composed under a root.
//!
//! Components live in slots addressed by [`ComponentId`]. Freed slots are
//! recycled through a free list, so an id is only meaningful while the
//! component it names is alive. Slot 0 is the root, which always covers the
//! whole terminal and can neither be moved nor removed.
//!
//! # Paint order
//!
//! [`ComponentTree::paint_order`] lists every component reachable from the
//! root, stable-sorted by z-index with ties broken by pre-order position.
//! Later entries paint on top.
//!
//! # Coordinates
//!
//! Rects are absolute screen coordinates. A component's effective region is
//! its own rect intersected with every ancestor's, so children never paint
//! outside their parents.

mod focus;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, TuiError};
use crate::input::{Event, EventKind, KeyPress, MouseEvent};
use crate::signals::Observer;
use crate::theme::{InteractionState, Theme};
use crate::types::{ClipRect, Rect};
use crate::widgets::{PaintContext, Screen, Widget};

/// Event handler attached to a component. Events are lent, never owned.
pub type Handler = Rc<dyn Fn(&Event)>;

// =============================================================================
// ComponentId
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    pub const ROOT: Self = Self(0);

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Component (builder)
// =============================================================================

/// Everything needed to create a component.
pub struct Component {
    rect: Rect,
    z_index: i32,
    theme: Theme,
    focusable: Option<bool>,
    visible: bool,
    disabled: bool,
    widget: Box<dyn Widget>,
}

impl Component {
    pub fn new(widget: impl Widget + 'static) -> Self {
        Self {
            rect: Rect::default(),
            z_index: 0,
            theme: Theme::default(),
            focusable: None,
            visible: true,
            disabled: false,
            widget: Box::new(widget),
        }
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Override the widget's own focusability.
    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = Some(focusable);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("rect", &self.rect)
            .field("z_index", &self.z_index)
            .field("visible", &self.visible)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Node
// =============================================================================

struct Node {
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    rect: Rect,
    z_index: i32,
    theme: Theme,
    focusable: Option<bool>,
    visible: bool,
    disabled: bool,
    widget: Box<dyn Widget>,
    observer: Observer,
    handlers: Vec<(EventKind, Handler)>,
}

impl Node {
    fn new(component: Component, redraw: &Rc<Cell<bool>>) -> Self {
        let flag = redraw.clone();
        Self {
            parent: None,
            children: Vec::new(),
            rect: component.rect,
            z_index: component.z_index,
            theme: component.theme,
            focusable: component.focusable,
            visible: component.visible,
            disabled: component.disabled,
            widget: component.widget,
            observer: Observer::with_callback(move || flag.set(true)),
            handlers: Vec::new(),
        }
    }
}

// =============================================================================
// PaintOrder
// =============================================================================

/// Finite, restartable paint-order iterator. Clone it to walk again.
#[derive(Debug, Clone)]
pub struct PaintOrder {
    ids: std::vec::IntoIter<ComponentId>,
}

impl Iterator for PaintOrder {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        self.ids.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for PaintOrder {
    fn next_back(&mut self) -> Option<ComponentId> {
        self.ids.next_back()
    }
}

impl ExactSizeIterator for PaintOrder {}

// =============================================================================
// ComponentTree
// =============================================================================

pub struct ComponentTree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    focused: Option<ComponentId>,
    active: Option<ComponentId>,
    /// Set by observers and structural changes; cleared by the renderer.
    redraw: Rc<Cell<bool>>,
}

impl ComponentTree {
    /// A tree holding only the root, sized to the terminal.
    pub fn new(width: u16, height: u16) -> Self {
        let redraw = Rc::new(Cell::new(true));
        let root = Node::new(
            Component::new(Screen).rect(Rect::new(0, 0, width, height)),
            &redraw,
        );
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            focused: None,
            active: None,
            redraw,
        }
    }

    #[inline]
    pub fn root(&self) -> ComponentId {
        ComponentId::ROOT
    }

    /// Root size, i.e. the terminal size.
    pub fn size(&self) -> (u16, u16) {
        let rect = self.root_node().rect;
        (rect.width.unwrap_or(0), rect.height.unwrap_or(0))
    }

    /// Resize the root to the new terminal size.
    pub fn resize(&mut self, width: u16, height: u16) {
        if let Some(root) = self.nodes[0].as_mut() {
            root.rect = Rect::new(0, 0, width, height);
        }
        self.request_redraw();
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.node(id).is_some()
    }

    fn root_node(&self) -> &Node {
        match self.nodes.first() {
            Some(Some(root)) => root,
            _ => unreachable!("root slot is never freed"),
        }
    }

    fn node(&self, id: ComponentId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: ComponentId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn require(&self, id: ComponentId) -> Result<&Node> {
        self.node(id).ok_or(TuiError::UnknownComponent(id))
    }

    fn require_mut(&mut self, id: ComponentId) -> Result<&mut Node> {
        self.node_mut(id).ok_or(TuiError::UnknownComponent(id))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Create a component and attach it under `parent`.
    pub fn add(&mut self, parent: ComponentId, component: Component) -> Result<ComponentId> {
        self.require(parent)?;
        let id = self.insert(component);
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Create a component with no parent. It is not painted until attached.
    pub fn insert(&mut self, component: Component) -> ComponentId {
        let node = Node::new(component, &self.redraw);
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                index
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        ComponentId(index)
    }

    /// Make `child` the last child of `parent`, re-parenting if needed.
    ///
    /// Fails without touching the tree when `child` is `parent` or one of
    /// its ancestors.
    pub fn attach(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.require(parent)?;
        self.require(child)?;
        if child == ComponentId::ROOT {
            return Err(TuiError::RootImmovable);
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TuiError::Cycle { child, parent });
        }

        self.unlink(child);
        self.require_mut(parent)?.children.push(child);
        self.require_mut(child)?.parent = Some(parent);
        self.request_redraw();
        Ok(())
    }

    /// Remove `child` from its parent. Its descendants stay attached to it.
    pub fn detach(&mut self, child: ComponentId) -> Result<()> {
        self.require(child)?;
        if child == ComponentId::ROOT {
            return Err(TuiError::RootImmovable);
        }
        self.unlink(child);
        self.request_redraw();
        Ok(())
    }

    /// Detach `id` and free it together with its whole subtree.
    pub fn remove(&mut self, id: ComponentId) -> Result<()> {
        self.require(id)?;
        if id == ComponentId::ROOT {
            return Err(TuiError::RootImmovable);
        }
        self.unlink(id);

        for dead in self.pre_order_from(id) {
            if self.focused == Some(dead) {
                self.focused = None;
            }
            if self.active == Some(dead) {
                self.active = None;
            }
            self.nodes[dead.0] = None;
            self.free.push(dead.0);
        }
        self.request_redraw();
        Ok(())
    }

    fn unlink(&mut self, child: ComponentId) {
        let Some(parent) = self.node_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|c| *c != child);
        }
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Components reachable from the root, parents before children.
    pub fn pre_order(&self) -> Vec<ComponentId> {
        self.pre_order_from(ComponentId::ROOT)
    }

    fn pre_order_from(&self, start: ComponentId) -> Vec<ComponentId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Components in the order they are painted (bottom first).
    pub fn paint_order(&self) -> PaintOrder {
        let mut ids = self.pre_order();
        // Stable: equal z keeps pre-order position.
        ids.sort_by_key(|id| self.node(*id).map_or(0, |n| n.z_index));
        PaintOrder {
            ids: ids.into_iter(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn rect(&self, id: ComponentId) -> Option<Rect> {
        self.node(id).map(|n| n.rect)
    }

    /// Replace the rect wholesale.
    pub fn set_rect(&mut self, id: ComponentId, rect: Rect) -> Result<()> {
        if id == ComponentId::ROOT {
            return Err(TuiError::RootImmovable);
        }
        self.require_mut(id)?.rect = rect;
        self.request_redraw();
        Ok(())
    }

    pub fn z_index(&self, id: ComponentId) -> Option<i32> {
        self.node(id).map(|n| n.z_index)
    }

    pub fn set_z_index(&mut self, id: ComponentId, z_index: i32) -> Result<()> {
        self.require_mut(id)?.z_index = z_index;
        self.request_redraw();
        Ok(())
    }

    pub fn theme(&self, id: ComponentId) -> Option<Theme> {
        self.node(id).map(|n| n.theme)
    }

    pub fn set_theme(&mut self, id: ComponentId, theme: Theme) -> Result<()> {
        self.require_mut(id)?.theme = theme;
        self.request_redraw();
        Ok(())
    }

    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        self.require_mut(id)?.visible = visible;
        if !visible {
            self.drop_interaction_within(id);
        }
        self.request_redraw();
        Ok(())
    }

    pub fn set_disabled(&mut self, id: ComponentId, disabled: bool) -> Result<()> {
        self.require_mut(id)?.disabled = disabled;
        if disabled {
            self.drop_interaction_within(id);
        }
        self.request_redraw();
        Ok(())
    }

    fn drop_interaction_within(&mut self, id: ComponentId) {
        if self.focused.is_some_and(|f| !self.is_focusable(f)) {
            tracing::debug!(component = %id, "focus dropped");
            self.focused = None;
        }
        if self.active.is_some_and(|a| a == id || self.is_ancestor(id, a)) {
            self.active = None;
        }
    }

    /// Visible itself and through every ancestor.
    pub fn is_visible(&self, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.node(c) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Disabled itself or through an ancestor.
    pub fn is_disabled(&self, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.node(c) {
                Some(node) if node.disabled => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    /// Can take keyboard focus right now.
    pub fn is_focusable(&self, id: ComponentId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let wants = node.focusable.unwrap_or_else(|| node.widget.focusable());
        wants && self.is_visible(id) && !self.is_disabled(id)
    }

    pub fn widget(&self, id: ComponentId) -> Option<&dyn Widget> {
        self.node(id).map(|n| n.widget.as_ref())
    }

    pub fn observer(&self, id: ComponentId) -> Option<&Observer> {
        self.node(id).map(|n| &n.observer)
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// The component's rect with missing dimensions taken from its widget.
    pub fn resolved_rect(&self, id: ComponentId) -> Option<ClipRect> {
        let node = self.node(id)?;
        let content = match (node.rect.width, node.rect.height) {
            (Some(w), Some(h)) => (w, h),
            _ => node.widget.measure(),
        };
        Some(node.rect.resolve(content))
    }

    /// Resolved rect clipped by every ancestor. None when nothing remains.
    pub fn effective_rect(&self, id: ComponentId) -> Option<ClipRect> {
        let mut region = self.resolved_rect(id)?;
        let mut current = self.parent(id);
        while let Some(p) = current {
            region = region.intersect(&self.resolved_rect(p)?)?;
            current = self.parent(p);
        }
        if region.is_empty() { None } else { Some(region) }
    }

    /// Topmost visible, mouse-capable component under (column, row).
    pub fn hit_test(&self, column: u16, row: u16) -> Option<ComponentId> {
        self.paint_order().rev().find(|id| {
            self.is_visible(*id)
                && self.widget(*id).is_some_and(|w| w.handles_mouse())
                && self.effective_rect(*id).is_some_and(|r| r.contains(column, row))
        })
    }

    // =========================================================================
    // Interaction State
    // =========================================================================

    pub fn focused(&self) -> Option<ComponentId> {
        self.focused
    }

    pub fn active(&self) -> Option<ComponentId> {
        self.active
    }

    /// Mark `id` active (mouse button held on it), or clear with `None`.
    pub fn set_active(&mut self, id: Option<ComponentId>) {
        if self.active != id {
            self.active = id;
            self.request_redraw();
        }
    }

    pub fn interaction_state(&self, id: ComponentId) -> InteractionState {
        InteractionState::resolve(
            self.is_disabled(id),
            self.active == Some(id),
            self.focused == Some(id),
        )
    }

    /// Theme resolved for this frame's interaction state.
    pub fn paint_context(&self, id: ComponentId) -> Option<PaintContext> {
        let node = self.node(id)?;
        let state = self.interaction_state(id);
        Some(PaintContext {
            state,
            style: node.theme.resolve(state),
        })
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Register a handler for `kind`. Handlers run in registration order.
    pub fn on(
        &mut self,
        id: ComponentId,
        kind: EventKind,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<()> {
        self.require_mut(id)?.handlers.push((kind, Rc::new(handler)));
        Ok(())
    }

    pub fn on_key(&mut self, id: ComponentId, handler: impl Fn(&KeyPress) + 'static) -> Result<()> {
        self.on(id, EventKind::KeyPress, move |event| {
            if let Event::KeyPress(key) = event {
                handler(key);
            }
        })
    }

    pub fn on_mouse(
        &mut self,
        id: ComponentId,
        handler: impl Fn(&MouseEvent) + 'static,
    ) -> Result<()> {
        self.on(id, EventKind::Mouse, move |event| {
            if let Event::Mouse(mouse) = event {
                handler(mouse);
            }
        })
    }

    /// Handlers for `kind`, cloned out so the tree is free while they run.
    pub fn handlers(&self, id: ComponentId, kind: EventKind) -> Vec<Handler> {
        self.node(id)
            .map(|n| {
                n.handlers
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, h)| h.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Redraw Tracking
    // =========================================================================

    pub fn request_redraw(&self) {
        self.redraw.set(true);
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw.get()
    }

    /// Read and clear the redraw flag.
    pub fn take_redraw(&self) -> bool {
        self.redraw.replace(false)
    }
}

impl fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTree")
            .field("len", &self.len())
            .field("focused", &self.focused)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
