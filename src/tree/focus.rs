//! Focus - the single keyboard focus pointer and Tab cycling.
//!
//! Focus cycles among visible, enabled, focusable components in paint order,
//! wrapping at both ends. At most one component is focused; the pointer may
//! also be empty.

use super::{ComponentId, ComponentTree};

impl ComponentTree {
    /// Focusable components in paint order.
    pub fn focusable_ids(&self) -> Vec<ComponentId> {
        self.paint_order().filter(|id| self.is_focusable(*id)).collect()
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.focused == Some(id)
    }

    /// Focus a specific component. Returns false if it cannot take focus.
    pub fn focus(&mut self, id: ComponentId) -> bool {
        if !self.is_focusable(id) {
            return false;
        }
        self.set_focus(Some(id));
        true
    }

    /// Clear focus (no component focused).
    pub fn blur(&mut self) {
        self.set_focus(None);
    }

    /// Move focus to the next focusable component.
    pub fn focus_next(&mut self) -> bool {
        self.cycle(1)
    }

    /// Move focus to the previous focusable component.
    pub fn focus_previous(&mut self) -> bool {
        self.cycle(-1)
    }

    pub fn focus_first(&mut self) -> bool {
        match self.focusable_ids().first() {
            Some(id) => self.focus(*id),
            None => false,
        }
    }

    pub fn focus_last(&mut self) -> bool {
        match self.focusable_ids().last() {
            Some(id) => self.focus(*id),
            None => false,
        }
    }

    fn cycle(&mut self, direction: isize) -> bool {
        let ids = self.focusable_ids();
        if ids.is_empty() {
            return false;
        }

        let len = ids.len() as isize;
        let next = match self.focused.and_then(|f| ids.iter().position(|id| *id == f)) {
            Some(pos) => ids[(pos as isize + direction).rem_euclid(len) as usize],
            None if direction > 0 => ids[0],
            None => ids[ids.len() - 1],
        };

        if self.focused == Some(next) {
            return false;
        }
        self.set_focus(Some(next));
        true
    }

    fn set_focus(&mut self, id: Option<ComponentId>) {
        if self.focused == id {
            return;
        }
        tracing::debug!(
            from = ?self.focused.map(|f| f.index()),
            to = ?id.map(|t| t.index()),
            "focus changed"
        );
        self.focused = id;
        self.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{Component, ComponentTree};
    use crate::types::Rect;
    use crate::widgets::{Input, Text};

    #[test]
    fn test_focus_cycles_in_paint_order() {
        let mut tree = ComponentTree::new(80, 24);
        let root = tree.root();
        let a = tree.add(root, Component::new(Input::new()).rect(Rect::new(0, 0, 10, 1))).unwrap();
        tree.add(root, Component::new(Text::new("label"))).unwrap();
        let b = tree
            .add(root, Component::new(Input::new()).rect(Rect::new(0, 1, 10, 1)).z_index(-1))
            .unwrap();

        assert_eq!(tree.focusable_ids(), vec![b, a]);
        assert!(tree.focus_next());
        assert_eq!(tree.focused(), Some(b));
        assert!(tree.focus_next());
        assert_eq!(tree.focused(), Some(a));
        assert!(tree.focus_next());
        assert_eq!(tree.focused(), Some(b));
        assert!(tree.focus_previous());
        assert_eq!(tree.focused(), Some(a));
    }

    #[test]
    fn test_focus_rejects_unfocusable() {
        let mut tree = ComponentTree::new(80, 24);
        let root = tree.root();
        let label = tree.add(root, Component::new(Text::new("x"))).unwrap();
        let disabled = tree
            .add(root, Component::new(Input::new()).rect(Rect::new(0, 0, 5, 1)).disabled(true))
            .unwrap();

        assert!(!tree.focus(label));
        assert!(!tree.focus(disabled));
        assert!(!tree.focus_next());
        assert_eq!(tree.focused(), None);
    }

    #[test]
    fn test_single_focusable_does_not_change() {
        let mut tree = ComponentTree::new(80, 24);
        let root = tree.root();
        let a = tree.add(root, Component::new(Input::new()).rect(Rect::new(0, 0, 5, 1))).unwrap();
        assert!(tree.focus_first());
        assert!(!tree.focus_next());
        assert_eq!(tree.focused(), Some(a));
    }

    #[test]
    fn test_hiding_drops_focus() {
        let mut tree = ComponentTree::new(80, 24);
        let root = tree.root();
        let a = tree.add(root, Component::new(Input::new()).rect(Rect::new(0, 0, 5, 1))).unwrap();
        tree.focus(a);
        tree.set_visible(a, false).unwrap();
        assert_eq!(tree.focused(), None);
        tree.blur();
        assert!(!tree.is_focused(a));
    }
}
