//! Widgets - the paint and input behaviour attached to components.
//!
//! A widget is a cheap handle around signals: cloning an [`Input`] gives a
//! second handle onto the same text and cursor, which is how applications
//! keep access to a widget after handing it to the tree.
//!
//! - [`Text`] - static label bound to a `Signal<String>`
//! - [`Input`] - single-line text entry
//! - [`Table`] - scrollable rows with a selected row

mod input;
mod table;
mod text;

pub use input::{Input, InputTheme};
pub use table::{Column, Table, TableTheme};
pub use text::Text;

use crate::input::{KeyPress, MouseEvent};
use crate::renderer::Canvas;
use crate::theme::{InteractionState, Style};
use crate::types::ClipRect;

/// Per-frame data handed to a paint routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintContext {
    /// The single interaction state resolved for this frame.
    pub state: InteractionState,
    /// The component theme resolved for `state`.
    pub style: Style,
}

/// Paint and input behaviour of a component.
///
/// Paint runs inside the component's tracking scope: signals read with
/// `get` become dependencies, signals read with `peek` do not.
pub trait Widget {
    fn paint(&self, canvas: &mut Canvas<'_>, ctx: &PaintContext);

    /// Content size used when the component rect leaves a dimension unset.
    fn measure(&self) -> (u16, u16) {
        (0, 0)
    }

    fn focusable(&self) -> bool {
        false
    }

    /// Mouse capability. Hit-testing skips widgets that return false.
    fn handles_mouse(&self) -> bool {
        false
    }

    /// Built-in key handling. Returns true if the key was consumed.
    fn on_key(&self, _key: &KeyPress, _area: ClipRect) -> bool {
        false
    }

    /// Built-in mouse handling. `local` is relative to `area`.
    fn on_mouse(&self, _mouse: &MouseEvent, _local: (u16, u16), _area: ClipRect) -> bool {
        false
    }
}

/// The root's widget: paints nothing, the renderer already cleared the frame.
pub(crate) struct Screen;

impl Widget for Screen {
    fn paint(&self, _canvas: &mut Canvas<'_>, _ctx: &PaintContext) {}
}
