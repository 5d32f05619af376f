//! # ember-tui
//!
//! Minimal reactive terminal UI framework.
//!
//! ## Architecture
//!
//! Components live in an arena tree. Each one owns a widget (paint and
//! input behaviour) and an observer. The renderer paints every component
//! inside its observer, so the signals a paint routine reads become that
//! component's dependencies; changing one of them schedules the next frame.
//!
//! ```text
//! stdin → InputRouter → handlers → Signal::set → Renderer → DiffRenderer → stdout
//! ```
//!
//! ## Modules
//!
//! - [`signals`] - reactive cells and tracking scopes
//! - [`types`] - colors, cells, rects, borders
//! - [`theme`] - interaction states and styles
//! - [`tree`] - component arena, paint order, focus
//! - [`widgets`] - Text, Input, Table
//! - [`input`] - byte decoder, stdin reader, event routing
//! - [`renderer`] - frame buffer, diffing, output sinks
//! - [`runtime`] - the tick loop
//!
//! ## Example
//!
//! ```no_run
//! use ember_tui::{Component, Config, Rect, Text, Tui};
//!
//! fn main() -> ember_tui::Result<()> {
//!     let mut tui = Tui::new(Config::default())?;
//!     let root = tui.tree().root();
//!     tui.tree_mut()
//!         .add(root, Component::new(Text::new("hello")).rect(Rect::at(2, 1)))?;
//!     tui.run()
//! }
//! ```

pub mod error;
pub mod input;
pub mod renderer;
pub mod runtime;
pub mod signals;
pub mod terminal;
pub mod theme;
pub mod tree;
pub mod types;
pub mod widgets;

pub use error::{Result, TuiError};

pub use types::{Attr, BorderStyle, Cell, ClipRect, Rect, Rgba};

pub use theme::{InteractionState, Style, Theme};

pub use signals::{signal, track, untrack, Observer, Signal, Subscription, WeakSignal};

pub use tree::{Component, ComponentId, ComponentTree, PaintOrder};

pub use widgets::{Column, Input, InputTheme, PaintContext, Table, TableTheme, Text, Widget};

pub use input::{
    Dispatch, Event, EventKind, InputRouter, Key, KeyPress, Modifiers, MouseButton, MouseEvent,
    MouseKind,
};

pub use renderer::{Canvas, DiffRenderer, FrameBuffer, FrameStats, MemorySink, OutputSink, Renderer};

pub use runtime::{Config, StopHandle, TickReport, Tui};
