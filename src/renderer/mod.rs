//! Renderer - component tree to terminal bytes.
//!
//! The renderer only knows cells. Each frame it:
//!
//! 1. Clears the frame buffer to the base style
//! 2. Paints every visible component in paint order, each inside its own
//!    tracking scope and clipped to its effective region
//! 3. Diffs the frame against the previous one ([`DiffRenderer`])
//!
//! Frames are skipped entirely while nothing is dirty: no signal a paint
//! read has changed, the tree is structurally unchanged and nobody called
//! [`Renderer::invalidate`].

pub mod buffer;
pub mod canvas;
pub mod diff;
pub mod output;
pub mod sink;

pub use buffer::{char_width, string_width, FrameBuffer};
pub use canvas::Canvas;
pub use diff::{DiffRenderer, FrameStats};
pub use output::StatefulCellRenderer;
pub use sink::{MemorySink, OutputSink, TerminalWriter};

use std::io;

use crate::signals::track;
use crate::theme::Style;
use crate::tree::ComponentTree;

pub struct Renderer {
    buffer: FrameBuffer,
    diff: DiffRenderer,
    base: Style,
    invalidated: bool,
}

impl Renderer {
    pub fn new(width: u16, height: u16, base: Style) -> Self {
        Self {
            buffer: FrameBuffer::filled(width, height, base.blank()),
            diff: DiffRenderer::new(),
            base,
            invalidated: true,
        }
    }

    /// The last composed frame.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn base(&self) -> Style {
        self.base
    }

    /// Force the next frame to be a full redraw.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
        self.diff.invalidate();
    }

    /// Resize the frame buffer. The next frame is a full redraw.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.buffer.resize(width, height, self.base.blank());
        self.invalidate();
    }

    /// True when the next [`render`](Self::render) would produce a frame.
    pub fn is_dirty(&self, tree: &ComponentTree) -> bool {
        self.invalidated || tree.needs_redraw() || !self.diff.has_previous()
    }

    /// Compose and diff one frame.
    ///
    /// Returns the frame's stats and its encoded bytes. Both are empty when
    /// nothing changed.
    pub fn render(&mut self, tree: &ComponentTree) -> io::Result<(FrameStats, Vec<u8>)> {
        let (width, height) = tree.size();
        if (width, height) != (self.buffer.width(), self.buffer.height()) {
            self.resize(width, height);
        }

        if !self.is_dirty(tree) {
            return Ok((FrameStats::default(), Vec::new()));
        }
        tree.take_redraw();
        self.invalidated = false;

        self.compose(tree);

        let mut out = Vec::new();
        let stats = self.diff.render(&self.buffer, &mut out)?;
        tracing::trace!(
            changed = stats.changed_cells,
            bytes = stats.bytes,
            full = stats.full_redraw,
            "frame rendered"
        );
        Ok((stats, out))
    }

    /// Paint the tree into the frame buffer without diffing.
    pub fn compose(&mut self, tree: &ComponentTree) {
        self.buffer.fill(self.base.blank());

        for id in tree.paint_order() {
            let Some(observer) = tree.observer(id) else {
                continue;
            };
            if !tree.is_visible(id) {
                // Hidden components should not schedule frames.
                observer.clear_dependencies();
                continue;
            }
            let (Some(widget), Some(area), Some(ctx)) =
                (tree.widget(id), tree.resolved_rect(id), tree.paint_context(id))
            else {
                continue;
            };
            let Some(clip) = tree.effective_rect(id) else {
                observer.clear_dependencies();
                continue;
            };

            let mut ctx = ctx;
            ctx.style = ctx.style.over(self.base);
            let mut canvas = Canvas::new(&mut self.buffer, area, clip);
            track(observer, || widget.paint(&mut canvas, &ctx));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
