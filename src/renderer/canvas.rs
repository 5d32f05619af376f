//! Canvas - a component's clipped view of the frame buffer.
//!
//! Paint routines draw in local coordinates (0,0 = top-left of the
//! component's rect). Everything outside the component's effective region
//! (its rect intersected with every ancestor's) is silently dropped.

use super::buffer::FrameBuffer;
use crate::theme::Style;
use crate::types::{BorderStyle, Cell, ClipRect};

pub struct Canvas<'a> {
    buffer: &'a mut FrameBuffer,
    area: ClipRect,
    clip: ClipRect,
}

impl<'a> Canvas<'a> {
    /// `area` is the component's full rect, `clip` its effective region.
    pub fn new(buffer: &'a mut FrameBuffer, area: ClipRect, clip: ClipRect) -> Self {
        Self { buffer, area, clip }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.area.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.area.height
    }

    /// The component's absolute rect.
    pub fn area(&self) -> ClipRect {
        self.area
    }

    /// The absolute region that will actually be written.
    pub fn clip(&self) -> ClipRect {
        self.clip
    }

    fn absolute(&self, x: u16, y: u16) -> Option<(u16, u16)> {
        if x >= self.area.width || y >= self.area.height {
            return None;
        }
        Some((self.area.x.saturating_add(x), self.area.y.saturating_add(y)))
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        match self.absolute(x, y) {
            Some((ax, ay)) => self.buffer.set_cell(ax, ay, cell, Some(&self.clip)),
            None => false,
        }
    }

    /// Fill the whole area with blanks in `style`.
    pub fn fill(&mut self, style: Style) {
        self.buffer.fill_rect(self.area, style.blank(), Some(&self.clip));
    }

    /// Fill local row `y` from column `x` to the right edge.
    pub fn fill_row(&mut self, x: u16, y: u16, style: Style) {
        let Some((ax, ay)) = self.absolute(x, y) else {
            return;
        };
        let rect = ClipRect::new(ax, ay, self.area.width - x, 1);
        self.buffer.fill_rect(rect, style.blank(), Some(&self.clip));
    }

    /// Draw text at local (x, y), never spilling past the area's right edge.
    ///
    /// Returns the number of columns consumed.
    pub fn text(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        let Some((ax, ay)) = self.absolute(x, y) else {
            return 0;
        };
        let clip = ClipRect::new(ax, ay, self.area.width - x, 1).intersect(&self.clip);
        match clip {
            Some(clip) => self.buffer.draw_text(ax, ay, text, style, Some(&clip)),
            None => 0,
        }
    }

    /// Draw a border along the area's edges.
    pub fn border(&mut self, border: BorderStyle, style: Style) {
        self.buffer.draw_border(self.area, border, style, Some(&self.clip));
    }
}
