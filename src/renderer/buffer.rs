//! FrameBuffer and drawing primitives.
//!
//! The FrameBuffer is a 2D grid of Cells that represents what should be
//! displayed on the terminal. All drawing operations work on this buffer.
//!
//! # Design Decisions
//!
//! - **Flat storage**: `Vec<Cell>` with row-major indexing.
//! - **Clipping**: drawing functions accept an optional `ClipRect`.
//! - **Wide characters**: emoji and CJK glyphs write a continuation cell
//!   (`char == 0`) to their right. A wide glyph that would straddle the clip
//!   edge is replaced by a space.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::theme::Style;
use crate::types::{BorderStyle, Cell, ClipRect};

// =============================================================================
// FrameBuffer
// =============================================================================

/// A 2D buffer of terminal cells.
///
/// Uses flat storage with row-major indexing: `index = y * width + x`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a new buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        Self::filled(width, height, Cell::default())
    }

    /// Create a new buffer where every cell is `cell`.
    pub fn filled(width: u16, height: u16, cell: Cell) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![cell; size],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Get the full buffer bounds as a ClipRect.
    #[inline]
    pub fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Get a cell reference (returns None if out of bounds).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate over cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let width = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let x = (i % width) as u16;
            let y = (i / width) as u16;
            (x, y, cell)
        })
    }

    /// Overwrite every cell.
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Resize the buffer, filling it with `cell`.
    pub fn resize(&mut self, width: u16, height: u16, cell: Cell) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width as usize * height as usize, cell);
    }

    /// Text of row `y` with continuation cells skipped. Test helper mostly.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .filter(|cell| cell.char != 0)
            .filter_map(|cell| char::from_u32(cell.char))
            .collect()
    }

    // =========================================================================
    // Drawing Primitives
    // =========================================================================

    /// Set a single cell with optional clipping.
    ///
    /// Returns true if the cell was set.
    pub fn set_cell(&mut self, x: u16, y: u16, cell: Cell, clip: Option<&ClipRect>) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        if let Some(clip) = clip {
            if !clip.contains(x, y) {
                return false;
            }
        }
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        true
    }

    /// Fill a rectangle with `cell`.
    pub fn fill_rect(&mut self, rect: ClipRect, cell: Cell, clip: Option<&ClipRect>) {
        let area = match clip {
            Some(clip) => rect.intersect(clip),
            None => Some(rect),
        };
        let Some(area) = area.and_then(|a| a.intersect(&self.bounds())) else {
            return;
        };

        for row in area.y..area.bottom() {
            let start = self.index(area.x, row);
            let end = self.index(area.right(), row);
            self.cells[start..end].fill(cell);
        }
    }

    /// Draw text at a position.
    ///
    /// Returns the number of columns consumed (handles wide characters).
    pub fn draw_text(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        style: Style,
        clip: Option<&ClipRect>,
    ) -> u16 {
        let mut col = x;

        for ch in text.chars() {
            if col >= self.width {
                break;
            }

            let width = char_width(ch);
            if width == 0 {
                continue;
            }

            if width == 2 {
                let next = col.saturating_add(1);
                let fits = next < self.width && clip.is_none_or(|c| c.contains(next, y));
                if fits {
                    self.set_cell(col, y, style.cell(ch), clip);
                    self.set_cell(next, y, Cell { char: 0, ..style.blank() }, clip);
                } else {
                    self.set_cell(col, y, style.blank(), clip);
                }
            } else {
                self.set_cell(col, y, style.cell(ch), clip);
            }

            col = col.saturating_add(width as u16);
        }

        col.saturating_sub(x)
    }

    /// Draw a border around a rectangle.
    pub fn draw_border(
        &mut self,
        rect: ClipRect,
        border: BorderStyle,
        style: Style,
        clip: Option<&ClipRect>,
    ) {
        if rect.width < 2 || rect.height < 2 || border == BorderStyle::None {
            return;
        }

        let (horiz, vert, tl, tr, br, bl) = border.chars();
        let x2 = rect.right() - 1;
        let y2 = rect.bottom() - 1;

        self.set_cell(rect.x, rect.y, style.cell(tl), clip);
        self.set_cell(x2, rect.y, style.cell(tr), clip);
        self.set_cell(x2, y2, style.cell(br), clip);
        self.set_cell(rect.x, y2, style.cell(bl), clip);

        for col in (rect.x + 1)..x2 {
            self.set_cell(col, rect.y, style.cell(horiz), clip);
            self.set_cell(col, y2, style.cell(horiz), clip);
        }

        for row in (rect.y + 1)..y2 {
            self.set_cell(rect.x, row, style.cell(vert), clip);
            self.set_cell(x2, row, style.cell(vert), clip);
        }
    }
}

// =============================================================================
// Text Width Utilities
// =============================================================================

/// Display width of a character (control characters are 0).
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Display width of a string.
pub fn string_width(s: &str) -> usize {
    s.width()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attr, Rgba};

    #[test]
    fn test_framebuffer_creation() {
        let buf = FrameBuffer::new(80, 24);
        assert_eq!(buf.width(), 80);
        assert_eq!(buf.height(), 24);
        assert_eq!(buf.cells().len(), 80 * 24);
    }

    #[test]
    fn test_framebuffer_set_cell() {
        let mut buf = FrameBuffer::new(10, 10);
        let cell = Style::new().fg(Rgba::RED).cell('A');
        assert!(buf.set_cell(5, 5, cell, None));
        assert_eq!(buf.get(5, 5).map(|c| c.char), Some('A' as u32));
        assert!(!buf.set_cell(10, 0, cell, None));
    }

    #[test]
    fn test_set_cell_respects_clip() {
        let mut buf = FrameBuffer::new(10, 10);
        let clip = ClipRect::new(0, 0, 3, 3);
        assert!(!buf.set_cell(4, 4, Style::new().cell('x'), Some(&clip)));
        assert_eq!(buf.get(4, 4), Some(&Cell::default()));
    }

    #[test]
    fn test_framebuffer_fill_rect() {
        let mut buf = FrameBuffer::new(10, 10);
        let cell = Style::new().bg(Rgba::BLUE).blank();
        buf.fill_rect(ClipRect::new(2, 2, 20, 3), cell, None);
        assert_eq!(buf.get(2, 2).map(|c| c.bg), Some(Rgba::BLUE));
        assert_eq!(buf.get(9, 4).map(|c| c.bg), Some(Rgba::BLUE));
        assert_eq!(buf.get(1, 2).map(|c| c.bg), Some(Rgba::TERMINAL_DEFAULT));
        assert_eq!(buf.get(2, 5).map(|c| c.bg), Some(Rgba::TERMINAL_DEFAULT));
    }

    #[test]
    fn test_draw_text() {
        let mut buf = FrameBuffer::new(20, 1);
        let used = buf.draw_text(0, 0, "Hello", Style::new().bold(), None);
        assert_eq!(used, 5);
        assert_eq!(buf.row_text(0).trim_end(), "Hello");
        assert!(buf.get(0, 0).is_some_and(|c| c.attrs.contains(Attr::BOLD)));
    }

    #[test]
    fn test_draw_text_clips() {
        let mut buf = FrameBuffer::new(20, 1);
        let clip = ClipRect::new(0, 0, 3, 1);
        buf.draw_text(0, 0, "Hello", Style::new(), Some(&clip));
        assert_eq!(buf.row_text(0).trim_end(), "Hel");
    }

    #[test]
    fn test_wide_char_continuation() {
        let mut buf = FrameBuffer::new(4, 1);
        let used = buf.draw_text(0, 0, "日a", Style::new(), None);
        assert_eq!(used, 3);
        assert_eq!(buf.get(1, 0).map(|c| c.char), Some(0));
        assert_eq!(buf.row_text(0), "日a ");
    }

    #[test]
    fn test_wide_char_at_clip_edge_becomes_space() {
        let mut buf = FrameBuffer::new(4, 1);
        let clip = ClipRect::new(0, 0, 1, 1);
        buf.draw_text(0, 0, "日", Style::new(), Some(&clip));
        assert_eq!(buf.get(0, 0).map(|c| c.char), Some(' ' as u32));
    }

    #[test]
    fn test_draw_border_rounded() {
        let mut buf = FrameBuffer::new(4, 3);
        buf.draw_border(buf.bounds(), BorderStyle::Rounded, Style::new(), None);
        assert_eq!(buf.row_text(0), "╭──╮");
        assert_eq!(buf.row_text(1), "│  │");
        assert_eq!(buf.row_text(2), "╰──╯");
    }

    #[test]
    fn test_string_width() {
        assert_eq!(string_width("Hello"), 5);
        assert_eq!(string_width("日本"), 4);
        assert_eq!(char_width('\x07'), 0);
    }
}
