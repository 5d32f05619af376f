//! Stateful cell output.
//!
//! Escape sequences are produced by crossterm commands queued into a byte
//! batch. The renderer tracks the last cursor position, colors and
//! attributes it emitted and only queues commands for state that changed.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};

use crate::types::{Attr, Cell, Rgba};

// =============================================================================
// Color / Attribute Conversion
// =============================================================================

/// Map a cell color onto crossterm's color model.
pub fn to_crossterm_color(color: Rgba) -> Color {
    if color.is_terminal_default() {
        Color::Reset
    } else if color.is_ansi() {
        Color::AnsiValue(color.ansi_index())
    } else {
        Color::Rgb {
            r: color.r.clamp(0, 255) as u8,
            g: color.g.clamp(0, 255) as u8,
            b: color.b.clamp(0, 255) as u8,
        }
    }
}

const ATTRIBUTES: [(Attr, Attribute); 6] = [
    (Attr::BOLD, Attribute::Bold),
    (Attr::DIM, Attribute::Dim),
    (Attr::ITALIC, Attribute::Italic),
    (Attr::UNDERLINE, Attribute::Underlined),
    (Attr::INVERSE, Attribute::Reverse),
    (Attr::STRIKETHROUGH, Attribute::CrossedOut),
];

// =============================================================================
// StatefulCellRenderer
// =============================================================================

/// Renders cells while tracking terminal state to minimize output.
#[derive(Debug)]
pub struct StatefulCellRenderer {
    last_x: i32,
    last_y: i32,
    last_fg: Option<Rgba>,
    last_bg: Option<Rgba>,
    last_attrs: Attr,
}

impl StatefulCellRenderer {
    pub fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::NONE,
        }
    }

    /// Forget all tracked state. Called at the start of each frame.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Queue the commands needed to show `cell` at (x, y).
    pub fn render_cell<W: Write>(
        &mut self,
        out: &mut W,
        x: u16,
        y: u16,
        cell: &Cell,
    ) -> io::Result<()> {
        // Continuation half of a wide glyph: the lead cell already covers it.
        // The cursor only sits past it when the lead was printed just before.
        if cell.char == 0 {
            if y as i32 == self.last_y && x as i32 == self.last_x + 1 {
                self.last_x = x as i32;
            } else {
                self.last_x = -1;
                self.last_y = -1;
            }
            return Ok(());
        }

        if y as i32 != self.last_y || x as i32 != self.last_x + 1 {
            queue!(out, MoveTo(x, y))?;
        }

        if cell.attrs != self.last_attrs {
            queue!(out, SetAttribute(Attribute::Reset))?;
            for (flag, attribute) in ATTRIBUTES {
                if cell.attrs.contains(flag) {
                    queue!(out, SetAttribute(attribute))?;
                }
            }
            // Reset cleared the colors too.
            self.last_fg = None;
            self.last_bg = None;
            self.last_attrs = cell.attrs;
        }

        if self.last_fg != Some(cell.fg) {
            queue!(out, SetForegroundColor(to_crossterm_color(cell.fg)))?;
            self.last_fg = Some(cell.fg);
        }

        if self.last_bg != Some(cell.bg) {
            queue!(out, SetBackgroundColor(to_crossterm_color(cell.bg)))?;
            self.last_bg = Some(cell.bg);
        }

        let ch = char::from_u32(cell.char).unwrap_or(char::REPLACEMENT_CHARACTER);
        queue!(out, Print(ch))?;

        self.last_x = x as i32;
        self.last_y = y as i32;
        Ok(())
    }

    /// Leave the terminal with default attributes after a frame.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.last_attrs != Attr::NONE || self.last_fg.is_some() || self.last_bg.is_some() {
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
        self.reset();
        Ok(())
    }
}

impl Default for StatefulCellRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(ch: char, fg: Rgba, bg: Rgba) -> Cell {
        Cell {
            char: ch as u32,
            fg,
            bg,
            attrs: Attr::NONE,
        }
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(to_crossterm_color(Rgba::TERMINAL_DEFAULT), Color::Reset);
        assert_eq!(to_crossterm_color(Rgba::ansi(9)), Color::AnsiValue(9));
        assert_eq!(
            to_crossterm_color(Rgba::rgb(1, 2, 3)),
            Color::Rgb { r: 1, g: 2, b: 3 }
        );
    }

    #[test]
    fn test_stateful_renderer_skips_sequential() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        let c = cell('A', Rgba::WHITE, Rgba::BLACK);

        renderer.render_cell(&mut out, 0, 0, &c).unwrap();
        let first_len = out.len();
        assert!(String::from_utf8_lossy(&out).contains("\x1b[1;1H"));

        out.clear();
        renderer.render_cell(&mut out, 1, 0, &c).unwrap();
        assert!(out.len() < first_len, "sequential cell should skip cursor move");
        assert_eq!(out, b"A");
    }

    #[test]
    fn test_stateful_renderer_skips_same_colors() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        let c = cell('X', Rgba::RED, Rgba::BLUE);

        renderer.render_cell(&mut out, 0, 0, &c).unwrap();
        out.clear();
        renderer.render_cell(&mut out, 5, 0, &c).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("\x1b[1;6H"));
        assert!(!text.contains("38;2"));
        assert!(text.ends_with('X'));
    }

    #[test]
    fn test_continuation_cell_skipped() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        renderer
            .render_cell(&mut out, 0, 0, &cell('\0', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_lone_continuation_forces_cursor_move() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        renderer
            .render_cell(&mut out, 4, 0, &cell('a', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        renderer
            .render_cell(&mut out, 6, 0, &cell('\0', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        out.clear();
        renderer
            .render_cell(&mut out, 7, 0, &cell('b', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        assert_eq!(out, b"\x1b[1;8Hb");
    }

    #[test]
    fn test_continuation_after_lead_keeps_cursor() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        renderer
            .render_cell(&mut out, 0, 0, &cell('日', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        renderer
            .render_cell(&mut out, 1, 0, &cell('\0', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        out.clear();
        renderer
            .render_cell(&mut out, 2, 0, &cell('b', Rgba::WHITE, Rgba::BLACK))
            .unwrap();
        assert_eq!(out, b"b");
    }

    #[test]
    fn test_attribute_change_reemits_colors() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = Vec::new();
        let plain = cell('a', Rgba::RED, Rgba::TERMINAL_DEFAULT);
        let bold = Cell {
            attrs: Attr::BOLD,
            ..plain
        };

        renderer.render_cell(&mut out, 0, 0, &plain).unwrap();
        out.clear();
        renderer.render_cell(&mut out, 1, 0, &bold).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("\x1b[0m"));
        assert!(text.contains("\x1b[1m"));
        assert!(text.contains("38;2;255;0;0"));
    }
}
