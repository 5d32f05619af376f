//! Input - single-line text entry.
//!
//! Holds two signals: the text and a cursor counted in grapheme clusters.
//! The cursor is clamped to `[0, grapheme_count]` after every change to
//! either signal, whoever makes it.
//!
//! Built-in keys: printable characters insert at the cursor, Backspace and
//! Delete remove around it, Left/Right/Home/End move it. Keys with Ctrl or
//! Alt held, Enter, Escape and vertical movement are left to handlers.

use std::cell::Cell;
use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;

use super::{PaintContext, Widget};
use crate::input::{Key, KeyPress};
use crate::renderer::{string_width, Canvas};
use crate::signals::{signal, Signal};
use crate::theme::{InteractionState, Style};
use crate::types::{Attr, ClipRect, Rgba};

// =============================================================================
// Theme
// =============================================================================

/// Extra styles drawn over the component's resolved style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTheme {
    pub cursor: Style,
    pub placeholder: Style,
}

impl Default for InputTheme {
    fn default() -> Self {
        Self {
            cursor: Style::new().invert(),
            placeholder: Style::new().fg(Rgba::GRAY).attrs(Attr::DIM),
        }
    }
}

// =============================================================================
// Input
// =============================================================================

#[derive(Clone, Debug)]
pub struct Input {
    text: Signal<String>,
    cursor: Signal<usize>,
    placeholder: Rc<str>,
    max_length: Option<usize>,
    theme: InputTheme,
    /// First visible display column.
    scroll: Rc<Cell<usize>>,
}

impl Input {
    pub fn new() -> Self {
        Self::with_signals(signal(String::new()), signal(0))
    }

    /// Wrap existing signals. The cursor is clamped immediately.
    pub fn with_signals(text: Signal<String>, cursor: Signal<usize>) -> Self {
        let input = Self {
            text,
            cursor,
            placeholder: Rc::from(""),
            max_length: None,
            theme: InputTheme::default(),
            scroll: Rc::new(Cell::new(0)),
        };
        input.install_clamps();
        input.clamp_cursor();
        input
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Rc::from(placeholder.into());
        self
    }

    /// Maximum number of graphemes accepted from typing.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn theme(mut self, theme: InputTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn text(&self) -> &Signal<String> {
        &self.text
    }

    pub fn cursor(&self) -> &Signal<usize> {
        &self.cursor
    }

    /// Current text without subscribing.
    pub fn value(&self) -> String {
        self.text.peek()
    }

    /// Replace the text and put the cursor at the end.
    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        let end = grapheme_count(&value);
        self.text.set(value);
        self.cursor.set_if_changed(end);
    }

    /// Empty the text and reset the cursor to 0.
    pub fn clear(&self) {
        self.cursor.set_if_changed(0);
        self.text.set_if_changed(String::new());
    }

    /// Return the text and clear the input.
    pub fn take(&self) -> String {
        let value = self.value();
        self.clear();
        value
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Insert at the cursor and advance past the insertion.
    pub fn insert(&self, s: &str) {
        if s.is_empty() {
            return;
        }
        let (text, cursor) = (self.text.peek(), self.cursor.peek());
        if let Some(max) = self.max_length {
            if grapheme_count(&text) + grapheme_count(s) > max {
                return;
            }
        }

        let at = byte_offset(&text, cursor);
        let mut head = text[..at].to_string();
        head.push_str(s);
        let new_cursor = grapheme_count(&head);
        head.push_str(&text[at..]);

        self.text.set(head);
        self.cursor.set_if_changed(new_cursor);
    }

    /// Remove the grapheme before the cursor.
    pub fn backspace(&self) {
        let cursor = self.cursor.peek();
        if cursor == 0 {
            return;
        }
        let text = self.text.peek();
        let start = byte_offset(&text, cursor - 1);
        let end = byte_offset(&text, cursor);
        let mut next = text;
        next.replace_range(start..end, "");

        self.cursor.set_if_changed(cursor - 1);
        self.text.set(next);
    }

    /// Remove the grapheme under the cursor.
    pub fn delete(&self) {
        let cursor = self.cursor.peek();
        let text = self.text.peek();
        if cursor >= grapheme_count(&text) {
            return;
        }
        let start = byte_offset(&text, cursor);
        let end = byte_offset(&text, cursor + 1);
        let mut next = text;
        next.replace_range(start..end, "");
        self.text.set(next);
    }

    pub fn move_left(&self) {
        let cursor = self.cursor.peek();
        self.cursor.set_if_changed(cursor.saturating_sub(1));
    }

    pub fn move_right(&self) {
        let len = self.text.with_peek(|t| grapheme_count(t));
        let cursor = self.cursor.peek();
        self.cursor.set_if_changed((cursor + 1).min(len));
    }

    pub fn move_home(&self) {
        self.cursor.set_if_changed(0);
    }

    pub fn move_end(&self) {
        let len = self.text.with_peek(|t| grapheme_count(t));
        self.cursor.set_if_changed(len);
    }

    // =========================================================================
    // Clamping
    // =========================================================================

    fn clamp_cursor(&self) {
        let len = self.text.with_peek(|t| grapheme_count(t));
        if self.cursor.peek() > len {
            self.cursor.set(len);
        }
    }

    /// Subscribers hold weak handles: the signals own these callbacks.
    fn install_clamps(&self) {
        let cursor = self.cursor.downgrade();
        self.text.subscribe(move |text| {
            if let Some(cursor) = cursor.upgrade() {
                let len = grapheme_count(text);
                if cursor.peek() > len {
                    cursor.set(len);
                }
            }
            Ok(())
        });

        let text = self.text.downgrade();
        let cursor = self.cursor.downgrade();
        self.cursor.subscribe(move |position| {
            if let (Some(text), Some(cursor)) = (text.upgrade(), cursor.upgrade()) {
                let len = text.with_peek(|t| grapheme_count(t));
                if *position > len {
                    cursor.set(len);
                }
            }
            Ok(())
        });
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for Input {
    fn paint(&self, canvas: &mut Canvas<'_>, ctx: &PaintContext) {
        let style = ctx.style;
        canvas.fill(style);

        let width = canvas.width() as usize;
        if width == 0 {
            return;
        }
        let show_cursor = matches!(ctx.state, InteractionState::Focused | InteractionState::Active);
        let cursor_style = self.theme.cursor.over(style);
        let cursor = self.cursor.get();

        self.text.with(|text| {
            if text.is_empty() {
                self.scroll.set(0);
                canvas.text(0, 0, &self.placeholder, self.theme.placeholder.over(style));
                if show_cursor {
                    let ch = self.placeholder.chars().next().unwrap_or(' ');
                    canvas.set(0, 0, cursor_style.cell(ch));
                }
                return;
            }

            let graphemes: Vec<&str> = text.graphemes(true).collect();
            let widths: Vec<usize> = graphemes.iter().map(|g| string_width(g)).collect();
            let cursor = cursor.min(graphemes.len());
            let cursor_col: usize = widths[..cursor].iter().sum();
            let total: usize = widths.iter().sum();

            // Scroll just enough to keep the cursor cell on screen.
            let mut offset = self.scroll.get().min((total + 1).saturating_sub(width));
            if cursor_col < offset {
                offset = cursor_col;
            } else if cursor_col >= offset + width {
                offset = cursor_col + 1 - width;
            }
            self.scroll.set(offset);

            let mut col = 0;
            for (grapheme, w) in graphemes.iter().zip(&widths) {
                let start = col;
                col += w;
                if start < offset {
                    continue;
                }
                let x = start - offset;
                if x + w > width {
                    break;
                }
                canvas.text(x as u16, 0, grapheme, style);
            }

            if show_cursor {
                let ch = graphemes
                    .get(cursor)
                    .and_then(|g| g.chars().next())
                    .unwrap_or(' ');
                canvas.set((cursor_col - offset) as u16, 0, cursor_style.cell(ch));
            }
        });
    }

    fn measure(&self) -> (u16, u16) {
        let width = self.text.with_peek(|t| {
            if t.is_empty() {
                string_width(&self.placeholder)
            } else {
                string_width(t)
            }
        });
        ((width + 1).min(u16::MAX as usize) as u16, 1)
    }

    fn focusable(&self) -> bool {
        true
    }

    fn handles_mouse(&self) -> bool {
        true
    }

    fn on_key(&self, key: &KeyPress, _area: ClipRect) -> bool {
        if key.ctrl() || key.alt() || key.meta() {
            return false;
        }
        if let Some(ch) = key.text() {
            let mut buf = [0u8; 4];
            self.insert(ch.encode_utf8(&mut buf));
            return true;
        }
        match key.key {
            Key::Backspace => self.backspace(),
            Key::Delete => self.delete(),
            Key::Left => self.move_left(),
            Key::Right => self.move_right(),
            Key::Home => self.move_home(),
            Key::End => self.move_end(),
            _ => return false,
        }
        true
    }
}

// =============================================================================
// Grapheme Helpers
// =============================================================================

fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Byte offset of grapheme `index`, or the string length past the end.
fn byte_offset(s: &str, index: usize) -> usize {
    s.grapheme_indices(true)
        .nth(index)
        .map_or(s.len(), |(offset, _)| offset)
}

// =============================================================================
// Tests
// =============================================================================
