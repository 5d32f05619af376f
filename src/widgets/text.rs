//! Text - a static label bound to a `Signal<String>`.
//!
//! Lines split on `\n` are drawn one per row, clipped at the rect width.
//! There is no wrapping.

use super::{PaintContext, Widget};
use crate::renderer::{string_width, Canvas};
use crate::signals::{signal, Signal};

#[derive(Clone, Debug)]
pub struct Text {
    content: Signal<String>,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self::from_signal(signal(content.into()))
    }

    /// Bind to an existing signal; the label follows it.
    pub fn from_signal(content: Signal<String>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &Signal<String> {
        &self.content
    }

    pub fn set(&self, content: impl Into<String>) {
        self.content.set(content.into());
    }
}

impl Widget for Text {
    fn paint(&self, canvas: &mut Canvas<'_>, ctx: &PaintContext) {
        canvas.fill(ctx.style);
        let height = canvas.height();
        self.content.with(|content| {
            for (row, line) in content.split('\n').take(height as usize).enumerate() {
                canvas.text(0, row as u16, line, ctx.style);
            }
        });
    }

    fn measure(&self) -> (u16, u16) {
        self.content.with_peek(|content| {
            let width = content.split('\n').map(string_width).max().unwrap_or(0);
            let height = content.split('\n').count();
            (width.min(u16::MAX as usize) as u16, height.min(u16::MAX as usize) as u16)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameBuffer;
    use crate::signals::{track, Observer};
    use crate::theme::{InteractionState, Style};
    use crate::types::ClipRect;

    fn paint(text: &Text, area: ClipRect, buf: &mut FrameBuffer) {
        let ctx = PaintContext {
            state: InteractionState::Base,
            style: Style::new(),
        };
        let mut canvas = Canvas::new(buf, area, area);
        text.paint(&mut canvas, &ctx);
    }

    #[test]
    fn test_clips_without_wrapping() {
        let text = Text::new("hello world");
        let mut buf = FrameBuffer::new(10, 2);
        paint(&text, ClipRect::new(0, 0, 5, 2), &mut buf);
        assert_eq!(buf.row_text(0), "hello     ");
        assert_eq!(buf.row_text(1), "          ");
    }

    #[test]
    fn test_multiline() {
        let text = Text::new("ab\ncd\nef");
        assert_eq!(text.measure(), (2, 3));
        let mut buf = FrameBuffer::new(4, 2);
        paint(&text, ClipRect::new(0, 0, 4, 2), &mut buf);
        assert_eq!(buf.row_text(0), "ab  ");
        assert_eq!(buf.row_text(1), "cd  ");
    }

    #[test]
    fn test_paint_tracks_content() {
        let text = Text::new("a");
        let observer = Observer::new();
        let mut buf = FrameBuffer::new(4, 1);
        track(&observer, || paint(&text, ClipRect::new(0, 0, 4, 1), &mut buf));
        assert!(!observer.is_dirty());

        text.set("b");
        assert!(observer.is_dirty());
    }
}
