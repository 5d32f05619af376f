//! Table - scrollable rows with one active row.
//!
//! Rows live in a `Signal<Vec<Vec<String>>>`; the active row index in a
//! `Signal<usize>`. The active index is clamped to `[0, rows - 1]` whenever
//! the rows change, and the viewport scrolls by the minimum amount that
//! keeps the active row visible.
//!
//! Layout, top to bottom: frame, header row (column titles), body rows,
//! frame. Columns have fixed widths and are drawn left to right until the
//! inner width runs out.

use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;

use super::{PaintContext, Widget};
use crate::input::{Key, KeyPress, MouseButton, MouseEvent, MouseKind};
use crate::renderer::{string_width, Canvas};
use crate::signals::{signal, Signal};
use crate::theme::{Style, Theme};
use crate::types::{BorderStyle, ClipRect, Rgba};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub width: u16,
}

impl Column {
    pub fn new(title: impl Into<String>, width: u16) -> Self {
        Self {
            title: title.into(),
            width,
        }
    }
}

/// Per-part styles, drawn over the component's resolved style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableTheme {
    pub header: Style,
    pub selected: Theme,
    pub frame: Theme,
}

impl Default for TableTheme {
    fn default() -> Self {
        Self {
            header: Style::new().bold(),
            selected: Theme::new(Style::new().bg(Rgba::DARK_GRAY))
                .focused(Style::new().fg(Rgba::BLACK).bg(Rgba::LIGHT_BLUE)),
            frame: Theme::new(Style::new().fg(Rgba::GRAY))
                .focused(Style::new().fg(Rgba::LIGHT_BLUE)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Table {
    columns: Rc<[Column]>,
    rows: Signal<Vec<Vec<String>>>,
    selected: Signal<usize>,
    /// First visible row.
    offset: Rc<Cell<usize>>,
    /// Body height seen at the last paint or key.
    viewport: Rc<Cell<usize>>,
    border: BorderStyle,
    show_header: bool,
    theme: TableTheme,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<String>>) -> Self {
        Self::with_signals(columns, signal(rows), signal(0))
    }

    pub fn with_signals(
        columns: Vec<Column>,
        rows: Signal<Vec<Vec<String>>>,
        selected: Signal<usize>,
    ) -> Self {
        let table = Self {
            columns: columns.into(),
            rows,
            selected,
            offset: Rc::new(Cell::new(0)),
            viewport: Rc::new(Cell::new(usize::MAX)),
            border: BorderStyle::Rounded,
            show_header: true,
            theme: TableTheme::default(),
        };
        table.install_clamp();
        table.clamp_selection(table.rows.with_peek(Vec::len));
        table
    }

    pub fn border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn show_header(mut self, show: bool) -> Self {
        self.show_header = show;
        self
    }

    pub fn theme(mut self, theme: TableTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &Signal<Vec<Vec<String>>> {
        &self.rows
    }

    pub fn selected(&self) -> &Signal<usize> {
        &self.selected
    }

    pub fn row_count(&self) -> usize {
        self.rows.with_peek(Vec::len)
    }

    /// The active row's cells, if there are any rows.
    pub fn selected_row(&self) -> Option<Vec<String>> {
        let index = self.selected.peek();
        self.rows.with_peek(|rows| rows.get(index).cloned())
    }

    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Row indices currently in the viewport.
    pub fn visible_range(&self) -> Range<usize> {
        let len = self.row_count();
        let start = self.offset.get().min(len);
        start..start.saturating_add(self.viewport.get()).min(len)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Make `index` the active row (clamped) and scroll it into view.
    pub fn select(&self, index: usize) {
        let len = self.row_count();
        let index = index.min(len.saturating_sub(1));
        self.selected.set_if_changed(index);
        self.scroll_to_selected(len);
    }

    /// Move the selection by `delta` rows.
    pub fn move_by(&self, delta: isize) {
        let current = self.selected.peek();
        self.select(current.saturating_add_signed(delta));
    }

    pub fn select_first(&self) {
        self.select(0);
    }

    pub fn select_last(&self) {
        self.select(usize::MAX);
    }

    fn page(&self) -> isize {
        self.viewport.get().clamp(1, isize::MAX as usize) as isize
    }

    fn scroll_to_selected(&self, len: usize) {
        let offset = scroll_offset(
            self.offset.get(),
            self.selected.peek(),
            self.viewport.get(),
            len,
        );
        self.offset.set(offset);
    }

    fn clamp_selection(&self, len: usize) {
        let max = len.saturating_sub(1);
        if self.selected.peek() > max {
            self.selected.set(max);
        }
        self.scroll_to_selected(len);
    }

    fn install_clamp(&self) {
        let selected = self.selected.downgrade();
        let offset = self.offset.clone();
        let viewport = self.viewport.clone();
        self.rows.subscribe(move |rows| {
            if let Some(selected) = selected.upgrade() {
                let max = rows.len().saturating_sub(1);
                if selected.peek() > max {
                    selected.set(max);
                }
                let active = selected.peek().min(max);
                offset.set(scroll_offset(offset.get(), active, viewport.get(), rows.len()));
            }
            Ok(())
        });
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    fn header_height(&self) -> u16 {
        u16::from(self.show_header)
    }

    /// Rows available for the body in an area of `height` rows.
    fn body_height(&self, height: u16) -> usize {
        height
            .saturating_sub(self.border.thickness() * 2)
            .saturating_sub(self.header_height()) as usize
    }

    fn sync_viewport(&self, area: ClipRect) {
        self.viewport.set(self.body_height(area.height));
    }
}

impl Widget for Table {
    fn paint(&self, canvas: &mut Canvas<'_>, ctx: &PaintContext) {
        let style = ctx.style;
        canvas.fill(style);

        let inset = self.border.thickness();
        let inner_right = canvas.width().saturating_sub(inset);
        let mut y = inset;

        if self.show_header {
            let header = self.theme.header.over(style);
            let titles = self.columns.iter().map(|c| c.title.as_str());
            draw_cells(canvas, inset, inner_right, y, titles, &self.columns, header);
            y += 1;
        }

        let viewport = self.body_height(canvas.height());
        self.viewport.set(viewport);
        let selected = self.selected.get();
        let selected_style = self.theme.selected.resolve(ctx.state).over(style);

        self.rows.with(|rows| {
            let offset = scroll_offset(self.offset.get(), selected, viewport, rows.len());
            self.offset.set(offset);

            for (index, row) in rows.iter().enumerate().skip(offset).take(viewport) {
                let row_style = if index == selected {
                    canvas.fill_row(inset, y, selected_style);
                    selected_style
                } else {
                    style
                };
                let cells = row.iter().map(String::as_str);
                draw_cells(canvas, inset, inner_right, y, cells, &self.columns, row_style);
                y += 1;
            }
        });

        canvas.border(self.border, self.theme.frame.resolve(ctx.state).over(style));
    }

    fn measure(&self) -> (u16, u16) {
        let inset = self.border.thickness() * 2;
        let width: u16 = self.columns.iter().map(|c| c.width).fold(0, u16::saturating_add);
        let rows = self.row_count().min(u16::MAX as usize) as u16;
        (
            width.saturating_add(inset),
            rows.saturating_add(self.header_height()).saturating_add(inset),
        )
    }

    fn focusable(&self) -> bool {
        true
    }

    fn handles_mouse(&self) -> bool {
        true
    }

    fn on_key(&self, key: &KeyPress, area: ClipRect) -> bool {
        if key.ctrl() || key.alt() {
            return false;
        }
        self.sync_viewport(area);
        match key.key {
            Key::Up => self.move_by(-1),
            Key::Down => self.move_by(1),
            Key::PageUp => self.move_by(-self.page()),
            Key::PageDown => self.move_by(self.page()),
            Key::Home => self.select_first(),
            Key::End => self.select_last(),
            _ => return false,
        }
        true
    }

    fn on_mouse(&self, mouse: &MouseEvent, local: (u16, u16), area: ClipRect) -> bool {
        self.sync_viewport(area);
        match mouse.kind {
            MouseKind::ScrollUp => self.move_by(-1),
            MouseKind::ScrollDown => self.move_by(1),
            MouseKind::Press(MouseButton::Left) => {
                let top = self.border.thickness() + self.header_height();
                let Some(line) = local.1.checked_sub(top) else {
                    return false;
                };
                let line = line as usize;
                if line >= self.viewport.get() {
                    return false;
                }
                let index = self.offset.get() + line;
                if index >= self.row_count() {
                    return false;
                }
                self.select(index);
            }
            _ => return false,
        }
        true
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Minimal scroll keeping `selected` inside `[offset, offset + viewport)`.
fn scroll_offset(offset: usize, selected: usize, viewport: usize, len: usize) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let mut offset = offset.min(len.saturating_sub(viewport));
    if selected < offset {
        offset = selected;
    } else if selected >= offset.saturating_add(viewport) {
        offset = selected + 1 - viewport;
    }
    offset
}

fn draw_cells<'a>(
    canvas: &mut Canvas<'_>,
    left: u16,
    right: u16,
    y: u16,
    cells: impl Iterator<Item = &'a str>,
    columns: &[Column],
    style: Style,
) {
    let mut x = left;
    for (cell, column) in cells.zip(columns) {
        if x >= right {
            break;
        }
        let width = column.width.min(right - x);
        canvas.text(x, y, fit(cell, width as usize), style);
        x = x.saturating_add(column.width);
    }
}

/// Longest grapheme prefix of `s` no wider than `width` columns.
fn fit(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (offset, grapheme) in s.grapheme_indices(true) {
        used += string_width(grapheme);
        if used > width {
            return &s[..offset];
        }
    }
    s
}

// =============================================================================
// Tests
// =============================================================================
