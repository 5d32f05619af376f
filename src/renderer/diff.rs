//! Differential frame encoding.
//!
//! The DiffRenderer compares the current frame to the previous one and
//! encodes only the cells that changed into a single byte batch.
//!
//! # Algorithm
//!
//! 1. For each cell in the new frame:
//!    - If the previous frame exists, has the same size and the cell is
//!      unchanged: skip
//!    - Otherwise: render the cell with StatefulCellRenderer; a changed
//!      continuation cell re-renders its unchanged wide lead first
//! 2. If anything changed, wrap the batch in a synchronized update
//! 3. Store the current frame as previous for the next comparison
//!
//! A frame with no changed cells encodes to an empty batch.

use std::io;

use crossterm::queue;
use crossterm::terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate};

use super::buffer::FrameBuffer;
use super::output::StatefulCellRenderer;
use crate::types::Cell;

/// Counters for one encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Cells whose content differed from the previous frame.
    pub changed_cells: usize,
    /// Bytes in the encoded batch.
    pub bytes: usize,
    /// True when the frame was painted without a previous frame to diff.
    pub full_redraw: bool,
}

impl FrameStats {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed_cells == 0
    }
}

/// Keeps the previous frame and encodes the difference to the next one.
#[derive(Debug, Default)]
pub struct DiffRenderer {
    cell_renderer: StatefulCellRenderer,
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the changes from the previous frame into `out`.
    ///
    /// `out` is appended to, never cleared.
    pub fn render(
        &mut self,
        buffer: &FrameBuffer,
        out: &mut Vec<u8>,
    ) -> io::Result<FrameStats> {
        let previous = self
            .previous
            .as_ref()
            .filter(|prev| prev.width() == buffer.width() && prev.height() == buffer.height());
        let full_redraw = previous.is_none();

        let mut body = Vec::new();
        let mut changed_cells = 0;
        self.cell_renderer.reset();

        if full_redraw {
            queue!(body, Clear(ClearType::All))?;
        }

        let differs = |x: u16, y: u16, cell: &Cell| match previous {
            Some(prev) => prev.get(x, y) != Some(cell),
            None => true,
        };

        for (x, y, cell) in buffer.iter() {
            if !differs(x, y, cell) {
                continue;
            }
            changed_cells += 1;

            // A changed continuation means the glyph's right half was covered
            // on screen; the lead has to be printed again to restore it.
            if cell.char == 0 && x > 0 {
                if let Some(lead) = buffer.get(x - 1, y) {
                    if lead.char != 0 && !differs(x - 1, y, lead) {
                        self.cell_renderer.render_cell(&mut body, x - 1, y, lead)?;
                    }
                }
            }
            self.cell_renderer.render_cell(&mut body, x, y, cell)?;
        }

        let mut stats = FrameStats {
            changed_cells,
            bytes: 0,
            full_redraw,
        };

        if changed_cells > 0 {
            self.cell_renderer.finish(&mut body)?;
            let start = out.len();
            queue!(out, BeginSynchronizedUpdate)?;
            out.extend_from_slice(&body);
            queue!(out, EndSynchronizedUpdate)?;
            stats.bytes = out.len() - start;
        }

        match &mut self.previous {
            Some(prev) => prev.clone_from(buffer),
            None => self.previous = Some(buffer.clone()),
        }

        Ok(stats)
    }

    /// Drop the previous frame so the next render repaints everything.
    ///
    /// Use this after terminal resize or when the screen is corrupted.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
