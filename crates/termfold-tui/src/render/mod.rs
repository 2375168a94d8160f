//! Diffing renderer
//!
//! Keeps the last painted frame and repaints only the rows that differ from
//! it. Row equality covers key, kind and text, so a row whose text did not
//! change but moved to another screen row is repainted too.


use crate::layout::DisplayRow;
use crate::terminal::Terminal;
use termfold_core::prelude::*;

/// What one repaint did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Rows written
    pub painted: usize,
    /// Rows of the previous frame cleared because the frame got shorter
    pub cleared: usize,
}

impl RenderStats {
    pub fn is_empty(&self) -> bool {
        self.painted == 0 && self.cleared == 0
    }
}

/// Paints frames through a [`Terminal`]
#[derive(Debug, Default)]
pub struct Renderer {
    previous: Vec<DisplayRow>,
    /// False until the first paint and after [`Renderer::invalidate`]
    valid: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what is on screen; the next render repaints every row
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// The last painted frame
    pub fn frame(&self) -> &[DisplayRow] {
        &self.previous
    }

    /// Paint `rows`, touching only rows that changed since the last frame.
    ///
    /// An unchanged frame performs no terminal I/O at all. Otherwise the
    /// cursor ends parked on the row just below the frame.
    pub fn render<T: Terminal + ?Sized>(
        &mut self,
        term: &mut T,
        rows: Vec<DisplayRow>,
    ) -> Result<RenderStats> {
        let mut stats = RenderStats::default();

        for (index, row) in rows.iter().enumerate() {
            if self.valid && self.previous.get(index) == Some(row) {
                continue;
            }
            term.move_cursor(screen_row(index))?;
            term.clear_line()?;
            term.write_line(row)?;
            stats.painted += 1;
        }

        for index in rows.len()..self.previous.len() {
            term.move_cursor(screen_row(index))?;
            term.clear_line()?;
            stats.cleared += 1;
        }

        self.previous = rows;
        self.valid = true;

        if stats.is_empty() {
            return Ok(stats);
        }

        term.move_cursor(screen_row(self.previous.len()))?;
        term.flush()?;
        trace!(
            "Frame of {} rows: {} painted, {} cleared",
            self.previous.len(),
            stats.painted,
            stats.cleared
        );
        Ok(stats)
    }

    /// Park the cursor below the final frame and show it again
    pub fn finish<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<()> {
        term.move_cursor(screen_row(self.previous.len()))?;
        term.show_cursor()?;
        term.flush()
    }
}

fn screen_row(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}
