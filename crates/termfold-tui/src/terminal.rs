//! Terminal capability and its crossterm backend
//!
//! The renderer only needs to position the cursor on a frame row, clear that
//! row and write a styled row. Everything else here is setup and teardown.

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{self, Hide, MoveTo, MoveToColumn, Show};
use crossterm::style::{Print, PrintStyledContent, ResetColor, StyledContent};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, ScrollUp,
};
use crossterm::{execute, queue};

use crate::layout::DisplayRow;
use crate::theme::styles;
use termfold_core::prelude::*;

/// Output operations the renderer relies on.
///
/// Row numbers are relative to the first row of the frame.
pub trait Terminal {
    /// Terminal size as (columns, rows)
    fn size(&self) -> Result<(u16, u16)>;

    /// Prepare the screen for a frame of up to `reserve` rows
    fn enter(&mut self, alternate: bool, reserve: u16) -> Result<()>;

    /// Undo [`Terminal::enter`]
    fn leave(&mut self) -> Result<()>;

    fn move_cursor(&mut self, row: u16) -> Result<()>;

    fn clear_line(&mut self) -> Result<()>;

    fn write_line(&mut self, row: &DisplayRow) -> Result<()>;

    fn hide_cursor(&mut self) -> Result<()>;

    fn show_cursor(&mut self) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Set while the alternate screen is active, for the panic hook
static IN_ALTERNATE_SCREEN: AtomicBool = AtomicBool::new(false);

fn term_err(action: &str, e: io::Error) -> Error {
    Error::terminal(format!("{}: {}", action, e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Crossterm backend
// ─────────────────────────────────────────────────────────────────────────────

/// Draws on stdout below the cursor, or in the alternate screen
pub struct CrosstermTerminal {
    out: Stdout,
    /// Screen row of frame row 0
    origin: u16,
    alternate: bool,
    entered: bool,
}

impl CrosstermTerminal {
    /// Fails when stdout has no usable terminal size
    pub fn new() -> Result<Self> {
        terminal::size().map_err(|e| Error::TerminalInit(e.to_string()))?;
        Ok(Self {
            out: io::stdout(),
            origin: 0,
            alternate: false,
            entered: false,
        })
    }
}

impl Terminal for CrosstermTerminal {
    fn size(&self) -> Result<(u16, u16)> {
        terminal::size().map_err(|e| term_err("Failed to query terminal size", e))
    }

    fn enter(&mut self, alternate: bool, reserve: u16) -> Result<()> {
        if alternate {
            execute!(self.out, EnterAlternateScreen, Hide, MoveTo(0, 0))
                .map_err(|e| Error::TerminalInit(e.to_string()))?;
            IN_ALTERNATE_SCREEN.store(true, Ordering::Release);
            self.origin = 0;
        } else {
            let (_, rows) = self.size()?;
            let (_, row) = cursor::position().map_err(|e| Error::TerminalInit(e.to_string()))?;
            // Scroll so that `reserve` rows fit below the cursor
            let reserve = reserve.min(rows);
            let overflow = row.saturating_add(reserve).saturating_sub(rows);
            if overflow > 0 {
                queue!(self.out, ScrollUp(overflow))
                    .map_err(|e| Error::TerminalInit(e.to_string()))?;
            }
            self.origin = row - overflow.min(row);
            execute!(self.out, Hide).map_err(|e| Error::TerminalInit(e.to_string()))?;
        }

        self.alternate = alternate;
        self.entered = true;
        debug!(
            "Terminal entered (alternate: {}, origin row {})",
            alternate, self.origin
        );
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        if self.alternate {
            IN_ALTERNATE_SCREEN.store(false, Ordering::Release);
            execute!(self.out, Show, LeaveAlternateScreen)
                .map_err(|e| term_err("Failed to leave alternate screen", e))
        } else {
            execute!(self.out, Show).map_err(|e| term_err("Failed to show cursor", e))
        }
    }

    fn move_cursor(&mut self, row: u16) -> Result<()> {
        queue!(self.out, MoveTo(0, self.origin.saturating_add(row)))
            .map_err(|e| term_err("Failed to move cursor", e))
    }

    fn clear_line(&mut self) -> Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
            .map_err(|e| term_err("Failed to clear line", e))
    }

    fn write_line(&mut self, row: &DisplayRow) -> Result<()> {
        let indent = " ".repeat(row.indent);
        queue!(
            self.out,
            Print(indent),
            PrintStyledContent(StyledContent::new(styles::prefix(row.kind), row.prefix)),
            PrintStyledContent(StyledContent::new(styles::text(row.kind), row.text.as_str())),
            PrintStyledContent(StyledContent::new(
                styles::detail(row.kind),
                row.detail.as_str()
            )),
            ResetColor
        )
        .map_err(|e| term_err("Failed to write row", e))
    }

    fn hide_cursor(&mut self) -> Result<()> {
        queue!(self.out, Hide).map_err(|e| term_err("Failed to hide cursor", e))
    }

    fn show_cursor(&mut self) -> Result<()> {
        queue!(self.out, Show).map_err(|e| term_err("Failed to show cursor", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| term_err("Failed to flush output", e))
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        if self.entered {
            let _ = self.leave();
        }
    }
}

/// Show the cursor again and leave the alternate screen if it is active
pub fn restore() {
    let mut out = io::stdout();
    if IN_ALTERNATE_SCREEN.swap(false, Ordering::AcqRel) {
        let _ = execute!(out, LeaveAlternateScreen);
    }
    let _ = execute!(out, Show);
}

/// Install a panic hook that restores the terminal
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore();
        original_hook(panic_info);
    }));
}
