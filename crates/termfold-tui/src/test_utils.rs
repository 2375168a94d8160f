//! Test utilities for renderer and runner verification
//!
//! [`MockTerminal`] implements [`Terminal`] in memory: it records every
//! operation and keeps a plain-text copy of the screen, so tests can check
//! both what was painted and how much was painted.
//!
//! # Example
//!
//! ```ignore
//! let mut term = MockTerminal::new(80, 24);
//! renderer.render(&mut term, rows)?;
//! assert_eq!(term.screen_line(0), "└── build");
//! ```

use crate::layout::DisplayRow;
use crate::terminal::Terminal;
use termfold_core::prelude::*;

/// Standard test terminal size
pub const TEST_WIDTH: u16 = 80;
pub const TEST_HEIGHT: u16 = 24;

/// One recorded terminal operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOp {
    Enter { alternate: bool, reserve: u16 },
    Leave,
    MoveCursor(u16),
    ClearLine,
    WriteLine(String),
    HideCursor,
    ShowCursor,
    Flush,
}

/// In-memory terminal
#[derive(Debug, Clone)]
pub struct MockTerminal {
    width: u16,
    height: u16,
    cursor: u16,
    screen: Vec<String>,
    ops: Vec<TermOp>,
    cursor_visible: bool,
    /// Fail every operation once this many writes succeeded
    fail_after_writes: Option<usize>,
    writes: usize,
}

impl Default for MockTerminal {
    fn default() -> Self {
        Self::new(TEST_WIDTH, TEST_HEIGHT)
    }
}

impl MockTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cursor: 0,
            screen: Vec::new(),
            ops: Vec::new(),
            cursor_visible: true,
            fail_after_writes: None,
            writes: 0,
        }
    }

    /// Make the terminal fail after `writes` successful row writes
    pub fn failing_after(mut self, writes: usize) -> Self {
        self.fail_after_writes = Some(writes);
        self
    }

    pub fn ops(&self) -> &[TermOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of rows written since the last [`MockTerminal::clear_ops`]
    pub fn writes_recorded(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, TermOp::WriteLine(_)))
            .count()
    }

    pub fn cursor_row(&self) -> u16 {
        self.cursor
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Text on a screen row; empty when never written or cleared
    pub fn screen_line(&self, row: usize) -> &str {
        self.screen.get(row).map_or("", String::as_str)
    }

    /// Non-empty leading screen rows joined by newlines
    pub fn screen_text(&self) -> String {
        let end = self
            .screen
            .iter()
            .rposition(|line| !line.is_empty())
            .map_or(0, |i| i + 1);
        self.screen[..end].join("\n")
    }

    fn check(&self) -> Result<()> {
        match self.fail_after_writes {
            Some(limit) if self.writes >= limit => Err(Error::terminal("mock terminal failure")),
            _ => Ok(()),
        }
    }

    fn line_mut(&mut self, row: u16) -> &mut String {
        let row = usize::from(row);
        if self.screen.len() <= row {
            self.screen.resize(row + 1, String::new());
        }
        &mut self.screen[row]
    }
}

impl Terminal for MockTerminal {
    fn size(&self) -> Result<(u16, u16)> {
        Ok((self.width, self.height))
    }

    fn enter(&mut self, alternate: bool, reserve: u16) -> Result<()> {
        self.check()?;
        self.ops.push(TermOp::Enter { alternate, reserve });
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.ops.push(TermOp::Leave);
        self.cursor_visible = true;
        Ok(())
    }

    fn move_cursor(&mut self, row: u16) -> Result<()> {
        self.check()?;
        self.ops.push(TermOp::MoveCursor(row));
        self.cursor = row;
        Ok(())
    }

    fn clear_line(&mut self) -> Result<()> {
        self.check()?;
        self.ops.push(TermOp::ClearLine);
        let row = self.cursor;
        self.line_mut(row).clear();
        Ok(())
    }

    fn write_line(&mut self, row: &DisplayRow) -> Result<()> {
        self.check()?;
        let text = row.plain();
        self.ops.push(TermOp::WriteLine(text.clone()));
        let cursor = self.cursor;
        self.line_mut(cursor).push_str(&text);
        self.writes += 1;
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.ops.push(TermOp::HideCursor);
        self.cursor_visible = false;
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<()> {
        self.ops.push(TermOp::ShowCursor);
        self.cursor_visible = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.check()?;
        self.ops.push(TermOp::Flush);
        Ok(())
    }
}
