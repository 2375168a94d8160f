//! termfold-tui - Terminal output for termfold
//!
//! This crate lays folded trees out into a bounded number of rows, paints
//! frames by repainting only changed rows, and drives the run loop. It takes
//! the `Engine` from termfold-app and adds the crossterm terminal on top.

pub mod layout;
pub mod render;
pub mod runner;
pub mod terminal;
pub mod theme;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export main entry points
pub use layout::{layout_panes, layout_tree, DisplayRow, LayoutOptions, PaneView, RowKind};
pub use render::{RenderStats, Renderer};
pub use runner::{run, FoldRunner};
pub use terminal::{CrosstermTerminal, Terminal};
