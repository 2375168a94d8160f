//! Configuration types for termfold
//!
//! Defines:
//! - `Settings` - Contents of `config.toml`
//! - `CliOverrides` - Values given on the command line
//! - `RunConfig` - The resolved configuration a run uses

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use termfold_core::{FolderOptions, PatternPair};

use crate::source::SourceSpec;

/// Application settings (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub patterns: PatternSettings,

    #[serde(default)]
    pub folding: FoldingSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

/// Marker patterns
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PatternSettings {
    /// Start/end pairs, tried after any given on the command line
    #[serde(default)]
    pub pairs: Vec<PatternPair>,
}

/// How lines are folded into the tree
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FoldingSettings {
    /// Keep marker lines as content of the node they open/close
    #[serde(default)]
    pub keep_marker_lines: bool,

    /// Keep only this many trailing content lines of a node once it closes
    #[serde(default)]
    pub retain_closed_lines: Option<usize>,
}

impl FoldingSettings {
    pub fn folder_options(&self) -> FolderOptions {
        FolderOptions {
            keep_marker_lines: self.keep_marker_lines,
            retain_closed_lines: self.retain_closed_lines,
        }
    }
}

/// Screen output settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplaySettings {
    /// Viewport height in rows; terminal height when unset
    #[serde(default)]
    pub height: Option<u16>,

    /// Rows left free below the final frame for the shell prompt
    #[serde(default = "default_final_shrink")]
    pub final_shrink: u16,

    /// Paint the final frame fully expanded
    #[serde(default)]
    pub expand_final: bool,

    /// Minimum time between repaints; 0 paints after every line
    #[serde(default)]
    pub frame_interval_ms: u64,

    /// Delay after each line, for demos
    #[serde(default)]
    pub interline_delay_ms: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            height: None,
            final_shrink: default_final_shrink(),
            expand_final: false,
            frame_interval_ms: 0,
            interline_delay_ms: 0,
        }
    }
}

impl DisplaySettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn interline_delay(&self) -> Option<Duration> {
        (self.interline_delay_ms > 0).then(|| Duration::from_millis(self.interline_delay_ms))
    }
}

fn default_final_shrink() -> u16 {
    2
}

/// What the run does with its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Fold in place on the terminal
    #[default]
    Fold,
    /// Fold in the alternate screen, then print the raw input
    Replay,
    /// Print the final trees as JSON, no terminal drawing
    DumpTree,
}

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub starts: Vec<String>,
    pub ends: Vec<String>,
    pub pairs_file: Option<PathBuf>,
    pub programs: Vec<String>,
    pub programs_file: Option<PathBuf>,
    pub shell: Option<String>,
    pub height: Option<u16>,
    pub final_shrink: Option<u16>,
    pub expand_final: bool,
    pub keep_markers: bool,
    pub retain_closed_lines: Option<usize>,
    pub frame_interval_ms: Option<u64>,
    pub interline_delay_ms: Option<u64>,
    pub replay: bool,
    pub dump_tree: bool,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pairs: Vec<PatternPair>,
    pub folding: FolderOptions,
    pub display: DisplaySettings,
    pub sources: Vec<SourceSpec>,
    pub output: OutputMode,
}
