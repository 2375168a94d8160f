//! Configuration for termfold
//!
//! Supports:
//! - `~/.config/termfold/config.toml` (or `--config PATH`) - Settings file
//! - Pattern pairs files (`-f`) - One start and one end pattern per two lines
//! - Command-line overrides, which take priority over the settings file

pub mod pairs;
pub mod priority;
pub mod settings;
pub mod types;

pub use pairs::{load_pairs_file, parse_pairs};
pub use priority::resolve;
pub use settings::{default_config_path, load_settings, load_settings_file, load_settings_or_default};
pub use types::*;
