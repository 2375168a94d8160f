//! termfold-app - Configuration, line sources and pane orchestration
//!
//! This crate resolves settings and command-line values into a [`RunConfig`],
//! starts line sources (stdin or child programs), and owns the [`Engine`]
//! that folds each source's lines into its own pane. Terminal drawing lives
//! in `termfold-tui`.

pub mod config;
pub mod engine;
pub mod message;
pub mod pacer;
pub mod signals;
pub mod source;

// Re-export primary types
pub use config::{CliOverrides, OutputMode, RunConfig, Settings};
pub use engine::{Engine, Pane, Update};
pub use message::{Message, SourceId};
pub use pacer::FramePacer;
pub use source::{spawn_source, SourceSpec};
