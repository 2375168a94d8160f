//! # termfold-core - Tree Folding Engine
//!
//! Foundation crate for termfold. Turns an unbounded stream of text lines into
//! a tree of nested regions delimited by start/end marker lines.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Marker Matching (`matcher`)
//! - [`Matchers`] - Compiled start/end pattern pairs
//! - [`PatternPair`] - Uncompiled pair as written in configuration
//! - [`MarkerRole`], [`MatchOutcome`] - Classification results
//!
//! ### Tree Model (`tree`)
//! - [`Tree`] - Arena of nodes plus the open stack
//! - [`Node`], [`NodeId`], [`NodeState`], [`Item`] - Tree entities
//!
//! ### Stream Folding (`folder`)
//! - [`Folder`] - Feeds lines into a tree
//! - [`FoldEvent`] - What one line did
//! - [`FolderOptions`] - Marker-line retention and closed-node truncation
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use termfold_core::prelude::*;
//! ```

pub mod ansi;
pub mod error;
pub mod folder;
pub mod logging;
pub mod matcher;
pub mod prelude;
pub mod tree;

// Re-export commonly used types at crate root for convenience
pub use ansi::{contains_ansi_codes, strip_ansi_codes};
pub use error::{Error, Result, ResultExt};
pub use folder::{FoldEvent, Folder, FolderOptions};
pub use matcher::{MarkerRole, MatchOutcome, Matchers, PatternPair, LABEL_GROUP};
pub use tree::{ChildCounts, Item, Node, NodeId, NodeState, Tree};
