//! Stream folder: turns a live line stream into a [`Tree`].
//!
//! Each line is tried as a start marker, then as an end marker, and otherwise
//! becomes content of the innermost open node. Every branch succeeds; noisy
//! input only yields more nodes or more lines attached higher up.

use std::sync::Arc;

use crate::matcher::{MarkerRole, Matchers};
use crate::prelude::*;
use crate::tree::{NodeId, Tree};

/// Folding behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FolderOptions {
    /// Store marker lines as the first/last content line of their node
    pub keep_marker_lines: bool,
    /// When set, a node that closes keeps only this many trailing content lines
    pub retain_closed_lines: Option<usize>,
}

/// What a single line did to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldEvent {
    /// A start marker opened this node
    Opened(NodeId),
    /// An end marker closed this node
    Closed(NodeId),
    /// An end marker arrived with nothing to close; it was kept as root content
    UnmatchedEnd,
    /// A plain line was appended to this node
    Content(NodeId),
}

/// Incremental tree builder for one line stream
#[derive(Debug, Clone)]
pub struct Folder {
    matchers: Arc<Matchers>,
    options: FolderOptions,
    tree: Tree,
    lines_seen: u64,
    finished: bool,
}

impl Folder {
    pub fn new(matchers: Arc<Matchers>, options: FolderOptions) -> Self {
        Self {
            matchers,
            options,
            tree: Tree::new(),
            lines_seen: 0,
            finished: false,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn options(&self) -> FolderOptions {
        self.options
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Whether the stream has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fold one line into the tree
    pub fn feed(&mut self, line: impl Into<String>) -> FoldEvent {
        let line = line.into();
        self.lines_seen += 1;

        let outcome = self.matchers.classify(&line);
        match outcome {
            Some(m) if m.role == MarkerRole::Start => self.open(m.label, m.pair, line),
            Some(m) => self.close(m.label, line),
            None => {
                let (node, _) = self.tree.append_line(line);
                FoldEvent::Content(node)
            }
        }
    }

    /// Mark the end of the stream. Open nodes stay open.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            "Stream finished after {} lines, {} nodes, {} still open",
            self.lines_seen,
            self.tree.node_count() - 1,
            self.tree.open_depth()
        );
    }

    fn open(&mut self, label: String, pair: usize, line: String) -> FoldEvent {
        let id = if self.options.keep_marker_lines {
            let id = self.tree.open_node(label, None, Some(pair));
            self.tree.append_marker_line(MarkerRole::Start, line);
            id
        } else {
            self.tree.open_node(label, Some(line), Some(pair))
        };
        trace!("Opened {} at depth {}", id, self.tree.depth(id));
        FoldEvent::Opened(id)
    }

    fn close(&mut self, label: String, line: String) -> FoldEvent {
        if self.tree.open_depth() == 0 {
            trace!("Unmatched end marker kept as content: {}", line);
            self.tree.append_line(line);
            return FoldEvent::UnmatchedEnd;
        }

        let end_line = if self.options.keep_marker_lines {
            self.tree.append_marker_line(MarkerRole::End, line);
            None
        } else {
            Some(line)
        };

        let Some(id) = self.tree.close_innermost(label, end_line) else {
            return FoldEvent::UnmatchedEnd;
        };

        if let Some(keep) = self.options.retain_closed_lines {
            let dropped = self.tree.truncate_closed_lines(id, keep);
            if dropped > 0 {
                trace!("Retention dropped {} lines from {}", dropped, id);
            }
        }

        trace!("Closed {}", id);
        FoldEvent::Closed(id)
    }
}
