//! Engine - pane ownership and line dispatch
//!
//! The engine owns one [`Pane`] per line source and applies [`Message`]s to
//! them. It is driven by a single consumer (the run loop), so trees are never
//! shared between tasks.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::message::{Message, SourceId};
use termfold_core::prelude::*;
use termfold_core::{FoldEvent, Folder, FolderOptions, Matchers, PatternPair, Tree};

// ─────────────────────────────────────────────────────────────────────────────
// Pane
// ─────────────────────────────────────────────────────────────────────────────

/// One line source with its own tree
#[derive(Debug)]
pub struct Pane {
    id: SourceId,
    title: String,
    folder: Folder,
    closed: bool,
    exit_code: Option<i32>,
    read_error: Option<String>,
}

impl Pane {
    fn new(id: SourceId, title: String, matchers: Arc<Matchers>, options: FolderOptions) -> Self {
        Self {
            id,
            title,
            folder: Folder::new(matchers, options),
            closed: false,
            exit_code: None,
            read_error: None,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tree(&self) -> &Tree {
        self.folder.tree()
    }

    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    /// Whether the source reached end of stream (or failed)
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn read_error(&self) -> Option<&str> {
        self.read_error.as_deref()
    }

    fn close(&mut self) {
        self.closed = true;
        self.folder.finish();
    }
}

/// What applying one message changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A line was folded into a pane's tree
    Folded { source: SourceId, event: FoldEvent },
    /// A source ended; its tree is final
    SourceEnded(SourceId),
    /// The run was asked to stop
    Quit,
}

#[derive(Serialize)]
struct PaneDump<'a> {
    title: &'a str,
    exit_code: Option<i32>,
    tree: &'a Tree,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Owns all panes of a run
#[derive(Debug)]
pub struct Engine {
    matchers: Arc<Matchers>,
    options: FolderOptions,
    panes: Vec<Pane>,
    quit: bool,
}

impl Engine {
    /// Compile the pattern pairs and create an engine without panes
    pub fn new(pairs: &[PatternPair], options: FolderOptions) -> Result<Self> {
        let matchers = Matchers::new(pairs)?;
        info!("Compiled {} marker pattern pair(s)", matchers.pair_count());
        Ok(Self::with_matchers(Arc::new(matchers), options))
    }

    pub fn with_matchers(matchers: Arc<Matchers>, options: FolderOptions) -> Self {
        Self {
            matchers,
            options,
            panes: Vec::new(),
            quit: false,
        }
    }

    /// Add a pane for a new source; returns the source id to tag its lines with
    pub fn add_pane(&mut self, title: impl Into<String>) -> SourceId {
        let id = self.panes.len();
        let title = title.into();
        debug!("Pane {} created for {}", id, title);
        self.panes.push(Pane::new(
            id,
            title,
            Arc::clone(&self.matchers),
            self.options,
        ));
        id
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane(&self, id: SourceId) -> Option<&Pane> {
        self.panes.get(id)
    }

    /// Apply one message. Messages for unknown sources are dropped.
    pub fn process_message(&mut self, message: Message) -> Option<Update> {
        match message {
            Message::Line { source, text } => {
                let Some(pane) = self.panes.get_mut(source) else {
                    warn!("Line for unknown source {} dropped", source);
                    return None;
                };
                if pane.closed {
                    trace!("Late line for closed source {}", source);
                }
                let event = pane.folder.feed(text);
                Some(Update::Folded { source, event })
            }
            Message::ReadFailed { source, message } => {
                let pane = self.panes.get_mut(source)?;
                let err = Error::stream_read(pane.title.clone(), message);
                warn!("{}", err);
                pane.read_error = Some(err.to_string());
                pane.close();
                Some(Update::SourceEnded(source))
            }
            Message::SourceClosed { source, exit_code } => {
                let pane = self.panes.get_mut(source)?;
                if exit_code.is_some() {
                    pane.exit_code = exit_code;
                }
                if pane.closed {
                    return None;
                }
                info!(
                    "Source {} ended after {} lines (exit {:?})",
                    source,
                    pane.folder.lines_seen(),
                    exit_code
                );
                pane.close();
                Some(Update::SourceEnded(source))
            }
            Message::Quit => {
                self.quit();
                Some(Update::Quit)
            }
        }
    }

    /// Stop the run; open nodes stay open
    pub fn quit(&mut self) {
        self.quit = true;
        for pane in &mut self.panes {
            pane.folder.finish();
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// The run is over: asked to quit, or every source ended
    pub fn is_done(&self) -> bool {
        self.quit || self.panes.iter().all(Pane::is_closed)
    }

    /// Every pane's final tree as pretty JSON
    pub fn dump_json(&self) -> Result<String> {
        let dump: Vec<PaneDump<'_>> = self
            .panes
            .iter()
            .map(|pane| PaneDump {
                title: &pane.title,
                exit_code: pane.exit_code,
                tree: pane.tree(),
            })
            .collect();
        serde_json::to_string_pretty(&dump).context("Failed to serialize trees")
    }

    /// Write the captured input verbatim, pane by pane, in arrival order
    pub fn write_raw(&self, out: &mut impl Write) -> Result<()> {
        for pane in &self.panes {
            for line in pane.tree().raw_lines() {
                writeln!(out, "{}", line)
                    .with_context(|| format!("Failed to replay output of {}", pane.title))?;
            }
        }
        out.flush().context("Failed to flush replayed output")
    }
}
