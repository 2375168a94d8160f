//! Messages from line sources and signal handlers to the run loop

/// Index of a line source; also the index of its pane
pub type SourceId = usize;

/// Everything the run loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One line read from a source, without its line terminator
    Line { source: SourceId, text: String },

    /// A reader hit an I/O fault; the source is treated as ended
    ReadFailed { source: SourceId, message: String },

    /// A source reached end of stream. Programs report their exit code once
    /// both output pipes are drained.
    SourceClosed {
        source: SourceId,
        exit_code: Option<i32>,
    },

    /// Stop reading and paint the final frame (signal handler)
    Quit,
}
