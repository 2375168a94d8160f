//! Run loop - entry point, painting and pass-through fallback
//!
//! Contains the application lifecycle:
//! - `run`: Wires sources, signals and the terminal for one run
//! - `FoldRunner`: Applies messages, paints frames and writes final output
//! - `FoldRunner::run_loop`: Waits for lines and pending repaints

use std::io::{self, IsTerminal, Write};

use tokio::sync::{mpsc, watch};

use termfold_app::config::DisplaySettings;
use termfold_app::{
    signals, spawn_source, Engine, FramePacer, Message, OutputMode, RunConfig, Update,
};
use termfold_core::prelude::*;

use crate::layout::{layout_panes, LayoutOptions, PaneView};
use crate::render::Renderer;
use crate::terminal::{self, CrosstermTerminal, Terminal};

/// Capacity of the line channel shared by all sources
const CHANNEL_CAPACITY: usize = 1024;

/// Run termfold with a resolved configuration
pub async fn run(config: RunConfig) -> Result<()> {
    let RunConfig {
        pairs,
        folding,
        display,
        sources,
        output,
    } = config;

    let mut engine = Engine::new(&pairs, folding)?;

    let (msg_tx, msg_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

    // Shutdown signal for readers and child processes
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Sources start before the terminal is touched so spawn errors print cleanly
    for spec in &sources {
        let id = engine.add_pane(spec.title());
        spawn_source(id, spec, msg_tx.clone(), shutdown_rx.clone())?;
    }

    // Spawn signal handler (sends Message::Quit on SIGINT/SIGTERM/SIGHUP)
    signals::spawn_signal_handler(msg_tx.clone());
    drop(msg_tx);

    let stdout = io::stdout();
    let term = match output {
        OutputMode::DumpTree => None,
        _ if !stdout.is_terminal() => {
            info!("stdout is not a terminal, passing lines through");
            None
        }
        _ => match CrosstermTerminal::new() {
            Ok(term) => Some(term),
            Err(e) => {
                warn!("{}", e);
                None
            }
        },
    };
    if term.is_some() {
        terminal::install_panic_hook();
    }

    let mut runner = FoldRunner::new(engine, term, display, output, stdout);
    runner.start()?;
    let result = runner.run_loop(msg_rx).await;

    let _ = shutdown_tx.send(true);
    runner.finish()?;

    info!(
        "Run finished with {} pane(s){}",
        runner.engine().panes().len(),
        if runner.engine().is_quitting() {
            " (interrupted)"
        } else {
            ""
        }
    );
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// FoldRunner
// ─────────────────────────────────────────────────────────────────────────────

/// Drives one run: folds messages into the engine and paints frames.
///
/// Without a terminal (or once the terminal fails) the runner is in
/// pass-through mode and prints lines verbatim to `out` instead.
pub struct FoldRunner<T: Terminal, W: Write> {
    engine: Engine,
    term: Option<T>,
    renderer: Renderer,
    pacer: FramePacer,
    display: DisplaySettings,
    output: OutputMode,
    out: W,
    passthrough: bool,
    /// Terminal size at the last paint
    size: Option<(u16, u16)>,
}

impl<T: Terminal, W: Write> FoldRunner<T, W> {
    pub fn new(
        engine: Engine,
        term: Option<T>,
        display: DisplaySettings,
        output: OutputMode,
        out: W,
    ) -> Self {
        let passthrough = term.is_none() && output != OutputMode::DumpTree;
        Self {
            engine,
            term,
            renderer: Renderer::new(),
            pacer: FramePacer::new(display.frame_interval()),
            display,
            output,
            out,
            passthrough,
            size: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The terminal, unless there never was one or it failed
    pub fn terminal(&self) -> Option<&T> {
        self.term.as_ref()
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Prepare the terminal; falls back to pass-through if that fails
    pub fn start(&mut self) -> Result<()> {
        let alternate = self.output == OutputMode::Replay;
        let fixed = self.display.height;
        let Some(term) = self.term.as_mut() else {
            return Ok(());
        };

        let entered = term.size().and_then(|(_, rows)| {
            term.enter(alternate, viewport_height(rows, fixed))?;
            term.hide_cursor()
        });
        match entered {
            Ok(()) => Ok(()),
            Err(e) => self.recover(e),
        }
    }

    /// Apply one message, painting when the pacer says so
    pub fn handle(&mut self, message: Message) -> Result<()> {
        if self.passthrough {
            if let Message::Line { text, .. } = &message {
                writeln!(self.out, "{}", text)?;
            }
        }

        match self.engine.process_message(message) {
            Some(Update::Folded { .. }) => {
                if self.pacer.add() {
                    self.paint()?;
                }
            }
            Some(Update::SourceEnded(source)) => {
                debug!("Source {} ended, repainting", source);
                self.paint()?;
            }
            Some(Update::Quit) | None => {}
        }
        Ok(())
    }

    /// Paint if lines are pending and the frame interval elapsed
    pub fn tick(&mut self) -> Result<()> {
        if self.pacer.should_paint() {
            self.paint()?;
        }
        Ok(())
    }

    /// Paint the live frame now
    pub fn paint(&mut self) -> Result<()> {
        self.pacer.painted();
        if self.passthrough {
            return Ok(());
        }
        match self.draw(0, true) {
            Ok(()) => Ok(()),
            Err(e) => self.recover(e),
        }
    }

    /// Wait for messages until every source ended or the run is interrupted
    pub async fn run_loop(&mut self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        let delay = self.display.interline_delay();

        while !self.engine.is_done() {
            let wait = self.pacer.time_until_paint();
            tokio::select! {
                message = rx.recv() => {
                    let Some(message) = message else {
                        debug!("Message channel closed");
                        break;
                    };
                    let is_line = matches!(message, Message::Line { .. });
                    self.handle(message)?;
                    if let (true, Some(delay)) = (is_line, delay) {
                        tokio::time::sleep(delay).await;
                    }
                }
                _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {
                    self.tick()?;
                }
            }
        }
        Ok(())
    }

    /// Write the run's final output.
    ///
    /// - Fold: the final frame, shrunk by `final_shrink` rows and expanded
    ///   when `expand_final` is set, then the cursor is restored below it
    /// - Replay: leaves the alternate screen and prints the captured input
    /// - DumpTree: prints every pane's tree as JSON
    pub fn finish(&mut self) -> Result<()> {
        if !self.passthrough {
            match self.output {
                OutputMode::Fold => {
                    if let Err(e) = self.final_frame() {
                        return self.recover(e);
                    }
                }
                OutputMode::Replay => {
                    if let Some(term) = self.term.as_mut() {
                        if let Err(e) = term.leave() {
                            warn!("{}", e);
                        }
                    }
                    self.engine.write_raw(&mut self.out)?;
                }
                OutputMode::DumpTree => {
                    let json = self.engine.dump_json()?;
                    writeln!(self.out, "{}", json).context("Failed to write tree dump")?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn final_frame(&mut self) -> Result<()> {
        self.draw(self.display.final_shrink, !self.display.expand_final)?;
        if let Some(term) = self.term.as_mut() {
            self.renderer.finish(term)?;
            term.leave()?;
        }
        Ok(())
    }

    /// Lay out every pane and paint the result
    fn draw(&mut self, shrink: u16, minimize: bool) -> Result<()> {
        let Some(term) = self.term.as_mut() else {
            return Ok(());
        };

        let size = term.size()?;
        if self.size != Some(size) {
            if self.size.is_some() {
                debug!("Terminal resized to {}x{}", size.0, size.1);
            }
            self.size = Some(size);
            self.renderer.invalidate();
        }

        let (cols, rows) = size;
        let height = viewport_height(rows, self.display.height).saturating_sub(shrink);
        let mut options = LayoutOptions::new(usize::from(height)).with_width(usize::from(cols));
        if !minimize {
            options = options.expanded();
        }

        let views: Vec<PaneView<'_>> = self
            .engine
            .panes()
            .iter()
            .map(|pane| PaneView {
                tree: pane.tree(),
                title: pane.title(),
            })
            .collect();
        let rows = layout_panes(&views, &options);
        self.renderer.render(term, rows)?;
        Ok(())
    }

    /// Fall back to pass-through on terminal failures; anything else is
    /// returned to the caller
    fn recover(&mut self, err: Error) -> Result<()> {
        if !err.is_recoverable() {
            return Err(err);
        }
        self.switch_to_passthrough(err)
    }

    /// Give up on the terminal: print what was captured so far, then keep
    /// printing new lines verbatim
    fn switch_to_passthrough(&mut self, err: Error) -> Result<()> {
        warn!("Terminal output failed, passing lines through: {}", err);
        self.passthrough = true;
        if let Some(mut term) = self.term.take() {
            let _ = self.renderer.finish(&mut term);
            let _ = term.leave();
        }
        self.engine.write_raw(&mut self.out)
    }
}

/// Rows available to the frame: the configured height, capped by the terminal
fn viewport_height(rows: u16, fixed: Option<u16>) -> u16 {
    fixed.map_or(rows, |height| height.min(rows))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{MockTerminal, TermOp};
    use termfold_core::{FolderOptions, PatternPair};

    fn engine(panes: &[&str]) -> Engine {
        let mut engine = Engine::new(
            &[PatternPair::new(">>( (?P<M>.*))?", "<<( (?P<M>.*))?")],
            FolderOptions::default(),
        )
        .unwrap();
        for title in panes {
            engine.add_pane(*title);
        }
        engine
    }

    fn runner(
        term: Option<MockTerminal>,
        display: DisplaySettings,
        output: OutputMode,
    ) -> FoldRunner<MockTerminal, Vec<u8>> {
        FoldRunner::new(engine(&["make"]), term, display, output, Vec::new())
    }

    fn feed(runner: &mut FoldRunner<MockTerminal, Vec<u8>>, lines: &[&str]) {
        for line in lines {
            runner
                .handle(Message::Line {
                    source: 0,
                    text: line.to_string(),
                })
                .unwrap();
        }
    }

    fn close(runner: &mut FoldRunner<MockTerminal, Vec<u8>>) {
        runner
            .handle(Message::SourceClosed {
                source: 0,
                exit_code: Some(0),
            })
            .unwrap();
    }

    fn output(runner: &FoldRunner<MockTerminal, Vec<u8>>) -> String {
        String::from_utf8(runner.output().clone()).unwrap()
    }

    #[test]
    fn test_viewport_height() {
        assert_eq!(viewport_height(24, None), 24);
        assert_eq!(viewport_height(24, Some(10)), 10);
        assert_eq!(viewport_height(24, Some(100)), 24);
    }

    #[test]
    fn test_start_enters_in_place_with_viewport_reserve() {
        let display = DisplaySettings {
            height: Some(8),
            ..Default::default()
        };
        let mut runner = runner(Some(MockTerminal::new(80, 24)), display, OutputMode::Fold);
        runner.start().unwrap();

        let term = runner.terminal().unwrap();
        assert_eq!(
            term.ops()[0],
            TermOp::Enter {
                alternate: false,
                reserve: 8
            }
        );
        assert!(!term.cursor_visible());
    }

    #[test]
    fn test_live_frames_follow_lines() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings::default(),
            OutputMode::Fold,
        );
        runner.start().unwrap();

        feed(&mut runner, &[">> build", "cc a.c"]);
        assert_eq!(
            runner.terminal().unwrap().screen_text(),
            "└── build\n    │ cc a.c"
        );

        feed(&mut runner, &["<< 0"]);
        assert_eq!(
            runner.terminal().unwrap().screen_text(),
            "└── build (0) [1 line]"
        );
        assert!(output(&runner).is_empty());
    }

    #[test]
    fn test_final_frame_is_shrunk_and_restores_cursor() {
        let display = DisplaySettings {
            height: Some(5),
            final_shrink: 2,
            ..Default::default()
        };
        let mut runner = runner(Some(MockTerminal::default()), display, OutputMode::Fold);
        runner.start().unwrap();
        feed(&mut runner, &[">> build", "1", "2", "3", "4", "5"]);
        assert_eq!(runner.terminal().unwrap().screen_text().lines().count(), 5);

        runner.finish().unwrap();
        let term = runner.terminal().unwrap();
        assert_eq!(
            term.screen_text(),
            "└── build … 3 hidden\n    │ 4\n    │ 5"
        );
        assert_eq!(term.cursor_row(), 3);
        assert!(term.cursor_visible());
        assert_eq!(term.ops().last(), Some(&TermOp::Leave));
    }

    #[test]
    fn test_expand_final_shows_closed_nodes() {
        let display = DisplaySettings {
            final_shrink: 0,
            expand_final: true,
            ..Default::default()
        };
        let mut runner = runner(Some(MockTerminal::default()), display, OutputMode::Fold);
        runner.start().unwrap();
        feed(&mut runner, &[">> build", "cc a.c", "<< 0"]);
        close(&mut runner);
        runner.finish().unwrap();

        assert_eq!(
            runner.terminal().unwrap().screen_text(),
            "└── build (0)\n    │ cc a.c"
        );
    }

    #[test]
    fn test_frame_interval_defers_painting() {
        let display = DisplaySettings {
            frame_interval_ms: 60_000,
            final_shrink: 0,
            ..Default::default()
        };
        let mut runner = runner(Some(MockTerminal::default()), display, OutputMode::Fold);
        runner.start().unwrap();
        feed(&mut runner, &["a", "b", "c"]);
        assert_eq!(runner.terminal().unwrap().writes_recorded(), 0);

        runner.finish().unwrap();
        assert_eq!(runner.terminal().unwrap().screen_text(), "│ a\n│ b\n│ c");
    }

    #[test]
    fn test_no_terminal_passes_lines_through() {
        let mut runner = runner(None, DisplaySettings::default(), OutputMode::Fold);
        assert!(runner.is_passthrough());
        runner.start().unwrap();
        feed(&mut runner, &["plain", ">> build", "cc a.c", "<< 0"]);
        close(&mut runner);
        runner.finish().unwrap();

        assert_eq!(output(&runner), "plain\n>> build\ncc a.c\n<< 0\n");
    }

    #[test]
    fn test_terminal_failure_falls_back_to_passthrough() {
        let term = MockTerminal::default().failing_after(1);
        let mut runner = runner(Some(term), DisplaySettings::default(), OutputMode::Fold);
        runner.start().unwrap();

        feed(&mut runner, &[">> build", "cc a.c", "<< 0", "after"]);
        assert!(runner.is_passthrough());
        assert!(runner.terminal().is_none());

        runner.finish().unwrap();
        assert_eq!(output(&runner), ">> build\ncc a.c\n<< 0\nafter\n");
    }

    #[test]
    fn test_only_terminal_errors_fall_back() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings::default(),
            OutputMode::Fold,
        );
        runner.start().unwrap();
        feed(&mut runner, &["x"]);

        let err = runner.recover(Error::config("bad pattern")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(!runner.is_passthrough());
        assert!(runner.terminal().is_some());

        runner.recover(Error::terminal("tty gone")).unwrap();
        assert!(runner.is_passthrough());
        assert!(runner.terminal().is_none());
        assert_eq!(output(&runner), "x\n");
    }

    #[test]
    fn test_replay_prints_input_after_alternate_screen() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings::default(),
            OutputMode::Replay,
        );
        runner.start().unwrap();
        feed(&mut runner, &["x", ">> a", "y", "<< ok"]);
        assert!(output(&runner).is_empty());

        runner.finish().unwrap();
        let term = runner.terminal().unwrap();
        assert_eq!(
            term.ops()[0],
            TermOp::Enter {
                alternate: true,
                reserve: 24
            }
        );
        assert_eq!(term.ops().last(), Some(&TermOp::Leave));
        assert_eq!(output(&runner), "x\n>> a\ny\n<< ok\n");
    }

    #[test]
    fn test_dump_tree_prints_json() {
        let mut runner = runner(None, DisplaySettings::default(), OutputMode::DumpTree);
        assert!(!runner.is_passthrough());
        feed(&mut runner, &[">> build", "cc a.c", "<< 0"]);
        runner
            .handle(Message::SourceClosed {
                source: 0,
                exit_code: Some(2),
            })
            .unwrap();
        runner.finish().unwrap();

        let json: serde_json::Value = serde_json::from_str(&output(&runner)).unwrap();
        assert_eq!(json[0]["title"], "make");
        assert_eq!(json[0]["exit_code"], 2);
        assert_eq!(json[0]["tree"]["nodes"][1]["label"], "build");
    }

    #[tokio::test]
    async fn test_run_loop_ends_when_sources_close() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings {
                final_shrink: 0,
                ..Default::default()
            },
            OutputMode::Fold,
        );
        runner.start().unwrap();

        let (tx, rx) = mpsc::channel(16);
        for text in [">> build", "cc a.c", "<< 0"] {
            tx.send(Message::Line {
                source: 0,
                text: text.to_string(),
            })
            .await
            .unwrap();
        }
        tx.send(Message::SourceClosed {
            source: 0,
            exit_code: Some(0),
        })
        .await
        .unwrap();

        runner.run_loop(rx).await.unwrap();
        assert!(runner.engine().is_done());

        runner.finish().unwrap();
        assert_eq!(
            runner.terminal().unwrap().screen_text(),
            "└── build (0) [1 line]"
        );
        drop(tx);
    }

    #[tokio::test]
    async fn test_quit_keeps_open_nodes_in_final_frame() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings {
                final_shrink: 0,
                ..Default::default()
            },
            OutputMode::Fold,
        );
        runner.start().unwrap();

        let (tx, rx) = mpsc::channel(16);
        tx.send(Message::Line {
            source: 0,
            text: ">> build".to_string(),
        })
        .await
        .unwrap();
        tx.send(Message::Quit).await.unwrap();

        runner.run_loop(rx).await.unwrap();
        assert!(runner.engine().is_quitting());

        runner.finish().unwrap();
        assert_eq!(runner.terminal().unwrap().screen_text(), "└── build");
        drop(tx);
    }

    #[tokio::test]
    async fn test_run_loop_paints_pending_lines_after_interval() {
        let mut runner = runner(
            Some(MockTerminal::default()),
            DisplaySettings {
                frame_interval_ms: 20,
                ..Default::default()
            },
            OutputMode::Fold,
        );
        runner.start().unwrap();

        let (tx, rx) = mpsc::channel(16);
        let feeder = tokio::spawn(async move {
            for text in ["a", "b"] {
                tx.send(Message::Line {
                    source: 0,
                    text: text.to_string(),
                })
                .await
                .unwrap();
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            // Quit does not repaint, so the frame below comes from the pacer
            tx.send(Message::Quit).await.unwrap();
        });

        runner.run_loop(rx).await.unwrap();
        feeder.await.unwrap();
        assert_eq!(runner.terminal().unwrap().screen_text(), "│ a\n│ b");
    }
}
