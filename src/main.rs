//! termfold - Fold long-running command output into a collapsible tree
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use termfold_app::config::{self, CliOverrides};
use termfold_core::prelude::*;

/// How long runtime shutdown waits for reader tasks
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Fold long-running command output into a collapsible tree
#[derive(Parser, Debug)]
#[command(name = "termfold", version)]
#[command(
    about = "Fold command output into a tree of start/end marker regions",
    long_about = None,
    after_help = "Programs are separated by `-/-`, e.g. `termfold -s 'BEGIN (.*)' -e 'END (.*)' -- make -/- make test`.\n\
                  A literal `-/-` argument is written `-//-`. Without programs, stdin is folded."
)]
struct Args {
    /// Start marker pattern (regex, anchored); pairs with the matching --end
    #[arg(short = 's', long = "start", value_name = "REGEX")]
    starts: Vec<String>,

    /// End marker pattern (regex, anchored); pairs with the matching --start
    #[arg(short = 'e', long = "end", value_name = "REGEX")]
    ends: Vec<String>,

    /// File with pattern pairs: a start line followed by an end line
    #[arg(short = 'f', long = "pairs-file", value_name = "PATH")]
    pairs_file: Option<PathBuf>,

    /// Settings file instead of ~/.config/termfold/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Viewport height in rows (default: terminal height)
    #[arg(long, value_name = "ROWS")]
    height: Option<u16>,

    /// Rows left free below the final frame
    #[arg(long, value_name = "ROWS")]
    final_shrink: Option<u16>,

    /// Paint the final frame fully expanded
    #[arg(long)]
    expand_final: bool,

    /// Keep marker lines as content of their node
    #[arg(long)]
    keep_markers: bool,

    /// Keep only the last N content lines of a node once it closes
    #[arg(long, value_name = "N")]
    retain_closed_lines: Option<usize>,

    /// Minimum milliseconds between repaints (0 paints every line)
    #[arg(long, value_name = "MS")]
    frame_interval: Option<u64>,

    /// Milliseconds to wait after each line
    #[arg(long, value_name = "MS")]
    interline_delay: Option<u64>,

    /// Fold in the alternate screen, then print the input verbatim
    #[arg(short = 'r', long)]
    replay: bool,

    /// Print the final trees as JSON instead of drawing
    #[arg(long, conflicts_with = "replay")]
    dump_tree: bool,

    /// Shell used for commands from --programs-file
    #[arg(long, value_name = "SHELL")]
    shell: Option<String>,

    /// File with one shell command per line (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    programs_file: Option<PathBuf>,

    /// Programs to run, separated by `-/-`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "PROGRAM")]
    programs: Vec<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_path: args.config,
            starts: args.starts,
            ends: args.ends,
            pairs_file: args.pairs_file,
            programs: args.programs,
            programs_file: args.programs_file,
            shell: args.shell,
            height: args.height,
            final_shrink: args.final_shrink,
            expand_final: args.expand_final,
            keep_markers: args.keep_markers,
            retain_closed_lines: args.retain_closed_lines,
            frame_interval_ms: args.frame_interval,
            interline_delay_ms: args.interline_delay,
            replay: args.replay,
            dump_tree: args.dump_tree,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    let cli = CliOverrides::from(Args::parse());

    color_eyre::install()?;

    // Logs go to a file; the terminal belongs to the folded output
    let log_file = termfold_core::logging::init()?;

    let settings = config::load_settings(cli.config_path.as_deref())?;
    let run_config = config::resolve(settings, cli)?;
    info!(
        "{} source(s), {} pattern pair(s), output {:?}",
        run_config.sources.len(),
        run_config.pairs.len(),
        run_config.output
    );

    // One thread: the engine and every reader share it
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(termfold_tui::run(run_config));

    // Blocking stdin reads cannot be cancelled; do not wait for them
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    info!("termfold exiting");
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => {
            error!("Fatal error: {:?}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Run ended with error: {:?}", e);
            eprintln!("termfold: {} (see {})", e, log_file.display());
            std::process::exit(1);
        }
    }
}
