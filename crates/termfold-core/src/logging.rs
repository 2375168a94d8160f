//! File logging through tracing
//!
//! The terminal belongs to the folded output, so logs only ever go to a file.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TERMFOLD_LOG";

/// Filter used when `TERMFOLD_LOG` is unset or invalid
const DEFAULT_FILTER: &str =
    "termfold=info,termfold_core=info,termfold_app=info,termfold_tui=info,warn";

const LOG_FILE: &str = "termfold.log";

/// Start logging to `<data dir>/termfold/logs/termfold.log`.
///
/// Returns the log file path so failures can point the user at it.
///
/// # Examples
/// ```bash
/// TERMFOLD_LOG=debug termfold -- make
/// TERMFOLD_LOG=termfold_core=trace termfold -- make
/// ```
pub fn init() -> Result<PathBuf> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    // One file per user; each run appends below a banner
    let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, LOG_FILE);

    tracing_subscriber::registry()
        .with(filter_from(std::env::var(LOG_ENV).ok().as_deref()))
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("───────────────────────────────────────────────────────");
    tracing::info!(
        "termfold {} starting (pid {})",
        env!("CARGO_PKG_VERSION"),
        std::process::id()
    );

    Ok(log_dir.join(LOG_FILE))
}

/// Build the filter from a `TERMFOLD_LOG` value, falling back to the default
/// when it is missing or does not parse
fn filter_from(spec: Option<&str>) -> EnvFilter {
    spec.and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Directory holding the log file
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("termfold")
        .join("logs")
}
