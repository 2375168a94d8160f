//! Line sources: stdin or child programs
//!
//! Every source is read by tokio tasks that forward lines to the run loop as
//! [`Message::Line`]. A program's stdout and stderr feed the same source.
//! Readers stop at end of stream, on an I/O fault, or when the shutdown
//! watch flips to `true`.

use std::io::BufRead;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use crate::message::{Message, SourceId};
use termfold_core::prelude::*;

/// Shell used for programs-file lines when `--shell` is not given
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Separates program argument groups on the command line
pub const PROGRAM_SEPARATOR: &str = "-/-";

/// Pane title of the stdin source
pub const STDIN_TITLE: &str = "<stdin>";

/// An escaped separator: `-//-` stands for a literal `-/-`, `-///-` for `-//-`
static SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-/(/+)-$").expect("Invalid separator regex"));

// ─────────────────────────────────────────────────────────────────────────────
// Source descriptions
// ─────────────────────────────────────────────────────────────────────────────

/// Where a pane's lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    /// A program run directly from its argument vector
    Program { argv: Vec<String> },
    /// A command line run through `shell -c`
    Shell { shell: String, command: String },
}

impl SourceSpec {
    /// Description shown as the pane title
    pub fn title(&self) -> String {
        match self {
            SourceSpec::Stdin => STDIN_TITLE.to_string(),
            SourceSpec::Program { argv } => argv
                .iter()
                .map(|arg| shell_quote(arg))
                .collect::<Vec<_>>()
                .join(" "),
            SourceSpec::Shell { command, .. } => command.clone(),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, SourceSpec::Stdin)
    }
}

/// Split trailing arguments into one argument vector per program.
///
/// Empty groups (leading, trailing or doubled separators) are skipped.
pub fn split_programs(args: &[String]) -> Vec<Vec<String>> {
    let mut programs = Vec::new();
    let mut current = Vec::new();

    for arg in args {
        if arg == PROGRAM_SEPARATOR {
            if !current.is_empty() {
                programs.push(std::mem::take(&mut current));
            }
            continue;
        }
        match SEPARATOR_REGEX.captures(arg) {
            Some(caps) => {
                let extra = caps.get(1).map_or("", |m| m.as_str());
                current.push(format!("-{}-", extra));
            }
            None => current.push(arg.clone()),
        }
    }

    if !current.is_empty() {
        programs.push(current);
    }
    programs
}

/// Read a programs file, one shell command per line. `-` reads stdin.
///
/// Blank lines are skipped.
pub fn load_programs_file(path: &Path) -> Result<Vec<String>> {
    let lines: Vec<String> = if path.as_os_str() == "-" {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(|e| Error::config(format!("Failed to read programs from stdin: {}", e)))?
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read programs file {}: {}",
                path.display(),
                e
            ))
        })?;
        content.lines().map(str::to_string).collect()
    };

    Ok(lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect())
}

/// Quote an argument for display the way a POSIX shell would accept it
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=+%@:,./".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Readers
// ─────────────────────────────────────────────────────────────────────────────

/// Start reading a source.
///
/// Programs are spawned immediately; a spawn failure is returned. Stdin
/// cannot fail to start.
pub fn spawn_source(
    source: SourceId,
    spec: &SourceSpec,
    tx: mpsc::Sender<Message>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    match spec {
        SourceSpec::Stdin => {
            info!("Reading source {} from stdin", source);
            tokio::spawn(async move {
                read_lines(source, tokio::io::stdin(), &tx, shutdown).await;
                let _ = tx
                    .send(Message::SourceClosed {
                        source,
                        exit_code: None,
                    })
                    .await;
            });
            Ok(())
        }
        SourceSpec::Program { argv } => {
            let Some((program, args)) = argv.split_first() else {
                return Err(Error::config("Empty program argument list"));
            };
            let mut command = Command::new(program);
            command.args(args);
            spawn_child(source, spec.title(), command, tx, shutdown)
        }
        SourceSpec::Shell { shell, command: line } => {
            let mut command = Command::new(shell);
            command.arg("-c").arg(line);
            spawn_child(source, spec.title(), command, tx, shutdown)
        }
    }
}

fn spawn_child(
    source: SourceId,
    title: String,
    mut command: Command,
    tx: mpsc::Sender<Message>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::process_spawn(title.clone(), e.to_string()))?;

    info!("Spawned source {} `{}` with PID {:?}", source, title, child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::spawn(async move {
        let out_shutdown = shutdown.clone();
        let err_shutdown = shutdown.clone();
        tokio::join!(
            async {
                if let Some(stdout) = stdout {
                    read_lines(source, stdout, &tx, out_shutdown).await;
                }
            },
            async {
                if let Some(stderr) = stderr {
                    read_lines(source, stderr, &tx, err_shutdown).await;
                }
            }
        );

        let exit_code = wait_for_exit(&mut child, shutdown).await;
        debug!("Source {} exited with {:?}", source, exit_code);
        let _ = tx.send(Message::SourceClosed { source, exit_code }).await;
    });

    Ok(())
}

/// Wait for a child whose pipes are drained, killing it on shutdown
async fn wait_for_exit(child: &mut Child, mut shutdown: watch::Receiver<bool>) -> Option<i32> {
    if *shutdown.borrow() {
        let _ = child.kill().await;
    }

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => status.code(),
            Err(e) => {
                error!("Error waiting for child process: {}", e);
                None
            }
        },
        Ok(()) = shutdown.changed() => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill child process: {}", e);
            }
            child.wait().await.ok().and_then(|status| status.code())
        }
    }
}

/// Forward lines from `reader` until end of stream, a read fault or shutdown
async fn read_lines<R>(
    source: SourceId,
    reader: R,
    tx: &mpsc::Sender<Message>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    // A cancelled read_until leaves partial bytes in buf; only clear after a full line
    let mut buf = Vec::new();

    while !*shutdown.borrow() {
        tokio::select! {
            result = reader.read_until(b'\n', &mut buf) => match result {
                Ok(0) => break,
                Ok(_) => {
                    let text = decode_line(&buf);
                    buf.clear();
                    trace!("source {}: {}", source, text);
                    if tx.send(Message::Line { source, text }).await.is_err() {
                        debug!("Line channel closed, source {} reader stopping", source);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Read error on source {}: {}", source, e);
                    let _ = tx
                        .send(Message::ReadFailed {
                            source,
                            message: e.to_string(),
                        })
                        .await;
                    break;
                }
            },
            Ok(()) = shutdown.changed() => {}
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && buf[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
