//! Merging command-line values over the settings file
//!
//! Priority, highest first: command line, pairs file, settings file.
//! Pattern pairs are not overridden but concatenated in that order, so the
//! command line's pairs are tried first.

use termfold_core::prelude::*;
use termfold_core::PatternPair;

use super::pairs::load_pairs_file;
use super::types::{CliOverrides, OutputMode, RunConfig, Settings};
use crate::source::{load_programs_file, split_programs, SourceSpec, DEFAULT_SHELL};

/// Build the run configuration from settings and command-line values
pub fn resolve(settings: Settings, cli: CliOverrides) -> Result<RunConfig> {
    let pairs = resolve_pairs(&settings, &cli)?;
    let sources = resolve_sources(&cli)?;

    let mut folding = settings.folding.folder_options();
    if cli.keep_markers {
        folding.keep_marker_lines = true;
    }
    if cli.retain_closed_lines.is_some() {
        folding.retain_closed_lines = cli.retain_closed_lines;
    }

    let mut display = settings.display;
    if cli.height.is_some() {
        display.height = cli.height;
    }
    if let Some(shrink) = cli.final_shrink {
        display.final_shrink = shrink;
    }
    if cli.expand_final {
        display.expand_final = true;
    }
    if let Some(ms) = cli.frame_interval_ms {
        display.frame_interval_ms = ms;
    }
    if let Some(ms) = cli.interline_delay_ms {
        display.interline_delay_ms = ms;
    }

    let output = if cli.dump_tree {
        OutputMode::DumpTree
    } else if cli.replay {
        OutputMode::Replay
    } else {
        OutputMode::Fold
    };

    if pairs.is_empty() {
        warn!("No marker patterns configured; every line will be plain content");
    }

    Ok(RunConfig {
        pairs,
        folding,
        display,
        sources,
        output,
    })
}

fn resolve_pairs(settings: &Settings, cli: &CliOverrides) -> Result<Vec<PatternPair>> {
    if cli.starts.len() != cli.ends.len() {
        return Err(Error::config(format!(
            "Start and end pattern counts differ: {} != {}",
            cli.starts.len(),
            cli.ends.len()
        )));
    }

    let mut pairs: Vec<PatternPair> = cli
        .starts
        .iter()
        .zip(&cli.ends)
        .map(|(s, e)| PatternPair::new(s.as_str(), e.as_str()))
        .collect();

    if let Some(path) = &cli.pairs_file {
        pairs.extend(load_pairs_file(path)?);
    }

    pairs.extend(settings.patterns.pairs.iter().cloned());
    Ok(pairs)
}

fn resolve_sources(cli: &CliOverrides) -> Result<Vec<SourceSpec>> {
    let mut sources = Vec::new();

    if let Some(path) = &cli.programs_file {
        let shell = cli.shell.clone().unwrap_or_else(|| DEFAULT_SHELL.to_string());
        for command in load_programs_file(path)? {
            sources.push(SourceSpec::Shell {
                shell: shell.clone(),
                command,
            });
        }
    }

    for argv in split_programs(&cli.programs) {
        sources.push(SourceSpec::Program { argv });
    }

    if sources.is_empty() {
        if cli.programs_file.is_some() {
            return Err(Error::config("No programs specified"));
        }
        sources.push(SourceSpec::Stdin);
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::PatternSettings;
    use tempfile::tempdir;

    fn cli() -> CliOverrides {
        CliOverrides::default()
    }

    #[test]
    fn test_defaults_read_stdin() {
        let config = resolve(Settings::default(), cli()).unwrap();
        assert_eq!(config.sources, vec![SourceSpec::Stdin]);
        assert_eq!(config.output, OutputMode::Fold);
        assert!(config.pairs.is_empty());
    }

    #[test]
    fn test_cli_pairs_come_first() {
        let settings = Settings {
            patterns: PatternSettings {
                pairs: vec![PatternPair::new("FILE (.*)", "ENDFILE")],
            },
            ..Default::default()
        };
        let overrides = CliOverrides {
            starts: vec!["CLI (.*)".into()],
            ends: vec!["ENDCLI".into()],
            ..cli()
        };

        let config = resolve(settings, overrides).unwrap();
        assert_eq!(
            config.pairs,
            vec![
                PatternPair::new("CLI (.*)", "ENDCLI"),
                PatternPair::new("FILE (.*)", "ENDFILE")
            ]
        );
    }

    #[test]
    fn test_unbalanced_cli_patterns_are_config_error() {
        let overrides = CliOverrides {
            starts: vec!["a".into(), "b".into()],
            ends: vec!["c".into()],
            ..cli()
        };
        let err = resolve(Settings::default(), overrides).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("2 != 1"));
    }

    #[test]
    fn test_pairs_file_between_cli_and_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs");
        std::fs::write(&path, "P (.*)\nQ\n").unwrap();

        let overrides = CliOverrides {
            starts: vec!["S".into()],
            ends: vec!["E".into()],
            pairs_file: Some(path),
            ..cli()
        };
        let config = resolve(Settings::default(), overrides).unwrap();
        assert_eq!(config.pairs[1], PatternPair::new("P (.*)", "Q"));
    }

    #[test]
    fn test_cli_overrides_display_and_folding() {
        let overrides = CliOverrides {
            height: Some(10),
            final_shrink: Some(0),
            expand_final: true,
            keep_markers: true,
            retain_closed_lines: Some(5),
            frame_interval_ms: Some(4),
            ..cli()
        };
        let config = resolve(Settings::default(), overrides).unwrap();
        assert_eq!(config.display.height, Some(10));
        assert_eq!(config.display.final_shrink, 0);
        assert!(config.display.expand_final);
        assert_eq!(config.display.frame_interval_ms, 4);
        assert!(config.folding.keep_marker_lines);
        assert_eq!(config.folding.retain_closed_lines, Some(5));
    }

    #[test]
    fn test_programs_split_into_sources() {
        let overrides = CliOverrides {
            programs: vec!["make".into(), "-/-".into(), "cargo".into(), "test".into()],
            ..cli()
        };
        let config = resolve(Settings::default(), overrides).unwrap();
        assert_eq!(
            config.sources,
            vec![
                SourceSpec::Program {
                    argv: vec!["make".into()]
                },
                SourceSpec::Program {
                    argv: vec!["cargo".into(), "test".into()]
                },
            ]
        );
    }

    #[test]
    fn test_programs_file_uses_shell() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("programs");
        std::fs::write(&path, "make all\n\nmake check\n").unwrap();

        let overrides = CliOverrides {
            programs_file: Some(path),
            shell: Some("/bin/bash".into()),
            ..cli()
        };
        let config = resolve(Settings::default(), overrides).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(
            config.sources[1],
            SourceSpec::Shell {
                shell: "/bin/bash".into(),
                command: "make check".into()
            }
        );
    }

    #[test]
    fn test_empty_programs_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("programs");
        std::fs::write(&path, "\n").unwrap();

        let overrides = CliOverrides {
            programs_file: Some(path),
            ..cli()
        };
        assert!(resolve(Settings::default(), overrides).is_err());
    }

    #[test]
    fn test_dump_tree_wins_over_replay() {
        let overrides = CliOverrides {
            replay: true,
            dump_tree: true,
            ..cli()
        };
        let config = resolve(Settings::default(), overrides).unwrap();
        assert_eq!(config.output, OutputMode::DumpTree);
    }
}
