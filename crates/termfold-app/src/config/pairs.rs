//! Pattern pairs file: one start pattern and one end pattern per two lines.

use std::path::Path;

use termfold_core::prelude::*;
use termfold_core::PatternPair;

/// Read pattern pairs from a file
pub fn load_pairs_file(path: &Path) -> Result<Vec<PatternPair>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;
    let pairs = parse_pairs(&content, &path.display().to_string())?;
    debug!("Loaded {} pattern pairs from {:?}", pairs.len(), path);
    Ok(pairs)
}

/// Parse pairs from text. Blank lines are skipped; an odd number of
/// patterns is an error.
pub fn parse_pairs(content: &str, origin: &str) -> Result<Vec<PatternPair>> {
    let mut pairs = Vec::new();
    let mut start: Option<&str> = None;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match start.take() {
            None => start = Some(line),
            Some(s) => pairs.push(PatternPair::new(s, line)),
        }
    }

    if let Some(unpaired) = start {
        return Err(Error::config(format!(
            "Unpaired pattern in {} (odd number of lines?): {}",
            origin, unpaired
        )));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_two_pairs() {
        let pairs = parse_pairs("A (.*)\nB\n\n==> (.*)\n<== (.*)\n", "test").unwrap();
        assert_eq!(
            pairs,
            vec![
                PatternPair::new("A (.*)", "B"),
                PatternPair::new("==> (.*)", "<== (.*)")
            ]
        );
    }

    #[test]
    fn test_odd_line_count_is_config_error() {
        let err = parse_pairs("A\nB\nC\n", "pairs.txt").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("pairs.txt"));
        assert!(err.to_string().contains('C'));
    }

    #[test]
    fn test_empty_file_has_no_pairs() {
        assert!(parse_pairs("\n\n", "x").unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs");
        std::fs::write(&path, "::group::(.*)\n::endgroup::\n").unwrap();

        let pairs = load_pairs_file(&path).unwrap();
        assert_eq!(pairs, vec![PatternPair::new("::group::(.*)", "::endgroup::")]);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempdir().unwrap();
        let err = load_pairs_file(&dir.path().join("missing")).unwrap_err();
        assert!(err.is_fatal());
    }
}
