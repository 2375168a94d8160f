//! Start/end marker matching.
//!
//! A [`Matchers`] holds every configured pattern pair. Each pattern is
//! anchored to the whole line, and may carry one capture group for the label:
//! the group named `M` when present, otherwise the first positional group.
//! A marker whose label group did not participate yields an empty label,
//! which is different from not matching at all.

use regex::{Captures, Regex, RegexSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the capture group that holds the label when a pattern has several groups
pub const LABEL_GROUP: &str = "M";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Which side of a region a marker belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    Start,
    End,
}

/// Uncompiled start/end pattern pair, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternPair {
    pub start: String,
    pub end: String,
}

impl PatternPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A successful classification of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Index of the pair that matched, in configuration order
    pub pair: usize,
    pub role: MarkerRole,
    /// Captured label, possibly empty
    pub label: String,
}

/// One compiled, anchored pattern
#[derive(Debug, Clone)]
struct Marker {
    regex: Regex,
    has_named_label: bool,
}

impl Marker {
    fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::pattern(pattern, e.to_string()))?;

        let has_named_label = regex.capture_names().any(|name| name == Some(LABEL_GROUP));

        // captures_len() includes the implicit whole-match group
        if regex.captures_len() > 2 && !has_named_label {
            return Err(Error::pattern(
                pattern,
                format!(
                    "multiple capture groups and none named {}; use (?P<{}>...) for the label",
                    LABEL_GROUP, LABEL_GROUP
                ),
            ));
        }

        Ok(Self {
            regex,
            has_named_label,
        })
    }

    fn label(&self, captures: &Captures<'_>) -> String {
        let group = if self.has_named_label {
            captures.name(LABEL_GROUP)
        } else {
            captures.get(1)
        };
        group.map(|m| m.as_str().to_string()).unwrap_or_default()
    }

    fn match_label(&self, line: &str) -> Option<String> {
        self.regex.captures(line).map(|caps| self.label(&caps))
    }
}

#[derive(Debug, Clone)]
struct MarkerPair {
    start: Marker,
    end: Marker,
}

// ─────────────────────────────────────────────────────────────────────────────
// Matchers
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled set of all start/end pattern pairs
#[derive(Debug, Clone)]
pub struct Matchers {
    pairs: Vec<MarkerPair>,
    /// Every anchored pattern, used to reject ordinary lines in one pass
    any: RegexSet,
}

impl Matchers {
    /// Compile pattern pairs. Fails on the first invalid pattern.
    pub fn new(pairs: &[PatternPair]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(pairs.len());
        let mut sources = Vec::with_capacity(pairs.len() * 2);

        for pair in pairs {
            let start = Marker::compile(&pair.start)?;
            let end = Marker::compile(&pair.end)?;
            sources.push(start.regex.as_str().to_string());
            sources.push(end.regex.as_str().to_string());
            compiled.push(MarkerPair { start, end });
        }

        let any = RegexSet::new(&sources).map_err(|e| Error::config(e.to_string()))?;

        Ok(Self {
            pairs: compiled,
            any,
        })
    }

    /// Matchers with no pairs: every line is plain content
    pub fn empty() -> Self {
        Self {
            pairs: Vec::new(),
            any: RegexSet::empty(),
        }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Classify a line against every pair.
    ///
    /// Pairs are tried in order, and within a pair the start pattern is tried
    /// before the end pattern, so a line matching both is a start marker.
    pub fn classify(&self, line: &str) -> Option<MatchOutcome> {
        if self.pairs.is_empty() || !self.any.is_match(line) {
            return None;
        }

        for (idx, pair) in self.pairs.iter().enumerate() {
            if let Some(label) = pair.start.match_label(line) {
                return Some(MatchOutcome {
                    pair: idx,
                    role: MarkerRole::Start,
                    label,
                });
            }
            if let Some(label) = pair.end.match_label(line) {
                return Some(MatchOutcome {
                    pair: idx,
                    role: MarkerRole::End,
                    label,
                });
            }
        }

        None
    }

    /// Match a line for one role only, across all pairs
    pub fn match_role(&self, line: &str, role: MarkerRole) -> Option<String> {
        self.pairs.iter().find_map(|pair| match role {
            MarkerRole::Start => pair.start.match_label(line),
            MarkerRole::End => pair.end.match_label(line),
        })
    }
}

impl Default for Matchers {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrows() -> Matchers {
        Matchers::new(&[PatternPair::new(">>( (?P<M>.*))?", "<<( (?P<M>.*))?")]).unwrap()
    }

    #[test]
    fn test_named_group_label() {
        let m = arrows();
        assert_eq!(m.match_role(">> build", MarkerRole::Start), Some("build".into()));
        assert_eq!(m.match_role("<< 0", MarkerRole::End), Some("0".into()));
    }

    #[test]
    fn test_non_participating_group_is_empty_label() {
        let m = arrows();
        assert_eq!(m.match_role(">>", MarkerRole::Start), Some(String::new()));
        assert_eq!(m.match_role("<<", MarkerRole::End), Some(String::new()));
    }

    #[test]
    fn test_no_match_is_none() {
        let m = arrows();
        assert_eq!(m.match_role("compiling a.c", MarkerRole::Start), None);
        assert_eq!(m.match_role("compiling a.c", MarkerRole::End), None);
        assert!(m.classify("compiling a.c").is_none());
    }

    #[test]
    fn test_patterns_are_anchored() {
        let m = arrows();
        assert!(m.classify("  >> build").is_none());
        assert!(m.classify("x<< 0").is_none());
    }

    #[test]
    fn test_pattern_without_group_yields_empty_label() {
        let m = Matchers::new(&[PatternPair::new("BEGIN", "END")]).unwrap();
        let outcome = m.classify("BEGIN").unwrap();
        assert_eq!(outcome.role, MarkerRole::Start);
        assert_eq!(outcome.label, "");
    }

    #[test]
    fn test_single_positional_group() {
        let m = Matchers::new(&[PatternPair::new(r"::group::(.*)", r"::endgroup::")]).unwrap();
        let outcome = m.classify("::group::Run tests").unwrap();
        assert_eq!(outcome.label, "Run tests");
        assert_eq!(m.classify("::endgroup::").unwrap().role, MarkerRole::End);
    }

    #[test]
    fn test_start_wins_when_both_match() {
        let m = Matchers::new(&[PatternPair::new("(.*)", "(.*)")]).unwrap();
        let outcome = m.classify("anything").unwrap();
        assert_eq!(outcome.role, MarkerRole::Start);
        assert_eq!(outcome.label, "anything");
    }

    #[test]
    fn test_pairs_tried_in_order() {
        let m = Matchers::new(&[
            PatternPair::new(r"\[start\] (.*)", r"\[end\] (.*)"),
            PatternPair::new(r"==> (.*)", r"<== (.*)"),
        ])
        .unwrap();
        assert_eq!(m.classify("==> lint").unwrap().pair, 1);
        assert_eq!(m.classify("[end] ok").unwrap().pair, 0);
    }

    #[test]
    fn test_invalid_syntax_is_pattern_error() {
        let err = Matchers::new(&[PatternPair::new("(unclosed", "end")]).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_multiple_groups_require_named_label() {
        let err = Matchers::new(&[PatternPair::new("(a)(b)", "end")]).unwrap_err();
        assert!(err.to_string().contains("none named M"));
    }

    #[test]
    fn test_empty_matchers_never_match() {
        let m = Matchers::empty();
        assert_eq!(m.pair_count(), 0);
        assert!(m.classify(">> build").is_none());
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let m = arrows();
        for line in ["", "\u{0}", ">>\u{1b}[31m x", "<<<<<<", "\u{fffd}\u{fffd}"] {
            let _ = m.classify(line);
        }
    }
}
