//! ANSI escape handling for captured program output.
//!
//! Captured lines are stored verbatim. Escapes are only removed when a line is
//! turned into a display row, where they would break width accounting.

use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences (colors, cursor motion), OSC sequences (titles, hyperlinks)
/// and lone two-byte escapes.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("ANSI pattern is valid")
});

/// Remove ANSI escape sequences from a string
pub fn strip_ansi_codes(text: &str) -> String {
    if !contains_ansi_codes(text) {
        return text.to_string();
    }
    ANSI_RE.replace_all(text, "").into_owned()
}

/// Check whether a string carries any escape character
pub fn contains_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}
