//! Row text preparation: escape stripping, tab expansion and width clipping

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use termfold_core::strip_ansi_codes;

/// Tab stops every this many columns
pub const TAB_WIDTH: usize = 8;

/// Marker appended to clipped text
pub const ELLIPSIS: &str = "...";

/// Make captured text safe to print on one terminal row.
///
/// ANSI escapes are removed, tabs expand to the next stop (counted from
/// the start of the text), and other control characters are dropped.
pub fn sanitize(text: &str) -> String {
    let stripped = strip_ansi_codes(text);
    let mut out = String::with_capacity(stripped.len());
    let mut column = 0;

    for c in stripped.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else if c.is_control() {
            continue;
        } else {
            out.push(c);
            column += c.width().unwrap_or(0);
        }
    }
    out
}

/// Display width in terminal columns
pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Clip `text` to at most `max` columns, ending in [`ELLIPSIS`] when cut.
///
/// With less room than the ellipsis itself, the text is cut bare.
pub fn clip(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }

    let budget = if max >= ELLIPSIS.len() {
        max - ELLIPSIS.len()
    } else {
        max
    };

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(c);
        used += w;
    }

    if max >= ELLIPSIS.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Fit a main text and its trailing detail into `max` columns.
///
/// The main text keeps priority; the detail is clipped first and vanishes
/// when the main text alone overflows.
pub fn fit(text: &str, detail: &str, max: usize) -> (String, String) {
    let text_width = text.width();
    if text_width + detail.width() <= max {
        return (text.to_string(), detail.to_string());
    }
    if text_width <= max {
        let room = max - text_width;
        let detail = if room > ELLIPSIS.len() {
            clip(detail, room)
        } else {
            String::new()
        };
        return (text.to_string(), detail);
    }
    (clip(text, max), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_ansi() {
        assert_eq!(sanitize("\x1b[1;31merror\x1b[0m: boom"), "error: boom");
    }

    #[test]
    fn test_sanitize_expands_tabs_to_stops() {
        assert_eq!(sanitize("a\tb"), "a       b");
        assert_eq!(sanitize("\tx"), "        x");
        assert_eq!(sanitize("abcdefgh\ty"), "abcdefgh        y");
    }

    #[test]
    fn test_sanitize_drops_control_chars() {
        assert_eq!(sanitize("50%\r100%"), "50%100%");
        assert_eq!(sanitize("bell\x07"), "bell");
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello", 5), "hello");
        assert_eq!(clip("hello world", 8), "hello...");
        assert_eq!(clip("hello", 2), "he");
        assert_eq!(clip("hello", 0), "");
    }

    #[test]
    fn test_clip_counts_wide_chars() {
        // Each CJK character takes two columns
        assert_eq!(display_width("日本語"), 6);
        assert_eq!(clip("日本語テキスト", 8), "日本...");
    }

    #[test]
    fn test_fit_prefers_main_text() {
        assert_eq!(
            fit("build", " [3 lines]", 20),
            ("build".into(), " [3 lines]".into())
        );
        assert_eq!(
            fit("build", " [3 lines]", 12),
            ("build".into(), " [3 ...".into())
        );
        assert_eq!(fit("build", " [3 lines]", 7), ("build".into(), "".into()));
        assert_eq!(
            fit("a long label", " [1 line]", 6),
            ("a l...".into(), "".into())
        );
    }
}
