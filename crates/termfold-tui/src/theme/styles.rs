//! Semantic styles for row parts

use crossterm::style::{Attribute, ContentStyle, Stylize};

use super::palette;
use crate::layout::RowKind;

/// Style of the tree prefix (`└── ` or `│ `)
pub fn prefix(kind: RowKind) -> ContentStyle {
    match kind {
        RowKind::OpenHeader => ContentStyle::new().with(palette::OPEN_HEADER).bold(),
        RowKind::Line | RowKind::LiveLine => ContentStyle::new().with(palette::GUTTER),
        _ => ContentStyle::new().bold(),
    }
}

/// Style of the main text
pub fn text(kind: RowKind) -> ContentStyle {
    match kind {
        RowKind::Title => ContentStyle::new()
            .with(palette::TITLE)
            .attribute(Attribute::Bold)
            .attribute(Attribute::Underlined),
        RowKind::OpenHeader => ContentStyle::new().with(palette::OPEN_HEADER).bold(),
        RowKind::ClosedHeader => ContentStyle::new().with(palette::CLOSED_HEADER),
        RowKind::Summary => ContentStyle::new(),
        RowKind::Line => ContentStyle::new().with(palette::OUTER_TEXT),
        RowKind::LiveLine => ContentStyle::new().with(palette::LIVE_TEXT),
    }
}

/// Style of the trailing detail: summary counts or hidden-line notes
pub fn detail(kind: RowKind) -> ContentStyle {
    match kind {
        RowKind::Summary => ContentStyle::new().with(palette::COUNTS),
        _ => ContentStyle::new().with(palette::HIDDEN).italic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::style::Color;

    #[test]
    fn test_open_headers_stand_out() {
        let style = text(RowKind::OpenHeader);
        assert_eq!(style.foreground_color, Some(Color::Cyan));
        assert!(style.attributes.has(Attribute::Bold));
    }

    #[test]
    fn test_summary_counts_dimmed() {
        assert_eq!(
            detail(RowKind::Summary).foreground_color,
            Some(palette::COUNTS)
        );
        assert_eq!(text(RowKind::Summary).foreground_color, None);
    }

    #[test]
    fn test_gutter_dimmed() {
        assert_eq!(
            prefix(RowKind::LiveLine).foreground_color,
            Some(palette::GUTTER)
        );
    }
}
