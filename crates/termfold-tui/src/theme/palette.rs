//! Color palette

use crossterm::style::Color;

// --- Headers ---
pub const OPEN_HEADER: Color = Color::Cyan;
pub const CLOSED_HEADER: Color = Color::Grey;
pub const TITLE: Color = Color::Cyan;

// --- Content ---
pub const GUTTER: Color = Color::DarkGrey;
pub const LIVE_TEXT: Color = Color::Reset;
pub const OUTER_TEXT: Color = Color::Grey;

// --- Details ---
pub const COUNTS: Color = Color::DarkGrey;
pub const HIDDEN: Color = Color::Yellow;
