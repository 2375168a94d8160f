//! Row styling for the crossterm backend.
//!
//! - `palette` - Raw color constants
//! - `styles` - Style per row part and kind

pub mod palette;
pub mod styles;
