//! Text Layout - name casing and box layout
//!
//! This crate provides:
//! - Title casing of names read from spreadsheets
//! - Greedy word wrapping against a measured width
//! - Placement of wrapped lines inside a bounding box (top-anchored, centered)
//!
//! # Example
//!
//! ```ignore
//! use text_layout::{layout_text, title_case, BoundingBox};
//!
//! let name = title_case("  jane   DOE ");           // "Jane Doe"
//! let bbox = BoundingBox::new(100.0, 100.0, 400.0, 150.0)?;
//! let lines = layout_text(&name, &measure, 24.0, &bbox);
//! ```

mod casing;
mod layout;

pub use casing::title_case;
pub use layout::{
    layout_text, wrap_lines, BoundingBox, PlacedLine, TextMeasure, LINE_HEIGHT_FACTOR,
};

use thiserror::Error;

/// Errors that can occur while preparing a layout
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Invalid box ({x1}, {y1}, {x2}, {y2}): x2 must be greater than x1 and y2 greater than y1")]
    InvalidBox { x1: f64, y1: f64, x2: f64, y2: f64 },

    #[error("Box coordinates must be finite numbers")]
    NonFiniteBox,
}

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
