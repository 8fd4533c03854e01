//! Greedy word wrap and line placement

use crate::{LayoutError, Result};

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Measures rendered text width in points
///
/// Implemented for any `Fn(&str) -> f64`, so a closure over a font and
/// size works directly.
pub trait TextMeasure {
    fn width(&self, text: &str) -> f64;
}

impl<F> TextMeasure for F
where
    F: Fn(&str) -> f64,
{
    fn width(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Rectangle in PDF page units, origin bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl BoundingBox {
    /// Create a box, requiring finite coordinates with `x2 > x1` and `y2 > y1`
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(LayoutError::NonFiniteBox);
        }
        if x2 <= x1 || y2 <= y1 {
            return Err(LayoutError::InvalidBox { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// One wrapped line with its draw position
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the line
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Measured width
    pub width: f64,
}

/// Greedy word wrap
///
/// Tokens are appended to the current line while the measured width stays
/// within `max_width`. A token that does not fit starts a new line; a token
/// wider than `max_width` on its own still gets a line to itself.
///
/// # Returns
/// Lines in order; empty when the text has no tokens
pub fn wrap_lines<M: TextMeasure + ?Sized>(text: &str, max_width: f64, measure: &M) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for token in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(token);
            continue;
        }

        let candidate = format!("{current_line} {token}");
        if measure.width(&candidate) <= max_width {
            current_line = candidate;
        } else {
            lines.push(std::mem::replace(&mut current_line, token.to_string()));
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Wrap text and place each line inside the box
///
/// Lines are top-anchored: the first baseline sits one line height below
/// `y2` and each following line one line height lower. Each line is centered
/// horizontally. Lines that fall below `y1` are still returned at their
/// computed position.
pub fn layout_text<M: TextMeasure + ?Sized>(
    text: &str,
    measure: &M,
    font_size: f64,
    bbox: &BoundingBox,
) -> Vec<PlacedLine> {
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let lines = wrap_lines(text, bbox.width(), measure);

    let placed: Vec<PlacedLine> = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let width = measure.width(&line);
            PlacedLine {
                x: bbox.x1 + (bbox.width() - width) / 2.0,
                y: bbox.y2 - line_height * (i as f64 + 1.0),
                width,
                text: line,
            }
        })
        .collect();

    let total_height = placed.len() as f64 * line_height;
    if total_height > bbox.height() {
        log::debug!(
            "{} line(s) of {text:?} need {total_height:.1}pt but the box is {:.1}pt high; overflowing",
            placed.len(),
            bbox.height()
        );
    }

    placed
}
