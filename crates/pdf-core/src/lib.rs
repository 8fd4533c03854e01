//! PDF Core - Low-level PDF overlay primitives
//!
//! This crate provides functionality for:
//! - Opening template PDF documents from a file or from bytes
//! - Embedding TrueType/OpenType fonts, or referencing a standard Type1 font
//! - Drawing text at absolute page coordinates (origin bottom-left)
//! - Saving the overlaid document to a file or to bytes
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Font, FontData, PdfDocument};
//!
//! let mut doc = PdfDocument::open("certificate_template.pdf")?;
//! doc.add_font("dejavu", Font::TrueType(FontData::from_file("dejavu", "DejaVuSans.ttf")?))?;
//! doc.set_font("dejavu", 24.0)?;
//! doc.insert_text("Jane Doe", 1, 198.6, 121.2)?;
//! doc.save("output/0812345678.pdf")?;
//! ```

mod document;
mod font;
mod text;

pub use document::{Color, PdfDocument};
pub use font::{Font, FontData, StandardFont};
pub use text::{format_number, generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
