//! certgen - batch certificate generation
//!
//! This crate provides:
//! - Request model: raw (config file / flags / prompts) and validated forms
//! - Host font catalog and the `FONTS_README.md` listing
//! - Spreadsheet row extraction with name casing and identifier sanitizing
//! - Per-row rendering of a name onto a PDF template
//! - A batch runner that writes `<outputDir>/<identifier>.pdf` per row
//!
//! # Example
//!
//! ```ignore
//! use certgen::{run_batch, FontCatalog, RawRequest};
//!
//! let catalog = FontCatalog::discover(certgen::default_font_dirs());
//! let raw = RawRequest::from_file("certgen.json")?;
//! let request = raw.validate(&catalog)?;
//! let summary = run_batch(&request, &catalog)?;
//! println!("{} certificates in {}", summary.generated.len(), summary.output_dir.display());
//! ```

mod batch;
mod catalog;
mod renderer;
mod request;
mod rows;

pub use batch::{run_batch, BatchSummary};
pub use catalog::{default_font_dirs, FontCatalog, FontSource, FONTS_ENV_VAR, FONTS_README};
pub use renderer::{render_bytes, render_row, Artifact, RowError, TemplateHandle};
pub use request::{
    column_to_index, index_to_column, parse_color, CertificateRequest, ConfigError, RawRequest,
    DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_ID_COLUMN, DEFAULT_NAME_COLUMN, DEFAULT_OUTPUT_DIR,
    DEFAULT_SPREADSHEET, DEFAULT_TEMPLATE,
};
pub use rows::{cell_to_string, open_sheet, sanitize_identifier, Row, RowExtractor, RowSkip};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a whole batch
#[derive(Debug, Error)]
pub enum CertError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load template {}: {reason}", .path.display())]
    Template { path: PathBuf, reason: String },

    #[error("Page index {page} is out of range (template has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook has no sheets: {}", .0.display())]
    EmptyWorkbook(PathBuf),

    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for certgen operations
pub type Result<T> = std::result::Result<T, CertError>;
