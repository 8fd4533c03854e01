//! Per-row certificate rendering

use crate::{CertError, CertificateRequest, Result, Row};
use pdf_core::{Font, PdfDocument, PdfError};
use std::path::{Path, PathBuf};
use text_layout::{layout_text, PlacedLine};
use thiserror::Error;

/// A row that could not be turned into a file
#[derive(Debug, Error)]
pub enum RowError {
    #[error("Row {row}: failed to render certificate '{identifier}': {source}")]
    Render {
        row: usize,
        identifier: String,
        #[source]
        source: PdfError,
    },

    #[error("Row {row}: failed to write {}: {source}", .path.display())]
    Write {
        row: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A written certificate
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub row_number: usize,
    pub identifier: String,
    pub path: PathBuf,
    /// Lines as drawn on the page
    pub lines: Vec<PlacedLine>,
}

/// Parsed template, loaded once per batch and copied per row
pub struct TemplateHandle {
    document: PdfDocument,
    page_count: usize,
}

impl TemplateHandle {
    /// Read and parse the template, checking that `page_index` exists
    ///
    /// The file is only read; outputs are built from in-memory copies.
    pub fn load<P: AsRef<Path>>(path: P, page_index: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let template_error = |reason: String| CertError::Template {
            path: path.clone(),
            reason,
        };

        let bytes = std::fs::read(&path).map_err(|e| template_error(e.to_string()))?;
        let document =
            PdfDocument::open_from_bytes(&bytes).map_err(|e| template_error(e.to_string()))?;

        let page_count = document.page_count();
        if page_count == 0 {
            return Err(template_error("document has no pages".to_string()));
        }
        if page_index >= page_count {
            return Err(CertError::PageOutOfRange {
                page: page_index,
                count: page_count,
            });
        }

        log::debug!("loaded template {} ({page_count} pages)", path.display());
        Ok(Self {
            document,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Width and height of a zero-based page, in points
    pub fn page_size(&self, page_index: usize) -> Result<(f64, f64)> {
        Ok(self.document.page_size(page_index + 1)?)
    }

    /// Fresh editable copy of the template
    fn document(&self) -> PdfDocument {
        self.document.clone()
    }
}

/// Render a row's name onto a copy of the template and return the PDF bytes
///
/// Nothing is written to disk.
pub fn render_bytes(
    row: &Row,
    request: &CertificateRequest,
    template: &TemplateHandle,
    font: &Font,
) -> std::result::Result<(Vec<u8>, Vec<PlacedLine>), PdfError> {
    let font_size = request.font_size as f32;
    let measure = |text: &str| font.text_width_points(text, font_size) as f64;
    let lines = layout_text(&row.name, &measure, request.font_size, &request.bbox);

    let mut doc = template.document();
    doc.add_font(&request.font_name, font.clone())?;
    doc.set_font(&request.font_name, font_size)?;
    doc.set_text_color(request.color);

    let page = request.page_index + 1;
    for line in &lines {
        doc.insert_text(&line.text, page, line.x, line.y)?;
    }

    Ok((doc.to_bytes()?, lines))
}

/// Render a row and write `<outputDir>/<identifier>.pdf`
///
/// The file is written next to its destination and renamed into place, so
/// a failed row leaves no partial output. An existing file is replaced.
pub fn render_row(
    row: &Row,
    request: &CertificateRequest,
    template: &TemplateHandle,
    font: &Font,
) -> std::result::Result<Artifact, RowError> {
    let (bytes, lines) =
        render_bytes(row, request, template, font).map_err(|source| RowError::Render {
            row: row.row_number,
            identifier: row.identifier.clone(),
            source,
        })?;

    let path = request.output_dir.join(format!("{}.pdf", row.identifier));
    write_atomic(&path, &bytes).map_err(|source| RowError::Write {
        row: row.row_number,
        path: path.clone(),
        source,
    })?;

    Ok(Artifact {
        row_number: row.row_number,
        identifier: row.identifier.clone(),
        path,
        lines,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let result = std::fs::write(&tmp_path, bytes).and_then(|()| std::fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}
