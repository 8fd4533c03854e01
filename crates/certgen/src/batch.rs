//! Batch runner

use crate::renderer::{render_row, Artifact, RowError, TemplateHandle};
use crate::rows::{open_sheet, RowExtractor, RowSkip};
use crate::{CertError, CertificateRequest, FontCatalog, Result};
use std::path::PathBuf;

/// Outcome of a batch
#[derive(Debug)]
pub struct BatchSummary {
    /// One entry per file on disk; a duplicate identifier keeps the later row
    pub generated: Vec<Artifact>,
    pub skipped: Vec<RowSkip>,
    pub failed: Vec<RowError>,
    /// Rows whose file was replaced by a later row with the same identifier
    pub overwritten: usize,
    pub output_dir: PathBuf,
}

impl BatchSummary {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            generated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            overwritten: 0,
            output_dir,
        }
    }
}

/// Generate one certificate per usable spreadsheet row
///
/// Template, font, spreadsheet and output directory problems are fatal and
/// reported before any file is written. Skipped and failed rows are logged
/// and collected in the summary.
pub fn run_batch(request: &CertificateRequest, catalog: &FontCatalog) -> Result<BatchSummary> {
    let template = TemplateHandle::load(&request.template_path, request.page_index)?;
    let font = catalog.load_font(&request.font_name)?;
    let range = open_sheet(&request.spreadsheet_path, request.sheet.as_deref())?;

    check_box_on_page(request, &template)?;

    std::fs::create_dir_all(&request.output_dir).map_err(|source| CertError::OutputDir {
        path: request.output_dir.clone(),
        source,
    })?;

    let mut summary = BatchSummary::new(request.output_dir.clone());

    for extracted in RowExtractor::new(range, request.name_column, request.id_column) {
        let row = match extracted {
            Ok(row) => row,
            Err(skip) => {
                log::warn!("{skip}");
                summary.skipped.push(skip);
                continue;
            }
        };

        match render_row(&row, request, &template, &font) {
            Ok(artifact) => {
                let previous = summary
                    .generated
                    .iter()
                    .position(|earlier| earlier.identifier == artifact.identifier);
                if let Some(previous) = previous {
                    let earlier = summary.generated.remove(previous);
                    log::warn!(
                        "Row {}: identifier '{}' already used by row {}; overwriting",
                        row.row_number,
                        row.identifier,
                        earlier.row_number
                    );
                    summary.overwritten += 1;
                }
                log::info!(
                    "Row {}: generated {} ({} line(s))",
                    row.row_number,
                    artifact.path.display(),
                    artifact.lines.len()
                );
                summary.generated.push(artifact);
            }
            Err(e) => {
                log::warn!("{e}");
                summary.failed.push(e);
            }
        }
    }

    log::info!(
        "batch finished: {} generated, {} skipped, {} failed",
        summary.generated.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    Ok(summary)
}

fn check_box_on_page(request: &CertificateRequest, template: &TemplateHandle) -> Result<()> {
    let (width, height) = template.page_size(request.page_index)?;
    let bbox = &request.bbox;
    if bbox.x1() < 0.0 || bbox.y1() < 0.0 || bbox.x2() > width || bbox.y2() > height {
        log::warn!(
            "text box ({}, {}, {}, {}) extends past page {} ({width} x {height})",
            bbox.x1(),
            bbox.y1(),
            bbox.x2(),
            bbox.y2(),
            request.page_index
        );
    }
    Ok(())
}
