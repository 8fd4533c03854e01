//! Spreadsheet row extraction

use crate::{index_to_column, CertError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use text_layout::title_case;
use thiserror::Error;

/// One usable data row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based spreadsheet row number
    pub row_number: usize,
    /// Title-cased name
    pub name: String,
    /// Identifier safe to use as a file stem
    pub identifier: String,
}

/// Why a data row was skipped
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowSkip {
    #[error("Row {row}: skipping - missing name")]
    EmptyName { row: usize },

    #[error("Row {row}: skipping - missing identifier")]
    EmptyIdentifier { row: usize },

    #[error("Row {row}: skipping - identifier '{raw}' has no characters usable in a file name")]
    UnusableIdentifier { row: usize, raw: String },

    #[error("Row {row}: skipping - cell {column}{row} holds the error value {value}")]
    ErrorCell {
        row: usize,
        column: String,
        value: String,
    },
}

impl RowSkip {
    /// 1-based spreadsheet row number
    pub fn row(&self) -> usize {
        match self {
            RowSkip::EmptyName { row }
            | RowSkip::EmptyIdentifier { row }
            | RowSkip::UnusableIdentifier { row, .. }
            | RowSkip::ErrorCell { row, .. } => *row,
        }
    }
}

/// Open a workbook and read one sheet (the first when `sheet` is `None`)
pub fn open_sheet(path: &Path, sheet: Option<&str>) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| CertError::SheetNotFound(wanted.to_string()))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| CertError::EmptyWorkbook(path.to_path_buf()))?,
    };

    log::debug!("reading sheet '{name}' from {}", path.display());
    Ok(workbook.worksheet_range(&name)?)
}

/// Convert a cell value to text
///
/// Whole numbers render without a fractional part so numeric identifiers
/// such as phone numbers keep their digits.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => format!("{dt}"),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Strip characters that are not allowed in file names
///
/// Removes path separators, `: * ? " < > |` and control characters, then
/// trims surrounding whitespace and dots.
pub fn sanitize_identifier(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    cleaned
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

/// One-pass iterator over the data rows of a sheet
///
/// Row 0 of the sheet is the header. Every later row up to the last used
/// row yields either a [`Row`] or the reason it was skipped.
pub struct RowExtractor {
    range: Range<Data>,
    name_column: u32,
    id_column: u32,
    next_row: u32,
    end_row: Option<u32>,
}

impl RowExtractor {
    pub fn new(range: Range<Data>, name_column: usize, id_column: usize) -> Self {
        let end_row = range.end().map(|(row, _)| row);
        Self {
            range,
            name_column: name_column as u32,
            id_column: id_column as u32,
            next_row: 1,
            end_row,
        }
    }

    fn cell_text(&self, row: u32, column: u32) -> String {
        self.range
            .get_value((row, column))
            .map(cell_to_string)
            .unwrap_or_default()
    }

    /// Formula errors such as `#DIV/0!` are never used as names or file names
    fn check_error_cell(&self, row: u32, column: u32) -> std::result::Result<(), RowSkip> {
        match self.range.get_value((row, column)) {
            Some(Data::Error(e)) => Err(RowSkip::ErrorCell {
                row: row as usize + 1,
                column: index_to_column(column as usize),
                value: e.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn extract(&self, row: u32) -> std::result::Result<Row, RowSkip> {
        let row_number = row as usize + 1;

        self.check_error_cell(row, self.name_column)?;
        self.check_error_cell(row, self.id_column)?;

        let raw_name = self.cell_text(row, self.name_column);
        let raw_id = self.cell_text(row, self.id_column);

        if raw_name.trim().is_empty() {
            return Err(RowSkip::EmptyName { row: row_number });
        }
        if raw_id.trim().is_empty() {
            return Err(RowSkip::EmptyIdentifier { row: row_number });
        }

        let identifier = sanitize_identifier(&raw_id);
        if identifier.is_empty() {
            return Err(RowSkip::UnusableIdentifier {
                row: row_number,
                raw: raw_id,
            });
        }

        Ok(Row {
            row_number,
            name: title_case(&raw_name),
            identifier,
        })
    }
}

impl Iterator for RowExtractor {
    type Item = std::result::Result<Row, RowSkip>;

    fn next(&mut self) -> Option<Self::Item> {
        let end_row = self.end_row?;
        if self.next_row > end_row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;
        Some(self.extract(row))
    }
}
