//! Certificate request: raw input and validation

use crate::FontCatalog;
use pdf_core::Color;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use text_layout::{BoundingBox, LayoutError};
use thiserror::Error;

pub const DEFAULT_SPREADSHEET: &str = "input_data.xlsx";
pub const DEFAULT_TEMPLATE: &str = "certificate_template.pdf";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_NAME_COLUMN: &str = "A";
pub const DEFAULT_ID_COLUMN: &str = "C";
pub const DEFAULT_FONT: &str = "Helvetica";
pub const DEFAULT_FONT_SIZE: f64 = 24.0;
const DEFAULT_COLOR: &str = "#000000";

/// Invalid or missing configuration; always fatal
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field} '{value}': column must be letters such as A, C or AA")]
    InvalidColumn { field: &'static str, value: String },

    #[error("Invalid box '{0}': expected four numbers x1,y1,x2,y2")]
    MalformedBox(String),

    #[error("Invalid box: {0}")]
    InvalidBox(#[from] LayoutError),

    #[error("Invalid font size '{0}': must be a positive number")]
    InvalidFontSize(String),

    #[error("Font '{0}' not found; see FONTS_README.md for available fonts")]
    UnknownFont(String),

    #[error("Invalid color '{0}': expected #RRGGBB or r,g,b")]
    InvalidColor(String),

    #[error("Invalid page index '{0}': must be a non-negative integer")]
    InvalidPage(String),

    #[error("{field} file '{}' does not exist", .path.display())]
    MissingFile { field: &'static str, path: PathBuf },

    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Unvalidated request, filled from a config file, flags and prompts
///
/// Every field is optional text. In JSON, numeric fields may be given as
/// numbers and `box` as an array of four numbers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRequest {
    #[serde(default)]
    pub spreadsheet: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub name_column: Option<String>,
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default, rename = "box", deserialize_with = "de_box")]
    pub bbox: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub font_size: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub page: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(f64),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoxValue {
    Text(String),
    Numbers(Vec<f64>),
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(TextOrNumber::into_text))
}

fn de_box<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<BoxValue>::deserialize(deserializer)?.map(|value| match value {
            BoxValue::Text(s) => s,
            BoxValue::Numbers(nums) => nums
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }),
    )
}

impl RawRequest {
    /// Parse a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Overlay `other` on top of `self`; fields set in `other` win
    pub fn merge(self, other: RawRequest) -> RawRequest {
        RawRequest {
            spreadsheet: other.spreadsheet.or(self.spreadsheet),
            template: other.template.or(self.template),
            output_dir: other.output_dir.or(self.output_dir),
            name_column: other.name_column.or(self.name_column),
            id_column: other.id_column.or(self.id_column),
            bbox: other.bbox.or(self.bbox),
            font: other.font.or(self.font),
            font_size: other.font_size.or(self.font_size),
            page: other.page.or(self.page),
            color: other.color.or(self.color),
            sheet: other.sheet.or(self.sheet),
        }
    }

    /// Validate into a [`CertificateRequest`], applying defaults
    ///
    /// The font name is matched case-insensitively against the catalog and
    /// replaced by the catalog's spelling.
    pub fn validate(&self, catalog: &FontCatalog) -> Result<CertificateRequest, ConfigError> {
        let spreadsheet_path = with_default_extension(
            non_empty(&self.spreadsheet).unwrap_or(DEFAULT_SPREADSHEET),
            "xlsx",
        );
        let template_path = with_default_extension(
            non_empty(&self.template).unwrap_or(DEFAULT_TEMPLATE),
            "pdf",
        );
        let output_dir = PathBuf::from(non_empty(&self.output_dir).unwrap_or(DEFAULT_OUTPUT_DIR));

        let name_column = parse_column(
            "name column",
            non_empty(&self.name_column).unwrap_or(DEFAULT_NAME_COLUMN),
        )?;
        let id_column = parse_column(
            "id column",
            non_empty(&self.id_column).unwrap_or(DEFAULT_ID_COLUMN),
        )?;

        let bbox = parse_box(non_empty(&self.bbox).ok_or(ConfigError::MissingField("box"))?)?;

        let font_size = {
            let raw = non_empty(&self.font_size).map(str::to_string);
            match raw {
                None => DEFAULT_FONT_SIZE,
                Some(text) => match text.parse::<f64>() {
                    Ok(size) if size.is_finite() && size > 0.0 => size,
                    _ => return Err(ConfigError::InvalidFontSize(text)),
                },
            }
        };

        let requested_font = non_empty(&self.font).unwrap_or(DEFAULT_FONT);
        let font_name = catalog
            .lookup(requested_font)
            .ok_or_else(|| ConfigError::UnknownFont(requested_font.to_string()))?
            .to_string();

        let page_index = match non_empty(&self.page) {
            None => 0,
            Some(text) => text
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidPage(text.to_string()))?,
        };

        let color_text = non_empty(&self.color).unwrap_or(DEFAULT_COLOR);
        let color =
            parse_color(color_text).ok_or_else(|| ConfigError::InvalidColor(color_text.to_string()))?;

        if !spreadsheet_path.is_file() {
            return Err(ConfigError::MissingFile {
                field: "Spreadsheet",
                path: spreadsheet_path,
            });
        }
        if !template_path.is_file() {
            return Err(ConfigError::MissingFile {
                field: "Template",
                path: template_path,
            });
        }

        Ok(CertificateRequest {
            spreadsheet_path,
            template_path,
            output_dir,
            name_column,
            id_column,
            bbox,
            font_name,
            font_size,
            page_index,
            color,
            sheet: non_empty(&self.sheet).map(str::to_string),
        })
    }
}

/// Validated, immutable settings for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRequest {
    pub spreadsheet_path: PathBuf,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    /// Zero-based column index of the name
    pub name_column: usize,
    /// Zero-based column index of the identifier
    pub id_column: usize,
    pub bbox: BoundingBox,
    /// Canonical catalog name
    pub font_name: String,
    pub font_size: f64,
    /// Zero-based template page
    pub page_index: usize,
    pub color: Color,
    /// Sheet to read; first sheet when `None`
    pub sheet: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Append `.extension` unless the name already ends with it (any case)
fn with_default_extension(path: &str, extension: &str) -> PathBuf {
    let suffix = format!(".{extension}");
    if path.to_ascii_lowercase().ends_with(&suffix) {
        PathBuf::from(path)
    } else {
        PathBuf::from(format!("{path}{suffix}"))
    }
}

fn parse_column(field: &'static str, value: &str) -> Result<usize, ConfigError> {
    column_to_index(value).ok_or_else(|| ConfigError::InvalidColumn {
        field,
        value: value.to_string(),
    })
}

fn parse_box(text: &str) -> Result<BoundingBox, ConfigError> {
    let values: Vec<f64> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConfigError::MalformedBox(text.to_string()))?;

    match values[..] {
        [x1, y1, x2, y2] => Ok(BoundingBox::new(x1, y1, x2, y2)?),
        _ => Err(ConfigError::MalformedBox(text.to_string())),
    }
}

/// Convert spreadsheet column letters to a zero-based index
///
/// `A` → 0, `Z` → 25, `AA` → 26. Input is trimmed and case-insensitive.
/// Returns `None` for empty, non-alphabetic or absurdly long input.
pub fn column_to_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut index: usize = 0;
    for c in letters.bytes() {
        let digit = (c.to_ascii_uppercase() - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Convert a zero-based column index to spreadsheet letters
pub fn index_to_column(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Parse `#RRGGBB` (or `RRGGBB`) or `r,g,b` with components 0-255
pub fn parse_color(text: &str) -> Option<Color> {
    let text = text.trim();

    if text.contains(',') {
        let parts: Vec<u8> = text
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        return match parts[..] {
            [r, g, b] => Some(Color::from_rgb(r, g, b)),
            _ => None,
        };
    }

    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}
