//! Interactive prompts for settings not given by config or flags

use certgen::{
    RawRequest, DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_ID_COLUMN, DEFAULT_NAME_COLUMN,
    DEFAULT_OUTPUT_DIR, DEFAULT_SPREADSHEET, DEFAULT_TEMPLATE, FONTS_README,
};
use std::io::{self, BufRead, Write};

/// Asks one question per missing field
///
/// An empty answer (or end of input) leaves the field unset so validation
/// applies its default.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, label: &str, default: Option<&str>) -> io::Result<Option<String>> {
        match default {
            Some(default) => write!(self.output, "{label} [{default}]: ")?,
            None => write!(self.output, "{label}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn ask_missing(
        &mut self,
        field: &mut Option<String>,
        label: &str,
        default: Option<&str>,
    ) -> io::Result<()> {
        if field.is_none() {
            *field = self.ask(label, default)?;
        }
        Ok(())
    }

    /// Prompt for every field of `raw` that is still unset
    pub fn fill(&mut self, raw: RawRequest) -> io::Result<RawRequest> {
        let mut raw = raw;
        let font_size = DEFAULT_FONT_SIZE.to_string();

        self.ask_missing(&mut raw.spreadsheet, "Spreadsheet file", Some(DEFAULT_SPREADSHEET))?;
        self.ask_missing(&mut raw.template, "PDF template file", Some(DEFAULT_TEMPLATE))?;
        self.ask_missing(&mut raw.output_dir, "Output folder", Some(DEFAULT_OUTPUT_DIR))?;
        self.ask_missing(&mut raw.sheet, "Sheet name", Some("first sheet"))?;
        self.ask_missing(&mut raw.name_column, "Name column letter", Some(DEFAULT_NAME_COLUMN))?;
        self.ask_missing(&mut raw.id_column, "Identifier column letter", Some(DEFAULT_ID_COLUMN))?;

        if raw.bbox.is_none() {
            writeln!(self.output)?;
            writeln!(self.output, "Text box coordinates, origin at the bottom-left of the page.")?;
            raw.bbox = self.ask("Box as x1,y1,x2,y2", None)?;
        }

        if raw.font.is_none() {
            writeln!(self.output)?;
            writeln!(self.output, "Available fonts are listed in {FONTS_README}.")?;
            raw.font = self.ask("Font name", Some(DEFAULT_FONT))?;
        }
        self.ask_missing(&mut raw.font_size, "Font size in points", Some(font_size.as_str()))?;
        self.ask_missing(&mut raw.page, "Page index (0 = first page)", Some("0"))?;
        self.ask_missing(&mut raw.color, "Text color (#RRGGBB or r,g,b)", Some("#000000"))?;

        Ok(raw)
    }
}
