//! Font handling for PDF documents

use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// A font that can be drawn into a document
#[derive(Debug, Clone)]
pub enum Font {
    /// Embedded TrueType/OpenType font
    TrueType(FontData),
    /// One of the PDF standard Type1 fonts (not embedded)
    Standard(StandardFont),
}

impl Font {
    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Font::TrueType(data) => data.text_width_points(text, font_size),
            Font::Standard(std_font) => std_font.text_width_points(text, font_size),
        }
    }

    /// Encode text as a hex string for the PDF Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        match self {
            Font::TrueType(data) => data.encode_text_hex(text),
            Font::Standard(std_font) => std_font.encode_text_hex(text),
        }
    }

    /// Record characters drawn with this font
    pub(crate) fn add_chars(&mut self, text: &str) {
        if let Font::TrueType(data) = self {
            data.add_chars(text);
        }
    }
}

/// PDF standard Type1 fonts that viewers provide without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    Courier,
}

impl StandardFont {
    /// All standard fonts known to this crate
    pub const ALL: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::Courier];

    /// PostScript name used as /BaseFont
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    /// Look up a standard font by name (ASCII case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.base_font_name().eq_ignore_ascii_case(name))
    }

    /// Glyph advance in 1/1000 em
    pub fn char_width(&self, c: char) -> u16 {
        match self {
            StandardFont::Courier => 600,
            StandardFont::Helvetica => helvetica_width(char_to_winansi(c).unwrap_or(b'?')),
        }
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        (width as f32 / 1000.0) * font_size
    }

    /// Encode text as WinAnsi bytes in a hex string; unmappable chars become `?`
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::new();
        for c in text.chars() {
            let byte = char_to_winansi(c).unwrap_or(b'?');
            result.push_str(&format!("{byte:02X}"));
        }
        format!("<{result}>")
    }

    /// Font dictionary for this standard font
    pub fn to_pdf_object(&self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", Object::Name(self.base_font_name().into())),
            ("Encoding", "WinAnsiEncoding".into()),
        ])
    }
}

/// Map a char to its Windows-1252 (WinAnsi) byte
fn char_to_winansi(c: char) -> Option<u8> {
    let byte = match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Helvetica advance widths (AFM, 1/1000 em) indexed by WinAnsi byte
fn helvetica_width(byte: u8) -> u16 {
    match byte {
        b' ' | b'!' => 278,
        b'"' => 355,
        b'#' | b'$' => 556,
        b'%' => 889,
        b'&' => 667,
        b'\'' => 191,
        b'(' | b')' => 333,
        b'*' => 389,
        b'+' => 584,
        b',' | b'.' | b'/' => 278,
        b'-' => 333,
        b'0'..=b'9' => 556,
        b':' | b';' => 278,
        b'<' | b'=' | b'>' => 584,
        b'?' => 556,
        b'@' => 1015,
        b'A' | b'B' | b'E' | b'K' | b'P' | b'S' | b'V' | b'X' | b'Y' => 667,
        b'C' | b'D' | b'H' | b'N' | b'R' | b'U' => 722,
        b'F' | b'T' | b'Z' => 611,
        b'G' | b'O' | b'Q' => 778,
        b'I' => 278,
        b'J' => 500,
        b'L' => 556,
        b'M' => 833,
        b'W' => 944,
        b'[' | b'\\' | b']' => 278,
        b'^' => 469,
        b'_' => 556,
        b'`' => 333,
        b'c' | b'k' | b's' | b'v' | b'x' | b'y' | b'z' => 500,
        b'f' | b't' => 278,
        b'i' | b'j' | b'l' => 222,
        b'm' => 833,
        b'r' => 333,
        b'w' => 722,
        b'a'..=b'z' => 556,
        b'{' | b'}' => 334,
        b'|' => 260,
        b'~' => 584,
        0x80 => 556,
        0x85 | 0x89 => 1000,
        0x8A => 667,
        0x8C => 1000,
        0x8E => 611,
        0x91 | 0x92 => 222,
        0x93 | 0x94 => 333,
        0x95 => 350,
        0x96 => 556,
        0x97 => 1000,
        0x99 => 1000,
        0x9A => 500,
        0x9C => 944,
        0x9E => 500,
        0x9F => 667,
        0xA0 => 278,
        0xC0..=0xC5 => 667,
        0xC6 => 1000,
        0xC7 => 722,
        0xC8..=0xCB => 667,
        0xCC..=0xCF => 278,
        0xD0 | 0xD1 => 722,
        0xD2..=0xD6 | 0xD8 => 778,
        0xD7 => 584,
        0xD9..=0xDC => 722,
        0xDD | 0xDE => 667,
        0xDF => 611,
        0xE0..=0xE5 => 556,
        0xE6 => 889,
        0xE7 => 500,
        0xE8..=0xEB => 556,
        0xEC..=0xEF => 278,
        0xF0..=0xF6 => 556,
        0xF7 => 584,
        0xF8 => 611,
        0xF9..=0xFC => 556,
        0xFD | 0xFF => 500,
        0xFE => 556,
        _ => 556,
    }
}

/// Font data structure for embedded fonts
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw font file data, shared between documents
    data: Arc<Vec<u8>>,
    /// Face index inside the file
    face_index: u32,
    /// Characters used (for the width array and ToUnicode map)
    pub used_chars: BTreeSet<char>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// Descendant CIDFont dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Key under which the font file is referenced from the descriptor
    pub font_file_key: &'static str,
    /// Font file stream
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF/OTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType or OpenType font file bytes
    pub fn from_ttf(name: &str, ttf_data: Vec<u8>) -> Result<Self> {
        ttf_parser::Face::parse(&ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            data: Arc::new(ttf_data),
            face_index: 0,
            used_chars: BTreeSet::new(),
        })
    }

    /// Read and parse a font file
    pub fn from_file<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_ttf(name, data)
    }

    /// Parsed face, or `None` if the data is not a usable font
    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.face_index).ok()
    }

    /// Whether the outlines are CFF (OpenType `OTTO`) rather than TrueType
    pub fn is_cff(&self) -> bool {
        self.data.starts_with(b"OTTO")
    }

    /// Add characters to the used set
    pub fn add_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Calculate text width in font units
    ///
    /// Characters without a glyph count with the `.notdef` advance, matching
    /// what gets drawn.
    pub fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        text.chars()
            .filter_map(|c| face.glyph_hor_advance(glyph_for(&face, c)))
            .map(|w| w as u32)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Encode text as hex string of glyph IDs for the Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::new();
        for c in text.chars() {
            let gid = face.as_ref().map(|f| glyph_for(f, c).0).unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        format!("<{result}>")
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// Object references between the dictionaries are left as placeholders
    /// and are filled in by the document when the objects are added.
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let font_name = Object::Name(pdf_font_name(&self.name).into_bytes());

        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![("Type", "CMap".into())]),
            tounicode_content.into_bytes(),
        );

        let (font_file_key, font_file_stream, cid_subtype) = if self.is_cff() {
            (
                "FontFile3",
                Stream::new(
                    Dictionary::from_iter(vec![("Subtype", "OpenType".into())]),
                    self.data.to_vec(),
                ),
                "CIDFontType0",
            )
        } else {
            (
                "FontFile2",
                Stream::new(
                    Dictionary::from_iter(vec![("Length1", (self.data.len() as i64).into())]),
                    self.data.to_vec(),
                ),
                "CIDFontType2",
            )
        };

        let units_per_em = self.units_per_em() as i64;
        let scale = |v: i64| v * 1000 / units_per_em.max(1);
        let ascender = scale(self.ascender() as i64);
        let descender = scale(self.descender() as i64);

        let font_bbox: Vec<Object> = vec![
            0.into(),
            descender.into(),
            1000.into(),
            ascender.into(),
        ];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let mut cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", cid_subtype.into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("W", self.generate_widths_array().into()),
            ("DW", 1000.into()),
        ]);
        if cid_subtype == "CIDFontType2" {
            cid_font.set("CIDToGIDMap", "Identity");
        }

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_key,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths, scaled to 1000 units per em
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut widths = Vec::new();
        let Some(face) = self.face() else {
            return widths;
        };
        let units_per_em = face.units_per_em().max(1) as i64;

        let mut gids: Vec<u16> = self
            .used_chars
            .iter()
            .map(|&c| glyph_for(&face, c).0)
            .collect();
        gids.sort();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .map(|a| a as i64 * 1000 / units_per_em)
                .unwrap_or(1000);
            widths.push((gid as i64).into());
            widths.push(vec![Object::from(advance)].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // .notdef has no single source character, so unmapped chars are left out
        let mapped: Vec<(u16, char)> = match self.face() {
            Some(face) => self
                .used_chars
                .iter()
                .filter_map(|&c| face.glyph_index(c).map(|gid| (gid.0, c)))
                .collect(),
            None => Vec::new(),
        };

        // At most 100 entries per bfchar section
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                cmap.push_str(&format!("<{gid:04X}> <{}>\n", utf16_hex(*c)));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// Glyph drawn for `c`: its mapped glyph, or `.notdef` (GID 0)
fn glyph_for(face: &ttf_parser::Face<'_>, c: char) -> ttf_parser::GlyphId {
    face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0))
}

/// UTF-16BE hex of a char, as required by bfchar destinations
fn utf16_hex(c: char) -> String {
    let mut buf = [0u16; 2];
    c.encode_utf16(&mut buf)
        .iter()
        .map(|unit| format!("{unit:04X}"))
        .collect()
}

/// PDF name for a font: printable ASCII without delimiters or spaces
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "CertFont".to_string()
    } else {
        cleaned
    }
}
