//! PDF Document wrapper

use crate::text::{generate_text_operators, TextRenderContext};
use crate::{Font, PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// Parent chain depth limit when resolving inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Fallback page size (A4) when no MediaBox is present
const A4_SIZE: (f64, f64) = (595.28, 841.89);

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Red color
    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// PDF Document wrapper that overlays text on existing pages
///
/// Drawing is buffered per page and written on save: the page's original
/// content is wrapped in `q`/`Q` and the overlay is appended as a new
/// compressed stream, so nothing in the template is rewritten.
#[derive(Clone)]
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Registered fonts (font name -> font)
    fonts: HashMap<String, Font>,
    /// Current font name
    current_font: Option<String>,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Page font resources (page number -> font name -> resource name)
    page_font_resources: BTreeMap<usize, HashMap<String, String>>,
    /// Next font resource number
    next_font_resource: u32,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("certificate_template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    /// Wrap an already parsed document
    pub fn from_document(inner: Document) -> Self {
        Self {
            inner,
            fonts: HashMap::new(),
            current_font: None,
            current_font_size: 12.0,
            current_text_color: Color::default(),
            page_font_resources: BTreeMap::new(),
            next_font_resource: 1,
            page_content_buffer: BTreeMap::new(),
        }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Register a font under a name (used in `set_font`)
    pub fn add_font(&mut self, name: &str, font: Font) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    /// Set the current font and size
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }

        self.current_font = Some(name.to_string());
        self.current_font_size = size;

        Ok(())
    }

    /// Set the text color
    ///
    /// # Example
    /// ```ignore
    /// doc.set_text_color(Color::red());
    /// doc.set_text_color(Color::from_rgb(255, 128, 0)); // Orange
    /// ```
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    fn current_font_name(&self) -> Result<String> {
        self.current_font
            .clone()
            .ok_or_else(|| PdfError::FontNotFound("No font set".to_string()))
    }

    fn font(&self, name: &str) -> Result<&Font> {
        self.fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))
    }

    /// Draw one line of text with its baseline starting at `(x, y)`
    ///
    /// # Arguments
    /// * `text` - Text to draw
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points, from the left edge
    /// * `y` - Baseline Y coordinate in points, from the bottom edge
    pub fn insert_text(&mut self, text: &str, page: usize, x: f64, y: f64) -> Result<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let font_name = self.current_font_name()?;

        if text.is_empty() {
            return Ok(());
        }

        let text_hex = {
            let font = self
                .fonts
                .get_mut(&font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
            font.add_chars(text);
            font.encode_text_hex(text)
        };

        let font_resource_name = self.get_or_create_font_ref(&font_name, page)?;

        let ctx = TextRenderContext {
            font_name: font_resource_name,
            font_size: self.current_font_size,
            color: self.current_text_color,
        };
        let operators = generate_text_operators(&text_hex, x, y, &ctx);
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Get current font's text width for a string, in points
    pub fn get_text_width(&self, text: &str) -> Result<f64> {
        let font_name = self.current_font_name()?;
        let font = self.font(&font_name)?;
        Ok(font.text_width_points(text, self.current_font_size) as f64)
    }

    /// Page width and height in points (1-indexed page)
    ///
    /// Follows MediaBox inheritance through parent Pages nodes and falls
    /// back to A4 when no MediaBox is found.
    pub fn page_size(&self, page: usize) -> Result<(f64, f64)> {
        let page_id = self.page_id(page)?;

        let media_box = match self.inherited_attribute(page_id, b"MediaBox")? {
            Some(obj) => obj,
            None => return Ok(A4_SIZE),
        };
        let values = media_box
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;
        if values.len() < 4 {
            return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            let value = self.resolve(value)?;
            *slot = value
                .as_f32()
                .map(|v| v as f64)
                .ok()
                .or_else(|| value.as_i64().ok().map(|v| v as f64))
                .ok_or_else(|| PdfError::ParseError("Invalid MediaBox value".to_string()))?;
        }

        Ok(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.finalize()?;

        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Embed used fonts, register them on their pages and write content
    fn finalize(&mut self) -> Result<()> {
        let embedded = self.embed_fonts()?;

        let page_resources = std::mem::take(&mut self.page_font_resources);
        for (page, fonts) in &page_resources {
            let entries: Vec<(String, ObjectId)> = fonts
                .iter()
                .map(|(font_name, resource_name)| {
                    embedded
                        .get(font_name)
                        .map(|id| (resource_name.clone(), *id))
                        .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))
                })
                .collect::<Result<_>>()?;
            self.add_fonts_to_page_resources(*page, &entries)?;
        }

        let buffers = std::mem::take(&mut self.page_content_buffer);
        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_overlay_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Embed every font referenced from a page, once each
    fn embed_fonts(&mut self) -> Result<HashMap<String, ObjectId>> {
        let mut font_names: Vec<String> = self
            .page_font_resources
            .values()
            .flat_map(|fonts| fonts.keys().cloned())
            .collect();
        font_names.sort();
        font_names.dedup();

        let mut embedded = HashMap::new();
        for font_name in font_names {
            let font_id = match self.font(&font_name)?.clone() {
                Font::Standard(std_font) => self.inner.add_object(std_font.to_pdf_object()),
                Font::TrueType(data) => {
                    let font_objects = data.to_pdf_objects()?;

                    let font_file_id = self.inner.add_object(font_objects.font_file_stream);

                    let mut font_descriptor = font_objects.font_descriptor;
                    font_descriptor.set(font_objects.font_file_key, Object::Reference(font_file_id));
                    let font_descriptor_id = self.inner.add_object(font_descriptor);

                    let mut cid_font = font_objects.cid_font;
                    cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
                    let cid_font_id = self.inner.add_object(cid_font);

                    let mut type0_font = font_objects.type0_font;
                    type0_font.set(
                        "DescendantFonts",
                        Object::Array(vec![Object::Reference(cid_font_id)]),
                    );
                    let tounicode_id = self.inner.add_object(font_objects.tounicode_stream);
                    type0_font.set("ToUnicode", Object::Reference(tounicode_id));

                    self.inner.add_object(type0_font)
                }
            };
            log::trace!("embedded font {font_name} as object {font_id:?}");
            embedded.insert(font_name, font_id);
        }

        Ok(embedded)
    }

    /// Get or create a font resource name for a specific page
    ///
    /// Returns a name such as "CF1" that does not clash with fonts the
    /// page already declares.
    fn get_or_create_font_ref(&mut self, font_name: &str, page: usize) -> Result<String> {
        if let Some(resource_name) = self
            .page_font_resources
            .get(&page)
            .and_then(|fonts| fonts.get(font_name))
        {
            return Ok(resource_name.clone());
        }

        let taken = self.existing_font_resource_names(page)?;
        let resource_name = loop {
            let candidate = format!("CF{}", self.next_font_resource);
            self.next_font_resource += 1;
            if !taken.contains(candidate.as_bytes()) {
                break candidate;
            }
        };

        self.page_font_resources
            .entry(page)
            .or_default()
            .insert(font_name.to_string(), resource_name.clone());

        Ok(resource_name)
    }

    /// Names already used in the page's effective /Font resources
    fn existing_font_resource_names(&self, page: usize) -> Result<HashSet<Vec<u8>>> {
        let resources = self.effective_resources(self.page_id(page)?)?;
        let names = match resources.get(b"Font") {
            Ok(font) => match self.resolve(font)?.as_dict() {
                Ok(dict) => dict.iter().map(|(name, _)| name.clone()).collect(),
                Err(_) => HashSet::new(),
            },
            Err(_) => HashSet::new(),
        };
        Ok(names)
    }

    /// Add font references to a page's Resources dictionary
    ///
    /// Inherited or referenced resources are copied into a direct
    /// dictionary on the page so shared parents are left untouched.
    fn add_fonts_to_page_resources(
        &mut self,
        page: usize,
        fonts: &[(String, ObjectId)],
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut resources_dict = self.effective_resources(page_id)?;

        let mut font_dict = match resources_dict.get(b"Font") {
            Ok(font) => self
                .resolve(font)?
                .as_dict()
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            Err(_) => Dictionary::new(),
        };
        for (resource_name, font_id) in fonts {
            font_dict.set(resource_name.as_bytes(), Object::Reference(*font_id));
        }
        resources_dict.set("Font", Object::Dictionary(font_dict));

        let mut page_dict = self.page_dict(page_id)?.clone();
        page_dict.set("Resources", Object::Dictionary(resources_dict));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    /// Wrap the page's existing content in q/Q and append the overlay
    fn append_overlay_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut page_dict = self.page_dict(page_id)?.clone();

        let existing = match page_dict.get(b"Contents") {
            Ok(contents) => self.content_stream_refs(contents.clone())?,
            Err(_) => Vec::new(),
        };

        let save_state_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

        let mut overlay = b"Q\n".to_vec();
        overlay.extend_from_slice(content);
        let overlay_stream = Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            compress(&overlay)?,
        );
        let overlay_id = self.inner.add_object(overlay_stream);

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(save_state_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        page_dict.set("Contents", Object::Array(contents));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    /// Flatten a `/Contents` value into references to its streams
    ///
    /// `/Contents` may be a stream, an array of streams, or a reference to
    /// either. Direct streams are moved into their own objects.
    fn content_stream_refs(&mut self, contents: Object) -> Result<Vec<Object>> {
        match contents {
            Object::Reference(id) => {
                let target = self.inner.get_object(id)?.as_array().ok().cloned();
                match target {
                    Some(items) => self.content_stream_refs(Object::Array(items)),
                    None => Ok(vec![Object::Reference(id)]),
                }
            }
            Object::Array(items) => {
                let mut refs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Object::Stream(stream) => {
                            refs.push(Object::Reference(self.inner.add_object(stream)))
                        }
                        Object::Reference(_) => refs.push(item),
                        _ => {}
                    }
                }
                Ok(refs)
            }
            Object::Stream(stream) => Ok(vec![Object::Reference(self.inner.add_object(stream))]),
            _ => Ok(Vec::new()),
        }
    }

    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))
    }

    /// Follow a reference to the object it points at
    fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        let mut current = obj;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Object::Reference(id) => current = self.inner.get_object(*id)?,
                other => return Ok(other),
            }
        }
        Err(PdfError::ParseError("Reference chain too deep".to_string()))
    }

    /// Look up a page attribute, following the Parent chain
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(self.resolve(value)?.clone()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// The page's Resources as a direct dictionary (empty if none)
    fn effective_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        Ok(self
            .inherited_attribute(page_id, b"Resources")?
            .and_then(|obj| obj.as_dict().ok().cloned())
            .unwrap_or_else(Dictionary::new))
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardFont;

    /// One page, resources inherited from the Pages node, font F1 taken
    fn inherited_resources_pdf() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let existing_font = doc.add_object(StandardFont::Courier.to_pdf_object());
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 10 Tf 10 10 Td (x) Tj ET\n".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let font_dict = dictionary! { "F1" => existing_font, "CF1" => existing_font };
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 400.into(), 300.into()],
                "Resources" => dictionary! { "Font" => font_dict },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_inherited_media_box() {
        let doc = PdfDocument::from_document(inherited_resources_pdf());
        assert_eq!(doc.page_size(1).unwrap(), (400.0, 300.0));
    }

    #[test]
    fn test_resource_name_skips_existing() {
        let mut doc = PdfDocument::from_document(inherited_resources_pdf());
        doc.add_font("Helvetica", Font::Standard(StandardFont::Helvetica))
            .unwrap();
        doc.set_font("Helvetica", 24.0).unwrap();
        doc.insert_text("Hi", 1, 10.0, 20.0).unwrap();

        let fonts = &doc.page_font_resources[&1];
        assert_eq!(fonts["Helvetica"], "CF2");
    }

    #[test]
    fn test_inherited_fonts_preserved_on_save() {
        let mut doc = PdfDocument::from_document(inherited_resources_pdf());
        doc.add_font("Helvetica", Font::Standard(StandardFont::Helvetica))
            .unwrap();
        doc.set_font("Helvetica", 24.0).unwrap();
        doc.insert_text("Hi", 1, 10.0, 20.0).unwrap();
        doc.finalize().unwrap();

        let page_id = doc.page_id(1).unwrap();
        let resources = doc.effective_resources(page_id).unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"CF1"));
        assert!(fonts.has(b"CF2"));
    }

    #[test]
    fn test_content_wrapped_in_save_restore() {
        let mut doc = PdfDocument::from_document(inherited_resources_pdf());
        doc.add_font("Helvetica", Font::Standard(StandardFont::Helvetica))
            .unwrap();
        doc.set_font("Helvetica", 24.0).unwrap();
        doc.insert_text("Hi", 1, 10.0, 20.0).unwrap();
        doc.finalize().unwrap();

        let page_id = doc.page_id(1).unwrap();
        let content = doc.inner.get_page_content(page_id).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.starts_with("q\n"));
        let restore = content.find("Q\n").unwrap();
        let original = content.find("(x) Tj").unwrap();
        let overlay = content.find("<4869> Tj").unwrap();
        assert!(original < restore && restore < overlay);
    }

    #[test]
    fn test_compress_roundtrip() {
        let data = b"BT /CF1 24 Tf ET\n";
        let compressed = compress(data).unwrap();
        let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed);
        assert_eq!(stream.decompressed_content().unwrap(), data.to_vec());
    }
}
