//! Fixture builders shared by the certgen integration tests

#![allow(dead_code)]

use certgen::{column_to_index, CertificateRequest};
use lopdf::dictionary;
use pdf_core::Color;
use std::io::Write;
use std::path::{Path, PathBuf};
use text_layout::BoundingBox;

/// A spreadsheet cell value
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

/// Write a single-sheet `.xlsx` workbook
///
/// `rows[0]` is the header row. Text cells go through the shared string
/// table, numbers are stored inline.
pub fn write_xlsx(path: &Path, sheet_name: &str, rows: &[Vec<Cell>]) {
    let mut shared: Vec<String> = Vec::new();
    let mut sheet_rows = String::new();

    for (r, row) in rows.iter().enumerate() {
        let row_number = r + 1;
        sheet_rows.push_str(&format!("<row r=\"{row_number}\">"));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_number}", certgen::index_to_column(c));
            match cell {
                Cell::Text(text) => {
                    shared.push(xml_escape(text));
                    sheet_rows.push_str(&format!(
                        "<c r=\"{reference}\" t=\"s\"><v>{}</v></c>",
                        shared.len() - 1
                    ));
                }
                Cell::Number(value) => {
                    sheet_rows.push_str(&format!("<c r=\"{reference}\"><v>{value}</v></c>"));
                }
                Cell::Empty => {}
            }
        }
        sheet_rows.push_str("</row>");
    }

    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        xml_escape(sheet_name)
    );

    let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

    let worksheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
    );

    let mut strings = String::new();
    for s in &shared {
        strings.push_str(&format!("<si><t xml:space=\"preserve\">{s}</t></si>"));
    }
    let shared_strings = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{strings}</sst>"#,
        n = shared.len()
    );

    let file = std::fs::File::create(path).expect("create xlsx");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    for (name, body) in [
        ("[Content_Types].xml", content_types.to_string()),
        ("_rels/.rels", root_rels.to_string()),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels.to_string()),
        ("xl/worksheets/sheet1.xml", worksheet),
        ("xl/sharedStrings.xml", shared_strings),
    ] {
        zip.start_file(name, options).expect("start zip entry");
        zip.write_all(body.as_bytes()).expect("write zip entry");
    }
    zip.finish().expect("finish xlsx");
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write a template PDF with `page_count` US Letter pages
///
/// Each page has a content stream that leaves a fill color set, so a leak
/// into the overlay would be visible.
pub fn write_template(path: &Path, page_count: usize) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for n in 0..page_count {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            format!("0 0 1 rg 20 20 572 752 re S % border {n}\n").into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => dictionary! {},
            "Contents" => contents_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Kids" => page_ids.into_iter().map(lopdf::Object::from).collect::<Vec<_>>(),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).expect("write template");
}

/// Scratch directory holding a template and a spreadsheet
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn template(&self) -> PathBuf {
        self.path("certificate_template.pdf")
    }

    pub fn spreadsheet(&self) -> PathBuf {
        self.path("input_data.xlsx")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("output")
    }

    /// A validated request pointing at this workspace's files
    pub fn request(&self, bbox: BoundingBox) -> CertificateRequest {
        CertificateRequest {
            spreadsheet_path: self.spreadsheet(),
            template_path: self.template(),
            output_dir: self.output_dir(),
            name_column: column_to_index("A").expect("column A"),
            id_column: column_to_index("C").expect("column C"),
            bbox,
            font_name: "Helvetica".to_string(),
            font_size: 24.0,
            page_index: 0,
            color: Color::black(),
            sheet: None,
        }
    }
}

/// Decompressed content of a 1-based page
pub fn page_content(path: &Path, page: u32) -> String {
    let doc = lopdf::Document::load(path).expect("parse output PDF");
    let page_id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(page_id).expect("page content")).into_owned()
}

/// Sorted file names in a directory
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
