//! Shared test utilities for docxmark
//!
//! This module provides common fixtures and helpers used across unit tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::package::{DOCUMENT_PATH, DOCUMENT_RELS_PATH};

pub const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub const EMPTY_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// Create a minimal valid DOCX archive
///
/// Contains `[Content_Types].xml`, `_rels/.rels`,
/// `word/_rels/document.xml.rels` and a one-paragraph `word/document.xml`.
pub fn create_minimal_docx() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES_XML.as_bytes()).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
    )
    .unwrap();

    zip.start_file(DOCUMENT_RELS_PATH, options).unwrap();
    zip.write_all(EMPTY_RELS_XML.as_bytes()).unwrap();

    zip.start_file(DOCUMENT_PATH, options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Template</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
    )
    .unwrap();

    zip.finish().unwrap();
    buffer.into_inner()
}

/// A drawing fragment whose tooltip carries the given marker text
pub fn drawing_with_tooltip(tooltip: &str) -> String {
    format!(
        concat!(
            r#"<w:drawing><wp:inline><wp:extent cx="990000" cy="792000"/>"#,
            r#"<wp:docPr id="1" name="Picture 1"><a:hlinkClick r:id="" tooltip="{}"/></wp:docPr>"#,
            r#"<a:graphic><a:graphicData><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:blipFill><a:blip r:embed="rId99"/></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="990000" cy="792000"/></a:xfrm></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
        ),
        tooltip.replace('"', "&quot;")
    )
}

/// Encode an RGB image of the given size as PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    #[test]
    fn test_create_minimal_docx() {
        let docx = create_minimal_docx();
        assert!(!docx.is_empty());

        let package = Package::from_reader(Cursor::new(&docx)).unwrap();
        assert!(package.contains("[Content_Types].xml"));
        assert!(package.contains(DOCUMENT_PATH));
        assert!(package.contains("_rels/.rels"));
    }

    #[test]
    fn test_png_bytes_have_requested_size() {
        let bytes = png_bytes(4, 3);
        let dims = crate::metrics::image_dimensions(&bytes).unwrap();
        assert_eq!(dims, (4, 3));
    }
}
