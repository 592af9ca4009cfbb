//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docxmark::package::{DOCUMENT_PATH, DOCUMENT_RELS_PATH};
use docxmark::{FetchedImage, ImageFetcher, MemoryFetcher, Package, Part, Result};

pub const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub const EMPTY_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// Package with the three parts the passes touch
pub fn package_with_body(body: &str) -> Package {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}</w:body></w:document>"#,
        body
    );
    Package::from_parts(vec![
        Part::text("[Content_Types].xml", CONTENT_TYPES_XML),
        Part::text(DOCUMENT_RELS_PATH, EMPTY_RELS_XML),
        Part::text(DOCUMENT_PATH, document),
    ])
    .unwrap()
}

/// Text of the main document part
pub fn document_text(package: &Package) -> String {
    package.get(DOCUMENT_PATH).unwrap().as_text().into_owned()
}

/// A picture paragraph whose tooltip holds `tooltip`
pub fn picture(tooltip: &str) -> String {
    format!(
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="990000" cy="792000"/>"#,
            r#"<wp:docPr id="1" name="Picture 1"><a:hlinkClick r:id="" tooltip="{}"/></wp:docPr>"#,
            r#"<a:graphic><a:graphicData><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:blipFill><a:blip r:embed="rId99"/></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="990000" cy="792000"/></a:xfrm></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ),
        tooltip.replace('"', "&quot;")
    )
}

/// `$docxImage{...}$` with the given JSON members
pub fn image_marker(json_members: &str) -> String {
    format!("$docxImage{{{}}}$", json_members)
}

/// PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Attribute values of every `name` element in `xml`, in document order
pub fn attribute_values(xml: &str, name: &str, attr: &str) -> Vec<String> {
    let tree = docxmark::XmlTree::parse_str(xml).unwrap();
    tree.elements_by_name(tree.root(), name)
        .into_iter()
        .filter_map(|id| tree.attribute(id, attr).map(str::to_string))
        .collect()
}

/// [`MemoryFetcher`] that answers each URL after a set number of scheduler
/// yields and records how many requests overlap
#[derive(Default)]
pub struct SlowFetcher {
    inner: MemoryFetcher,
    yields: HashMap<String, usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, body: Vec<u8>, content_type: Option<&str>, yields: usize) -> Self {
        self.inner = self.inner.with_image(url, body, content_type);
        self.yields.insert(url.to_string(), yields);
        self
    }

    /// Highest number of requests observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for SlowFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        for _ in 0..self.yields.get(url).copied().unwrap_or(0) {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.fetch(url).await
    }
}
