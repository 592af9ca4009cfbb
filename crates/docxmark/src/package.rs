//! Package model for DOCX files
//!
//! A package is the ordered set of parts found in the ZIP container. Parts keep
//! their archive order, and every path appears once. XML parts are parsed
//! lazily: they start out as bytes and become an [`XmlTree`] the first time a
//! pass asks for the tree.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{DocxError, Result};
use crate::xml::XmlTree;

/// Main document part
pub const DOCUMENT_PATH: &str = "word/document.xml";

/// Relationships of the main document part
pub const DOCUMENT_RELS_PATH: &str = "word/_rels/document.xml.rels";

/// Content of a single part
#[derive(Debug, Clone)]
pub enum PartContent {
    /// Parsed XML tree
    Xml(XmlTree),
    /// Raw text, used after text-level region replacement
    Text(String),
    /// Untouched bytes (media, or XML not parsed yet)
    Binary(Vec<u8>),
}

/// A named part of the package
#[derive(Debug, Clone)]
pub struct Part {
    path: String,
    content: PartContent,
}

impl Part {
    /// Create a part from raw bytes
    pub fn binary(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content: PartContent::Binary(bytes),
        }
    }

    /// Create a part from text
    pub fn text(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: PartContent::Text(text.into()),
        }
    }

    /// Create a part from a parsed tree
    pub fn xml(path: impl Into<String>, tree: XmlTree) -> Self {
        Self {
            path: path.into(),
            content: PartContent::Xml(tree),
        }
    }

    /// Path of the part inside the package
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current content
    pub fn content(&self) -> &PartContent {
        &self.content
    }

    /// Check if the path names an XML part
    pub fn is_xml(&self) -> bool {
        self.path.ends_with(".xml") || self.path.ends_with(".rels")
    }

    /// Content as text, serializing the tree if needed
    pub fn as_text(&self) -> Cow<'_, str> {
        match &self.content {
            PartContent::Xml(tree) => Cow::Owned(tree.to_xml_string()),
            PartContent::Text(text) => Cow::Borrowed(text.as_str()),
            PartContent::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Content as bytes, serializing the tree if needed
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match &self.content {
            PartContent::Xml(tree) => Cow::Owned(tree.to_xml_string().into_bytes()),
            PartContent::Text(text) => Cow::Borrowed(text.as_bytes()),
            PartContent::Binary(bytes) => Cow::Borrowed(bytes.as_slice()),
        }
    }

    /// Parsed tree, parsing and caching it on first access
    pub fn xml_mut(&mut self) -> Result<&mut XmlTree> {
        if !matches!(self.content, PartContent::Xml(_)) {
            let tree = XmlTree::parse(&self.to_bytes())?;
            self.content = PartContent::Xml(tree);
        }
        match &mut self.content {
            PartContent::Xml(tree) => Ok(tree),
            _ => Err(DocxError::InvalidStructure(format!(
                "part {} is not XML",
                self.path
            ))),
        }
    }

    /// Replace the content with text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = PartContent::Text(text.into());
    }
}

/// Ordered collection of parts with unique paths
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a package from parts, rejecting duplicate paths
    pub fn from_parts(parts: impl IntoIterator<Item = Part>) -> Result<Self> {
        let mut package = Self::new();
        for part in parts {
            package.push(part)?;
        }
        Ok(package)
    }

    /// Open and unpack a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut package = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            package.push(Part::binary(name, contents))?;
        }

        Ok(package)
    }

    /// Append a part; the path must not exist yet
    pub fn push(&mut self, part: Part) -> Result<()> {
        if self.contains(part.path()) {
            return Err(DocxError::DuplicatePart(part.path().to_string()));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Get a part by path
    pub fn get(&self, path: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.path == path)
    }

    /// Get a mutable part by path
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.path == path)
    }

    /// Get a required part, failing with [`DocxError::MissingPart`]
    pub fn require_mut(&mut self, path: &str) -> Result<&mut Part> {
        self.get_mut(path)
            .ok_or_else(|| DocxError::MissingPart(path.to_string()))
    }

    /// Parsed tree of a required XML part
    pub fn xml_mut(&mut self, path: &str) -> Result<&mut XmlTree> {
        self.require_mut(path)?.xml_mut()
    }

    /// Check if a part exists
    pub fn contains(&self, path: &str) -> bool {
        self.parts.iter().any(|p| p.path == path)
    }

    /// Iterate over parts in package order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Iterate mutably over parts in package order
    pub fn parts_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        self.parts.iter_mut()
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the package has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Write the package to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Write the package to any writer, in part order
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.path(), options)?;
            zip.write_all(&part.to_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }
}
