//! Relationships of the main document part
//!
//! `word/_rels/document.xml.rels` maps short ids (`rId7`) to targets. Every
//! resolved image adds one entry of type image pointing at a new media file:
//!
//! ```ignore
//! use docxmark::relationships::Relationships;
//!
//! let mut rels = Relationships::parse(xml_bytes)?;
//! let image = rels.add_image("png");
//! assert_eq!(image.target, format!("media/imageDocx{}.png", image.number));
//! let xml = rels.to_xml();
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use quick_xml::escape::escape;

use crate::error::Result;
use crate::xml::XmlTree;

/// Namespace of `.rels` parts
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` for URLs, absent for package parts
    pub target_mode: Option<String>,
}

/// An image relationship allocated by [`Relationships::add_image`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRelationship {
    pub id: String,
    /// Numeric part of the id, shared with the media file name
    pub number: u32,
    /// Target relative to `word/`
    pub target: String,
}

impl ImageRelationship {
    /// Path of the media part inside the package
    pub fn part_path(&self) -> String {
        format!("word/{}", self.target)
    }
}

/// Entries of a `.rels` part in file order
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: Vec<Relationship>,
    index: HashMap<String, usize>,
}

impl Relationships {
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

    pub fn new() -> Self {
        Self::default()
    }

    /// Read the entries of a `.rels` part
    ///
    /// Entries without an `Id` or `Target` are dropped; a repeated id keeps
    /// its first occurrence.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let tree = XmlTree::parse(xml)?;
        let mut rels = Self::new();

        for node in tree.elements_by_name(tree.root(), "Relationship") {
            let (Some(id), Some(target)) = (tree.attribute(node, "Id"), tree.attribute(node, "Target")) else {
                continue;
            };
            rels.push(Relationship {
                id: id.to_string(),
                rel_type: tree.attribute(node, "Type").unwrap_or_default().to_string(),
                target: target.to_string(),
                target_mode: tree.attribute(node, "TargetMode").map(str::to_string),
            });
        }

        Ok(rels)
    }

    /// Append an image relationship pointing at a fresh media file
    ///
    /// The number is the current entry count plus one. Documents whose
    /// existing ids have gaps may already use that number; the next free
    /// number is taken instead.
    pub fn add_image(&mut self, extension: &str) -> ImageRelationship {
        self.add_image_where(extension, |_| true)
    }

    /// Like [`add_image`](Self::add_image), also skipping numbers whose media
    /// part path (`word/media/...`) is rejected by `is_free`
    pub fn add_image_where(&mut self, extension: &str, is_free: impl Fn(&str) -> bool) -> ImageRelationship {
        let mut number = self.entries.len() as u32 + 1;
        while self.contains(&format!("rId{}", number))
            || !is_free(&format!("word/media/imageDocx{}.{}", number, extension))
        {
            number += 1;
        }

        let image = ImageRelationship {
            id: format!("rId{}", number),
            number,
            target: format!("media/imageDocx{}.{}", number, extension),
        };
        self.push(Relationship {
            id: image.id.clone(),
            rel_type: Self::TYPE_IMAGE.to_string(),
            target: image.target.clone(),
            target_mode: None,
        });
        image
    }

    fn push(&mut self, rel: Relationship) {
        if self.index.contains_key(&rel.id) {
            return;
        }
        self.index.insert(rel.id.clone(), self.entries.len());
        self.entries.push(rel);
    }

    /// Serialize as a complete `.rels` part
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, "\n<Relationships xmlns=\"{}\">", RELATIONSHIPS_NS);
        for rel in &self.entries {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape(rel.id.as_str()),
                escape(rel.rel_type.as_str()),
                escape(rel.target.as_str())
            );
            if let Some(mode) = &rel.target_mode {
                let _ = write!(xml, r#" TargetMode="{}""#, escape(mode.as_str()));
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }

    /// Target of an entry
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entry(id).map(|rel| rel.target.as_str())
    }

    /// Entry with the given id
    pub fn entry(&self, id: &str) -> Option<&Relationship> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Check if an entry has the image type
    pub fn is_image(&self, id: &str) -> bool {
        self.entry(id).is_some_and(|rel| rel.rel_type == Self::TYPE_IMAGE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }
}
