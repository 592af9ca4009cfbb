//! Mutable XML tree for package parts
//!
//! Parts are parsed with `quick-xml` into an arena of nodes addressed by
//! [`NodeId`]. Every node knows its parent, so rewrites can walk upwards from
//! a text node to its enclosing row and insert siblings there. Node ids stay
//! valid for the lifetime of the tree; detached nodes are simply unreachable
//! from the root and are skipped on serialization.
//!
//! Element and attribute names are kept verbatim, prefix included
//! (`w:t`, `r:embed`). Namespace declarations are ordinary attributes, which
//! lets isolated fragments such as a single `<w:drawing>` block parse without
//! the declarations of the enclosing document.

use std::fmt::Write as _;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DocxError, Result};

/// Handle to a node inside an [`XmlTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Synthetic root holding the prolog and the document element
    Document,
    /// An element with its attributes in source order
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// Unescaped character data
    Text(String),
    /// Raw CDATA section content
    CData(String),
    /// Comment body
    Comment(String),
    /// XML declaration content (`xml version="1.0" ...`)
    Declaration(String),
    /// Processing instruction content
    ProcessingInstruction(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed XML document
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTree {
    /// Create an empty tree containing only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse a tree from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut tree = Self::new();
        let mut stack = vec![tree.root()];
        let mut buf = Vec::new();

        loop {
            let parent = stack.last().copied().unwrap_or(tree.root());
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let id = tree.push_node(element_kind(e)?);
                    tree.append_child(parent, id);
                    stack.push(id);
                }
                Event::Empty(ref e) => {
                    let id = tree.push_node(element_kind(e)?);
                    tree.append_child(parent, id);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Text(ref e) => {
                    let text = e.unescape()?.into_owned();
                    let id = tree.push_node(NodeKind::Text(text));
                    tree.append_child(parent, id);
                }
                Event::CData(ref e) => {
                    let id = tree.push_node(NodeKind::CData(lossy(e)));
                    tree.append_child(parent, id);
                }
                Event::Comment(ref e) => {
                    let id = tree.push_node(NodeKind::Comment(lossy(e)));
                    tree.append_child(parent, id);
                }
                Event::Decl(ref e) => {
                    let id = tree.push_node(NodeKind::Declaration(lossy(e)));
                    tree.append_child(parent, id);
                }
                Event::PI(ref e) => {
                    let id = tree.push_node(NodeKind::ProcessingInstruction(lossy(e)));
                    tree.append_child(parent, id);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|id| tree.name(*id))
                .unwrap_or_default()
                .to_string();
            return Err(DocxError::InvalidStructure(format!(
                "unclosed element <{}>",
                open
            )));
        }

        Ok(tree)
    }

    /// Parse a tree from an XML string
    pub fn parse_str(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Serialize the reachable part of the tree back to XML text
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root(), &mut out);
        out
    }

    /// The synthetic document root
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element directly below the root
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    /// Node payload
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Check if a node is an element
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Element name including its prefix, `None` for non-elements
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Attribute value by qualified name
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set or replace an attribute; ignored on non-elements
    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            let value = value.into();
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => attributes.push((key.to_string(), value)),
            }
        }
    }

    /// Parent of a node, `None` for the root and detached nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Ordered children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// All descendants of a node in document order, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendant elements with the given name, in document order
    pub fn elements_by_name(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.name(*n) == Some(name))
            .collect()
    }

    /// First descendant element with the given name
    pub fn first_element_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.elements_by_name(id, name).into_iter().next()
    }

    /// Nearest strict ancestor element with the given name
    pub fn ancestor_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.name(node) == Some(name) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated character data of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// Replace the character data of a node
    ///
    /// Text nodes are rewritten in place; elements lose all their children
    /// and receive a single text child.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        if let NodeKind::Text(existing) | NodeKind::CData(existing) = &mut self.nodes[id.0].kind {
            *existing = text;
            return;
        }
        if !self.is_element(id) {
            return;
        }
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let child = self.create_text(text);
            self.append_child(id, child);
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `node` as the preceding sibling of `reference`
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        self.insert_sibling(reference, node, 0)
    }

    /// Insert `node` as the following sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        self.insert_sibling(reference, node, 1)
    }

    fn insert_sibling(&mut self, reference: NodeId, node: NodeId, offset: usize) -> Result<()> {
        self.detach(node);
        let parent = self.parent(reference).ok_or_else(|| {
            DocxError::InvalidStructure("cannot insert a sibling next to a detached node".into())
        })?;
        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == reference)
            .ok_or_else(|| DocxError::InvalidStructure("node missing from its parent".into()))?;
        self.nodes[parent.0].children.insert(position + offset, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) | NodeKind::CData(text) => out.push_str(text),
            _ => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
            }
            NodeKind::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    let _ = write!(out, r#" {}="{}""#, key, escape(value.as_str()));
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for child in children {
                        self.write_node(*child, out);
                    }
                    let _ = write!(out, "</{}>", name);
                }
            }
            NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeKind::CData(text) => {
                let _ = write!(out, "<![CDATA[{}]]>", text);
            }
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeKind::Declaration(text) | NodeKind::ProcessingInstruction(text) => {
                let _ = write!(out, "<?{}?>", text);
            }
        }
    }
}

fn element_kind(start: &BytesStart) -> Result<NodeKind> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(NodeKind::Element { name, attributes })
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:tbl><w:tr><w:tc><w:p><w:r><w:t xml:space="preserve">Hello &amp; welcome</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>"#;

    #[test]
    fn test_parse_and_serialize_preserves_content() {
        let tree = XmlTree::parse_str(SAMPLE).unwrap();
        assert_eq!(tree.to_xml_string(), SAMPLE);
    }

    #[test]
    fn test_document_element() {
        let tree = XmlTree::parse_str(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.name(root), Some("w:document"));
    }

    #[test]
    fn test_text_content_is_unescaped() {
        let tree = XmlTree::parse_str(SAMPLE).unwrap();
        let t = tree.first_element_by_name(tree.root(), "w:t").unwrap();
        assert_eq!(tree.text_content(t), "Hello & welcome");
        assert_eq!(tree.attribute(t, "xml:space"), Some("preserve"));
    }

    #[test]
    fn test_ancestor_by_name() {
        let tree = XmlTree::parse_str(SAMPLE).unwrap();
        let t = tree.first_element_by_name(tree.root(), "w:t").unwrap();
        let row = tree.ancestor_by_name(t, "w:tr").unwrap();
        assert_eq!(tree.name(row), Some("w:tr"));
        assert!(tree.ancestor_by_name(t, "w:hdr").is_none());
    }

    #[test]
    fn test_insert_siblings() {
        let mut tree = XmlTree::parse_str("<a><b/></a>").unwrap();
        let b = tree.first_element_by_name(tree.root(), "b").unwrap();

        let before = tree.create_element("x");
        tree.insert_before(b, before).unwrap();
        let after = tree.create_element("y");
        tree.set_text_content(after, "z");
        tree.insert_after(b, after).unwrap();

        assert_eq!(tree.to_xml_string(), "<a><x/><b/><y>z</y></a>");
    }

    #[test]
    fn test_insert_next_to_root_fails() {
        let mut tree = XmlTree::parse_str("<a/>").unwrap();
        let node = tree.create_element("x");
        let root = tree.root();
        assert!(tree.insert_before(root, node).is_err());
    }

    #[test]
    fn test_set_text_content_replaces_children() {
        let mut tree = XmlTree::parse_str("<w:t>a<x/>b</w:t>").unwrap();
        let t = tree.document_element().unwrap();
        tree.set_text_content(t, "1 < 2");
        assert_eq!(tree.to_xml_string(), "<w:t>1 &lt; 2</w:t>");
    }

    #[test]
    fn test_attribute_escaping_roundtrip() {
        let xml = r#"<a:hlinkClick tooltip="$docxImage{&quot;src&quot;:&quot;x&quot;}$"/>"#;
        let mut tree = XmlTree::parse_str(xml).unwrap();
        let link = tree.document_element().unwrap();
        assert_eq!(
            tree.attribute(link, "tooltip"),
            Some(r#"$docxImage{"src":"x"}$"#)
        );

        tree.set_attribute(link, "tooltip", "a & b");
        tree.set_attribute(link, "r:id", "rId1");
        assert_eq!(
            tree.to_xml_string(),
            r#"<a:hlinkClick tooltip="a &amp; b" r:id="rId1"/>"#
        );
    }

    #[test]
    fn test_elements_by_name_in_document_order() {
        let tree = XmlTree::parse_str("<r><t>1</t><p><t>2</t></p><t>3</t></r>").unwrap();
        let texts: Vec<String> = tree
            .elements_by_name(tree.root(), "t")
            .into_iter()
            .map(|id| tree.text_content(id))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        assert!(XmlTree::parse_str("<a><b></b>").is_err());
    }

    #[test]
    fn test_comments_and_cdata_survive() {
        let xml = "<a><!-- note --><![CDATA[<raw>]]></a>";
        let tree = XmlTree::parse_str(xml).unwrap();
        assert_eq!(tree.to_xml_string(), xml);
    }
}
