//! Drawing fragments and image placeholders
//!
//! A placeholder picture in the rendered document looks like:
//!
//! ```xml
//! <w:drawing>
//!   <wp:inline>
//!     <wp:extent cx="..." cy="..."/>
//!     <wp:docPr id="1" name="Picture 1">
//!       <a:hlinkClick r:id="" tooltip="$docxImage{...}$"/>
//!     </wp:docPr>
//!     <a:graphic>
//!       ... <a:blip r:embed="rId5"/> ...
//!       ... <a:xfrm><a:off x="0" y="0"/><a:ext cx="..." cy="..."/></a:xfrm> ...
//!     </a:graphic>
//!   </wp:inline>
//! </w:drawing>
//! ```
//!
//! Fragments are located in the raw document text, parsed on their own, mutated
//! as a tree and serialized back. `wp:extent` and the `a:ext` under `a:xfrm` are
//! always written together so they never disagree.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::descriptor::ImageDescriptor;
use crate::error::{DocxError, Result};
use crate::markers::find_image_marker;
use crate::xml::{NodeId, XmlTree};

/// Hyperlink node whose tooltip carries the image marker
pub const TOOLTIP_ELEMENT: &str = "a:hlinkClick";

/// Binary reference node
pub const BLIP_ELEMENT: &str = "a:blip";

/// Outer size node
pub const EXTENT_ELEMENT: &str = "wp:extent";

/// Transform holding the inner size node
pub const XFRM_ELEMENT: &str = "a:xfrm";

/// Inner size node
pub const EXT_ELEMENT: &str = "a:ext";

/// Byte ranges of every complete `<w:drawing>` block, in document order
pub fn drawing_regions(text: &str) -> Vec<Range<usize>> {
    static DRAWING_RE: OnceLock<Regex> = OnceLock::new();
    let re = DRAWING_RE.get_or_init(|| Regex::new(r"(?s)<w:drawing>.*?</w:drawing>").unwrap());
    re.find_iter(text).map(|m| m.range()).collect()
}

/// One `<w:drawing>` block parsed in isolation
#[derive(Debug, Clone)]
pub struct DrawingFragment {
    tree: XmlTree,
}

impl DrawingFragment {
    /// Parse a fragment
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self {
            tree: XmlTree::parse_str(xml)?,
        })
    }

    fn tooltip_nodes(&self) -> Vec<NodeId> {
        self.tree.elements_by_name(self.tree.root(), TOOLTIP_ELEMENT)
    }

    /// Tooltip of the first hyperlink node
    pub fn tooltip(&self) -> Option<&str> {
        let first = *self.tooltip_nodes().first()?;
        self.tree.attribute(first, "tooltip")
    }

    /// Extract the image descriptor and remove its marker from the tooltips
    ///
    /// Returns `Ok(None)` when the fragment is not an image placeholder: it has
    /// no hyperlink node or the tooltip carries no image marker. Word sometimes
    /// duplicates the hyperlink node; the marker is stripped from each copy.
    pub fn take_image_descriptor(&mut self) -> Result<Option<ImageDescriptor>> {
        let Some(tooltip) = self.tooltip().map(str::to_string) else {
            return Ok(None);
        };
        let Some(marker) = find_image_marker(&tooltip)? else {
            return Ok(None);
        };

        let descriptor = ImageDescriptor::from_json(marker.payload)?;

        for node in self.tooltip_nodes() {
            if let Some(current) = self.tree.attribute(node, "tooltip") {
                let cleaned = current.replacen(marker.marker, "", 1);
                self.tree.set_attribute(node, "tooltip", cleaned);
            }
        }

        Ok(Some(descriptor))
    }

    /// Current `cx`/`cy` of `wp:extent`
    pub fn placeholder_size(&self) -> Option<(i64, i64)> {
        let extent = self.tree.first_element_by_name(self.tree.root(), EXTENT_ELEMENT)?;
        let cx = self.tree.attribute(extent, "cx")?.trim().parse::<f64>().ok()?;
        let cy = self.tree.attribute(extent, "cy")?.trim().parse::<f64>().ok()?;
        Some((cx.round() as i64, cy.round() as i64))
    }

    /// Point the picture at a relationship
    pub fn set_embed(&mut self, rel_id: &str) -> Result<()> {
        let blip = self
            .tree
            .first_element_by_name(self.tree.root(), BLIP_ELEMENT)
            .ok_or_else(|| DocxError::MissingNode(BLIP_ELEMENT.to_string()))?;
        self.tree.set_attribute(blip, "r:embed", rel_id);
        Ok(())
    }

    /// Write the same size to `wp:extent` and `a:xfrm/a:ext`
    pub fn set_size(&mut self, cx: i64, cy: i64) -> Result<()> {
        let root = self.tree.root();
        let extent = self
            .tree
            .first_element_by_name(root, EXTENT_ELEMENT)
            .ok_or_else(|| DocxError::MissingNode(EXTENT_ELEMENT.to_string()))?;
        let ext = self
            .tree
            .first_element_by_name(root, XFRM_ELEMENT)
            .and_then(|xfrm| self.tree.first_element_by_name(xfrm, EXT_ELEMENT))
            .ok_or_else(|| DocxError::MissingNode(format!("{}/{}", XFRM_ELEMENT, EXT_ELEMENT)))?;

        for node in [extent, ext] {
            self.tree.set_attribute(node, "cx", cx.to_string());
            self.tree.set_attribute(node, "cy", cy.to_string());
        }
        Ok(())
    }

    /// Serialize the fragment, dropping empty namespace declarations
    pub fn to_xml_string(&self) -> String {
        static EMPTY_NS_RE: OnceLock<Regex> = OnceLock::new();
        let re = EMPTY_NS_RE.get_or_init(|| Regex::new(r#" ?xmlns(?::[A-Za-z0-9]+)?="""#).unwrap());
        re.replace_all(&self.tree.to_xml_string(), "").into_owned()
    }
}
