//! Template marker detection
//!
//! Two marker families travel through the document text:
//!
//! - table markers, `{{#docxTable <args>}}` and `{{/docxTable}}`, written by the
//!   template author inside table cells;
//! - image markers, `$docxImage<JSON>$`, produced by the template engine inside
//!   the tooltip of a picture's hyperlink.
//!
//! This module only finds them. Relocation and resolution live in
//! [`crate::table`] and [`crate::drawing`].

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DocxError, Result};
use crate::xml::{NodeId, XmlTree};

/// Start of an opening table marker
pub const TABLE_OPEN_PREFIX: &str = "{{#docxTable";

/// Closing table marker
pub const TABLE_CLOSE: &str = "{{/docxTable}}";

/// Start of an image marker inside a tooltip
pub const IMAGE_TOKEN: &str = "$docxImage";

/// Text-bearing leaf element of WordprocessingML
pub const TEXT_ELEMENT: &str = "w:t";

/// Longest argument list accepted inside an opening table marker
pub const MAX_TABLE_ARGS_LEN: usize = 500;

/// Text leaf nodes of a part, in document order
pub fn text_nodes(tree: &XmlTree) -> Vec<NodeId> {
    tree.elements_by_name(tree.root(), TEXT_ELEMENT)
}

/// Check if the text contains a closing table marker
pub fn has_table_close(text: &str) -> bool {
    text.contains(TABLE_CLOSE)
}

/// Locate the first opening table marker
///
/// Returns `Ok(None)` when the text has no opening marker. Text that starts
/// a marker but never completes it within the argument bound is malformed.
pub fn find_table_open(text: &str) -> Result<Option<Range<usize>>> {
    if !text.contains(TABLE_OPEN_PREFIX) {
        return Ok(None);
    }

    static OPEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = OPEN_RE.get_or_init(|| {
        Regex::new(&format!(
            r"\{{\{{#docxTable [^{{}}]{{0,{}}}\}}\}}",
            MAX_TABLE_ARGS_LEN
        ))
        .unwrap()
    });

    re.find(text)
        .map(|m| Some(m.range()))
        .ok_or_else(|| DocxError::MalformedMarker(format!("unterminated table marker in {:?}", text)))
}

/// An image marker found in a tooltip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMarker<'a> {
    /// The whole marker, delimiters included
    pub marker: &'a str,
    /// The JSON payload between `$docxImage` and the closing `$`
    pub payload: &'a str,
}

/// Locate the image marker in a tooltip
///
/// Returns `Ok(None)` when the tooltip does not carry the image token.
pub fn find_image_marker(tooltip: &str) -> Result<Option<ImageMarker<'_>>> {
    if !tooltip.contains(IMAGE_TOKEN) {
        return Ok(None);
    }

    static IMAGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = IMAGE_RE.get_or_init(|| Regex::new(r"\$docxImage([^$]*)\$").unwrap());

    let caps = re.captures(tooltip).ok_or_else(|| {
        DocxError::MalformedMarker(format!("unterminated image marker in {:?}", tooltip))
    })?;
    match (caps.get(0), caps.get(1)) {
        (Some(marker), Some(payload)) => Ok(Some(ImageMarker {
            marker: marker.as_str(),
            payload: payload.as_str(),
        })),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_table_open() {
        let text = "before {{#docxTable items}} after";
        let range = find_table_open(text).unwrap().unwrap();
        assert_eq!(&text[range], "{{#docxTable items}}");
    }

    #[test]
    fn test_find_table_open_absent() {
        assert_eq!(find_table_open("plain text").unwrap(), None);
        assert_eq!(find_table_open("{{/docxTable}}").unwrap(), None);
    }

    #[test]
    fn test_find_table_open_respects_argument_bound() {
        let ok = format!("{{{{#docxTable {}}}}}", "a".repeat(MAX_TABLE_ARGS_LEN));
        assert!(find_table_open(&ok).unwrap().is_some());

        let too_long = format!("{{{{#docxTable {}}}}}", "a".repeat(MAX_TABLE_ARGS_LEN + 1));
        assert!(matches!(
            find_table_open(&too_long),
            Err(DocxError::MalformedMarker(_))
        ));
    }

    #[test]
    fn test_has_table_close() {
        assert!(has_table_close("x{{/docxTable}}y"));
        assert!(!has_table_close("{{/docxTable"));
    }

    #[test]
    fn test_find_image_marker() {
        let tooltip = r#"Logo $docxImage{"src":"http://x/a.png"}$"#;
        let marker = find_image_marker(tooltip).unwrap().unwrap();
        assert_eq!(marker.marker, r#"$docxImage{"src":"http://x/a.png"}$"#);
        assert_eq!(marker.payload, r#"{"src":"http://x/a.png"}"#);
    }

    #[test]
    fn test_find_image_marker_absent() {
        assert_eq!(find_image_marker("just a tooltip").unwrap(), None);
    }

    #[test]
    fn test_unterminated_image_marker() {
        assert!(matches!(
            find_image_marker(r#"$docxImage{"src":"a"}"#),
            Err(DocxError::MalformedMarker(_))
        ));
    }

    #[test]
    fn test_text_nodes_in_order() {
        let tree = XmlTree::parse_str(
            "<w:body><w:p><w:r><w:t>a</w:t></w:r><w:r><w:t>b</w:t></w:r></w:p><w:p><w:r><w:t>c</w:t></w:r></w:p></w:body>",
        )
        .unwrap();
        let texts: Vec<String> = text_nodes(&tree)
            .into_iter()
            .map(|id| tree.text_content(id))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
