//! `[Content_Types].xml` defaults
//!
//! Every file extension stored in the package needs one `<Default>` entry
//! mapping it to a MIME type. Media parts added by the image pass register
//! their extension here, at most once per extension.

use crate::error::{DocxError, Result};
use crate::xml::XmlTree;

/// Path of the content types part
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Check if a default is declared for the extension (case-insensitive)
pub fn has_default(tree: &XmlTree, extension: &str) -> bool {
    tree.elements_by_name(tree.root(), "Default")
        .into_iter()
        .filter_map(|d| tree.attribute(d, "Extension"))
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Add a `<Default>` entry unless one already exists
///
/// Returns `true` if an entry was added.
pub fn ensure_default(tree: &mut XmlTree, extension: &str, content_type: &str) -> Result<bool> {
    if has_default(tree, extension) {
        return Ok(false);
    }

    let types = tree
        .document_element()
        .filter(|root| tree.name(*root) == Some("Types"))
        .ok_or_else(|| DocxError::MissingNode("Types".to_string()))?;

    let default = tree.create_element("Default");
    tree.set_attribute(default, "Extension", extension);
    tree.set_attribute(default, "ContentType", content_type);
    tree.append_child(types, default);
    Ok(true)
}

/// Get the MIME content type for an image extension
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "tiff" | "tif" => "image/tiff",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    #[test]
    fn test_ensure_default_adds_once() {
        let mut tree = XmlTree::parse_str(TYPES).unwrap();

        assert!(ensure_default(&mut tree, "png", "image/png").unwrap());
        assert!(!ensure_default(&mut tree, "png", "image/png").unwrap());

        let xml = tree.to_xml_string();
        assert_eq!(xml.matches(r#"Extension="png""#).count(), 1);
        assert!(xml.ends_with(
            r#"<Default Extension="png" ContentType="image/png"/></Types>"#
        ));
    }

    #[test]
    fn test_existing_default_is_case_insensitive() {
        let xml = TYPES.replace("</Types>", r#"<Default Extension="PNG" ContentType="image/png"/></Types>"#);
        let mut tree = XmlTree::parse_str(&xml).unwrap();
        assert!(has_default(&tree, "png"));
        assert!(!ensure_default(&mut tree, "png", "image/png").unwrap());
    }

    #[test]
    fn test_missing_types_root() {
        let mut tree = XmlTree::parse_str("<Other/>").unwrap();
        assert!(matches!(
            ensure_default(&mut tree, "png", "image/png"),
            Err(DocxError::MissingNode(_))
        ));
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("png"), "image/png");
        assert_eq!(content_type_for_extension("PNG"), "image/png");
        assert_eq!(content_type_for_extension("jpeg"), "image/jpeg");
        assert_eq!(content_type_for_extension("jpg"), "image/jpeg");
        assert_eq!(content_type_for_extension("svg"), "image/svg+xml");
        assert_eq!(content_type_for_extension("emf"), "image/x-emf");
        assert_eq!(content_type_for_extension("xyz"), "application/octet-stream");
    }
}
