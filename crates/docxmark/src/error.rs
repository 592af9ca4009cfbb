//! Error types for docxmark operations

use thiserror::Error;

/// Errors that can occur while rewriting a document package
#[derive(Error, Debug)]
pub enum DocxError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Image descriptor payload is not valid JSON
    #[error("Invalid image descriptor: {0}")]
    Json(#[from] serde_json::Error),

    /// Data URI payload is not valid base64
    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// HTTP request for a remote image failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Image bytes could not be decoded to obtain dimensions
    #[error("Image metrics error: {0}")]
    ImageMetrics(#[from] image::ImageError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Required part not found in the package
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// A part with the same path already exists
    #[error("Duplicate part path: {0}")]
    DuplicatePart(String),

    /// Required XML element not found
    #[error("Required element not found: {0}")]
    MissingNode(String),

    /// Document shape the rewriter does not support
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// Template marker that cannot be interpreted
    #[error("Malformed template marker: {0}")]
    MalformedMarker(String),

    /// No image is available for a source
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// The fetch limiter was shut down while a resolution was waiting
    #[error("Fetch limiter closed")]
    LimiterClosed,
}

/// Result type for docxmark operations
pub type Result<T> = std::result::Result<T, DocxError>;
