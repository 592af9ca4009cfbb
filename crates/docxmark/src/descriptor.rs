//! Image descriptors carried by image markers
//!
//! The payload of `$docxImage<JSON>$` decodes to:
//!
//! ```json
//! { "src": "data:image/png;base64,...", "width": "5cm", "height": "120px", "usePlaceholderSize": false }
//! ```
//!
//! `width` and `height` only count when they are strings in the
//! `<number>cm` / `<number>px` form; any other value is treated as absent.

use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::units::Length;

/// Where and how big an image should be
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    /// Data URI or remote URL
    pub src: String,
    /// Requested width
    #[serde(default, deserialize_with = "lenient_length")]
    pub width: Option<Length>,
    /// Requested height
    #[serde(default, deserialize_with = "lenient_length")]
    pub height: Option<Length>,
    /// Keep the size of the placeholder picture
    #[serde(default)]
    pub use_placeholder_size: bool,
}

impl ImageDescriptor {
    /// Decode a marker payload
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Check if the source is an inline data URI
    pub fn is_data_uri(&self) -> bool {
        self.src.starts_with("data:")
    }
}

fn lenient_length<'de, D>(deserializer: D) -> std::result::Result<Option<Length>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(Length::parse))
}
