//! Natural image dimensions
//!
//! Dimensions are read from the image header with the `image` crate; the pixel
//! data is never decoded. Remote bytes that are not a recognizable image are
//! replaced by [`FALLBACK_PNG`], a transparent 1x1 PNG.

use std::io::Cursor;

use image::ImageReader;

use crate::error::Result;

/// Transparent 1x1 PNG substituted for images that cannot be read
pub const FALLBACK_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0xf8, 0x5f,
    0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Extension of [`FALLBACK_PNG`]
pub const FALLBACK_EXTENSION: &str = "png";

/// Width and height in pixels
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
