//! Image resolution for a single drawing fragment
//!
//! [`ImageResolver::resolve`] turns one placeholder `<w:drawing>` into a real
//! picture: it decodes the descriptor from the tooltip, obtains the bytes,
//! allocates a relationship and a media part, and rewrites the fragment's size
//! and binary reference.
//!
//! Many resolutions run concurrently against one resolver. Remote fetches pass
//! through a shared [`Semaphore`] owned by the caller. The relationships and
//! the list of new media parts are shared state; allocating an id and recording
//! the media part happen together under one lock so no two resolutions can
//! compute the same id.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::descriptor::ImageDescriptor;
use crate::drawing::{DrawingFragment, EXTENT_ELEMENT};
use crate::error::{DocxError, Result};
use crate::fetch::{abbreviate, decode_data_uri, fetched_image_data, ImageData, ImageFetcher};
use crate::metrics::{image_dimensions, FALLBACK_EXTENSION, FALLBACK_PNG};
use crate::relationships::Relationships;
use crate::units::px_to_emu;

/// Media part produced by a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    /// Package path (e.g., `word/media/imageDocx1.png`)
    pub path: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// An image that was replaced by the fallback picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWarning {
    /// Image source, abbreviated
    pub src: String,
    pub message: String,
}

/// Outcome of resolving one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not an image placeholder; keep the original text
    Untouched,
    /// Replacement text for the fragment
    Resolved(String),
}

/// Shared state of one image pass
pub struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    limiter: Arc<Semaphore>,
    relationships: Mutex<Relationships>,
    taken_paths: HashSet<String>,
    media: Mutex<Vec<MediaPart>>,
    warnings: Mutex<Vec<ImageWarning>>,
}

impl ImageResolver {
    /// Create a resolver appending to `relationships`
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        limiter: Arc<Semaphore>,
        relationships: Relationships,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            relationships: Mutex::new(relationships),
            taken_paths: HashSet::new(),
            media: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Part paths already present in the package; media files never reuse them
    pub fn with_taken_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.taken_paths = paths.into_iter().collect();
        self
    }

    /// Resolve one `<w:drawing>` fragment
    ///
    /// Failures fetching or reading a remote image are recovered with the
    /// fallback picture. Data URIs are embedded as given; their header is only
    /// read when the size depends on it, and an unreadable one is an error, as
    /// are a malformed descriptor and a fragment missing its blip or size nodes.
    pub async fn resolve(&self, fragment: &str) -> Result<Resolution> {
        let mut drawing = DrawingFragment::parse(fragment)?;
        let Some(descriptor) = drawing.take_image_descriptor()? else {
            return Ok(Resolution::Untouched);
        };

        let (data, natural) = if descriptor.is_data_uri() {
            let data = decode_data_uri(&descriptor.src)?;
            let natural = if needs_natural_size(&descriptor) {
                Some(image_dimensions(&data.bytes)?)
            } else {
                None
            };
            (data, natural)
        } else {
            let data = self.fetch(&descriptor.src).await?;
            let (data, natural) = self.validate(&descriptor.src, data);
            (data, Some(natural))
        };

        let rel_id = {
            let mut relationships = self.relationships.lock();
            let rel = relationships.add_image_where(&data.extension, |path| !self.taken_paths.contains(path));
            self.media.lock().push(MediaPart {
                path: rel.part_path(),
                extension: data.extension,
                bytes: data.bytes,
            });
            rel.id
        };

        let (cx, cy) = final_size(&descriptor, natural, drawing.placeholder_size())?;
        drawing.set_embed(&rel_id)?;
        drawing.set_size(cx, cy)?;

        log::debug!("Resolved image {} as {}", abbreviate(&descriptor.src), rel_id);
        Ok(Resolution::Resolved(drawing.to_xml_string()))
    }

    async fn fetch(&self, src: &str) -> Result<ImageData> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| DocxError::LimiterClosed)?;

        match self.fetcher.fetch(src).await {
            Ok(fetched) => Ok(fetched_image_data(fetched)),
            Err(err) => {
                self.warn(src, &err);
                Ok(fallback_image())
            }
        }
    }

    fn validate(&self, src: &str, data: ImageData) -> (ImageData, (u32, u32)) {
        match image_dimensions(&data.bytes) {
            Ok(dims) => (data, dims),
            Err(err) => {
                self.warn(src, &err);
                (fallback_image(), (1, 1))
            }
        }
    }

    fn warn(&self, src: &str, err: &DocxError) {
        let src = abbreviate(src);
        log::warn!("Image from {} failed: {}; using fallback image", src, err);
        self.warnings.lock().push(ImageWarning {
            src,
            message: err.to_string(),
        });
    }

    /// Current number of relationship entries
    pub fn relationship_count(&self) -> usize {
        self.relationships.lock().len()
    }

    /// Consume the resolver, returning the updated relationships, the new
    /// media parts in allocation order and the recovered failures
    pub fn into_parts(self) -> (Relationships, Vec<MediaPart>, Vec<ImageWarning>) {
        (
            self.relationships.into_inner(),
            self.media.into_inner(),
            self.warnings.into_inner(),
        )
    }
}

fn fallback_image() -> ImageData {
    ImageData {
        bytes: FALLBACK_PNG.to_vec(),
        extension: FALLBACK_EXTENSION.to_string(),
    }
}

/// Whether [`final_size`] reads the natural pixel size for `descriptor`
pub fn needs_natural_size(descriptor: &ImageDescriptor) -> bool {
    match (descriptor.width, descriptor.height) {
        (Some(_), Some(_)) => false,
        (None, None) => !descriptor.use_placeholder_size,
        _ => true,
    }
}

/// Final `(cx, cy)` in EMUs
///
/// Explicit lengths win. With a single explicit length the other side follows
/// the natural aspect ratio. Without any, `usePlaceholderSize` keeps the
/// placeholder's extent, otherwise the natural pixel size is used. `natural`
/// may be `None` whenever [`needs_natural_size`] is false.
pub fn final_size(
    descriptor: &ImageDescriptor,
    natural: Option<(u32, u32)>,
    placeholder: Option<(i64, i64)>,
) -> Result<(i64, i64)> {
    if let (Some(width), Some(height)) = (descriptor.width, descriptor.height) {
        return Ok((width.to_emu(), height.to_emu()));
    }
    if descriptor.width.is_none() && descriptor.height.is_none() && descriptor.use_placeholder_size {
        return placeholder.ok_or_else(|| DocxError::MissingNode(EXTENT_ELEMENT.to_string()));
    }

    let (natural_w, natural_h) = natural
        .map(|(w, h)| (f64::from(w), f64::from(h)))
        .ok_or_else(|| DocxError::InvalidStructure("natural image size unavailable".to_string()))?;
    match (descriptor.width, descriptor.height) {
        (Some(width), _) => {
            let cx = width.to_emu();
            Ok((cx, scale(cx, natural_h, natural_w)))
        }
        (None, Some(height)) => {
            let cy = height.to_emu();
            Ok((scale(cy, natural_w, natural_h), cy))
        }
        (None, None) => Ok((px_to_emu(natural_w), px_to_emu(natural_h))),
    }
}

/// `given * numerator / denominator`, rounded; a zero denominator keeps `given`
fn scale(given: i64, numerator: f64, denominator: f64) -> i64 {
    if denominator == 0.0 {
        return given;
    }
    (given as f64 * numerator / denominator).round() as i64
}
