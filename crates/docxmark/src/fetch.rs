//! Obtaining image bytes
//!
//! Image sources are either inline data URIs, decoded here directly, or remote
//! URLs fetched through an [`ImageFetcher`]. [`HttpFetcher`] is the `reqwest`
//! implementation and [`MemoryFetcher`] serves a fixed set of images; embedders
//! can supply their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::ImageSettings;
use crate::error::{DocxError, Result};

/// Body and declared type of a fetched image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Response body
    pub bytes: Vec<u8>,
    /// `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
}

/// Source of remote image bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource at `url` as binary
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

/// Fetches images over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self> {
        Self::from_settings(&ImageSettings::default())
    }

    /// Create a fetcher honoring timeout and user agent settings
    pub fn from_settings(settings: &ImageSettings) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(settings.fetch_timeout_secs));
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Serves images held in memory, keyed by URL
///
/// Unknown URLs fail with [`DocxError::ImageNotFound`], which the image pass
/// recovers like any other fetch error.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    images: HashMap<String, FetchedImage>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `url`
    pub fn with_image(mut self, url: impl Into<String>, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.insert(
            url,
            FetchedImage {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    /// Register an image, returning the one it replaces
    pub fn insert(&mut self, url: impl Into<String>, image: FetchedImage) -> Option<FetchedImage> {
        self.images.insert(url.into(), image)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[async_trait]
impl ImageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| DocxError::ImageNotFound(abbreviate(url)))
    }
}

/// Bytes and file extension of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub extension: String,
}

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

/// Standard alphabet, padding optional
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// URL-safe alphabet (`-`, `_`), padding optional
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decode a `data:<media-type>;base64,<payload>` URI
///
/// Padding is optional and the URL-safe alphabet is accepted too.
pub fn decode_data_uri(src: &str) -> Result<ImageData> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| DocxError::MalformedMarker(format!("not a data URI: {}", abbreviate(src))))?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| {
        DocxError::MalformedMarker(format!("data URI without payload: {}", abbreviate(src)))
    })?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DocxError::MalformedMarker(format!(
            "only base64 data URIs are supported: {}",
            abbreviate(src)
        )));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = match STANDARD_LENIENT.decode(&payload) {
        Ok(bytes) => bytes,
        Err(err) => URL_SAFE_LENIENT.decode(&payload).map_err(|_| err)?,
    };
    let extension = extension_for_media_type(media_type).unwrap_or_else(|| "png".to_string());

    Ok(ImageData { bytes, extension })
}

/// Turn a fetched response into image data
///
/// The extension comes from the declared content type; without one the
/// format is guessed from the bytes, then defaults to `png`.
pub fn fetched_image_data(fetched: FetchedImage) -> ImageData {
    let extension = fetched
        .content_type
        .as_deref()
        .and_then(extension_for_media_type)
        .or_else(|| {
            image::guess_format(&fetched.bytes)
                .ok()
                .and_then(|f| f.extensions_str().first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "png".to_string());

    ImageData {
        bytes: fetched.bytes,
        extension,
    }
}

/// File extension for a media type (`image/jpeg` -> `jpeg`, `image/svg+xml` -> `svg`)
pub fn extension_for_media_type(media_type: &str) -> Option<String> {
    let essence = media_type.split(';').next()?.trim();
    let subtype = essence.split('/').nth(1)?;
    let subtype = subtype.split('+').next()?.trim();
    if subtype.is_empty() {
        None
    } else {
        Some(subtype.to_ascii_lowercase())
    }
}

pub(crate) fn abbreviate(src: &str) -> String {
    const LIMIT: usize = 64;
    match src.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &src[..idx]),
        None => src.to_string(),
    }
}
