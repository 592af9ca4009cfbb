//! Image pass over a rendered package (post-process)
//!
//! After the template engine has run, picture placeholders in
//! `word/document.xml` carry `$docxImage{...}$` in their hyperlink tooltip.
//! [`ImagePass::run`] resolves all of them concurrently and mutates the package:
//!
//! - the document text gets each resolved `<w:drawing>` substituted in place
//! - `word/_rels/document.xml.rels` gains one image relationship per picture
//! - `word/media/imageDocx<N>.<ext>` parts are appended
//! - `[Content_Types].xml` declares `png` and any other extension written
//!
//! Drawing blocks are located once, in document order. Resolutions may
//! finish in any order; each result stays bound to the span it was cut from.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::config::ImageSettings;
use crate::content_types::{content_type_for_extension, ensure_default, CONTENT_TYPES_PATH};
use crate::drawing::drawing_regions;
use crate::error::{DocxError, Result};
use crate::fetch::{HttpFetcher, ImageFetcher};
use crate::metrics::FALLBACK_EXTENSION;
use crate::package::{Package, Part, DOCUMENT_PATH, DOCUMENT_RELS_PATH};
use crate::relationships::Relationships;
use crate::resolver::{ImageResolver, ImageWarning, Resolution};

/// Summary of one image pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReport {
    /// Fragments replaced with a picture
    pub resolved: usize,
    /// Drawing blocks that were not image placeholders
    pub untouched: usize,
    /// Images replaced by the fallback picture
    pub warnings: Vec<ImageWarning>,
}

/// Coordinator of the image pass
///
/// Owns the fetch limiter shared by every resolution of a run.
pub struct ImagePass {
    fetcher: Arc<dyn ImageFetcher>,
    limiter: Arc<Semaphore>,
}

impl ImagePass {
    /// Create a pass using `fetcher` for remote images
    pub fn new(fetcher: Arc<dyn ImageFetcher>, settings: &ImageSettings) -> Self {
        Self {
            fetcher,
            limiter: Arc::new(Semaphore::new(settings.max_concurrent_fetches.max(1))),
        }
    }

    /// Create a pass fetching over HTTP
    pub fn with_http(settings: &ImageSettings) -> Result<Self> {
        let fetcher = HttpFetcher::from_settings(settings)?;
        Ok(Self::new(Arc::new(fetcher), settings))
    }

    /// Fetch permits currently free
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Resolve every image placeholder of the main document part
    pub async fn run(&self, package: &mut Package) -> Result<ImageReport> {
        ensure_default(
            package.xml_mut(CONTENT_TYPES_PATH)?,
            FALLBACK_EXTENSION,
            content_type_for_extension(FALLBACK_EXTENSION),
        )?;

        let relationships = match package.get(DOCUMENT_RELS_PATH) {
            Some(part) => Relationships::parse(&part.to_bytes())?,
            None => Relationships::new(),
        };
        let text = package
            .get(DOCUMENT_PATH)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PATH.to_string()))?
            .as_text()
            .into_owned();

        let regions = drawing_regions(&text);
        log::debug!("Found {} drawing blocks in {}", regions.len(), DOCUMENT_PATH);

        let taken: Vec<String> = package.parts().map(|part| part.path().to_string()).collect();
        let resolver = ImageResolver::new(self.fetcher.clone(), self.limiter.clone(), relationships)
            .with_taken_paths(taken);
        let outcomes = join_all(
            regions
                .iter()
                .map(|region| resolver.resolve(&text[region.clone()])),
        )
        .await;

        let mut report = ImageReport::default();
        let mut rewritten = String::with_capacity(text.len());
        let mut cursor = 0;
        for (region, outcome) in regions.iter().zip(outcomes) {
            rewritten.push_str(&text[cursor..region.start]);
            match outcome? {
                Resolution::Resolved(xml) => {
                    report.resolved += 1;
                    rewritten.push_str(&xml);
                }
                Resolution::Untouched => {
                    report.untouched += 1;
                    rewritten.push_str(&text[region.clone()]);
                }
            }
            cursor = region.end;
        }
        rewritten.push_str(&text[cursor..]);

        let (relationships, media, warnings) = resolver.into_parts();
        report.warnings = warnings;

        if media.is_empty() {
            return Ok(report);
        }
        if let Some(part) = media.iter().find(|m| package.contains(&m.path)) {
            return Err(DocxError::DuplicatePart(part.path.clone()));
        }

        package.require_mut(DOCUMENT_PATH)?.set_text(rewritten);
        match package.get_mut(DOCUMENT_RELS_PATH) {
            Some(part) => part.set_text(relationships.to_xml()),
            None => package.push(Part::text(DOCUMENT_RELS_PATH, relationships.to_xml()))?,
        }

        let extensions: BTreeSet<String> = media.iter().map(|m| m.extension.to_ascii_lowercase()).collect();
        let content_types = package.xml_mut(CONTENT_TYPES_PATH)?;
        for ext in &extensions {
            ensure_default(content_types, ext, content_type_for_extension(ext))?;
        }

        for part in media {
            package.push(Part::binary(part.path, part.bytes))?;
        }

        Ok(report)
    }
}

/// Resolve the images of `package` with the given fetcher and settings
pub async fn resolve_images(
    package: &mut Package,
    fetcher: Arc<dyn ImageFetcher>,
    settings: &ImageSettings,
) -> Result<ImageReport> {
    ImagePass::new(fetcher, settings).run(package).await
}
