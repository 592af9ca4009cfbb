//! # docxmark
//!
//! Template-marker rewriting for DOCX packages.
//!
//! This crate provides the two passes that surround a text template engine:
//! - Pre-process: hoist `{{#docxTable ...}}` / `{{/docxTable}}` markers typed
//!   into table cells out to the row level, so the engine can repeat rows
//! - Post-process: resolve `$docxImage{...}$` markers left in picture tooltips
//!   into embedded images, fetching remote sources concurrently
//!
//! ## Example
//!
//! ```no_run
//! use docxmark::{preprocess, ImagePass, Package, Settings};
//!
//! # async fn run() -> docxmark::Result<()> {
//! let settings = Settings::default();
//!
//! let mut template = Package::open("template.docx")?;
//! preprocess(&mut template)?;
//! // ... render the template ...
//!
//! let mut rendered = Package::open("rendered.docx")?;
//! let report = ImagePass::with_http(&settings.images)?.run(&mut rendered).await?;
//! for warning in &report.warnings {
//!     eprintln!("{}: {}", warning.src, warning.message);
//! }
//! rendered.write_to_file("output.docx")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content_types;
pub mod descriptor;
pub mod drawing;
pub mod error;
pub mod fetch;
pub mod markers;
pub mod metrics;
pub mod package;
pub mod postprocess;
pub mod relationships;
pub mod resolver;
pub mod table;
pub mod units;
pub mod xml;

#[cfg(test)]
mod test_utils;

pub use config::{ImageSettings, Settings};
pub use descriptor::ImageDescriptor;
pub use drawing::DrawingFragment;
pub use error::{DocxError, Result};
pub use fetch::{FetchedImage, HttpFetcher, ImageFetcher, MemoryFetcher};
pub use package::{Package, Part, PartContent};
pub use postprocess::{resolve_images, ImagePass, ImageReport};
pub use relationships::{Relationship, Relationships};
pub use resolver::{ImageResolver, ImageWarning, Resolution};
pub use table::{preprocess, rewrite_table_markers, ScanState, TableRegionRewriter};
pub use units::{cm_to_emu, px_to_emu, Length, LengthUnit};
pub use xml::{NodeId, XmlTree};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
