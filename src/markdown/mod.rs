//! Markdown module for mdpress
//!
//! Handles the preview-and-export pipeline:
//! - Markdown to sanitized HTML
//! - Preview pane with per-image load state
//! - Image resolution with retry and fallback
//! - Export snapshot and PDF rendering
//! - Standalone HTML pages

pub mod dom;
pub mod engine;
pub mod export;
pub mod image;
pub mod page;
pub mod pdf;
pub mod preview;

pub use engine::{CmarkEngine, MarkdownEngine, Sanitizer};
pub use export::{export_filename, first_heading, snapshot, ExportOptions, Snapshot};
pub use image::{
    HttpImageFetcher, ImageFetcher, ImageRequest, ImageResolver, ImageSlot, ImageState, RetryPolicy,
};
pub use page::{standalone_page, PageOptions};
pub use pdf::{DocumentRenderer, PdfRenderer};
pub use preview::{PreviewPane, PreviewRenderer, RenderedPreview};
