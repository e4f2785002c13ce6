//! Markdown preview rendering
//!
//! [`PreviewRenderer`] turns document text into sanitized HTML, a fixed
//! placeholder for blank text, or an inline error block. [`PreviewPane`] holds
//! the last render together with the load state of its images.

use super::dom::{self, Fragment};
use super::engine::{MarkdownEngine, Sanitizer};
use super::image::{ImageSlot, ImageState};
use crate::utils::text::escape_html;
use std::sync::Arc;

/// An image reference found in rendered HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

/// Result of rendering document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedPreview {
    /// Blank document
    Placeholder(String),

    /// Sanitized document HTML and its images in document order
    Document { html: String, images: Vec<ImageRef> },

    /// The parser failed; `html` is the inline error block
    Error { html: String, message: String },
}

impl RenderedPreview {
    pub fn html(&self) -> &str {
        match self {
            RenderedPreview::Placeholder(html) => html,
            RenderedPreview::Document { html, .. } => html,
            RenderedPreview::Error { html, .. } => html,
        }
    }

    pub fn images(&self) -> &[ImageRef] {
        match self {
            RenderedPreview::Document { images, .. } => images,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderedPreview::Error { .. })
    }
}

impl Default for RenderedPreview {
    fn default() -> Self {
        RenderedPreview::Placeholder(placeholder_html(crate::config::EMPTY_PREVIEW_TEXT))
    }
}

fn placeholder_html(text: &str) -> String {
    format!("<p class=\"preview-placeholder\">{}</p>", escape_html(text))
}

fn error_html(message: &str) -> String {
    format!(
        "<div class=\"preview-error\"><strong>Error rendering Markdown:</strong> {}</div>",
        escape_html(message)
    )
}

/// Text to sanitized HTML
pub struct PreviewRenderer {
    engine: Arc<dyn MarkdownEngine>,
    sanitizer: Sanitizer,
    placeholder: String,
}

impl PreviewRenderer {
    pub fn new(engine: Arc<dyn MarkdownEngine>, placeholder: impl Into<String>) -> Self {
        Self {
            engine,
            sanitizer: Sanitizer::new(),
            placeholder: placeholder.into(),
        }
    }

    /// Render `text`; never fails
    pub fn render(&self, text: &str) -> RenderedPreview {
        if text.trim().is_empty() {
            return RenderedPreview::Placeholder(placeholder_html(&self.placeholder));
        }

        match self.engine.to_html(text) {
            Ok(raw) => {
                let html = self.sanitizer.clean(&raw);
                let images = collect_images(&html);
                log::debug!("Rendered {} bytes of HTML, {} image(s)", html.len(), images.len());
                RenderedPreview::Document { html, images }
            }
            Err(e) => {
                log::warn!("Preview render failed: {}", e);
                let message = e.to_string();
                RenderedPreview::Error {
                    html: error_html(&message),
                    message,
                }
            }
        }
    }
}

fn collect_images(html: &str) -> Vec<ImageRef> {
    if !html.contains("<img") {
        return Vec::new();
    }
    Fragment::parse(html)
        .elements("img")
        .iter()
        .map(|img| ImageRef {
            src: dom::attr(img, "src").unwrap_or_default(),
            alt: dom::attr(img, "alt").unwrap_or_default(),
        })
        .collect()
}

/// The display region: last render plus per-image state
#[derive(Debug, Default)]
pub struct PreviewPane {
    content: RenderedPreview,
    images: Vec<ImageSlot>,
    cycle: u64,
}

impl PreviewPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content wholesale and start a new render cycle
    pub fn show(&mut self, rendered: RenderedPreview) -> u64 {
        self.cycle += 1;
        self.images = rendered
            .images()
            .iter()
            .map(|image| ImageSlot::pending(image.src.clone(), image.alt.clone()))
            .collect();
        self.content = rendered;
        self.cycle
    }

    /// Record the outcome for image `index` of render `cycle`
    ///
    /// Returns false for superseded cycles, unknown indices and images that
    /// have already settled.
    pub fn apply_image(&mut self, cycle: u64, index: usize, state: ImageState) -> bool {
        if cycle != self.cycle {
            log::debug!("Dropping image result from stale render cycle {}", cycle);
            return false;
        }
        match self.images.get_mut(index) {
            Some(slot) if slot.state == ImageState::Pending => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }

    pub fn content(&self) -> &RenderedPreview {
        &self.content
    }

    /// Sanitized HTML of the last render, without image decoration
    pub fn rendered_html(&self) -> &str {
        self.content.html()
    }

    pub fn images(&self) -> &[ImageSlot] {
        &self.images
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Whether every image has loaded or fallen back
    pub fn images_settled(&self) -> bool {
        self.images.iter().all(|slot| slot.state.is_settled())
    }

    /// HTML as displayed: images carry their load state, failed ones are
    /// replaced by a placeholder naming the original reference
    pub fn display_html(&self) -> String {
        let html = self.content.html();
        if self.images.is_empty() {
            return html.to_string();
        }

        let fragment = Fragment::parse(html);
        for (node, slot) in fragment.elements("img").iter().zip(&self.images) {
            match slot.state {
                ImageState::Pending => dom::add_class(node, "image-pending"),
                ImageState::Loaded => dom::add_class(node, "image-loaded"),
                ImageState::Fallback => {
                    let text = format!("Image not available: {}", slot.src);
                    let placeholder = dom::new_element(
                        "span",
                        &[("class", "image-fallback"), ("title", slot.alt.as_str())],
                        &text,
                    );
                    dom::replace(node, placeholder);
                }
            }
        }

        match fragment.to_html() {
            Ok(decorated) => decorated,
            Err(e) => {
                log::warn!("Could not decorate preview images: {}", e);
                html.to_string()
            }
        }
    }
}
