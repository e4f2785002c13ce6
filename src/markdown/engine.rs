//! Markdown to HTML conversion
//!
//! Parsing is delegated to pulldown-cmark and sanitizing to ammonia. The
//! [`MarkdownEngine`] trait is the seam the preview renderer talks to, so a
//! different parser (or a failing one in tests) can be dropped in.

use crate::config::MAX_RENDER_SIZE;
use crate::error::{RenderError, RenderResult};
use pulldown_cmark::{html, Event, Options, Parser};
use std::panic::{self, AssertUnwindSafe};

/// Converts Markdown text to (unsanitized) HTML
pub trait MarkdownEngine: Send + Sync {
    fn to_html(&self, markdown: &str) -> RenderResult<String>;
}

/// pulldown-cmark backed engine
///
/// GitHub-flavoured extensions and tables are on, and single newlines are
/// rendered as hard line breaks.
#[derive(Debug, Clone)]
pub struct CmarkEngine {
    options: Options,
    max_bytes: usize,
}

impl CmarkEngine {
    pub fn new() -> Self {
        Self::with_limit(MAX_RENDER_SIZE)
    }

    /// Engine refusing documents larger than `max_bytes`
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            options: parser_options(),
            max_bytes,
        }
    }
}

/// Extensions enabled for every parse of document text
pub(crate) fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_GFM);
    options
}

impl Default for CmarkEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownEngine for CmarkEngine {
    fn to_html(&self, markdown: &str) -> RenderResult<String> {
        if markdown.len() > self.max_bytes {
            return Err(RenderError::TooLarge {
                size: markdown.len(),
                max_size: self.max_bytes,
            });
        }

        let options = self.options;
        panic::catch_unwind(AssertUnwindSafe(|| {
            let parser = Parser::new_ext(markdown, options).map(|event| match event {
                Event::SoftBreak => Event::HardBreak,
                other => other,
            });
            let mut out = String::with_capacity(markdown.len() * 3 / 2);
            html::push_html(&mut out, parser);
            out
        }))
        .map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown parser failure".to_string());
            RenderError::Parser(reason)
        })
    }
}

/// Strips script-capable constructs from rendered HTML
pub struct Sanitizer {
    builder: ammonia::Builder<'static>,
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .add_tags(&["input"])
            .add_tag_attributes("input", &["type", "checked", "disabled"])
            .add_generic_attributes(&["class", "align"]);
        Self { builder }
    }

    /// Clean `html`; the output is stable under repeated cleaning
    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_rendering() {
        let html = CmarkEngine::new().to_html("# Title\n\nSome *text*").unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_single_newline_is_hard_break() {
        let html = CmarkEngine::new().to_html("one\ntwo").unwrap();
        assert!(html.contains("one<br />"));
    }

    #[test]
    fn test_gfm_extensions() {
        let engine = CmarkEngine::new();
        let html = engine
            .to_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done")
            .unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn test_size_limit() {
        let engine = CmarkEngine::with_limit(4);
        assert!(matches!(
            engine.to_html("too long"),
            Err(RenderError::TooLarge { size: 8, max_size: 4 })
        ));
    }

    #[test]
    fn test_sanitizer_strips_script() {
        let sanitizer = Sanitizer::new();
        let clean = sanitizer.clean(r#"<p onclick="x()">hi</p><script>alert(1)</script><a href="javascript:alert(1)">l</a>"#);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("javascript:"));
        assert!(clean.contains("<p>hi</p>"));
    }

    #[test]
    fn test_sanitizer_keeps_markdown_output() {
        let sanitizer = Sanitizer::new();
        let html = CmarkEngine::new()
            .to_html("```rust\nfn main() {}\n```\n\n- [ ] todo\n\n![cat](cat.png)")
            .unwrap();
        let clean = sanitizer.clean(&html);
        assert!(clean.contains(r#"class="language-rust""#));
        assert!(clean.contains(r#"type="checkbox""#));
        assert!(clean.contains(r#"src="cat.png""#));
    }

    #[test]
    fn test_sanitizer_idempotent() {
        let sanitizer = Sanitizer::new();
        let once = sanitizer.clean("<p>a <b>b</b><img src=x onerror=y></p>");
        assert_eq!(sanitizer.clean(&once), once);
    }
}
