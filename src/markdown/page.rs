//! Standalone HTML page around a preview fragment
//!
//! Used by the `preview` and `watch` commands to write something a browser
//! can open directly. The stylesheet covers the preview decorations (image
//! load state, fallback placeholder, error block) and carries print rules so
//! printing the page paginates like the PDF export.

use crate::utils::text::escape_html;

/// Options for the generated page
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    /// Selectors that must not be split across printed pages
    pub avoid_break_selectors: Vec<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Document".to_string(),
            avoid_break_selectors: crate::config::ExportConfig::default().avoid_break_selectors,
        }
    }
}

/// Wrap `body_html` in a complete HTML document
pub fn standalone_page(body_html: &str, options: &PageOptions) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="mdpress {version}">
    <title>{title}</title>
    {styles}
</head>
<body>
    <article class="markdown-body">
{body}
    </article>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
        title = escape_html(&options.title),
        styles = styles(&options.avoid_break_selectors),
        body = body_html,
    )
}

const THEME: &str = r#":root {
            --color-bg: #ffffff;
            --color-text: #24292e;
            --color-link: #0366d6;
            --color-code-bg: #f6f8fa;
            --color-border: #e1e4e8;
            --color-muted: #6a737d;
            --color-error-bg: #ffebe9;
            --color-error: #cf222e;
        }"#;

fn styles(avoid_break: &[String]) -> String {
    let avoid_inside = if avoid_break.is_empty() {
        String::new()
    } else {
        format!("{} {{ page-break-inside: avoid; break-inside: avoid; }}", avoid_break.join(", "))
    };

    format!(
        r#"<style>
        {theme}

        * {{ box-sizing: border-box; }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            font-size: 16px;
            line-height: 1.6;
            color: var(--color-text);
            background-color: var(--color-bg);
            max-width: 900px;
            margin: 0 auto;
            padding: 2rem;
        }}

        .markdown-body h1, .markdown-body h2 {{ border-bottom: 1px solid var(--color-border); padding-bottom: .3em; }}
        .markdown-body a {{ color: var(--color-link); }}
        .markdown-body code {{
            background-color: var(--color-code-bg);
            padding: .2em .4em;
            border-radius: 6px;
            font-size: 85%;
            font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
        }}
        .markdown-body pre {{ background-color: var(--color-code-bg); padding: 16px; overflow: auto; border-radius: 6px; }}
        .markdown-body pre code {{ background: transparent; padding: 0; font-size: 100%; }}
        .markdown-body blockquote {{ margin: 16px 0; padding: 0 1em; color: var(--color-muted); border-left: .25em solid var(--color-border); }}
        .markdown-body table {{ border-collapse: collapse; width: 100%; }}
        .markdown-body th, .markdown-body td {{ padding: 6px 13px; border: 1px solid var(--color-border); }}
        .markdown-body img {{ max-width: 100%; height: auto; transition: opacity .2s; }}
        .markdown-body hr {{ border: 0; border-top: 1px solid var(--color-border); }}

        .preview-placeholder {{ color: var(--color-muted); font-style: italic; }}
        .image-pending {{ opacity: .5; }}
        .image-loaded {{ opacity: 1; }}
        .image-fallback {{
            display: inline-block;
            padding: 8px 12px;
            border: 1px dashed var(--color-border);
            color: var(--color-muted);
            font-size: 90%;
        }}
        .preview-error {{
            padding: 12px 16px;
            border-radius: 6px;
            background-color: var(--color-error-bg);
            color: var(--color-error);
        }}

        @media print {{
            body {{ max-width: none; padding: 1cm; }}
            h1, h2, h3, h4, h5, h6 {{ page-break-after: avoid; break-after: avoid; }}
            {avoid_inside}
        }}
    </style>"#,
        theme = THEME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_wraps_body() {
        let options = PageOptions {
            title: "Notes <draft>".to_string(),
            ..Default::default()
        };
        let page = standalone_page("<h1>Hi</h1>", &options);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Notes &lt;draft&gt;</title>"));
        assert!(page.contains("<h1>Hi</h1>"));
        assert!(page.contains(".image-pending { opacity: .5; }"));
    }

    #[test]
    fn test_print_rules_follow_selectors() {
        let options = PageOptions {
            avoid_break_selectors: vec!["p".to_string(), "tr".to_string()],
            ..Default::default()
        };
        let page = standalone_page("", &options);
        assert!(page.contains("p, tr { page-break-inside: avoid; break-inside: avoid; }"));

        let none = PageOptions {
            avoid_break_selectors: Vec::new(),
            ..Default::default()
        };
        assert!(!standalone_page("", &none).contains("page-break-inside"));
    }
}
