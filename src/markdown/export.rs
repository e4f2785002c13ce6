//! Export snapshot of the rendered preview
//!
//! The export never reads the live preview pane. It takes the sanitized HTML
//! of the last render and turns it into a [`Snapshot`]: a flat list of
//! layout blocks with inline styled runs. On the way images become a neutral
//! text placeholder and embedded frames and objects are dropped. Each block
//! records whether it may be split across a page boundary.

use super::dom::{self, Fragment};
use super::engine::parser_options;
use crate::config::{ExportConfig, Orientation, PageFormat};
use crate::error::{ExportError, ExportResult};
use crate::utils::text::{collapse_whitespace, slugify};
use chrono::NaiveDate;
use markup5ever_rcdom::{Handle, NodeData};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// Elements removed from the snapshot entirely
const REMOVED_ELEMENTS: &[&str] = &["iframe", "frame", "frameset", "object", "embed", "script", "style"];

/// Options for one export, built fresh from the config each time
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Target file name, including extension
    pub filename: String,
    /// Margins in millimetres: top, right, bottom, left
    pub margins_mm: [f32; 4],
    pub page_format: PageFormat,
    pub orientation: Orientation,
    pub image_type: String,
    pub image_quality: f32,
    pub compress: bool,
    /// Tags whose blocks must not be split across pages
    pub avoid_break: Vec<String>,
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig, filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            margins_mm: config.margins_mm,
            page_format: config.page_format,
            orientation: config.orientation,
            image_type: config.image_type.clone(),
            image_quality: config.image_quality,
            compress: config.compress,
            avoid_break: config
                .avoid_break_selectors
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
        }
    }

    /// Page size in millimetres with orientation applied
    pub fn page_size_mm(&self) -> (f32, f32) {
        let (w, h) = self.page_format.size_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn avoids_break(&self, tag: &str) -> bool {
        self.avoid_break.iter().any(|s| s == tag)
    }
}

/// Text of the first non-empty level-one heading
///
/// Headings are found by parsing, so `#` lines inside code blocks do not count.
pub fn first_heading(text: &str) -> Option<String> {
    let mut heading: Option<String> = None;
    for event in Parser::new_ext(text, parser_options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => heading = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let title = heading.take().map(|h| collapse_whitespace(h.trim())).unwrap_or_default();
                if !title.is_empty() {
                    return Some(title);
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(h) = heading.as_mut() {
                    h.push(' ');
                }
            }
            _ => {}
        }
    }
    None
}

/// `{slug}-{YYYY-MM-DD}.pdf`, the slug taken from the first heading
pub fn export_filename(text: &str, date: NaiveDate, default_name: &str) -> String {
    let stem = first_heading(text)
        .map(|heading| slugify(&heading))
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| default_name.to_string());
    format!("{}-{}.pdf", stem, date.format("%Y-%m-%d"))
}

/// Inline styling of a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: bool,
    pub strike: bool,
}

/// Styled text; `\n` inside marks a forced line break
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem { marker: String },
    CodeBlock,
    Quote,
    TableRow { header: bool },
    Rule,
}

impl BlockKind {
    /// Tag the block came from, as matched against avoid-break selectors
    pub fn tag(&self) -> String {
        match self {
            BlockKind::Heading(level) => format!("h{}", level),
            BlockKind::Paragraph => "p".to_string(),
            BlockKind::ListItem { .. } => "li".to_string(),
            BlockKind::CodeBlock => "pre".to_string(),
            BlockKind::Quote => "blockquote".to_string(),
            BlockKind::TableRow { .. } => "tr".to_string(),
            BlockKind::Rule => "hr".to_string(),
        }
    }
}

/// One layout block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Inline content; empty for rules and table rows
    pub runs: Vec<Run>,
    /// Table cells, for table rows
    pub cells: Vec<Vec<Run>>,
    /// List nesting level
    pub depth: usize,
    /// Keep the block on a single page
    pub avoid_break: bool,
}

impl Block {
    fn new(kind: BlockKind, runs: Vec<Run>, depth: usize) -> Self {
        Self {
            kind,
            runs,
            cells: Vec::new(),
            depth,
            avoid_break: false,
        }
    }

    /// Concatenated text of the block
    pub fn text(&self) -> String {
        if self.cells.is_empty() {
            runs_text(&self.runs)
        } else {
            self.cells.iter().map(|c| runs_text(c)).collect::<Vec<_>>().join(" | ")
        }
    }
}

fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Flattened, print-ready copy of the preview
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Text of the first level-one heading
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Plain text of all blocks, one per line
    pub fn plain_text(&self) -> String {
        self.blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n")
    }
}

/// Take a print snapshot of rendered preview HTML
pub fn snapshot(html: &str, options: &ExportOptions) -> ExportResult<Snapshot> {
    let fragment = Fragment::parse(html);

    for image in fragment.elements("img") {
        let label = dom::attr(&image, "alt")
            .filter(|alt| !alt.trim().is_empty())
            .or_else(|| dom::attr(&image, "src"))
            .unwrap_or_default();
        let placeholder = dom::new_element("span", &[("class", "image-placeholder")], &format!("[Image: {}]", label));
        dom::replace(&image, placeholder);
    }
    for node in fragment.elements_in(REMOVED_ELEMENTS) {
        dom::remove(&node);
    }

    let mut walker = Walker::default();
    walker.blocks_of(fragment.root(), 0);

    let mut blocks = walker.blocks;
    for block in &mut blocks {
        block.avoid_break = options.avoids_break(&block.kind.tag());
    }

    if blocks.is_empty() {
        return Err(ExportError::Snapshot("the preview has no printable content".to_string()));
    }

    let title = blocks
        .iter()
        .find(|b| b.kind == BlockKind::Heading(1))
        .map(Block::text)
        .filter(|t| !t.is_empty());

    log::debug!("Snapshot has {} block(s)", blocks.len());
    Ok(Snapshot { title, blocks })
}

#[derive(Default)]
struct Walker {
    blocks: Vec<Block>,
}

impl Walker {
    /// Walk block-level children of `node`; stray inline content becomes paragraphs
    fn blocks_of(&mut self, node: &Handle, depth: usize) {
        let mut loose = Vec::new();
        for child in node.children.borrow().iter() {
            match dom::tag_name(child) {
                Some(tag) if is_block(&tag) => {
                    self.push(BlockKind::Paragraph, std::mem::take(&mut loose), depth);
                    self.block(child, &tag, depth);
                }
                _ => inline(child, RunStyle::default(), &mut loose),
            }
        }
        self.push(BlockKind::Paragraph, loose, depth);
    }

    fn block(&mut self, node: &Handle, tag: &str, depth: usize) {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                self.push(BlockKind::Heading(level), inline_children(node), depth);
            }
            "p" => self.push(BlockKind::Paragraph, inline_children(node), depth),
            "ul" | "ol" => self.list(node, tag == "ol", depth),
            "li" => self.list_item(node, "\u{2022}".to_string(), depth),
            "pre" => {
                let text = dom::text_content(node);
                let text = text.strip_suffix('\n').unwrap_or(&text).to_string();
                let style = RunStyle {
                    code: true,
                    ..Default::default()
                };
                let block = Block::new(BlockKind::CodeBlock, vec![Run { text, style }], depth);
                self.blocks.push(block);
            }
            "blockquote" => self.push(BlockKind::Quote, inline_children(node), depth),
            "table" => self.table(node, depth),
            "hr" => self.blocks.push(Block::new(BlockKind::Rule, Vec::new(), depth)),
            _ => self.blocks_of(node, depth),
        }
    }

    fn list(&mut self, node: &Handle, ordered: bool, depth: usize) {
        let start: usize = dom::attr(node, "start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let items: Vec<Handle> = node
            .children
            .borrow()
            .iter()
            .filter(|c| dom::tag_name(c).as_deref() == Some("li"))
            .cloned()
            .collect();
        for (i, item) in items.iter().enumerate() {
            let marker = if ordered {
                format!("{}.", start + i)
            } else {
                "\u{2022}".to_string()
            };
            self.list_item(item, marker, depth);
        }
    }

    fn list_item(&mut self, node: &Handle, marker: String, depth: usize) {
        let mut runs = Vec::new();
        let mut nested = Vec::new();
        for child in node.children.borrow().iter() {
            match dom::tag_name(child).as_deref() {
                Some("ul") | Some("ol") => nested.push(child.clone()),
                _ => inline(child, RunStyle::default(), &mut runs),
            }
        }

        let runs = trim_runs(runs);
        self.blocks.push(Block::new(BlockKind::ListItem { marker }, runs, depth));

        for list in nested {
            let ordered = dom::tag_name(&list).as_deref() == Some("ol");
            self.list(&list, ordered, depth + 1);
        }
    }

    fn table(&mut self, node: &Handle, depth: usize) {
        for row in rows_of(node) {
            let mut header = parent_tag(&row).as_deref() == Some("thead");
            let mut cells = Vec::new();
            for cell in row.children.borrow().iter() {
                match dom::tag_name(cell).as_deref() {
                    Some("th") => {
                        header = true;
                        cells.push(trim_runs(inline_children(cell)));
                    }
                    Some("td") => cells.push(trim_runs(inline_children(cell))),
                    _ => {}
                }
            }
            if cells.is_empty() {
                continue;
            }
            let mut block = Block::new(BlockKind::TableRow { header }, Vec::new(), depth);
            block.cells = cells;
            self.blocks.push(block);
        }
    }

    /// Push a text block unless it has no visible text
    fn push(&mut self, kind: BlockKind, runs: Vec<Run>, depth: usize) {
        let runs = trim_runs(runs);
        if runs.iter().any(|r| !r.text.trim().is_empty()) {
            self.blocks.push(Block::new(kind, runs, depth));
        }
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "blockquote"
            | "table"
            | "hr"
            | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "dl"
            | "dd"
            | "dt"
    )
}

/// Table rows in document order, not descending into nested tables
fn rows_of(table: &Handle) -> Vec<Handle> {
    let mut rows = Vec::new();
    for child in table.children.borrow().iter() {
        match dom::tag_name(child).as_deref() {
            Some("tr") => rows.push(child.clone()),
            Some("thead") | Some("tbody") | Some("tfoot") => rows.extend(rows_of(child)),
            _ => {}
        }
    }
    rows
}

fn parent_tag(node: &Handle) -> Option<String> {
    let weak = node.parent.take();
    let tag = weak.as_ref().and_then(|w| w.upgrade()).and_then(|p| dom::tag_name(&p));
    node.parent.set(weak);
    tag
}

fn inline_children(node: &Handle) -> Vec<Run> {
    let mut runs = Vec::new();
    for child in node.children.borrow().iter() {
        inline(child, RunStyle::default(), &mut runs);
    }
    runs
}

/// Collect inline runs; nested block elements become line breaks
fn inline(node: &Handle, style: RunStyle, runs: &mut Vec<Run>) {
    let tag = match &node.data {
        NodeData::Text { contents } => {
            let text = if style.code {
                contents.borrow().replace('\n', " ")
            } else {
                collapse_whitespace(&contents.borrow())
            };
            push_run(runs, &text, style);
            return;
        }
        NodeData::Element { .. } => dom::tag_name(node).unwrap_or_default(),
        _ => return,
    };

    let mut style = style;
    match tag.as_str() {
        "br" => {
            push_run(runs, "\n", style);
            return;
        }
        "input" => {
            if dom::attr(node, "type").as_deref() == Some("checkbox") {
                let mark = if dom::attr(node, "checked").is_some() { "[x] " } else { "[ ] " };
                push_run(runs, mark, style);
            }
            return;
        }
        "strong" | "b" => style.bold = true,
        "em" | "i" => style.italic = true,
        "code" | "kbd" | "samp" => style.code = true,
        "a" => style.link = true,
        "del" | "s" | "strike" => style.strike = true,
        "span" if dom::attr(node, "class").as_deref() == Some("image-placeholder") => style.italic = true,
        _ => {}
    }

    let block_like = is_block(&tag) || matches!(tag.as_str(), "tr" | "table");
    if block_like {
        line_break(runs);
    }
    if tag == "pre" {
        style.code = true;
        let text = dom::text_content(node);
        push_run(runs, text.trim_end_matches('\n'), style);
    } else {
        for child in node.children.borrow().iter() {
            inline(child, style, runs);
        }
    }
    if block_like {
        line_break(runs);
    }
}

fn line_break(runs: &mut Vec<Run>) {
    let needs_break = runs
        .last()
        .map(|r| !r.text.ends_with('\n') && !r.text.is_empty())
        .unwrap_or(false);
    if needs_break {
        push_run(runs, "\n", RunStyle::default());
    }
}

fn push_run(runs: &mut Vec<Run>, text: &str, style: RunStyle) {
    let mut text = text;
    let after_space = runs
        .last()
        .map(|r| r.text.ends_with([' ', '\n']))
        .unwrap_or(false);
    if after_space && !style.code {
        text = text.trim_start_matches(' ');
    }
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => runs.push(Run {
            text: text.to_string(),
            style,
        }),
    }
}

/// Strip surrounding whitespace and spaces that follow forced breaks
fn trim_runs(runs: Vec<Run>) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::with_capacity(runs.len());
    let mut at_line_start = true;
    for mut run in runs {
        if out.is_empty() {
            run.text = run.text.trim_start().to_string();
        } else if at_line_start && !run.style.code {
            run.text = run.text.trim_start_matches(' ').to_string();
        }
        run.text = run.text.replace("\n ", "\n");
        if run.text.is_empty() {
            continue;
        }
        at_line_start = run.text.ends_with('\n');
        out.push(run);
    }

    while let Some(last) = out.last_mut() {
        let trimmed = last.text.trim_end().to_string();
        if trimmed.is_empty() {
            out.pop();
        } else {
            last.text = trimmed;
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::engine::{CmarkEngine, MarkdownEngine};

    fn options() -> ExportOptions {
        ExportOptions::from_config(&ExportConfig::default(), "out.pdf")
    }

    fn snap(markdown: &str) -> Snapshot {
        let html = CmarkEngine::new().to_html(markdown).unwrap();
        snapshot(&html, &options()).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_filename_from_heading() {
        let name = export_filename("intro\n# Hello World!\nbody", date(), "document");
        assert_eq!(name, "hello-world-2024-03-09.pdf");
    }

    #[test]
    fn test_filename_default() {
        assert_eq!(export_filename("## Only h2\ntext", date(), "document"), "document-2024-03-09.pdf");
        assert_eq!(export_filename("# !!!", date(), "document"), "document-2024-03-09.pdf");
        assert_eq!(export_filename("#NoSpace", date(), "notes"), "notes-2024-03-09.pdf");
    }

    #[test]
    fn test_first_heading_strips_closing_hashes() {
        assert_eq!(first_heading("# Title ##").as_deref(), Some("Title"));
        assert_eq!(first_heading("text\n#\nmore"), None);
    }

    #[test]
    fn test_heading_inside_code_block_ignored() {
        let text = "```sh\n# install deps\n```\n\n    # indented code\n\n# Real `Title`";
        assert_eq!(first_heading(text).as_deref(), Some("Real Title"));
        assert_eq!(export_filename(text, date(), "document"), "real-title-2024-03-09.pdf");
        assert_eq!(first_heading("```\n# only code\n```"), None);
    }

    #[test]
    fn test_options_from_config() {
        let options = options();
        assert_eq!(options.margins_mm, [10.0; 4]);
        assert_eq!(options.page_size_mm(), (210.0, 297.0));
        assert!(options.compress);
        assert!(options.avoids_break("h3"));
        assert!(options.avoids_break("tr"));
        assert!(!options.avoids_break("table"));

        let mut config = ExportConfig::default();
        config.orientation = Orientation::Landscape;
        let landscape = ExportOptions::from_config(&config, "x.pdf");
        assert_eq!(landscape.page_size_mm(), (297.0, 210.0));
    }

    #[test]
    fn test_images_become_placeholders() {
        let snapshot = snap("Look: ![a cat](https://example.com/cat.png)\n\n![](pic.png)");
        let text = snapshot.plain_text();
        assert!(text.contains("[Image: a cat]"));
        assert!(text.contains("[Image: pic.png]"));
        assert!(!text.contains("https://example.com"));
    }

    #[test]
    fn test_frames_removed() {
        let html = r#"<p>before</p><iframe src="https://video"></iframe><object data="x"></object><embed src="y"><p>after</p>"#;
        let snapshot = snapshot(html, &options()).unwrap();
        assert_eq!(snapshot.plain_text(), "before\nafter");
    }

    #[test]
    fn test_block_structure() {
        let snapshot = snap(
            "# Title\n\nSome **bold** text\n\n- one\n  - nested\n- two\n\n3. three\n\n```\ncode\n  indented\n```\n\n> quoted\n\n---",
        );
        let kinds: Vec<_> = snapshot.blocks.iter().map(|b| b.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Paragraph,
                BlockKind::ListItem { marker: "\u{2022}".to_string() },
                BlockKind::ListItem { marker: "\u{2022}".to_string() },
                BlockKind::ListItem { marker: "\u{2022}".to_string() },
                BlockKind::ListItem { marker: "3.".to_string() },
                BlockKind::CodeBlock,
                BlockKind::Quote,
                BlockKind::Rule,
            ]
        );
        assert_eq!(snapshot.title.as_deref(), Some("Title"));
        assert_eq!(snapshot.blocks[3].depth, 1);
        assert_eq!(snapshot.blocks[6].text(), "code\n  indented");

        let bold: Vec<_> = snapshot.blocks[1].runs.iter().filter(|r| r.style.bold).collect();
        assert_eq!(bold.len(), 1);
        assert_eq!(bold[0].text, "bold");
    }

    #[test]
    fn test_avoid_break_flags() {
        let snapshot = snap(
            "# T\n\npara\n\n- item\n\n```\ncode\n```\n\n> quote\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n---",
        );
        let tags: Vec<_> = snapshot.blocks.iter().map(|b| b.kind.tag()).collect();
        assert_eq!(tags, ["h1", "p", "li", "pre", "blockquote", "tr", "tr", "hr"]);
        for block in &snapshot.blocks {
            let expected = !matches!(block.kind, BlockKind::Rule);
            assert_eq!(block.avoid_break, expected, "{:?}", block.kind);
        }
    }

    #[test]
    fn test_table_rows() {
        let snapshot = snap("| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |");
        assert_eq!(snapshot.blocks.len(), 3);
        assert_eq!(snapshot.blocks[0].kind, BlockKind::TableRow { header: true });
        assert_eq!(snapshot.blocks[2].kind, BlockKind::TableRow { header: false });
        assert_eq!(snapshot.blocks[2].text(), "3 | 4");
    }

    #[test]
    fn test_task_list_and_line_breaks() {
        let snapshot = snap("- [x] done\n- [ ] todo\n\nline one\nline two");
        assert_eq!(snapshot.blocks[0].text(), "[x] done");
        assert_eq!(snapshot.blocks[1].text(), "[ ] todo");
        assert_eq!(snapshot.blocks[2].text(), "line one\nline two");
    }

    #[test]
    fn test_empty_preview_rejected() {
        assert!(matches!(
            snapshot("<p>   </p>", &options()),
            Err(ExportError::Snapshot(_))
        ));
    }
}
