//! PDF rendering of export snapshots
//!
//! Lays a [`Snapshot`] out on fixed-size pages using the PDF base-14 fonts
//! (Helvetica family plus Courier for code) and writes the result with
//! pdf-writer. Text is encoded as WinAnsi; characters outside it print as `?`.

use super::export::{Block, BlockKind, ExportOptions, Run, RunStyle, Snapshot};
use crate::error::{ExportError, ExportResult};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::io::Write;

/// Turns a snapshot into document bytes
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, snapshot: &Snapshot, options: &ExportOptions) -> ExportResult<Vec<u8>>;
}

const MM_TO_PT: f32 = 72.0 / 25.4;

const TEXT_COLOR: (f32, f32, f32) = (0.141, 0.161, 0.180);
const LINK_COLOR: (f32, f32, f32) = (0.012, 0.400, 0.839);
const MUTED_COLOR: (f32, f32, f32) = (0.416, 0.451, 0.490);
const CODE_BG: (f32, f32, f32) = (0.965, 0.973, 0.980);
const BORDER_COLOR: (f32, f32, f32) = (0.882, 0.894, 0.910);

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Face {
    const ALL: [Face; 5] = [Face::Regular, Face::Bold, Face::Italic, Face::BoldItalic, Face::Mono];

    fn for_style(style: RunStyle, force_bold: bool) -> Self {
        if style.code {
            return Face::Mono;
        }
        match (style.bold || force_bold, style.italic) {
            (true, true) => Face::BoldItalic,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (false, false) => Face::Regular,
        }
    }

    fn resource(&self) -> Name<'static> {
        match self {
            Face::Regular => Name(b"F1"),
            Face::Bold => Name(b"F2"),
            Face::Italic => Name(b"F3"),
            Face::BoldItalic => Name(b"F4"),
            Face::Mono => Name(b"F5"),
        }
    }

    fn base_font(&self) -> Name<'static> {
        match self {
            Face::Regular => Name(b"Helvetica"),
            Face::Bold => Name(b"Helvetica-Bold"),
            Face::Italic => Name(b"Helvetica-Oblique"),
            Face::BoldItalic => Name(b"Helvetica-BoldOblique"),
            Face::Mono => Name(b"Courier"),
        }
    }

    /// Advance width of `text` at `size` points
    ///
    /// Bold faces use the regular metrics widened slightly.
    fn measure(&self, text: &str, size: f32) -> f32 {
        let units: f32 = match self {
            Face::Mono => text.chars().count() as f32 * 600.0,
            _ => text.chars().map(|c| char_width(c) as f32).sum(),
        };
        let widen = match self {
            Face::Bold | Face::BoldItalic => 1.05,
            _ => 1.0,
        };
        units * widen * size / 1000.0
    }
}

fn char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => 556,
    }
}

/// Encode text as WinAnsi bytes
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\t' => b' ',
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02c6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8a,
            '\u{2039}' => 0x8b,
            '\u{0152}' => 0x8c,
            '\u{017d}' => 0x8e,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02dc}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9a,
            '\u{203a}' => 0x9b,
            '\u{0153}' => 0x9c,
            '\u{017e}' => 0x9e,
            '\u{0178}' => 0x9f,
            _ => b'?',
        })
        .collect()
}

/// Page geometry in points, origin bottom-left
#[derive(Debug, Clone, Copy)]
struct Geometry {
    width: f32,
    height: f32,
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Geometry {
    fn from_options(options: &ExportOptions) -> Self {
        let (w, h) = options.page_size_mm();
        let [top, right, bottom, left] = options.margins_mm;
        Self {
            width: w * MM_TO_PT,
            height: h * MM_TO_PT,
            top: top * MM_TO_PT,
            right: right * MM_TO_PT,
            bottom: bottom * MM_TO_PT,
            left: left * MM_TO_PT,
        }
    }

    fn content_top(&self) -> f32 {
        self.height - self.top
    }

    fn content_width(&self) -> f32 {
        (self.width - self.left - self.right).max(1.0)
    }

    fn content_height(&self) -> f32 {
        self.height - self.top - self.bottom
    }
}

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    face: Face,
    size: f32,
    link: bool,
    strike: bool,
    width: f32,
}

#[derive(Debug, Clone, Default)]
struct Line {
    pieces: Vec<Piece>,
    width: f32,
}

impl Line {
    fn push(&mut self, text: &str, face: Face, size: f32, style: RunStyle) {
        let width = face.measure(text, size);
        self.width += width;
        if let Some(last) = self.pieces.last_mut() {
            if last.face == face && last.size == size && last.link == style.link && last.strike == style.strike {
                last.text.push_str(text);
                last.width += width;
                return;
            }
        }
        self.pieces.push(Piece {
            text: text.to_string(),
            face,
            size,
            link: style.link,
            strike: style.strike,
            width,
        });
    }

    fn trim_end(&mut self) {
        if let Some(last) = self.pieces.last_mut() {
            let trimmed = last.text.trim_end_matches(' ').to_string();
            let width = last.face.measure(&trimmed, last.size);
            self.width -= last.width - width;
            last.text = trimmed;
            last.width = width;
        }
    }

    fn is_empty(&self) -> bool {
        self.pieces.iter().all(|p| p.text.is_empty())
    }
}

/// Greedy word wrap of styled runs; `\n` forces a break
fn wrap(runs: &[Run], size: f32, max_width: f32, force_bold: bool) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for run in runs {
        let face = Face::for_style(run.style, force_bold);
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                line.trim_end();
                lines.push(std::mem::take(&mut line));
            }
            for token in segment.split_inclusive(' ') {
                let word = token.trim_end_matches(' ');
                let word_width = face.measure(word, size);
                if line.width + word_width > max_width && !line.is_empty() {
                    line.trim_end();
                    lines.push(std::mem::take(&mut line));
                }
                let token = if line.is_empty() { token.trim_start_matches(' ') } else { token };
                if face.measure(token, size) > max_width {
                    break_long(token, face, size, max_width, run.style, &mut line, &mut lines);
                } else {
                    line.push(token, face, size, run.style);
                }
            }
        }
    }

    line.trim_end();
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn break_long(
    token: &str,
    face: Face,
    size: f32,
    max_width: f32,
    style: RunStyle,
    line: &mut Line,
    lines: &mut Vec<Line>,
) {
    let mut chunk = String::new();
    for c in token.chars() {
        let mut next = chunk.clone();
        next.push(c);
        if line.width + face.measure(&next, size) > max_width && !chunk.is_empty() {
            line.push(&chunk, face, size, style);
            lines.push(std::mem::take(line));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        line.push(&chunk, face, size, style);
    }
}

/// Code lines keep their spacing and are cut at the column limit
fn wrap_code(text: &str, size: f32, max_width: f32) -> Vec<Line> {
    let columns = ((max_width / (0.6 * size)).floor() as usize).max(1);
    let style = RunStyle {
        code: true,
        ..Default::default()
    };
    let mut lines = Vec::new();
    for source in text.split('\n') {
        let chars: Vec<char> = source.replace('\t', "    ").chars().collect();
        if chars.is_empty() {
            lines.push(Line::default());
            continue;
        }
        for chunk in chars.chunks(columns) {
            let mut line = Line::default();
            line.push(&chunk.iter().collect::<String>(), Face::Mono, size, style);
            lines.push(line);
        }
    }
    lines
}

/// Accumulates page content streams while laying blocks out top to bottom
struct Composer {
    geometry: Geometry,
    base_size: f32,
    pages: Vec<Vec<u8>>,
    content: Content,
    y: f32,
    color: (f32, f32, f32),
    /// Page each block starts on
    block_pages: Vec<usize>,
}

impl Composer {
    fn new(geometry: Geometry, base_size: f32) -> Self {
        Self {
            geometry,
            base_size,
            pages: Vec::new(),
            content: Content::new(),
            y: geometry.content_top(),
            color: TEXT_COLOR,
            block_pages: Vec::new(),
        }
    }

    fn at_page_top(&self) -> bool {
        self.y >= self.geometry.content_top()
    }

    fn remaining(&self) -> f32 {
        self.y - self.geometry.bottom
    }

    fn new_page(&mut self) {
        let finished = std::mem::replace(&mut self.content, Content::new());
        self.pages.push(finished.finish());
        self.y = self.geometry.content_top();
    }

    /// Vertical gap, dropped at the top of a page
    fn space(&mut self, amount: f32) {
        if !self.at_page_top() {
            self.y -= amount.min(self.remaining().max(0.0));
        }
    }

    fn finish(mut self) -> (Vec<Vec<u8>>, Vec<usize>) {
        self.new_page();
        (self.pages, self.block_pages)
    }

    fn mark_start(&mut self) {
        self.block_pages.push(self.pages.len());
    }

    fn place(&mut self, block: &Block) {
        let size = self.base_size;
        let width = self.geometry.content_width();
        let left = self.geometry.left;

        match &block.kind {
            BlockKind::Heading(level) => {
                let scale = match level {
                    1 => 2.0,
                    2 => 1.5,
                    3 => 1.25,
                    4 => 1.0,
                    5 => 0.875,
                    _ => 0.85,
                };
                let heading_size = size * scale;
                let lines = wrap(&block.runs, heading_size, width, true);
                let rule = *level <= 2;
                self.space(size * 1.2);
                let color = if *level == 6 { MUTED_COLOR } else { TEXT_COLOR };
                self.flow(block, &lines, heading_size * 1.25, left, 0.0, |c, _, _| c.text(color));
                if rule && self.remaining() > heading_size * 0.4 {
                    self.y -= heading_size * 0.2;
                    self.hline(left, left + width, self.y, 1.0, BORDER_COLOR);
                    self.y -= heading_size * 0.2;
                }
                self.space(size * 0.6);
            }
            BlockKind::Paragraph => {
                let lines = wrap(&block.runs, size, width, false);
                self.space(size * 0.8);
                self.flow(block, &lines, size * 1.5, left, 0.0, |c, _, _| c.text(TEXT_COLOR));
                self.space(size * 0.8);
            }
            BlockKind::ListItem { marker } => {
                let indent = size * 1.8 * (block.depth as f32 + 1.0);
                let lines = wrap(&block.runs, size, (width - indent).max(size), false);
                self.space(size * 0.25);
                let marker = marker.clone();
                self.flow(block, &lines, size * 1.5, left + indent, 0.0, move |c, line_index, baseline| {
                    if line_index == 0 {
                        let marker_width = Face::Regular.measure(&marker, size);
                        c.draw_text(&marker, Face::Regular, size, left + indent - marker_width - size * 0.5, baseline, TEXT_COLOR);
                    }
                    c.text(TEXT_COLOR);
                });
                self.space(size * 0.25);
            }
            BlockKind::CodeBlock => {
                let code_size = size * 0.85;
                let pad = code_size;
                let text = block.runs.first().map(|r| r.text.as_str()).unwrap_or("");
                let lines = wrap_code(text, code_size, width - 2.0 * pad);
                let line_height = code_size * 1.45;
                self.space(size * 0.8);
                self.flow(block, &lines, line_height, left + pad, pad, move |c, _, baseline| {
                    c.fill_rect(left, baseline - line_height * 0.25, width, line_height, CODE_BG);
                    c.text(TEXT_COLOR);
                });
                self.space(size * 0.8);
            }
            BlockKind::Quote => {
                let indent = size * 1.2;
                let lines = wrap(&block.runs, size, width - indent, false);
                let line_height = size * 1.5;
                self.space(size * 0.8);
                self.flow(block, &lines, line_height, left + indent, 0.0, move |c, _, baseline| {
                    c.fill_rect(left, baseline - line_height * 0.25, size * 0.25, line_height, BORDER_COLOR);
                    c.text(MUTED_COLOR);
                });
                self.space(size * 0.8);
            }
            BlockKind::TableRow { header } => self.table_row(block, *header),
            BlockKind::Rule => {
                self.space(size);
                if self.remaining() < size {
                    self.new_page();
                }
                self.mark_start();
                self.hline(left, left + width, self.y, 2.0, BORDER_COLOR);
                self.space(size);
            }
        }
    }

    /// Place lines, keeping them together when the block asks for it and fits a page
    fn flow<F>(&mut self, block: &Block, lines: &[Line], line_height: f32, x: f32, pad: f32, mut decorate: F)
    where
        F: FnMut(&mut Composer, usize, f32),
    {
        let total = lines.len() as f32 * line_height + 2.0 * pad;
        if block.avoid_break && total <= self.geometry.content_height() && total > self.remaining() {
            self.new_page();
        }

        self.mark_start();

        if pad > 0.0 {
            self.pad_strip(block, pad);
        }
        for (i, line) in lines.iter().enumerate() {
            if line_height > self.remaining() {
                self.new_page();
            }
            let baseline = self.y - line_height * 0.75;
            decorate(self, i, baseline);
            self.draw_line(line, x, baseline);
            self.y -= line_height;
        }
        if pad > 0.0 {
            self.pad_strip(block, pad);
        }
    }

    /// Code block padding above and below the lines
    fn pad_strip(&mut self, block: &Block, pad: f32) {
        if pad > self.remaining() {
            self.new_page();
        }
        if block.kind == BlockKind::CodeBlock {
            let left = self.geometry.left;
            let width = self.geometry.content_width();
            self.fill_rect(left, self.y - pad, width, pad, CODE_BG);
        }
        self.y -= pad;
    }

    fn table_row(&mut self, block: &Block, header: bool) {
        let size = self.base_size;
        let left = self.geometry.left;
        let width = self.geometry.content_width();
        let columns = block.cells.len().max(1);
        let column_width = width / columns as f32;
        let pad = size * 0.5;
        let line_height = size * 1.4;

        let cells: Vec<Vec<Line>> = block
            .cells
            .iter()
            .map(|runs| wrap(runs, size, (column_width - 2.0 * pad).max(size), header))
            .collect();
        let row_lines = cells.iter().map(Vec::len).max().unwrap_or(1);
        let height = row_lines as f32 * line_height + 2.0 * pad;

        if (block.avoid_break && height <= self.geometry.content_height() && height > self.remaining())
            || self.remaining() < line_height + 2.0 * pad
        {
            self.new_page();
        }
        self.mark_start();

        // Rows taller than the space left continue on the next page
        let mut offset = 0;
        while offset < row_lines {
            let fit = (((self.remaining() - 2.0 * pad) / line_height).floor() as usize).max(1);
            let take = fit.min(row_lines - offset);
            let chunk_height = take as f32 * line_height + 2.0 * pad;
            let top = self.y;

            if header {
                self.fill_rect(left, top - chunk_height, width, chunk_height, CODE_BG);
            }
            for (col, lines) in cells.iter().enumerate() {
                let x = left + col as f32 * column_width;
                self.stroke_rect(x, top - chunk_height, column_width, chunk_height);
                for (i, line) in lines.iter().skip(offset).take(take).enumerate() {
                    let baseline = top - pad - (i as f32 + 0.75) * line_height;
                    self.text(TEXT_COLOR);
                    self.draw_line(line, x + pad, baseline);
                }
            }

            self.y -= chunk_height;
            offset += take;
            if offset < row_lines {
                self.new_page();
            }
        }
    }

    /// Set the fill colour used for following text
    fn text(&mut self, color: (f32, f32, f32)) {
        self.color = color;
        self.content.set_fill_rgb(color.0, color.1, color.2);
    }

    fn draw_line(&mut self, line: &Line, x: f32, baseline: f32) {
        let mut cx = x;
        for piece in &line.pieces {
            if piece.text.is_empty() {
                continue;
            }
            if piece.link {
                self.content.set_fill_rgb(LINK_COLOR.0, LINK_COLOR.1, LINK_COLOR.2);
            }
            self.content
                .begin_text()
                .set_font(piece.face.resource(), piece.size)
                .set_text_matrix([1.0, 0.0, 0.0, 1.0, cx, baseline])
                .show(Str(&encode_win_ansi(&piece.text)))
                .end_text();
            if piece.link {
                self.hline(cx, cx + piece.width, baseline - piece.size * 0.12, 0.5, LINK_COLOR);
                let (r, g, b) = self.color;
                self.content.set_fill_rgb(r, g, b);
            }
            if piece.strike {
                self.hline(cx, cx + piece.width, baseline + piece.size * 0.3, 0.6, self.color);
            }
            cx += piece.width;
        }
    }

    fn draw_text(&mut self, text: &str, face: Face, size: f32, x: f32, baseline: f32, color: (f32, f32, f32)) {
        self.text(color);
        self.content
            .begin_text()
            .set_font(face.resource(), size)
            .set_text_matrix([1.0, 0.0, 0.0, 1.0, x, baseline])
            .show(Str(&encode_win_ansi(text)))
            .end_text();
    }

    fn hline(&mut self, x1: f32, x2: f32, y: f32, width: f32, color: (f32, f32, f32)) {
        self.content
            .save_state()
            .set_stroke_rgb(color.0, color.1, color.2)
            .set_line_width(width)
            .move_to(x1, y)
            .line_to(x2, y)
            .stroke()
            .restore_state();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: (f32, f32, f32)) {
        self.content
            .save_state()
            .set_fill_rgb(color.0, color.1, color.2)
            .rect(x, y, w, h)
            .fill_nonzero()
            .restore_state();
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.content
            .save_state()
            .set_stroke_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2)
            .set_line_width(0.75)
            .rect(x, y, w, h)
            .stroke()
            .restore_state();
    }
}

/// pdf-writer backed renderer
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    /// Body text size in points
    pub base_size: f32,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self { base_size: 11.0 }
    }

    /// Page content streams plus the page each block starts on
    fn compose(&self, snapshot: &Snapshot, options: &ExportOptions) -> (Vec<Vec<u8>>, Vec<usize>) {
        let mut composer = Composer::new(Geometry::from_options(options), self.base_size);
        for block in &snapshot.blocks {
            composer.place(block);
        }
        composer.finish()
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, snapshot: &Snapshot, options: &ExportOptions) -> ExportResult<Vec<u8>> {
        let geometry = Geometry::from_options(options);
        if geometry.content_height() <= self.base_size * 2.0 {
            return Err(ExportError::Render("margins leave no room for content".to_string()));
        }

        let (pages, _) = self.compose(snapshot, options);
        log::debug!(
            "Laid out {} block(s) on {} page(s) (image type {}, quality {})",
            snapshot.blocks.len(),
            pages.len(),
            options.image_type,
            options.image_quality
        );

        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let tree_id = alloc.bump();
        let info_id = alloc.bump();
        let font_ids: Vec<(Face, Ref)> = Face::ALL.iter().map(|face| (*face, alloc.bump())).collect();
        let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().map(|(page, _)| *page))
            .count(page_ids.len() as i32);

        let title = snapshot
            .title
            .clone()
            .unwrap_or_else(|| options.filename.trim_end_matches(".pdf").to_string());
        pdf.document_info(info_id)
            .title(TextStr(&title))
            .producer(TextStr(concat!("mdpress ", env!("CARGO_PKG_VERSION"))));

        for (face, id) in &font_ids {
            let mut font = pdf.type1_font(*id);
            font.base_font(face.base_font());
            font.encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let media_box = Rect::new(0.0, 0.0, geometry.width, geometry.height);
        for ((page_id, content_id), data) in page_ids.iter().zip(&pages) {
            {
                let mut page = pdf.page(*page_id);
                page.media_box(media_box);
                page.parent(tree_id);
                page.contents(*content_id);
                let mut resources = page.resources();
                let mut fonts = resources.fonts();
                for (face, id) in &font_ids {
                    fonts.pair(face.resource(), *id);
                }
            }

            if options.compress {
                let compressed = deflate(data)?;
                pdf.stream(*content_id, &compressed).filter(Filter::FlateDecode);
            } else {
                pdf.stream(*content_id, data).finish();
            }
        }

        Ok(pdf.finish())
    }
}

fn deflate(data: &[u8]) -> ExportResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| ExportError::Render(format!("compression failed: {}", e)))
}
