//! Formatting toolbar actions
//!
//! Each toolbar button carries a format identifier. Applying a format turns
//! the current selection (or a placeholder phrase when nothing is selected)
//! into Markdown and splices it back into the buffer.

use super::buffer::TextBuffer;
use crate::error::{EditorError, EditorResult};
use crate::state::Selection;
use std::fmt;
use std::str::FromStr;

/// Formats offered by the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bold,
    Italic,
    Strikethrough,
    Heading,
    Link,
    Image,
    Code,
    Quote,
    List,
    OrderedList,
}

impl Format {
    /// All formats in toolbar order
    pub const ALL: [Format; 10] = [
        Format::Bold,
        Format::Italic,
        Format::Strikethrough,
        Format::Heading,
        Format::Link,
        Format::Image,
        Format::Code,
        Format::Quote,
        Format::List,
        Format::OrderedList,
    ];

    /// Identifier carried by the toolbar button
    pub fn id(&self) -> &'static str {
        match self {
            Format::Bold => "bold",
            Format::Italic => "italic",
            Format::Strikethrough => "strikethrough",
            Format::Heading => "heading",
            Format::Link => "link",
            Format::Image => "image",
            Format::Code => "code",
            Format::Quote => "quote",
            Format::List => "list",
            Format::OrderedList => "ordered-list",
        }
    }

    /// Phrase used when there is no selection
    pub fn placeholder(&self) -> &'static str {
        match self {
            Format::Bold => "bold text",
            Format::Italic => "italic text",
            Format::Strikethrough => "strikethrough text",
            Format::Heading => "Heading",
            Format::Link => "link text",
            Format::Image => "alt text",
            Format::Code => "code",
            Format::Quote => "Quote",
            Format::List | Format::OrderedList => "List item",
        }
    }

    /// Produce the Markdown that replaces `selected`
    pub fn render(&self, selected: &str) -> String {
        let text = if selected.is_empty() {
            self.placeholder()
        } else {
            selected
        };

        match self {
            Format::Bold => format!("**{}**", text),
            Format::Italic => format!("*{}*", text),
            Format::Strikethrough => format!("~~{}~~", text),
            Format::Heading => format!("# {}", text),
            Format::Link => format!("[{}](https://example.com)", text),
            Format::Image => format!("![{}](https://example.com/image.png)", text),
            Format::Code if text.contains('\n') => format!("```\n{}\n```", text),
            Format::Code => format!("`{}`", text),
            Format::Quote => prefix_lines(text, |_| "> ".to_string()),
            Format::List => prefix_lines(text, |_| "- ".to_string()),
            Format::OrderedList => prefix_lines(text, |n| format!("{}. ", n + 1)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Format {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .iter()
            .copied()
            .find(|f| f.id() == s)
            .ok_or_else(|| EditorError::UnknownFormat(s.to_string()))
    }
}

fn prefix_lines(text: &str, prefix: impl Fn(usize) -> String) -> String {
    text.split('\n')
        .enumerate()
        .map(|(n, line)| format!("{}{}", prefix(n), line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply `format` to the selection and splice the result into `buffer`
///
/// Returns the collapsed selection placed just after the inserted text.
pub fn apply_format(
    buffer: &mut TextBuffer,
    selection: Selection,
    format: Format,
) -> EditorResult<Selection> {
    let range = selection.range();
    let selected = buffer.slice(range.clone())?;
    let replacement = format.render(&selected);
    let cursor = buffer.splice(range, &replacement)?;

    log::debug!("Applied {} format, cursor now at {}", format, cursor);
    Ok(Selection::collapsed(cursor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_wraps_selection() {
        let mut buf = TextBuffer::from_text("say hi");
        let sel = apply_format(&mut buf, Selection::new(4, 6), Format::Bold).unwrap();
        assert_eq!(buf.text(), "say **hi**");
        assert_eq!(sel, Selection::collapsed(10));
    }

    #[test]
    fn test_bold_without_selection_uses_placeholder() {
        let mut buf = TextBuffer::new();
        let sel = apply_format(&mut buf, Selection::collapsed(0), Format::Bold).unwrap();
        assert_eq!(buf.text(), "**bold text**");
        assert_eq!(sel.start, 13);
    }

    #[test]
    fn test_reversed_selection_is_normalized() {
        let mut buf = TextBuffer::from_text("hi");
        apply_format(&mut buf, Selection::new(2, 0), Format::Italic).unwrap();
        assert_eq!(buf.text(), "*hi*");
    }

    #[test]
    fn test_code_single_and_multi_line() {
        assert_eq!(Format::Code.render("x = 1"), "`x = 1`");
        assert_eq!(Format::Code.render("a\nb"), "```\na\nb\n```");
        assert_eq!(Format::Code.render(""), "`code`");
    }

    #[test]
    fn test_line_prefix_formats() {
        assert_eq!(Format::Quote.render("a\nb"), "> a\n> b");
        assert_eq!(Format::List.render("a\nb"), "- a\n- b");
        assert_eq!(Format::OrderedList.render("a\nb\nc"), "1. a\n2. b\n3. c");
        assert_eq!(Format::Heading.render(""), "# Heading");
    }

    #[test]
    fn test_link_and_image_templates() {
        assert_eq!(Format::Link.render("docs"), "[docs](https://example.com)");
        assert_eq!(
            Format::Image.render(""),
            "![alt text](https://example.com/image.png)"
        );
    }

    #[test]
    fn test_format_ids_round_trip() {
        for format in Format::ALL {
            assert_eq!(format.id().parse::<Format>().unwrap(), format);
        }
        assert!(matches!(
            "underline".parse::<Format>(),
            Err(EditorError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_invalid_selection_leaves_buffer() {
        let mut buf = TextBuffer::from_text("abc");
        assert!(apply_format(&mut buf, Selection::new(1, 10), Format::Bold).is_err());
        assert_eq!(buf.text(), "abc");
    }
}
