//! Document text buffer backed by ropey
//!
//! The buffer is the only source of truth for document content. Ranges are
//! character indices, never byte offsets.

use crate::error::{EditorError, EditorResult};
use ropey::Rope;
use std::ops::Range;

/// Text buffer wrapping ropey::Rope
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    /// The underlying rope data structure
    rope: Rope,
}

impl TextBuffer {
    /// Create an empty text buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer from a string, normalising CRLF to LF
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&text.replace("\r\n", "\n")),
        }
    }

    /// Get total character count
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// True when the buffer holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    /// Get the entire buffer contents as a string
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the entire buffer contents
    pub fn set_content(&mut self, text: &str) {
        self.rope = Rope::from_str(&text.replace("\r\n", "\n"));
    }

    fn check_range(&self, range: &Range<usize>) -> EditorResult<()> {
        if range.start > range.end || range.end > self.rope.len_chars() {
            return Err(EditorError::InvalidSelection {
                start: range.start,
                end: range.end,
            });
        }
        Ok(())
    }

    /// Get a slice of the buffer by character indices
    pub fn slice(&self, range: Range<usize>) -> EditorResult<String> {
        self.check_range(&range)?;
        Ok(self.rope.slice(range).to_string())
    }

    /// Replace a character range with `text`
    ///
    /// Returns the character index just past the inserted text.
    pub fn splice(&mut self, range: Range<usize>, text: &str) -> EditorResult<usize> {
        self.check_range(&range)?;
        if range.start < range.end {
            self.rope.remove(range.clone());
        }
        self.rope.insert(range.start, text);
        Ok(range.start + text.chars().count())
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let buf = TextBuffer::new();
        assert!(buf.is_empty());
        assert!(buf.is_blank());
        assert_eq!(buf.len_chars(), 0);
    }

    #[test]
    fn test_blank_detection() {
        assert!(TextBuffer::from_text("  \n\t ").is_blank());
        assert!(!TextBuffer::from_text("  x ").is_blank());
    }

    #[test]
    fn test_crlf_normalized() {
        let buf = TextBuffer::from_text("a\r\nb");
        assert_eq!(buf.text(), "a\nb");
    }

    #[test]
    fn test_splice_replaces_and_reports_cursor() {
        let mut buf = TextBuffer::from_text("say hi now");
        let cursor = buf.splice(4..6, "**hi**").unwrap();
        assert_eq!(buf.text(), "say **hi** now");
        assert_eq!(cursor, 10);
    }

    #[test]
    fn test_splice_counts_chars_not_bytes() {
        let mut buf = TextBuffer::from_text("héllo");
        let cursor = buf.splice(1..2, "é!").unwrap();
        assert_eq!(buf.text(), "hé!llo");
        assert_eq!(cursor, 3);
    }

    #[test]
    fn test_splice_out_of_bounds() {
        let mut buf = TextBuffer::from_text("abc");
        assert!(matches!(
            buf.splice(2..9, "x"),
            Err(EditorError::InvalidSelection { start: 2, end: 9 })
        ));
        assert_eq!(buf.text(), "abc");
    }

    #[test]
    fn test_set_content_normalizes_crlf() {
        let mut buf = TextBuffer::from_text("old");
        buf.set_content("# Title\r\nbody");
        assert_eq!(buf.text(), "# Title\nbody");
    }
}
