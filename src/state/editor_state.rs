//! Editor state for the open document
//!
//! Holds the text buffer together with the user's selection.

use crate::editor::TextBuffer;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Text selection as character indices
///
/// `start` is the anchor and `end` the active point, so a selection may run
/// backwards; use [`Selection::range`] for the ordered span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Anchor point
    pub start: usize,

    /// Active point, where the cursor sits
    pub end: usize,
}

impl Selection {
    /// Create a new selection
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a collapsed selection (cursor with no selection)
    pub fn collapsed(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Check if selection is collapsed (no text selected)
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Ordered character range covered by the selection
    pub fn range(&self) -> Range<usize> {
        self.start.min(self.end)..self.start.max(self.end)
    }
}

/// Buffer plus selection for the single open document
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    /// Document text
    pub buffer: TextBuffer,

    /// Current selection
    pub selection: Selection,
}

impl EditorState {
    /// Replace the whole document and put the cursor at the start
    pub fn replace_text(&mut self, text: &str) {
        self.buffer.set_content(text);
        self.selection = Selection::collapsed(0);
    }

    /// Replace the whole document as typed, keeping the selection where it fits
    pub fn set_text(&mut self, text: &str) {
        self.buffer.set_content(text);
        self.select(self.selection);
    }

    /// Update the selection, clamped to the document
    pub fn select(&mut self, selection: Selection) {
        let len = self.buffer.len_chars();
        self.selection = Selection::new(selection.start.min(len), selection.end.min(len));
    }

    /// Current text of the document
    pub fn text(&self) -> String {
        self.buffer.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_range_normalized() {
        assert_eq!(Selection::new(5, 2).range(), 2..5);
        assert!(Selection::collapsed(3).is_collapsed());
    }

    #[test]
    fn test_select_clamps_to_buffer() {
        let mut state = EditorState::default();
        state.replace_text("hello");
        state.select(Selection::new(1, 99));
        assert_eq!(state.selection, Selection::new(1, 5));
        assert_eq!(state.selection.range(), 1..5);
    }

    #[test]
    fn test_replace_text_resets_selection() {
        let mut state = EditorState::default();
        state.replace_text("abc");
        state.select(Selection::new(1, 2));
        state.replace_text("new");
        assert_eq!(state.selection, Selection::collapsed(0));
        assert_eq!(state.text(), "new");
    }
}
