//! Editor module for mdpress
//!
//! Text storage and the formatting toolbar that edits it.

pub mod buffer;
pub mod toolbar;

pub use buffer::TextBuffer;
pub use toolbar::{apply_format, Format};
