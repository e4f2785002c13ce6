//! File handler module for mdpress
//!
//! Handles all file system operations including:
//! - Reading documents with encoding detection
//! - Type validation against the document allow-list
//! - Atomic writes for exported artifacts
//! - Watching the open document for external changes

pub mod io;
pub mod load;
pub mod watcher;

pub use io::*;
pub use load::*;
pub use watcher::*;
