//! Error types for mdpress
//!
//! This module defines all custom error types used throughout the application.
//! Error types are organized by category so every failure can be turned into a
//! user-facing notification without tearing down the running editor.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Editor operation errors
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Preview rendering errors
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Image resolution errors
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Export pipeline errors
    #[error(transparent)]
    Export(#[from] ExportError),

    /// File watcher errors
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// File type is not on the allow-list
    #[error("Unsupported file type: {name}")]
    UnsupportedType { name: String },

    /// File is too large to open
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing file
    #[error("Could not save file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory operation error
    #[error("Directory error: {path}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error saving configuration
    #[error("Could not save configuration: {0}")]
    SaveError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Editor operation errors
#[derive(Error, Debug)]
pub enum EditorError {
    /// Invalid selection range
    #[error("Invalid selection range: {start} to {end}")]
    InvalidSelection { start: usize, end: usize },

    /// Unknown toolbar format identifier
    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

/// Markdown rendering errors, shown inline in the preview
#[derive(Error, Debug)]
pub enum RenderError {
    /// The parser gave up on the input
    #[error("Markdown parser failed: {0}")]
    Parser(String),

    /// Document exceeds the configured render limit
    #[error("Document is too large to preview ({size} bytes, max {max_size} bytes)")]
    TooLarge { size: usize, max_size: usize },
}

/// Image resolution errors
#[derive(Error, Debug)]
pub enum ImageError {
    /// I/O error while reading a local image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reference could not be interpreted as a path or URL
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    /// Network request failed
    #[error("Request failed: {0}")]
    Network(String),

    /// Remote answered with a non-success status
    #[error("Server returned status {0}")]
    Status(u16),

    /// Content is not a recognised image
    #[error("Invalid image format")]
    InvalidFormat,

    /// Attempt did not finish in time
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

/// Errors that can occur during export
#[derive(Error, Debug)]
pub enum ExportError {
    /// Nothing to export
    #[error("Document is empty")]
    EmptyDocument,

    /// An export is already running
    #[error("An export is already in progress")]
    Busy,

    /// Rendered HTML could not be snapshotted
    #[error("Could not snapshot preview: {0}")]
    Snapshot(String),

    /// Page layout or PDF assembly failed
    #[error("PDF generation failed: {0}")]
    Render(String),

    /// Writing the artifact failed
    #[error(transparent)]
    Save(#[from] FileError),

    /// Background task died before reporting
    #[error("Export task failed: {0}")]
    Task(String),
}

/// File watcher errors
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Could not initialize file watcher
    #[error("Could not start file watcher: {0}")]
    InitError(String),

    /// Could not watch path
    #[error("Could not watch path: {path}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Result type alias for rendering
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type alias for image resolution
pub type ImageResult<T> = Result<T, ImageError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

impl FileError {
    /// Create a user-friendly error message suitable for notifications
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound(_) => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::UnsupportedType { .. } => {
                "Please select a Markdown (.md, .markdown) or text (.txt) file.".to_string()
            }
            FileError::FileTooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            FileError::ReadError { .. } => "Error reading the file.".to_string(),
            FileError::WriteError { .. } => {
                "Could not save the file. Check disk space and permissions.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl ExportError {
    /// Create a user-friendly error message suitable for notifications
    pub fn user_message(&self) -> String {
        match self {
            ExportError::EmptyDocument => "Please enter some Markdown content first.".to_string(),
            ExportError::Busy => "An export is already in progress.".to_string(),
            ExportError::Save(e) => format!("Error generating PDF: {}", e.user_message()),
            other => format!("Error generating PDF: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_display() {
        let err = FileError::NotFound(PathBuf::from("/test/file.md"));
        assert!(err.to_string().contains("/test/file.md"));
    }

    #[test]
    fn test_file_error_user_message() {
        let err = FileError::UnsupportedType {
            name: "photo.png".to_string(),
        };
        let msg = err.user_message();
        assert!(msg.contains(".md"));
    }

    #[test]
    fn test_app_error_from_file_error() {
        let file_err = FileError::NotFound(PathBuf::from("/test.md"));
        let app_err: AppError = file_err.into();
        assert!(matches!(app_err, AppError::FileIO(_)));
    }

    #[test]
    fn test_export_error_user_message() {
        assert!(ExportError::EmptyDocument.user_message().contains("Markdown"));
        let msg = ExportError::Render("no pages".to_string()).user_message();
        assert!(msg.starts_with("Error generating PDF"));
        assert!(msg.contains("no pages"));
    }
}
