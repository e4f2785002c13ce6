//! Document loading with type validation
//!
//! A file picked by the user (or named on the command line) is checked
//! against an allow-list before any bytes are read.

use super::io::{read_file, DecodedText};
use crate::error::{FileError, FileResult};
use std::path::{Path, PathBuf};

/// MIME types accepted regardless of extension
const TEXT_MIME_TYPES: &[&str] = &["text/markdown", "text/x-markdown", "text/plain"];

/// MIME types that carry no information; the extension decides
const FALLBACK_MIME_TYPES: &[&str] = &["", "application/octet-stream"];

/// Extensions accepted for documents
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// A file offered for loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Where the bytes live
    pub path: PathBuf,
    /// MIME type reported by the source, if any
    pub mime: Option<String>,
}

impl FileCandidate {
    /// Candidate with no reported MIME type
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: None,
        }
    }

    /// Candidate with a reported MIME type
    pub fn with_mime(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime: Some(mime.into()),
        }
    }

    /// Display name used in notifications
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Check if path has an accepted document extension
pub fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            DOCUMENT_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Decide whether a candidate may be loaded
pub fn is_allowed(candidate: &FileCandidate) -> bool {
    let mime = candidate
        .mime
        .as_deref()
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if TEXT_MIME_TYPES.contains(&mime.as_str()) {
        return true;
    }
    FALLBACK_MIME_TYPES.contains(&mime.as_str()) && has_document_extension(&candidate.path)
}

/// Validate and read a candidate document
pub async fn load_document(candidate: &FileCandidate) -> FileResult<DecodedText> {
    if !is_allowed(candidate) {
        log::warn!(
            "Rejected {} (type {:?})",
            candidate.path.display(),
            candidate.mime
        );
        return Err(FileError::UnsupportedType {
            name: candidate.display_name(),
        });
    }

    let decoded = read_file(&candidate.path).await?;
    log::info!(
        "Loaded {} ({} bytes, {})",
        candidate.path.display(),
        decoded.size_bytes,
        decoded.encoding.display_name()
    );
    Ok(decoded)
}
