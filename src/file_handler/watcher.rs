//! File system watcher for the `watch` command
//!
//! Watches the directory containing the open document and forwards changes
//! to that one file. Editors often save by writing a temp file and renaming
//! it over the original, so the parent directory is watched rather than the
//! file itself.

use crate::error::WatcherError;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Events from the document watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The document was created or rewritten
    Modified(PathBuf),

    /// The document disappeared
    Removed(PathBuf),

    /// Watcher error occurred
    Error(String),
}

/// Watches a single document on disk
pub struct DocumentWatcher {
    /// Kept alive for as long as events are wanted
    _watcher: RecommendedWatcher,

    /// The watched document
    path: PathBuf,
}

impl DocumentWatcher {
    /// Start watching `path`, sending events into `tx`
    pub fn new(path: impl AsRef<Path>, tx: UnboundedSender<WatchEvent>) -> Result<Self, WatcherError> {
        let path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => convert_event(&target, event),
                    Err(e) => Some(WatchEvent::Error(e.to_string())),
                };
                if let Some(event) = event {
                    let _ = tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| WatcherError::InitError(e.to_string()))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::WatchError {
                path: parent.clone(),
                source,
            })?;

        log::info!("Watching {}", path.display());
        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    /// The document being watched
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map a raw notify event onto the watched document
fn convert_event(target: &Path, event: Event) -> Option<WatchEvent> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Modified(target.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Removed(target.to_path_buf())),
        _ => None,
    }
}
