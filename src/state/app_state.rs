//! Root application state container
//!
//! Contains the central state for the editor session: the open document,
//! the preview pane, the export status and visible notifications.

use super::{EditorState, Notification, NotificationCenter};
use crate::markdown::PreviewPane;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Most notifications kept for a front end that has not collected them
pub const MAX_UNANNOUNCED: usize = 64;

/// Whether an export is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStatus {
    #[default]
    Idle,

    /// Started at `since`; further requests are rejected until it finishes
    Busy { since: DateTime<Utc> },
}

impl ExportStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, ExportStatus::Busy { .. })
    }
}

/// Root state for the editor session
#[derive(Debug, Default)]
pub struct AppState {
    /// Text and selection
    pub editor: EditorState,

    /// Where the document came from, if it was loaded from disk
    pub document_path: Option<PathBuf>,

    /// What the preview currently shows
    pub preview: PreviewPane,

    /// Export in flight, if any
    pub export: ExportStatus,

    /// Visible notifications
    pub notifications: NotificationCenter,

    /// Path of the most recent successful export
    pub last_export: Option<PathBuf>,

    /// Number of renders performed
    pub render_count: u64,

    /// Notifications raised since the front end last collected them, oldest first
    unannounced: VecDeque<Notification>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative image references resolve against
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.document_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_busy()
    }

    /// Queue `notification` for the front end, dropping the oldest past the cap
    pub fn announce(&mut self, notification: Notification) {
        if self.unannounced.len() == MAX_UNANNOUNCED {
            self.unannounced.pop_front();
        }
        self.unannounced.push_back(notification);
    }

    pub fn has_unannounced(&self) -> bool {
        !self.unannounced.is_empty()
    }

    /// Drain queued notifications, oldest first
    pub fn take_unannounced(&mut self) -> Vec<Notification> {
        self.unannounced.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Severity;

    #[test]
    fn test_base_dir_follows_document() {
        let mut state = AppState::new();
        assert!(state.base_dir().is_none());

        state.document_path = Some(PathBuf::from("/notes/today.md"));
        assert_eq!(state.base_dir(), Some(PathBuf::from("/notes")));

        state.document_path = Some(PathBuf::from("today.md"));
        assert!(state.base_dir().is_none());
    }

    #[test]
    fn test_export_status() {
        let mut state = AppState::new();
        assert!(!state.is_exporting());
        state.export = ExportStatus::Busy { since: Utc::now() };
        assert!(state.is_exporting());
    }

    #[test]
    fn test_unannounced_is_capped() {
        let mut state = AppState::new();
        let mut center = NotificationCenter::new();
        for i in 0..MAX_UNANNOUNCED + 5 {
            state.announce(center.push(format!("saved {}", i), Severity::Info));
        }
        assert!(state.has_unannounced());

        let queued = state.take_unannounced();
        assert_eq!(queued.len(), MAX_UNANNOUNCED);
        assert_eq!(queued[0].message, "saved 5");
        assert_eq!(queued[MAX_UNANNOUNCED - 1].message, format!("saved {}", MAX_UNANNOUNCED + 4));
        assert!(!state.has_unannounced());
    }
}
