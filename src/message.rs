//! Application message types
//!
//! Defines all messages that can be sent to the application's update function.
//! Messages are organized by category for clear handling and routing. Results
//! of background work (debounce timers, image probes, exports) come back as
//! messages too, so all state changes happen inside `App::update`.

use crate::editor::Format;
use crate::error::{ExportResult, FileError};
use crate::file_handler::{DecodedText, FileCandidate};
use crate::markdown::ImageState;
use crate::state::{NotificationId, Selection};
use std::path::PathBuf;

/// Main application message enum
#[derive(Debug)]
pub enum Message {
    /// Editor operations
    Editor(EditorMessage),

    /// File operations
    File(FileMessage),

    /// Preview operations
    Preview(PreviewMessage),

    /// Export operations
    Export(ExportMessage),

    /// Notification operations
    Notification(NotificationMessage),
}

/// Editor-related messages
#[derive(Debug, Clone)]
pub enum EditorMessage {
    /// The whole text after a keystroke, paste or cut
    TextChanged(String),

    /// Selection moved
    Select(Selection),

    /// Toolbar button pressed
    ApplyFormat(Format),
}

/// File-related messages
#[derive(Debug)]
pub enum FileMessage {
    /// Load a file picked or dropped by the user
    Open(FileCandidate),

    /// File was loaded from disk
    Loaded {
        path: PathBuf,
        document: DecodedText,
    },

    /// Error loading file
    LoadFailed(FileError),

    /// The open document changed on disk
    Changed(PathBuf),
}

/// Preview-related messages
#[derive(Debug, Clone)]
pub enum PreviewMessage {
    /// Render now, bypassing the debounce
    Refresh,

    /// The debounce window of the given generation elapsed
    DebounceElapsed(u64),

    /// An image of render `cycle` finished resolving
    ImageResolved {
        cycle: u64,
        index: usize,
        state: ImageState,
    },
}

/// Export-related messages
#[derive(Debug)]
pub enum ExportMessage {
    /// Export button pressed
    Start,

    /// The background export finished
    Finished(ExportResult<PathBuf>),
}

/// Notification-related messages
#[derive(Debug, Clone)]
pub enum NotificationMessage {
    /// Hide a notification
    Dismiss(NotificationId),
}

impl From<EditorMessage> for Message {
    fn from(msg: EditorMessage) -> Self {
        Message::Editor(msg)
    }
}

impl From<FileMessage> for Message {
    fn from(msg: FileMessage) -> Self {
        Message::File(msg)
    }
}

impl From<PreviewMessage> for Message {
    fn from(msg: PreviewMessage) -> Self {
        Message::Preview(msg)
    }
}

impl From<ExportMessage> for Message {
    fn from(msg: ExportMessage) -> Self {
        Message::Export(msg)
    }
}

impl From<NotificationMessage> for Message {
    fn from(msg: NotificationMessage) -> Self {
        Message::Notification(msg)
    }
}
