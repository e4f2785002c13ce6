//! Transient user notifications
//!
//! Notifications stack in creation order and are dismissed individually,
//! normally by a timer scheduled when they are shown.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Create a new unique notification ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a notification is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Short label for terminal output
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Stack of visible notifications
#[derive(Debug, Default)]
pub struct NotificationCenter {
    active: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a notification and return it
    pub fn push(&mut self, message: impl Into<String>, severity: Severity) -> Notification {
        let notification = Notification {
            id: NotificationId::new(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        };

        match severity {
            Severity::Error => log::error!("{}", notification.message),
            Severity::Warning => log::warn!("{}", notification.message),
            Severity::Info | Severity::Success => log::info!("{}", notification.message),
        }

        self.active.push(notification.clone());
        notification
    }

    /// Remove a notification; false if it was already gone
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    /// Drop every notification older than `ttl` at `now`
    pub fn prune_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.active.len();
        self.active.retain(|n| now - n.timestamp < ttl);
        before - self.active.len()
    }

    /// Visible notifications, oldest first
    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    /// Most recent notification
    pub fn latest(&self) -> Option<&Notification> {
        self.active.last()
    }
}
