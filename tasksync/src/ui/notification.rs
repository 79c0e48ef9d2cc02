//! Notification queue entries.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tasksync_proto::Timestamp;

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(uuid::Uuid);

impl NotificationId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
    /// Something needs attention.
    Warning,
    /// Neutral information.
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Auto-dismiss durations per kind, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDurations {
    /// Duration for [`NotificationKind::Success`].
    pub success_ms: u64,
    /// Duration for [`NotificationKind::Error`].
    pub error_ms: u64,
    /// Duration for [`NotificationKind::Warning`].
    pub warning_ms: u64,
    /// Duration for [`NotificationKind::Info`].
    pub info_ms: u64,
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            success_ms: 3000,
            error_ms: 5000,
            warning_ms: 4000,
            info_ms: 3000,
        }
    }
}

impl NotificationDurations {
    /// Duration for `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: NotificationKind) -> Duration {
        let ms = match kind {
            NotificationKind::Success => self.success_ms,
            NotificationKind::Error => self.error_ms,
            NotificationKind::Warning => self.warning_ms,
            NotificationKind::Info => self.info_ms,
        };
        Duration::from_millis(ms)
    }
}

/// A message queued for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Identifier used to dismiss it.
    pub id: NotificationId,
    /// Severity.
    pub kind: NotificationKind,
    /// Text shown to the user.
    pub message: String,
    /// How long it stays before auto-dismiss; zero means until dismissed.
    pub duration: Duration,
    /// When it was queued.
    pub created_at: Timestamp,
}

impl Notification {
    /// Whether the notification should be gone at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.duration.is_zero() && u128::from(now.millis_since(self.created_at)) >= self.duration.as_millis()
    }
}
