//! UI coordination state.
//!
//! [`UiState`] is pure bookkeeping: the notification queue, which modals
//! are open, the loading indicator and the confirmation dialog. It holds
//! no business data and performs no validation. Sync outcomes reach it
//! through [`UiState::apply`].

pub mod modal;
pub mod notification;

use std::time::Duration;

use tasksync_proto::Timestamp;

use crate::sync::{SyncErrorKind, SyncEvent, SyncOp};

pub use modal::{Confirmation, LoadingState, Modal, ModalData};
pub use notification::{Notification, NotificationDurations, NotificationId, NotificationKind};

/// Notifications, modals, loading indicator and confirmation dialog.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    notifications: Vec<Notification>,
    durations: NotificationDurations,
    modals: Vec<Modal>,
    loading: LoadingState,
    /// Fetches currently in flight, so overlapping fetches share one indicator.
    pending_fetches: usize,
    confirmation: Option<Confirmation>,
}

impl UiState {
    /// Empty state with default notification durations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty state with custom notification durations.
    #[must_use]
    pub fn with_durations(durations: NotificationDurations) -> Self {
        Self {
            durations,
            ..Self::default()
        }
    }

    // --- notifications ---

    /// Queue a notification with the default duration for its kind.
    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> NotificationId {
        let duration = self.durations.for_kind(kind);
        self.notify_for(kind, message, duration)
    }

    /// Queue a notification with an explicit duration.
    pub fn notify_for(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> NotificationId {
        let id = NotificationId::new();
        let message = message.into();
        tracing::debug!(%id, %kind, %message, "notification queued");
        self.notifications.push(Notification {
            id,
            kind,
            message,
            duration,
            created_at: Timestamp::now(),
        });
        id
    }

    /// Queue a success notification.
    pub fn success(&mut self, message: impl Into<String>) -> NotificationId {
        self.notify(NotificationKind::Success, message)
    }

    /// Queue an error notification.
    pub fn error(&mut self, message: impl Into<String>) -> NotificationId {
        self.notify(NotificationKind::Error, message)
    }

    /// Queue a warning notification.
    pub fn warning(&mut self, message: impl Into<String>) -> NotificationId {
        self.notify(NotificationKind::Warning, message)
    }

    /// Queue an info notification.
    pub fn info(&mut self, message: impl Into<String>) -> NotificationId {
        self.notify(NotificationKind::Info, message)
    }

    /// Remove one notification. Unknown ids are ignored.
    pub fn dismiss(&mut self, id: NotificationId) {
        self.notifications.retain(|n| n.id != id);
    }

    /// Remove every notification.
    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Drop notifications whose duration has elapsed at `now`.
    /// Returns how many were removed.
    pub fn expire(&mut self, now: Timestamp) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired(now));
        before - self.notifications.len()
    }

    /// Queued notifications, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    // --- modals ---

    /// Open `name`, replacing its data if already open.
    pub fn open_modal(&mut self, name: impl Into<String>, data: Option<ModalData>) {
        let name = name.into();
        if let Some(modal) = self.modals.iter_mut().find(|m| m.name == name) {
            modal.data = data;
        } else {
            self.modals.push(Modal { name, data });
        }
    }

    /// Close every other modal, then open `name`.
    pub fn open_exclusive(&mut self, name: impl Into<String>, data: Option<ModalData>) {
        let name = name.into();
        self.modals.clear();
        self.modals.push(Modal { name, data });
    }

    /// Close `name`. Closing a modal that is not open does nothing.
    pub fn close_modal(&mut self, name: &str) {
        self.modals.retain(|m| m.name != name);
    }

    /// Close every modal.
    pub fn close_all_modals(&mut self) {
        self.modals.clear();
    }

    /// Whether `name` is open.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.modals.iter().any(|m| m.name == name)
    }

    /// Data attached to `name`, if open with data.
    #[must_use]
    pub fn modal_data(&self, name: &str) -> Option<&ModalData> {
        self.modals
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.data.as_ref())
    }

    /// Open modals in the order they were opened.
    #[must_use]
    pub fn open_modals(&self) -> &[Modal] {
        &self.modals
    }

    // --- loading ---

    /// Turn the loading indicator on or off, clearing its message.
    pub fn set_loading(&mut self, active: bool) {
        self.loading = LoadingState {
            active,
            message: String::new(),
        };
        if !active {
            self.pending_fetches = 0;
        }
    }

    /// Turn the loading indicator on with a message.
    pub fn set_loading_with_message(&mut self, message: impl Into<String>) {
        self.loading = LoadingState {
            active: true,
            message: message.into(),
        };
    }

    /// Turn the loading indicator off.
    pub fn clear_loading(&mut self) {
        self.set_loading(false);
    }

    /// Current loading indicator.
    #[must_use]
    pub const fn loading(&self) -> &LoadingState {
        &self.loading
    }

    // --- confirmation ---

    /// Show a confirmation dialog; `None` uses the default title or message.
    pub fn show_confirmation(&mut self, title: Option<String>, message: Option<String>) {
        let defaults = Confirmation::default();
        self.confirmation = Some(Confirmation {
            title: title.unwrap_or(defaults.title),
            message: message.unwrap_or(defaults.message),
        });
    }

    /// Hide the confirmation dialog.
    pub fn hide_confirmation(&mut self) {
        self.confirmation = None;
    }

    /// The visible confirmation dialog.
    #[must_use]
    pub const fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    // --- sync events ---

    /// Reflect a sync outcome.
    ///
    /// Each failure yields exactly one error notification and each
    /// successful mutation one success notification. Fetches drive the
    /// loading indicator. Corrupt persisted data is recovered silently.
    pub fn apply(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Started {
                kind,
                op: SyncOp::FetchAll,
            } => {
                self.pending_fetches += 1;
                self.set_loading_with_message(format!("Loading {kind}s..."));
            }
            SyncEvent::Started { .. } => {}
            SyncEvent::Succeeded { kind, op, .. } => {
                if *op == SyncOp::FetchAll {
                    self.fetch_finished();
                } else {
                    self.success(format!("{} {}", kind.label(), op.past_tense()));
                }
            }
            SyncEvent::Failed { kind, op, error } => {
                if *op == SyncOp::FetchAll {
                    self.fetch_finished();
                }
                if error.kind() == SyncErrorKind::StorageCorrupt {
                    return;
                }
                self.error(format!("Failed to {} {kind}: {error}", op.verb()));
            }
        }
    }

    fn fetch_finished(&mut self) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
        if self.pending_fetches == 0 {
            self.clear_loading();
        }
    }
}
