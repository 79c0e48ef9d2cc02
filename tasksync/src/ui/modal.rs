//! Modal, loading and confirmation bookkeeping.

use tasksync_proto::{CategoryId, TaskId};

/// Payload attached to an open modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalData {
    /// The task the modal acts on.
    Task(TaskId),
    /// The category the modal acts on.
    Category(CategoryId),
    /// Free-form text.
    Text(String),
}

/// An open modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    /// Name the modal was opened under.
    pub name: String,
    /// Attached data, if any.
    pub data: Option<ModalData>,
}

/// Global loading indicator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadingState {
    /// Whether something is loading.
    pub active: bool,
    /// Optional message shown with the indicator.
    pub message: String,
}

/// Default confirmation dialog title.
pub const DEFAULT_CONFIRM_TITLE: &str = "Confirm";

/// Default confirmation dialog message.
pub const DEFAULT_CONFIRM_MESSAGE: &str = "Are you sure?";

/// A pending yes/no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Dialog title.
    pub title: String,
    /// Question asked.
    pub message: String,
}

impl Default for Confirmation {
    fn default() -> Self {
        Self {
            title: DEFAULT_CONFIRM_TITLE.to_string(),
            message: DEFAULT_CONFIRM_MESSAGE.to_string(),
        }
    }
}
