//! Task records and their create/update payloads.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, ValidationError, check_title};
use crate::id::{CategoryId, TaskId, Timestamp};

/// Calendar date a task is due on.
pub type DueDate = chrono::NaiveDate;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet done.
    #[default]
    Active,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// The opposite status, used by toggle.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Completed,
            Self::Completed => Self::Active,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Task priority. Variant order is the sort order: low < medium < high.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Lowest priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Highest priority.
    High,
}

impl Priority {
    /// Fixed ordinal used for sorting (low = 1, medium = 2, high = 3).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// The category a task is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CategoryRef {
    /// Sentinel for tasks without a category.
    #[default]
    Uncategorized,
    /// Reference to a category by identifier. May dangle.
    Id(CategoryId),
}

impl CategoryRef {
    /// Returns the referenced identifier, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&CategoryId> {
        match self {
            Self::Uncategorized => None,
            Self::Id(id) => Some(id),
        }
    }
}

impl From<CategoryId> for CategoryRef {
    fn from(id: CategoryId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uncategorized => write!(f, "uncategorized"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// A task record.
///
/// `created_at` is set once; `updated_at` is refreshed on every mutation
/// and never falls below `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, immutable after creation.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Free-form description, may be empty.
    pub description: String,
    /// Completion state.
    pub status: TaskStatus,
    /// Priority level.
    pub priority: Priority,
    /// Category reference or the uncategorized sentinel.
    pub category: CategoryRef,
    /// Optional due date.
    pub due_date: Option<DueDate>,
    /// When the task was created.
    pub created_at: Timestamp,
    /// When the task was last modified.
    pub updated_at: Timestamp,
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Title of the new task.
    pub title: String,
    /// Description of the new task.
    pub description: String,
    /// Initial status; `None` means [`TaskStatus::Active`].
    pub status: Option<TaskStatus>,
    /// Priority of the new task.
    pub priority: Priority,
    /// Category of the new task.
    pub category: CategoryRef,
    /// Optional due date.
    pub due_date: Option<DueDate>,
}

impl TaskDraft {
    /// Starts a draft with the given title and defaults for everything else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Files the task under a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category = CategoryRef::Id(category.into());
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DueDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Partial update for a task. Only `Some` fields are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New category.
    pub category: Option<CategoryRef>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<DueDate>>,
}

impl TaskPatch {
    /// A patch that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
    }
}

impl Entity for Task {
    type Id = TaskId;
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &TaskId {
        &self.id
    }

    fn provisional_id() -> TaskId {
        TaskId::provisional()
    }

    fn from_draft(id: TaskId, draft: &TaskDraft, now: Timestamp) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            status: draft.status.unwrap_or_default(),
            priority: draft.priority,
            category: draft.category.clone(),
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: &TaskPatch, now: Timestamp) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    fn validate_draft(draft: &TaskDraft) -> Result<(), ValidationError> {
        check_title(&draft.title)
    }

    fn validate_patch(patch: &TaskPatch) -> Result<(), ValidationError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        match &patch.title {
            Some(title) => check_title(title),
            None => Ok(()),
        }
    }
}
