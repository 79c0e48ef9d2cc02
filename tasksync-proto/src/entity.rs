//! The [`Entity`] abstraction shared by tasks and categories.
//!
//! The store and the sync coordinator are generic over this trait, so
//! one implementation serves both entity kinds.

use std::fmt;
use std::hash::Hash;

use crate::id::Timestamp;

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Maximum allowed category name length in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 64;

/// Malformed input to a create or update, rejected before any store change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title is empty or whitespace only.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds [`MAX_TITLE_LENGTH`] characters.
    #[error("task title too long (max {MAX_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Category name is empty or whitespace only.
    #[error("category name cannot be empty")]
    NameEmpty,
    /// Category name exceeds [`MAX_CATEGORY_NAME_LENGTH`] characters.
    #[error("category name too long (max {MAX_CATEGORY_NAME_LENGTH} characters)")]
    NameTooLong,
    /// A patch that would change nothing.
    #[error("update contains no changes")]
    EmptyPatch,
}

/// Which kind of entity a store or coordinator manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A [`Task`](crate::Task) record.
    Task,
    /// A [`Category`](crate::Category) record.
    Category,
}

impl EntityKind {
    /// Capitalized label used in user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Category => "Category",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Category => write!(f, "category"),
        }
    }
}

/// A record kept in an entity store and synchronized with a remote service.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Identifier type; unique within a store.
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + From<String> + Send + Sync + 'static;
    /// Payload of a create request.
    type Draft: Clone + fmt::Debug + Send + Sync + 'static;
    /// Typed partial update; absent fields are preserved.
    type Patch: Clone + fmt::Debug + Send + Sync + 'static;

    /// Which kind of entity this is.
    const KIND: EntityKind;

    /// Returns the record's identifier.
    fn id(&self) -> &Self::Id;

    /// Mints a provisional identifier for an optimistic create.
    fn provisional_id() -> Self::Id;

    /// Builds a full record from a draft, stamping both timestamps with `now`.
    fn from_draft(id: Self::Id, draft: &Self::Draft, now: Timestamp) -> Self;

    /// Merges `patch` into the record and refreshes its update timestamp.
    fn apply_patch(&mut self, patch: &Self::Patch, now: Timestamp);

    /// Checks a draft before any optimistic mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first problem found.
    fn validate_draft(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Checks a patch before any optimistic mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first problem found.
    fn validate_patch(patch: &Self::Patch) -> Result<(), ValidationError>;
}

/// Validates a task title: non-blank and within the length limit.
pub(crate) fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

/// Validates a category name: non-blank and within the length limit.
pub(crate) fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}
