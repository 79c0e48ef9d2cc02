//! Category records.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, ValidationError, check_name};
use crate::id::{CategoryId, Timestamp};

/// A category tasks can be filed under.
///
/// Names should be unique ignoring case, but nothing enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier.
    pub id: CategoryId,
    /// Non-empty display name.
    pub name: String,
    /// Display color, opaque to the core (hex code by convention).
    pub color: String,
}

impl Category {
    /// Creates a category record.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }

    /// The categories a fresh installation starts with.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("cat_1", "Work", "#2196F3"),
            Self::new("cat_2", "Personal", "#4CAF50"),
            Self::new("cat_3", "Shopping", "#FF9800"),
            Self::new("cat_4", "Health", "#F44336"),
            Self::new("cat_5", "Finance", "#9C27B0"),
        ]
    }
}

/// Payload for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryDraft {
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
}

impl CategoryDraft {
    /// Creates a draft with the given name and color.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Partial update for a category. Only `Some` fields are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    /// New name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<String>,
}

impl Entity for Category {
    type Id = CategoryId;
    type Draft = CategoryDraft;
    type Patch = CategoryPatch;

    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> &CategoryId {
        &self.id
    }

    fn provisional_id() -> CategoryId {
        CategoryId::provisional()
    }

    // Categories carry no timestamps.
    fn from_draft(id: CategoryId, draft: &CategoryDraft, _now: Timestamp) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            color: draft.color.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &CategoryPatch, _now: Timestamp) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(color) = &patch.color {
            self.color.clone_from(color);
        }
    }

    fn validate_draft(draft: &CategoryDraft) -> Result<(), ValidationError> {
        check_name(&draft.name)
    }

    fn validate_patch(patch: &CategoryPatch) -> Result<(), ValidationError> {
        match (&patch.name, &patch.color) {
            (None, None) => Err(ValidationError::EmptyPatch),
            (Some(name), _) => check_name(name),
            (None, Some(_)) => Ok(()),
        }
    }
}
