//! Derived task views.
//!
//! [`derive_view`] is a pure function from a task collection and a
//! [`ViewCriteria`] to the list the user sees. The stages always run in
//! the same order: filter, then search, then sort. Nothing here mutates
//! the store.

pub mod sort;
pub mod summary;

use std::fmt;
use std::str::FromStr;

use tasksync_proto::{CategoryId, CategoryRef, Priority, Task, TaskStatus};

pub use sort::{SortDirection, SortField, SortSpec};
pub use summary::{CategoryDirectory, CategoryLabel, TaskStats};

/// Filter on task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    /// Every task.
    #[default]
    All,
    /// Only active tasks.
    Active,
    /// Only completed tasks.
    Completed,
}

impl StatusFilter {
    /// Whether a task with `status` passes.
    #[must_use]
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status == TaskStatus::Active,
            Self::Completed => status == TaskStatus::Completed,
        }
    }
}

/// Filter on task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PriorityFilter {
    /// Every priority.
    #[default]
    All,
    /// Exactly this priority.
    Only(Priority),
}

impl PriorityFilter {
    /// Whether a task with `priority` passes.
    #[must_use]
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Only(p) => p == priority,
        }
    }
}

/// Filter on task category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    /// Every category.
    #[default]
    All,
    /// Only tasks without a category.
    Uncategorized,
    /// Only tasks filed under this category.
    Id(CategoryId),
}

impl CategoryFilter {
    /// Whether a task filed under `category` passes.
    #[must_use]
    pub fn matches(&self, category: &CategoryRef) -> bool {
        match (self, category) {
            (Self::All, _) | (Self::Uncategorized, CategoryRef::Uncategorized) => true,
            (Self::Id(want), CategoryRef::Id(have)) => want == have,
            _ => false,
        }
    }
}

/// Everything that shapes the derived view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewCriteria {
    /// Status filter.
    pub status: StatusFilter,
    /// Priority filter.
    pub priority: PriorityFilter,
    /// Category filter.
    pub category: CategoryFilter,
    /// Free-text query over title and description.
    pub search: String,
    /// Sort order.
    pub sort: SortSpec,
}

impl ViewCriteria {
    /// Default criteria with the given sort.
    #[must_use]
    pub fn sorted_by(sort: SortSpec) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// Set the status filter.
    #[must_use]
    pub const fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Set the priority filter.
    #[must_use]
    pub const fn with_priority(mut self, priority: PriorityFilter) -> Self {
        self.priority = priority;
        self
    }

    /// Set the category filter.
    #[must_use]
    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    /// Set the search query.
    #[must_use]
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    /// Set the sort.
    #[must_use]
    pub const fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Reset filters and search; the sort is kept.
    pub fn clear_filters(&mut self) {
        self.status = StatusFilter::All;
        self.priority = PriorityFilter::All;
        self.category = CategoryFilter::All;
        self.search.clear();
    }

    /// Whether any filter or search is active.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.status != StatusFilter::All
            || self.priority != PriorityFilter::All
            || self.category != CategoryFilter::All
            || !self.search.trim().is_empty()
    }

    /// Whether `task` passes every filter and the search.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task.status)
            && self.priority.matches(task.priority)
            && self.category.matches(&task.category)
            && matches_search(task, &self.search)
    }
}

/// Case-insensitive substring match on title or description.
/// A blank query matches everything.
#[must_use]
pub fn matches_search(task: &Task, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle) || task.description.to_lowercase().contains(&needle)
}

/// Filter, search and sort `tasks` under `criteria`.
#[must_use]
pub fn derive_view(tasks: &[Task], criteria: &ViewCriteria) -> Vec<Task> {
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|t| criteria.matches(t))
        .cloned()
        .collect();
    criteria.sort.sort(&mut visible);
    tracing::trace!(total = tasks.len(), visible = visible.len(), "view derived");
    visible
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Priority>()
            .map(Self::Only)
            .map_err(|_| format!("unknown priority filter: {s}"))
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty category filter".to_string()),
            "all" => Ok(Self::All),
            "uncategorized" | "none" => Ok(Self::Uncategorized),
            id => Ok(Self::Id(CategoryId::new(id))),
        }
    }
}
