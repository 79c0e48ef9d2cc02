//! Aggregates and lookups derived from the collections.

use std::collections::HashMap;

use tasksync_proto::{Category, CategoryId, CategoryRef, Priority, Task, TaskStatus};

/// Label shown for tasks without a (resolvable) category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Color shown for tasks without a (resolvable) category.
pub const FALLBACK_COLOR: &str = "#9E9E9E";

/// Counts over a task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    /// Every task.
    pub total: usize,
    /// Active tasks.
    pub active: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Active tasks with high priority.
    pub high_priority: usize,
}

impl TaskStats {
    /// Count `tasks`.
    #[must_use]
    pub fn compute(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Active => {
                    stats.active += 1;
                    if task.priority == Priority::High {
                        stats.high_priority += 1;
                    }
                }
                TaskStatus::Completed => stats.completed += 1,
            }
            stats
        })
    }
}

/// Display name and color for a task's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLabel<'a> {
    /// Category name, or [`UNCATEGORIZED_LABEL`].
    pub name: &'a str,
    /// Category color, or [`FALLBACK_COLOR`].
    pub color: &'a str,
}

const FALLBACK_LABEL: CategoryLabel<'static> = CategoryLabel {
    name: UNCATEGORIZED_LABEL,
    color: FALLBACK_COLOR,
};

/// Read-only index over a category collection.
///
/// Dangling references resolve to the fallback label instead of failing.
#[derive(Debug, Clone, Default)]
pub struct CategoryDirectory {
    categories: Vec<Category>,
    by_id: HashMap<CategoryId, usize>,
}

impl CategoryDirectory {
    /// Index `categories`, preserving their order.
    #[must_use]
    pub fn new(categories: Vec<Category>) -> Self {
        let by_id = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self { categories, by_id }
    }

    /// Look up a category by id.
    #[must_use]
    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.by_id.get(id).map(|&i| &self.categories[i])
    }

    /// Resolve a task's category reference for display.
    #[must_use]
    pub fn resolve(&self, category: &CategoryRef) -> CategoryLabel<'_> {
        category
            .id()
            .and_then(|id| self.get(id))
            .map_or(FALLBACK_LABEL, |c| CategoryLabel {
                name: &c.name,
                color: &c.color,
            })
    }

    /// Category names in collection order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a category by name, ignoring case.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name.to_lowercase() == name)
    }

    /// All categories in collection order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Number of tasks filed under each category, in collection order.
    /// Tasks with missing or dangling categories are not counted.
    #[must_use]
    pub fn task_counts(&self, tasks: &[Task]) -> Vec<(&Category, usize)> {
        let mut counts = vec![0usize; self.categories.len()];
        for task in tasks {
            if let Some(&i) = task.category.id().and_then(|id| self.by_id.get(id)) {
                counts[i] += 1;
            }
        }
        self.categories.iter().zip(counts).collect()
    }
}
