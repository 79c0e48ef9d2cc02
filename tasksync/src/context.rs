//! Application context.
//!
//! [`AppContext`] is built once at startup and passed around explicitly.
//! It owns one coordinator per entity kind, the UI state, the active view
//! criteria and the receiving end of the sync event channel.

use std::sync::Arc;

use tokio::sync::mpsc;

use tasksync_proto::{Category, Task};

use crate::remote::RemoteService;
use crate::storage::DurableStorage;
use crate::sync::{LoadOutcome, SyncCoordinator, SyncError, SyncEvent, TaskSync};
use crate::ui::{NotificationDurations, UiState};
use crate::view::{self, CategoryDirectory, SortSpec, TaskStats, ViewCriteria};

/// Storage key of the persisted task collection.
pub const TASKS_KEY: &str = "tasks";

/// Storage key of the persisted category collection.
pub const CATEGORIES_KEY: &str = "categories";

/// Optional wiring for [`AppContext::with_options`].
#[derive(Clone, Default)]
pub struct ContextOptions {
    /// Where collections are persisted; `None` keeps everything in memory.
    pub storage: Option<Arc<dyn DurableStorage>>,
    /// Notification durations for the UI state.
    pub notifications: NotificationDurations,
    /// Sort of the initial view criteria.
    pub default_sort: SortSpec,
}

/// Everything the presentation layer needs, in one place.
pub struct AppContext<TR, CR>
where
    TR: RemoteService<Task>,
    CR: RemoteService<Category>,
{
    tasks: Arc<TaskSync<TR>>,
    categories: Arc<SyncCoordinator<Category, CR>>,
    ui: UiState,
    criteria: ViewCriteria,
    events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl<TR, CR> AppContext<TR, CR>
where
    TR: RemoteService<Task>,
    CR: RemoteService<Category>,
{
    /// In-memory context with default options.
    pub fn new(task_remote: TR, category_remote: CR) -> Self {
        Self::with_options(task_remote, category_remote, ContextOptions::default())
    }

    /// Context wired according to `options`.
    pub fn with_options(task_remote: TR, category_remote: CR, options: ContextOptions) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let mut tasks = TaskSync::new(task_remote, event_tx.clone());
        let mut categories = SyncCoordinator::new(category_remote, event_tx);
        if let Some(storage) = options.storage {
            tasks = tasks.with_storage(Arc::clone(&storage), TASKS_KEY);
            categories = categories.with_storage(storage, CATEGORIES_KEY);
        }

        Self {
            tasks: Arc::new(tasks),
            categories: Arc::new(categories),
            ui: UiState::with_durations(options.notifications),
            criteria: ViewCriteria::sorted_by(options.default_sort),
            events,
        }
    }

    /// The task coordinator. Clone the `Arc` to run operations concurrently.
    pub const fn task_sync(&self) -> &Arc<TaskSync<TR>> {
        &self.tasks
    }

    /// The category coordinator.
    pub const fn category_sync(&self) -> &Arc<SyncCoordinator<Category, CR>> {
        &self.categories
    }

    /// Restore both collections from storage.
    ///
    /// Tasks default to empty, categories to [`Category::defaults`].
    pub fn load_persisted(&self) -> (LoadOutcome, LoadOutcome) {
        (
            self.tasks.load_persisted(Vec::new),
            self.categories.load_persisted(Category::defaults),
        )
    }

    /// Fetch both collections from their remotes concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the other fetch still completes.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let (tasks, categories) = tokio::join!(self.tasks.fetch_all(), self.categories.fetch_all());
        tasks?;
        categories?;
        Ok(())
    }

    /// Apply every pending sync event to the UI state.
    /// Returns how many were applied.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            tracing::trace!(?event, "applying sync event");
            self.ui.apply(&event);
            applied += 1;
        }
        applied
    }

    /// The UI state.
    pub const fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Mutable UI state, for modal and notification handling.
    pub const fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    /// The active view criteria.
    pub const fn criteria(&self) -> &ViewCriteria {
        &self.criteria
    }

    /// Mutable view criteria.
    pub const fn criteria_mut(&mut self) -> &mut ViewCriteria {
        &mut self.criteria
    }

    /// Reset filters and search, keeping the sort.
    pub fn clear_filters(&mut self) {
        self.criteria.clear_filters();
    }

    /// Tasks under the active criteria.
    pub fn visible_tasks(&self) -> Vec<Task> {
        self.tasks
            .read(|store| view::derive_view(store.get_all(), &self.criteria))
    }

    /// Counts over all tasks, ignoring the criteria.
    pub fn stats(&self) -> TaskStats {
        self.tasks.read(|store| TaskStats::compute(store.get_all()))
    }

    /// Index of the current categories.
    pub fn categories(&self) -> CategoryDirectory {
        CategoryDirectory::new(self.categories.records())
    }
}
