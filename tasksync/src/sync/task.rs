//! Task-specific sync operations.

use tasksync_proto::{Task, TaskId, TaskPatch};

use super::{SyncCoordinator, SyncError, SyncOp};
use crate::remote::RemoteService;

/// Coordinator for tasks.
pub type TaskSync<R> = SyncCoordinator<Task, R>;

impl<R: RemoteService<Task>> SyncCoordinator<Task, R> {
    /// Flip a task between active and completed.
    ///
    /// The current status is read once the task's lock is held, so queued
    /// toggles each see the result of the previous one.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFoundLocal`] if the task is not in the store (no
    /// remote call is made), or [`SyncError::Remote`] if the remote call
    /// fails (the status is restored).
    pub async fn toggle_status(&self, id: &TaskId) -> Result<Task, SyncError> {
        self.mutate(SyncOp::ToggleStatus, id, |task| {
            TaskPatch::status(task.status.toggled())
        })
        .await
    }
}
