//! Shared record definitions for `tasksync`.
//!
//! Everything here is plain data: task and category records, their
//! identifiers, the typed drafts and patches used to create and mutate
//! them, and the postcard codec for persisted collections.

pub mod category;
pub mod codec;
pub mod entity;
pub mod id;
pub mod task;

pub use category::{Category, CategoryDraft, CategoryPatch};
pub use entity::{Entity, EntityKind, ValidationError};
pub use id::{CategoryId, TaskId, Timestamp};
pub use task::{CategoryRef, DueDate, Priority, Task, TaskDraft, TaskPatch, TaskStatus};
