//! Optimistic synchronization between the local store and the remote service.
//!
//! The [`SyncCoordinator`] applies every mutation to the local
//! [`EntityStore`](crate::store::EntityStore) first, sends it to the
//! [`RemoteService`](crate::remote::RemoteService), and then either commits
//! the authoritative response or rolls the store back to the captured
//! pre-mutation state.
//!
//! Outcomes are reported twice: as the `Result` of each call, and as a
//! [`SyncEvent`] on the channel passed to the coordinator, which the UI
//! layer turns into notifications.

pub mod coordinator;
pub mod locks;
mod task;

use std::fmt;

use tasksync_proto::{EntityKind, ValidationError};

use crate::remote::RemoteError;

pub use coordinator::{LoadOutcome, SyncCoordinator};
pub use locks::{KeyedGuard, KeyedLocks};
pub use task::TaskSync;

/// Errors produced by sync operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The input was rejected before anything changed.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The remote call failed; local state was rolled back.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// The record does not exist locally; nothing was sent.
    #[error("{kind} {id} not found")]
    NotFoundLocal {
        /// Entity kind looked up.
        kind: EntityKind,
        /// Identifier that was missing.
        id: String,
    },

    /// The persisted collection could not be decoded.
    #[error("stored {kind} data is unreadable: {reason}")]
    StorageCorrupt {
        /// Entity kind whose collection was unreadable.
        kind: EntityKind,
        /// Decoder message.
        reason: String,
    },
}

/// Discriminant of [`SyncError`], for routing without matching payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorKind {
    /// See [`SyncError::Validation`].
    Validation,
    /// See [`SyncError::Remote`].
    Remote,
    /// See [`SyncError::NotFoundLocal`].
    NotFoundLocal,
    /// See [`SyncError::StorageCorrupt`].
    StorageCorrupt,
}

impl SyncError {
    /// The error's kind.
    #[must_use]
    pub const fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Validation(_) => SyncErrorKind::Validation,
            Self::Remote(_) => SyncErrorKind::Remote,
            Self::NotFoundLocal { .. } => SyncErrorKind::NotFoundLocal,
            Self::StorageCorrupt { .. } => SyncErrorKind::StorageCorrupt,
        }
    }
}

/// The operation a [`SyncEvent`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOp {
    /// Full refresh from the remote.
    FetchAll,
    /// Record creation.
    Create,
    /// Partial update.
    Update,
    /// Deletion.
    Delete,
    /// Task status flip.
    ToggleStatus,
    /// Loading the persisted collection at startup.
    LoadPersisted,
}

impl SyncOp {
    /// Verb used in user-facing messages ("Failed to {verb} task").
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::FetchAll => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ToggleStatus => "toggle",
            Self::LoadPersisted => "restore",
        }
    }

    /// Past tense used in success messages ("Task created").
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::FetchAll => "loaded",
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::ToggleStatus => "status updated",
            Self::LoadPersisted => "restored",
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchAll => write!(f, "fetch_all"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::ToggleStatus => write!(f, "toggle_status"),
            Self::LoadPersisted => write!(f, "load_persisted"),
        }
    }
}

/// Progress and outcome of a sync operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The operation has been applied optimistically (or, for a fetch,
    /// the request is in flight).
    Started {
        /// Entity kind.
        kind: EntityKind,
        /// Operation.
        op: SyncOp,
    },
    /// The remote accepted the operation and the store was reconciled.
    Succeeded {
        /// Entity kind.
        kind: EntityKind,
        /// Operation.
        op: SyncOp,
        /// Authoritative identifier of the affected record, if any.
        id: Option<String>,
    },
    /// The operation failed and local state is back to what it was.
    Failed {
        /// Entity kind.
        kind: EntityKind,
        /// Operation.
        op: SyncOp,
        /// What went wrong.
        error: SyncError,
    },
}

impl SyncEvent {
    /// Entity kind the event concerns.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Started { kind, .. } | Self::Succeeded { kind, .. } | Self::Failed { kind, .. } => {
                *kind
            }
        }
    }

    /// Operation the event concerns.
    #[must_use]
    pub const fn op(&self) -> SyncOp {
        match self {
            Self::Started { op, .. } | Self::Succeeded { op, .. } | Self::Failed { op, .. } => *op,
        }
    }
}
