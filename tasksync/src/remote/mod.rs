//! Remote service abstraction.
//!
//! Defines the [`RemoteService`] trait the sync coordinator talks to.
//! The service is the source of truth: it assigns authoritative
//! identifiers on create and returns the stored record on every write.
//! Concrete implementations include:
//! - [`memory::InMemoryRemote`]: in-process service with injectable
//!   latency and failures, for tests and the CLI

pub mod memory;

use std::fmt;
use std::future::Future;

use tasksync_proto::Entity;

/// Identifies one kind of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// Fetch every record.
    List,
    /// Create a record from a draft.
    Create,
    /// Apply a partial update.
    Update,
    /// Delete a record.
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors reported by a remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The record does not exist on the service.
    #[error("record {0} not found on server")]
    NotFound(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
}

/// Authoritative backing service for one entity kind.
///
/// All operations may fail with a [`RemoteError`]. Implementations must be
/// safe to call concurrently from multiple tasks.
pub trait RemoteService<E: Entity>: Send + Sync {
    /// Fetch every record.
    fn list_all(&self) -> impl Future<Output = Result<Vec<E>, RemoteError>> + Send;

    /// Create a record, returning it with its authoritative identifier.
    fn create(&self, draft: &E::Draft) -> impl Future<Output = Result<E, RemoteError>> + Send;

    /// Apply a partial update, returning the stored record.
    fn update(
        &self,
        id: &E::Id,
        patch: &E::Patch,
    ) -> impl Future<Output = Result<E, RemoteError>> + Send;

    /// Delete a record, returning the deleted identifier.
    fn delete(&self, id: &E::Id) -> impl Future<Output = Result<E::Id, RemoteError>> + Send;
}
