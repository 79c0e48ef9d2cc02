//! Durable key/value storage for persisted collections.
//!
//! Defines the [`DurableStorage`] trait the sync coordinator writes
//! encoded collections through. Implementations:
//! - [`MemoryStorage`]: in-process map, for tests
//! - [`file::FileStorage`]: one file per key under a data directory

pub mod file;

use std::collections::HashMap;

use parking_lot::Mutex;

/// Errors that can occur in a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key contains characters the backend cannot store.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// An I/O error from the backing medium.
    #[error("storage I/O error for {key}: {source}")]
    Io {
        /// Key being read or written.
        key: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Byte-oriented key/value storage that survives restarts.
///
/// Writes replace the previous value atomically: a reader sees either the
/// old bytes or the new bytes, never a mix.
pub trait DurableStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the key is invalid or the write fails.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Load the bytes stored under `key`, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the key is invalid or the read fails.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// In-memory [`DurableStorage`] for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DurableStorage for MemoryStorage {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }
}
