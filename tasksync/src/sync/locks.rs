//! Per-identifier async locks.
//!
//! Operations on the same record must run one at a time and in the order
//! they were issued; operations on different records run in parallel.
//! [`KeyedLocks`] hands out a fair [`tokio::sync::Mutex`] per key, kept
//! only through [`Weak`] references so idle keys cost nothing once their
//! last guard is dropped.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Dead entries are only purged once the map grows past this size.
const CLEANUP_THRESHOLD: usize = 128;

/// Purge dead entries on every Nth acquisition.
const CLEANUP_INTERVAL: usize = 64;

/// A map of per-key async mutexes.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Weak<tokio::sync::Mutex<()>>>>,
    acquire_counter: AtomicUsize,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Create an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            acquire_counter: AtomicUsize::new(0),
        }
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Waiters on the same key are admitted in FIFO order.
    pub async fn acquire(&self, key: &K) -> KeyedGuard {
        let mutex = {
            let mut map = self.locks.lock();
            let mutex = map.get(key).and_then(Weak::upgrade).unwrap_or_else(|| {
                let fresh = Arc::new(tokio::sync::Mutex::new(()));
                map.insert(key.clone(), Arc::downgrade(&fresh));
                fresh
            });

            let tick = self.acquire_counter.fetch_add(1, Ordering::Relaxed);
            if map.len() > CLEANUP_THRESHOLD && tick.is_multiple_of(CLEANUP_INTERVAL) {
                map.retain(|_, weak| weak.strong_count() > 0);
            }
            mutex
        };
        KeyedGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of entries in the map, live or dead.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.locks.lock().len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a key's lock until dropped.
pub struct KeyedGuard {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}
