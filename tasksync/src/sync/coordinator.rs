//! The optimistic sync coordinator.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, mpsc, watch};

use tasksync_proto::codec::{self, CodecError};
use tasksync_proto::{Entity, Timestamp};

use super::{KeyedLocks, SyncError, SyncEvent, SyncOp};
use crate::remote::RemoteService;
use crate::storage::DurableStorage;
use crate::store::{EntityStore, RecordSnapshot};

/// Result of [`SyncCoordinator::load_persisted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The persisted collection was restored.
    Restored {
        /// Number of records loaded.
        count: usize,
    },
    /// Nothing was persisted; defaults were installed.
    Missing,
    /// The persisted collection was unreadable; defaults were installed.
    Corrupt,
}

struct Persistence<E: Entity> {
    storage: Arc<dyn DurableStorage>,
    key: String,
    encode: fn(&[E]) -> Result<Vec<u8>, CodecError>,
    decode: fn(&[u8]) -> Result<Vec<E>, CodecError>,
    /// Last-known-good collection: only remote-confirmed state, in store
    /// order. Optimistic changes never reach it.
    confirmed: Mutex<Confirmed<E>>,
    /// Sequence number of the last snapshot written. Held while saving so
    /// writes are serialized and never go backwards.
    written: Mutex<u64>,
}

struct Confirmed<E: Entity> {
    records: EntityStore<E>,
    /// Bumped on every change; orders encoded snapshots.
    sequence: u64,
}

/// Coordinates optimistic mutations of one entity kind.
///
/// Every mutation follows the same lifecycle: validate, apply locally,
/// call the remote, then commit the authoritative record or roll back.
/// Mutations on the same identifier are serialized in issue order;
/// different identifiers proceed concurrently. [`fetch_all`](Self::fetch_all)
/// waits until no mutation is between its optimistic apply and its
/// reconcile, and mutations issued after a pending fetch wait for it.
///
/// The store lock is never held across an `.await`.
pub struct SyncCoordinator<E: Entity, R> {
    store: Mutex<EntityStore<E>>,
    remote: R,
    locks: KeyedLocks<E::Id>,
    /// Mutations hold a read guard from optimistic apply to reconcile;
    /// fetch-all takes the write guard.
    gate: RwLock<()>,
    events: mpsc::UnboundedSender<SyncEvent>,
    persistence: Option<Persistence<E>>,
}

impl<E: Entity, R: RemoteService<E>> SyncCoordinator<E, R> {
    /// Create a coordinator with an empty store.
    ///
    /// Outcomes are reported on `events`; a closed receiver is ignored.
    pub fn new(remote: R, events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self {
            store: Mutex::new(EntityStore::new()),
            remote,
            locks: KeyedLocks::new(),
            gate: RwLock::new(()),
            events,
            persistence: None,
        }
    }

    /// Persist the collection to `storage` under `key` after every
    /// successful commit.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self
    where
        E: Serialize + DeserializeOwned,
    {
        let current = self.store.lock().get_all().to_vec();
        self.persistence = Some(Persistence {
            storage,
            key: key.into(),
            encode: codec::encode_collection::<E>,
            decode: codec::decode_collection::<E>,
            confirmed: Mutex::new(Confirmed {
                records: EntityStore::with_records(current),
                sequence: 0,
            }),
            written: Mutex::new(0),
        });
        self
    }

    /// Seed the local store without contacting the remote. The records
    /// count as confirmed.
    #[must_use]
    pub fn with_records(self, records: Vec<E>) -> Self {
        self.install(records);
        self
    }

    /// The remote service.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Copy of all records in insertion order.
    pub fn records(&self) -> Vec<E> {
        self.store.lock().get_all().to_vec()
    }

    /// Copy of one record.
    pub fn get(&self, id: &E::Id) -> Option<E> {
        self.store.lock().get(id).cloned()
    }

    /// Number of records in the local store.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Whether the local store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Run `f` against the store without copying it out.
    pub fn read<T>(&self, f: impl FnOnce(&EntityStore<E>) -> T) -> T {
        f(&self.store.lock())
    }

    /// Current store revision.
    pub fn revision(&self) -> u64 {
        self.store.lock().revision()
    }

    /// Subscribe to store revisions.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.lock().subscribe()
    }

    /// Load the last persisted collection into the store.
    ///
    /// Falls back to `defaults` when nothing was persisted, no storage is
    /// attached, or the stored bytes cannot be decoded. A corrupt
    /// collection is logged and reported as a [`SyncEvent::Failed`] with
    /// [`SyncError::StorageCorrupt`], never as a hard error.
    pub fn load_persisted(&self, defaults: impl FnOnce() -> Vec<E>) -> LoadOutcome {
        let Some(p) = &self.persistence else {
            self.install(defaults());
            return LoadOutcome::Missing;
        };

        let bytes = match p.storage.load(&p.key) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(entity = %E::KIND, key = %p.key, error = %e, "persisted collection unavailable");
                None
            }
        };
        let Some(bytes) = bytes else {
            self.install(defaults());
            return LoadOutcome::Missing;
        };

        match (p.decode)(&bytes) {
            Ok(records) => {
                let count = self.install(records);
                tracing::info!(entity = %E::KIND, count, "restored persisted collection");
                LoadOutcome::Restored { count }
            }
            Err(e) => {
                tracing::warn!(entity = %E::KIND, key = %p.key, error = %e, "persisted collection corrupt, using defaults");
                self.install(defaults());
                self.emit(SyncEvent::Failed {
                    kind: E::KIND,
                    op: SyncOp::LoadPersisted,
                    error: SyncError::StorageCorrupt {
                        kind: E::KIND,
                        reason: e.to_string(),
                    },
                });
                LoadOutcome::Corrupt
            }
        }
    }

    /// Replace the local collection with the remote's.
    ///
    /// On failure the store is left untouched. Returns the record count.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] if the remote call fails.
    pub async fn fetch_all(&self) -> Result<usize, SyncError> {
        let _gate = self.gate.write().await;
        self.started(SyncOp::FetchAll);
        tracing::debug!(entity = %E::KIND, "fetching all records");

        match self.remote.list_all().await {
            Ok(records) => {
                let count = {
                    let mut store = self.store.lock();
                    store.replace_all(records.clone());
                    store.len()
                };
                self.persist(|confirmed| confirmed.replace_all(records));
                tracing::info!(entity = %E::KIND, count, "fetch complete");
                self.succeeded(SyncOp::FetchAll, None);
                Ok(count)
            }
            Err(e) => Err(self.fail(SyncOp::FetchAll, e.into())),
        }
    }

    /// Create a record from `draft`.
    ///
    /// A provisional record appears in the store immediately and is
    /// replaced, at the same position, by the authoritative record.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] if the draft is invalid (the store is not
    /// touched), or [`SyncError::Remote`] if the remote call fails (the
    /// provisional record is removed).
    pub async fn create(&self, draft: E::Draft) -> Result<E, SyncError> {
        if let Err(e) = E::validate_draft(&draft) {
            return Err(self.fail(SyncOp::Create, e.into()));
        }

        let _gate = self.gate.read().await;
        let provisional_id = E::provisional_id();
        let _guard = self.locks.acquire(&provisional_id).await;

        let provisional = E::from_draft(provisional_id.clone(), &draft, Timestamp::now());
        self.store.lock().upsert(provisional);
        self.started(SyncOp::Create);
        tracing::debug!(entity = %E::KIND, id = %provisional_id, "optimistic create applied");

        match self.remote.create(&draft).await {
            Ok(record) => {
                let preceding: Vec<E::Id> = {
                    let mut store = self.store.lock();
                    store.swap_id(&provisional_id, record.clone());
                    let position = store.position(record.id()).unwrap_or(0);
                    store.get_all()[..position]
                        .iter()
                        .map(|r| r.id().clone())
                        .collect()
                };
                let committed = record.clone();
                self.persist(move |confirmed| {
                    // Place it after the nearest confirmed record that
                    // precedes it locally.
                    let position = preceding
                        .iter()
                        .rev()
                        .find_map(|id| confirmed.position(id))
                        .map_or(0, |p| p + 1);
                    confirmed.reinstate(RecordSnapshot {
                        position,
                        record: committed,
                    });
                });
                tracing::info!(entity = %E::KIND, provisional = %provisional_id, id = %record.id(), "create committed");
                self.succeeded(SyncOp::Create, Some(record.id().to_string()));
                Ok(record)
            }
            Err(e) => {
                self.store.lock().remove(&provisional_id);
                Err(self.fail(SyncOp::Create, e.into()))
            }
        }
    }

    /// Apply `patch` to the record `id`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] for an invalid patch,
    /// [`SyncError::NotFoundLocal`] if the record is not in the store (no
    /// remote call is made), or [`SyncError::Remote`] if the remote call
    /// fails (the record is restored exactly).
    pub async fn update(&self, id: &E::Id, patch: E::Patch) -> Result<E, SyncError> {
        if let Err(e) = E::validate_patch(&patch) {
            return Err(self.fail(SyncOp::Update, e.into()));
        }
        self.mutate(SyncOp::Update, id, move |_| patch).await
    }

    /// Delete the record `id`.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFoundLocal`] if the record is not in the store, or
    /// [`SyncError::Remote`] if the remote call fails (the record is
    /// re-inserted at its original position).
    pub async fn delete(&self, id: &E::Id) -> Result<(), SyncError> {
        let _gate = self.gate.read().await;
        let _guard = self.locks.acquire(id).await;

        let captured = {
            let mut store = self.store.lock();
            let captured = store.capture(id);
            if captured.is_some() {
                store.remove(id);
            }
            captured
        };
        let Some(before) = captured else {
            return Err(self.fail(SyncOp::Delete, self.not_found(id)));
        };
        self.started(SyncOp::Delete);
        tracing::debug!(entity = %E::KIND, %id, position = before.position, "optimistic delete applied");

        match self.remote.delete(id).await {
            Ok(deleted) => {
                self.persist(|confirmed| {
                    confirmed.remove(&deleted);
                });
                tracing::info!(entity = %E::KIND, id = %deleted, "delete committed");
                self.succeeded(SyncOp::Delete, Some(deleted.to_string()));
                Ok(())
            }
            Err(e) => {
                self.store.lock().reinstate(before);
                Err(self.fail(SyncOp::Delete, e.into()))
            }
        }
    }

    /// Shared update lifecycle. `make_patch` sees the record as it is once
    /// the identifier's lock is held.
    pub(super) async fn mutate(
        &self,
        op: SyncOp,
        id: &E::Id,
        make_patch: impl FnOnce(&E) -> E::Patch + Send,
    ) -> Result<E, SyncError> {
        let _gate = self.gate.read().await;
        let _guard = self.locks.acquire(id).await;

        let captured = self.store.lock().capture(id);
        let Some(before) = captured else {
            return Err(self.fail(op, self.not_found(id)));
        };
        let patch = make_patch(&before.record);
        self.store.lock().patch(id, &patch, Timestamp::now());
        self.started(op);
        tracing::debug!(entity = %E::KIND, %id, %op, "optimistic update applied");

        match self.remote.update(id, &patch).await {
            Ok(record) => {
                if self.store.lock().replace_if_present(record.clone()) {
                    let committed = record.clone();
                    self.persist(move |confirmed| {
                        confirmed.upsert(committed);
                    });
                } else {
                    tracing::debug!(entity = %E::KIND, %id, "record gone before commit, response dropped");
                }
                tracing::info!(entity = %E::KIND, %id, %op, "update committed");
                self.succeeded(op, Some(id.to_string()));
                Ok(record)
            }
            Err(e) => {
                self.store.lock().reinstate(before);
                Err(self.fail(op, e.into()))
            }
        }
    }

    fn not_found(&self, id: &E::Id) -> SyncError {
        SyncError::NotFoundLocal {
            kind: E::KIND,
            id: id.to_string(),
        }
    }

    /// Replace the local collection and the confirmed collection alike,
    /// without writing. Returns the record count.
    fn install(&self, records: Vec<E>) -> usize {
        if let Some(p) = &self.persistence {
            let mut confirmed = p.confirmed.lock();
            confirmed.records.replace_all(records.clone());
            confirmed.sequence += 1;
        }
        let mut store = self.store.lock();
        store.replace_all(records);
        store.len()
    }

    /// Apply a committed change to the confirmed collection and write it
    /// through the attached storage.
    ///
    /// Encoding happens under the confirmed lock; the save happens after
    /// it is released, so store readers never wait on disk I/O. A snapshot
    /// older than the last one written is discarded. Failures are logged;
    /// the in-memory state stays authoritative.
    fn persist(&self, commit: impl FnOnce(&mut EntityStore<E>)) {
        let Some(p) = &self.persistence else {
            return;
        };
        let (sequence, encoded) = {
            let mut confirmed = p.confirmed.lock();
            commit(&mut confirmed.records);
            confirmed.sequence += 1;
            (confirmed.sequence, (p.encode)(confirmed.records.get_all()))
        };
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(entity = %E::KIND, key = %p.key, %error, "failed to encode collection");
                return;
            }
        };

        let mut written = p.written.lock();
        if *written >= sequence {
            tracing::debug!(entity = %E::KIND, sequence, "newer snapshot already written");
            return;
        }
        match p.storage.save(&p.key, &bytes) {
            Ok(()) => *written = sequence,
            Err(error) => {
                tracing::warn!(entity = %E::KIND, key = %p.key, %error, "failed to persist collection");
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn started(&self, op: SyncOp) {
        self.emit(SyncEvent::Started { kind: E::KIND, op });
    }

    fn succeeded(&self, op: SyncOp, id: Option<String>) {
        self.emit(SyncEvent::Succeeded {
            kind: E::KIND,
            op,
            id,
        });
    }

    /// Logs and reports a failure, returning the error for the caller.
    fn fail(&self, op: SyncOp, error: SyncError) -> SyncError {
        tracing::warn!(entity = %E::KIND, %op, %error, "sync operation failed");
        self.emit(SyncEvent::Failed {
            kind: E::KIND,
            op,
            error: error.clone(),
        });
        error
    }
}
