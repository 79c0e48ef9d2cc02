//! In-memory entity store with snapshot/restore for rollback.
//!
//! [`EntityStore`] holds one entity kind in insertion order, indexed by
//! identifier. Every operation is synchronous and infallible: a missing
//! identifier is a normal outcome, never an error. Each mutation bumps a
//! revision counter published on a [`tokio::sync::watch`] channel so the
//! presentation layer can re-derive its views.

use std::collections::HashMap;

use tokio::sync::watch;

use tasksync_proto::{Entity, Timestamp};

/// A full copy of a store's contents, used for whole-collection rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot<E>(Vec<E>);

impl<E> StoreSnapshot<E> {
    /// Records captured in the snapshot, in insertion order.
    #[must_use]
    pub fn records(&self) -> &[E] {
        &self.0
    }
}

/// A single record together with the position it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot<E> {
    /// Index of the record in insertion order at capture time.
    pub position: usize,
    /// The record as it was.
    pub record: E,
}

/// Ordered, identifier-indexed collection of one entity kind.
///
/// Invariant: no two records share an identifier, and `index` maps each
/// identifier to its position in `records`.
pub struct EntityStore<E: Entity> {
    records: Vec<E>,
    index: HashMap<E::Id, usize>,
    revision: watch::Sender<u64>,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("kind", &E::KIND)
            .field("len", &self.records.len())
            .field("revision", &*self.revision.borrow())
            .finish()
    }
}

impl<E: Entity> EntityStore<E> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            revision,
        }
    }

    /// Creates a store pre-populated with `records` (see [`replace_all`](Self::replace_all)).
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let mut store = Self::new();
        store.replace_all(records);
        store
    }

    /// Replaces the entire collection.
    ///
    /// Duplicate identifiers are resolved last-write-wins: the later record
    /// takes the slot of the first occurrence.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = E>) {
        let mut deduped: Vec<E> = Vec::new();
        let mut index: HashMap<E::Id, usize> = HashMap::new();
        for record in records {
            if let Some(&pos) = index.get(record.id()) {
                deduped[pos] = record;
            } else {
                index.insert(record.id().clone(), deduped.len());
                deduped.push(record);
            }
        }
        self.records = deduped;
        self.index = index;
        self.bump();
    }

    /// Inserts `record` at the end if its identifier is new, otherwise
    /// replaces the existing record in place. Returns the replaced record.
    pub fn upsert(&mut self, record: E) -> Option<E> {
        let previous = if let Some(&pos) = self.index.get(record.id()) {
            Some(std::mem::replace(&mut self.records[pos], record))
        } else {
            self.index.insert(record.id().clone(), self.records.len());
            self.records.push(record);
            None
        };
        self.bump();
        previous
    }

    /// Merges `patch` into the record with identifier `id`.
    ///
    /// Fields absent from the patch are preserved. Returns the updated
    /// record, or `None` if no such record exists.
    pub fn patch(&mut self, id: &E::Id, patch: &E::Patch, now: Timestamp) -> Option<E> {
        let pos = *self.index.get(id)?;
        let record = &mut self.records[pos];
        record.apply_patch(patch, now);
        let updated = record.clone();
        self.bump();
        Some(updated)
    }

    /// Replaces an existing record; does nothing if its identifier is absent.
    ///
    /// Returns whether the record was applied. Used when committing an
    /// authoritative response, so that a record deleted in the meantime is
    /// not resurrected.
    pub fn replace_if_present(&mut self, record: E) -> bool {
        let Some(&pos) = self.index.get(record.id()) else {
            return false;
        };
        self.records[pos] = record;
        self.bump();
        true
    }

    /// Replaces the record `old_id` with `record`, keeping its position.
    ///
    /// Handles the provisional-to-authoritative identifier change after a
    /// create. If `old_id` is gone, `record` is upserted instead.
    pub fn swap_id(&mut self, old_id: &E::Id, record: E) {
        let Some(old_pos) = self.index.get(old_id).copied() else {
            self.upsert(record);
            return;
        };
        if record.id() == old_id {
            self.records[old_pos] = record;
            self.bump();
            return;
        }
        if self.index.contains_key(record.id()) {
            // The authoritative record is already present; drop the placeholder.
            self.remove(old_id);
            self.upsert(record);
            return;
        }
        self.index.remove(old_id);
        self.index.insert(record.id().clone(), old_pos);
        self.records[old_pos] = record;
        self.bump();
    }

    /// Removes the record with identifier `id`, returning it if present.
    pub fn remove(&mut self, id: &E::Id) -> Option<E> {
        let pos = self.index.remove(id)?;
        let removed = self.records.remove(pos);
        self.reindex_from(pos);
        self.bump();
        Some(removed)
    }

    /// Returns the record with identifier `id`.
    #[must_use]
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    /// Returns every record in insertion order.
    #[must_use]
    pub fn get_all(&self) -> &[E] {
        &self.records
    }

    /// Whether a record with identifier `id` exists.
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Position of `id` in insertion order.
    #[must_use]
    pub fn position(&self, id: &E::Id) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Captures the full collection.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot<E> {
        StoreSnapshot(self.records.clone())
    }

    /// Restores a previously captured collection in one step.
    pub fn restore(&mut self, snapshot: StoreSnapshot<E>) {
        self.replace_all(snapshot.0);
    }

    /// Captures a single record and its position.
    #[must_use]
    pub fn capture(&self, id: &E::Id) -> Option<RecordSnapshot<E>> {
        let position = *self.index.get(id)?;
        Some(RecordSnapshot {
            position,
            record: self.records[position].clone(),
        })
    }

    /// Puts a captured record back.
    ///
    /// If the identifier still exists the record is replaced in place;
    /// otherwise it is re-inserted at its captured position (clamped to
    /// the current length).
    pub fn reinstate(&mut self, snapshot: RecordSnapshot<E>) {
        if let Some(&pos) = self.index.get(snapshot.record.id()) {
            self.records[pos] = snapshot.record;
        } else {
            let pos = snapshot.position.min(self.records.len());
            self.records.insert(pos, snapshot.record);
            self.reindex_from(pos);
        }
        self.bump();
    }

    /// Current revision; increases on every mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, record) in self.records.iter().enumerate().skip(start) {
            self.index.insert(record.id().clone(), pos);
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
