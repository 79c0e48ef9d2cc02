//! In-process remote service.
//!
//! [`InMemoryRemote`] behaves like a real backend: it assigns
//! `<prefix>-<n>` identifiers, stamps timestamps, and answers with the
//! stored record. Tests can add latency, hold calls with
//! [`pause`](InMemoryRemote::pause), and inject failures per operation.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use tasksync_proto::{Entity, Timestamp};

use super::{RemoteError, RemoteOp, RemoteService};

struct RemoteState<E> {
    records: Vec<E>,
    next_id: u64,
    injected: HashMap<RemoteOp, VecDeque<RemoteError>>,
    fail_all: Option<RemoteError>,
    calls: HashMap<RemoteOp, usize>,
}

/// In-memory [`RemoteService`] with controllable latency and failures.
pub struct InMemoryRemote<E: Entity> {
    id_prefix: String,
    latency: Duration,
    state: Mutex<RemoteState<E>>,
    paused: watch::Sender<bool>,
}

impl<E: Entity> InMemoryRemote<E> {
    /// Create an empty service issuing identifiers as `<id_prefix>-<n>`.
    pub fn new(id_prefix: impl Into<String>) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            id_prefix: id_prefix.into(),
            latency: Duration::ZERO,
            state: Mutex::new(RemoteState {
                records: Vec::new(),
                next_id: 1,
                injected: HashMap::new(),
                fail_all: None,
                calls: HashMap::new(),
            }),
            paused,
        }
    }

    /// Seed the service with existing records.
    ///
    /// The identifier counter continues after the highest seeded
    /// `<id_prefix>-<n>` so new records never collide with seeded ones.
    #[must_use]
    pub fn with_records(self, records: Vec<E>) -> Self {
        self.seed(records);
        self
    }

    /// Replace the service's records, as [`with_records`](Self::with_records).
    pub fn seed(&self, records: Vec<E>) {
        let highest = records
            .iter()
            .filter_map(|r| self.sequence_of(&r.id().to_string()))
            .max()
            .unwrap_or(0);
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(highest + 1);
        state.records = records;
    }

    /// Delay every call by `latency` before it is answered.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next call of `op` fail with [`RemoteError::Unavailable`].
    pub fn fail_next(&self, op: RemoteOp) {
        self.fail_next_with(op, RemoteError::Unavailable(format!("injected {op} failure")));
    }

    /// Make the next call of `op` fail with `error`. Calls queue up.
    pub fn fail_next_with(&self, op: RemoteOp, error: RemoteError) {
        self.state
            .lock()
            .injected
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Fail every call with `error` until cleared with `None`.
    pub fn fail_all(&self, error: Option<RemoteError>) {
        self.state.lock().fail_all = error;
    }

    /// Hold all calls until [`resume`](Self::resume).
    ///
    /// Failure decisions are made when a call is released, so failures
    /// injected while paused apply to calls already waiting.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Release calls held by [`pause`](Self::pause).
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Number of calls of `op` received so far (including failed ones).
    #[must_use]
    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Copy of the records currently held by the service.
    #[must_use]
    pub fn records(&self) -> Vec<E> {
        self.state.lock().records.clone()
    }

    fn sequence_of(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.id_prefix.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    /// Counts the call, applies latency and pause, then decides whether
    /// the call fails.
    async fn admit(&self, op: RemoteOp) -> Result<(), RemoteError> {
        *self.state.lock().calls.entry(op).or_insert(0) += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut paused = self.paused.subscribe();
        if paused.wait_for(|p| !*p).await.is_err() {
            return Err(RemoteError::Unavailable("service shut down".into()));
        }

        let mut state = self.state.lock();
        if let Some(error) = state.injected.get_mut(&op).and_then(VecDeque::pop_front) {
            tracing::debug!(%op, %error, "injected remote failure");
            return Err(error);
        }
        if let Some(error) = state.fail_all.clone() {
            return Err(error);
        }
        Ok(())
    }
}

impl<E: Entity> RemoteService<E> for InMemoryRemote<E> {
    async fn list_all(&self) -> Result<Vec<E>, RemoteError> {
        self.admit(RemoteOp::List).await?;
        Ok(self.records())
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        self.admit(RemoteOp::Create).await?;
        E::validate_draft(draft).map_err(|e| RemoteError::Rejected(e.to_string()))?;

        let mut state = self.state.lock();
        let id = loop {
            let candidate = E::Id::from(format!("{}-{}", self.id_prefix, state.next_id));
            state.next_id += 1;
            if !state.records.iter().any(|r| r.id() == &candidate) {
                break candidate;
            }
        };
        let record = E::from_draft(id, draft, Timestamp::now());
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &E::Id, patch: &E::Patch) -> Result<E, RemoteError> {
        self.admit(RemoteOp::Update).await?;
        E::validate_patch(patch).map_err(|e| RemoteError::Rejected(e.to_string()))?;

        let mut state = self.state.lock();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        record.apply_patch(patch, Timestamp::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &E::Id) -> Result<E::Id, RemoteError> {
        self.admit(RemoteOp::Delete).await?;

        let mut state = self.state.lock();
        let pos = state
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        state.records.remove(pos);
        Ok(id.clone())
    }
}
