use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::composite::{is_composite_key, partial_key_range};
use crate::error::{LedgerError, LedgerOp, LedgerResult};
use crate::traits::{
    Backend, HistoryEntry, HistoryIter, KeyValue, LedgerIterator, LedgerPort, StateIter,
};

/// Pending writes of one key space: `None` marks a delete.
type WriteSet = BTreeMap<String, Option<Vec<u8>>>;

/// In-memory ledger for tests, local demos, and embedding.
///
/// Simulates the host ledger closely enough to exercise the core:
///
/// - writes are buffered in the active transaction and applied atomically on
///   [`commit`](Self::commit), or discarded on [`rollback`](Self::rollback);
/// - reads inside a transaction see that transaction's own writes;
/// - every committed public write or delete appends to the key's history;
/// - private collections keep no history, and their hashes are BLAKE3
///   digests of the plaintext.
///
/// For tests it also counts accessor calls per [`LedgerOp`], tracks open
/// iterators, and can inject failures with [`fail_on`](Self::fail_on).
pub struct InMemoryLedger {
    backend: Backend,
    inner: RwLock<LedgerState>,
    ops: Mutex<HashMap<LedgerOp, usize>>,
    faults: Mutex<HashSet<LedgerOp>>,
    open_iterators: Arc<AtomicUsize>,
}

struct LedgerState {
    creator: String,
    world: BTreeMap<String, Vec<u8>>,
    private: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    history: HashMap<String, Vec<HistoryEntry>>,
    active: Option<ActiveTx>,
}

struct ActiveTx {
    tx_id: String,
    timestamp: DateTime<Utc>,
    creator: String,
    writes: WriteSet,
    private_writes: BTreeMap<String, WriteSet>,
}

impl InMemoryLedger {
    /// A simulated backend whose transactions are submitted by `org1MSP`.
    pub fn new() -> Self {
        Self {
            backend: Backend::Simulated,
            inner: RwLock::new(LedgerState {
                creator: "org1MSP".into(),
                world: BTreeMap::new(),
                private: BTreeMap::new(),
                history: HashMap::new(),
                active: None,
            }),
            ops: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashSet::new()),
            open_iterators: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report a different backend kind (e.g. to exercise production paths).
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Identity used for transactions begun from now on.
    pub fn set_creator(&self, creator: impl Into<String>) -> LedgerResult<()> {
        self.write_state()?.creator = creator.into();
        Ok(())
    }

    /// Start a transaction. Only one may be active at a time.
    pub fn begin(&self, tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> LedgerResult<()> {
        let mut state = self.write_state()?;
        if let Some(active) = &state.active {
            return Err(LedgerError::TransactionActive(active.tx_id.clone()));
        }
        let creator = state.creator.clone();
        state.active = Some(ActiveTx {
            tx_id: tx_id.into(),
            timestamp,
            creator,
            writes: BTreeMap::new(),
            private_writes: BTreeMap::new(),
        });
        Ok(())
    }

    /// Apply the active transaction's writes and record history.
    pub fn commit(&self) -> LedgerResult<()> {
        let mut state = self.write_state()?;
        let tx = state.active.take().ok_or(LedgerError::NoActiveTransaction)?;
        let public_writes = tx.writes.len();

        for (key, value) in tx.writes {
            match &value {
                Some(bytes) => {
                    state.world.insert(key.clone(), bytes.clone());
                }
                None => {
                    state.world.remove(&key);
                }
            }
            state.history.entry(key).or_default().push(HistoryEntry {
                tx_id: tx.tx_id.clone(),
                timestamp: tx.timestamp,
                value,
            });
        }

        for (collection, writes) in tx.private_writes {
            let store = state.private.entry(collection).or_default();
            for (key, value) in writes {
                match value {
                    Some(bytes) => {
                        store.insert(key, bytes);
                    }
                    None => {
                        store.remove(&key);
                    }
                }
            }
        }

        debug!(tx_id = %tx.tx_id, writes = public_writes, "transaction committed");
        Ok(())
    }

    /// Discard the active transaction's writes.
    pub fn rollback(&self) -> LedgerResult<()> {
        let mut state = self.write_state()?;
        let tx = state.active.take().ok_or(LedgerError::NoActiveTransaction)?;
        debug!(tx_id = %tx.tx_id, "transaction rolled back");
        Ok(())
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    pub fn transaction<T, E>(
        &self,
        tx_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        f: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<LedgerError>,
    {
        self.begin(tx_id, timestamp)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                self.rollback()?;
                Err(e)
            }
        }
    }

    /// Make every call through `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_on(&self, op: LedgerOp) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).insert(op);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of calls made through `op`.
    pub fn op_count(&self, op: LedgerOp) -> usize {
        self.ops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_op_counts(&self) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Iterators handed out and not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Number of committed public keys, composite keys included.
    pub fn committed_len(&self) -> usize {
        self.inner.read().map(|s| s.world.len()).unwrap_or(0)
    }

    fn write_state(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::Poisoned)
    }

    fn read_state(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::Poisoned)
    }

    /// Count the access and apply any injected fault.
    fn enter(&self, op: LedgerOp) -> LedgerResult<()> {
        *self
            .ops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(op)
            .or_insert(0) += 1;
        if self.is_faulted(op) {
            return Err(LedgerError::backend(op, "injected fault"));
        }
        Ok(())
    }

    fn is_faulted(&self, op: LedgerOp) -> bool {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&op)
    }

    fn iterator<T: 'static>(&self, items: Vec<T>, fail_first: Option<LedgerOp>) -> Box<MemoryIterator<T>> {
        self.open_iterators.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryIterator {
            items: items.into_iter(),
            open: Arc::clone(&self.open_iterators),
            closed: false,
            fail_first,
        })
    }

    fn state_scan(&self, start: &str, end: &str, composite: bool) -> LedgerResult<Vec<KeyValue>> {
        let state = self.read_state()?;
        let pending = state.active.as_ref().map(|tx| &tx.writes);
        Ok(merged_range(&state.world, pending, start, end, composite))
    }

    fn private_scan(
        &self,
        collection: &str,
        start: &str,
        end: &str,
        composite: bool,
    ) -> LedgerResult<Vec<KeyValue>> {
        check_collection(collection)?;
        let state = self.read_state()?;
        let empty = BTreeMap::new();
        let committed = state.private.get(collection).unwrap_or(&empty);
        let pending = state
            .active
            .as_ref()
            .and_then(|tx| tx.private_writes.get(collection));
        Ok(merged_range(committed, pending, start, end, composite))
    }

    fn read_private(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        check_collection(collection)?;
        let state = self.read_state()?;
        let pending = state
            .active
            .as_ref()
            .and_then(|tx| tx.private_writes.get(collection))
            .and_then(|writes| writes.get(key));
        if let Some(value) = pending {
            return Ok(value.clone());
        }
        Ok(state
            .private
            .get(collection)
            .and_then(|store| store.get(key))
            .cloned())
    }

    fn stage(&self, collection: Option<&str>, key: &str, value: Option<Vec<u8>>) -> LedgerResult<()> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        let mut state = self.write_state()?;
        let tx = state.active.as_mut().ok_or(LedgerError::NoActiveTransaction)?;
        let writes = match collection {
            Some(collection) => tx.private_writes.entry(collection.to_string()).or_default(),
            None => &mut tx.writes,
        };
        writes.insert(key.to_string(), value);
        Ok(())
    }

    fn with_active<T>(&self, f: impl FnOnce(&ActiveTx) -> T) -> LedgerResult<T> {
        let state = self.read_state()?;
        state
            .active
            .as_ref()
            .map(f)
            .ok_or(LedgerError::NoActiveTransaction)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("backend", &self.backend)
            .field("key_count", &self.committed_len())
            .field("open_iterators", &self.open_iterators())
            .finish()
    }
}

impl LedgerPort for InMemoryLedger {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn tx_id(&self) -> LedgerResult<String> {
        self.with_active(|tx| tx.tx_id.clone())
    }

    fn tx_timestamp(&self) -> LedgerResult<DateTime<Utc>> {
        self.with_active(|tx| tx.timestamp)
    }

    fn creator(&self) -> LedgerResult<String> {
        self.with_active(|tx| tx.creator.clone())
    }

    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.enter(LedgerOp::GetState)?;
        let state = self.read_state()?;
        if let Some(pending) = state.active.as_ref().and_then(|tx| tx.writes.get(key)) {
            return Ok(pending.clone());
        }
        Ok(state.world.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.enter(LedgerOp::PutState)?;
        self.stage(None, key, Some(value.to_vec()))
    }

    fn del_state(&self, key: &str) -> LedgerResult<()> {
        self.enter(LedgerOp::DelState)?;
        self.stage(None, key, None)
    }

    fn state_range(&self, start: &str, end: &str) -> LedgerResult<StateIter<'_>> {
        self.enter(LedgerOp::RangeQuery)?;
        let items = self.state_scan(start, end, false)?;
        Ok(self.iterator(items, None))
    }

    fn state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>> {
        self.enter(LedgerOp::RangeQuery)?;
        let (start, end) = partial_key_range(object_type, attributes)?;
        let items = self.state_scan(&start, &end, true)?;
        Ok(self.iterator(items, None))
    }

    fn get_private(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.enter(LedgerOp::GetPrivate)?;
        self.read_private(collection, key)
    }

    fn get_private_hash(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.enter(LedgerOp::GetPrivateHash)?;
        let value = self.read_private(collection, key)?;
        Ok(value.map(|bytes| blake3::hash(&bytes).as_bytes().to_vec()))
    }

    fn put_private(&self, collection: &str, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.enter(LedgerOp::PutPrivate)?;
        check_collection(collection)?;
        self.stage(Some(collection), key, Some(value.to_vec()))
    }

    fn del_private(&self, collection: &str, key: &str) -> LedgerResult<()> {
        self.enter(LedgerOp::DelPrivate)?;
        check_collection(collection)?;
        self.stage(Some(collection), key, None)
    }

    fn private_range(
        &self,
        collection: &str,
        start: &str,
        end: &str,
    ) -> LedgerResult<StateIter<'_>> {
        self.enter(LedgerOp::PrivateRangeQuery)?;
        let items = self.private_scan(collection, start, end, false)?;
        Ok(self.iterator(items, None))
    }

    fn private_by_partial_composite_key(
        &self,
        collection: &str,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>> {
        self.enter(LedgerOp::PrivateRangeQuery)?;
        let (start, end) = partial_key_range(object_type, attributes)?;
        let items = self.private_scan(collection, &start, &end, true)?;
        Ok(self.iterator(items, None))
    }

    fn history_for_key(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        self.enter(LedgerOp::HistoryQuery)?;
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        let entries = self
            .read_state()?
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();
        let fail_first = self
            .is_faulted(LedgerOp::HistoryNext)
            .then_some(LedgerOp::HistoryNext);
        Ok(self.iterator(entries, fail_first))
    }
}

/// Snapshot iterator; the ledger lock is not held while iterating.
struct MemoryIterator<T> {
    items: std::vec::IntoIter<T>,
    open: Arc<AtomicUsize>,
    closed: bool,
    fail_first: Option<LedgerOp>,
}

impl<T> LedgerIterator for MemoryIterator<T> {
    type Item = T;

    fn next_entry(&mut self) -> LedgerResult<Option<T>> {
        if self.closed {
            return Err(LedgerError::IteratorClosed);
        }
        if let Some(op) = self.fail_first.take() {
            return Err(LedgerError::backend(op, "injected fault"));
        }
        Ok(self.items.next())
    }

    fn close(&mut self) -> LedgerResult<()> {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn check_collection(collection: &str) -> LedgerResult<()> {
    if collection.is_empty() {
        return Err(LedgerError::InvalidKey("collection must not be empty".into()));
    }
    Ok(())
}

/// Committed entries in `[start, end)` overlaid with the pending write set.
///
/// Plain scans skip composite keys; composite scans see only them.
fn merged_range(
    committed: &BTreeMap<String, Vec<u8>>,
    pending: Option<&WriteSet>,
    start: &str,
    end: &str,
    composite: bool,
) -> Vec<KeyValue> {
    if !start.is_empty() && !end.is_empty() && start >= end {
        return Vec::new();
    }
    let lower = if start.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(start)
    };
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    };

    let mut merged: BTreeMap<&str, &[u8]> = committed
        .range::<str, _>((lower, upper))
        .map(|(k, v)| (k.as_str(), v.as_slice()))
        .collect();
    if let Some(writes) = pending {
        for (key, value) in writes.range::<str, _>((lower, upper)) {
            match value {
                Some(bytes) => {
                    merged.insert(key.as_str(), bytes.as_slice());
                }
                None => {
                    merged.remove(key.as_str());
                }
            }
        }
    }

    merged
        .into_iter()
        .filter(|(key, _)| is_composite_key(key) == composite)
        .map(|(key, value)| KeyValue {
            key: key.to_string(),
            value: value.to_vec(),
        })
        .collect()
}
