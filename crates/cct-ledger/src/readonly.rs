use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{Backend, HistoryIter, LedgerPort, StateIter};

/// Port wrapper that forwards reads and rejects every write.
///
/// Handed to read-only transactions so that a handler cannot mutate state
/// even by accident.
pub struct ReadOnlyLedger<'a, L: ?Sized> {
    inner: &'a L,
}

impl<'a, L: LedgerPort + ?Sized> ReadOnlyLedger<'a, L> {
    pub fn new(inner: &'a L) -> Self {
        Self { inner }
    }
}

impl<L: LedgerPort + ?Sized> LedgerPort for ReadOnlyLedger<'_, L> {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn tx_id(&self) -> LedgerResult<String> {
        self.inner.tx_id()
    }

    fn tx_timestamp(&self) -> LedgerResult<DateTime<Utc>> {
        self.inner.tx_timestamp()
    }

    fn creator(&self) -> LedgerResult<String> {
        self.inner.creator()
    }

    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.inner.get_state(key)
    }

    fn put_state(&self, _key: &str, _value: &[u8]) -> LedgerResult<()> {
        Err(LedgerError::ReadOnly)
    }

    fn del_state(&self, _key: &str) -> LedgerResult<()> {
        Err(LedgerError::ReadOnly)
    }

    fn state_range(&self, start: &str, end: &str) -> LedgerResult<StateIter<'_>> {
        self.inner.state_range(start, end)
    }

    fn state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>> {
        self.inner.state_by_partial_composite_key(object_type, attributes)
    }

    fn get_private(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.inner.get_private(collection, key)
    }

    fn get_private_hash(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.inner.get_private_hash(collection, key)
    }

    fn put_private(&self, _collection: &str, _key: &str, _value: &[u8]) -> LedgerResult<()> {
        Err(LedgerError::ReadOnly)
    }

    fn del_private(&self, _collection: &str, _key: &str) -> LedgerResult<()> {
        Err(LedgerError::ReadOnly)
    }

    fn private_range(
        &self,
        collection: &str,
        start: &str,
        end: &str,
    ) -> LedgerResult<StateIter<'_>> {
        self.inner.private_range(collection, start, end)
    }

    fn private_by_partial_composite_key(
        &self,
        collection: &str,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>> {
        self.inner
            .private_by_partial_composite_key(collection, object_type, attributes)
    }

    fn history_for_key(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        self.inner.history_for_key(key)
    }
}
