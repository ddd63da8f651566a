use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

/// Kind of backend behind a [`LedgerPort`].
///
/// A simulated backend exposes private values in plaintext to every
/// accessor. A production backend only guarantees the hash commitment of a
/// private value to non-members, so presence probes must use the hash
/// accessor there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Simulated,
    Production,
}

/// One key/value pair returned by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One committed mutation of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Transaction that committed the mutation.
    pub tx_id: String,
    /// Commit timestamp of that transaction.
    pub timestamp: DateTime<Utc>,
    /// Snapshot written, or `None` for a delete tombstone.
    pub value: Option<Vec<u8>>,
}

impl HistoryEntry {
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// Forward-only iterator over a ledger result set.
///
/// Iterators hold ledger-side resources and must be closed. Wrap them in an
/// [`IteratorGuard`](crate::IteratorGuard) so that happens on every path.
pub trait LedgerIterator {
    type Item;

    /// Next entry, or `Ok(None)` once exhausted.
    fn next_entry(&mut self) -> LedgerResult<Option<Self::Item>>;

    /// Release the iterator. Closing twice is a no-op.
    fn close(&mut self) -> LedgerResult<()>;
}

/// Iterator over key/value pairs.
pub type StateIter<'a> = Box<dyn LedgerIterator<Item = KeyValue> + 'a>;

/// Iterator over a key's history.
pub type HistoryIter<'a> = Box<dyn LedgerIterator<Item = HistoryEntry> + 'a>;

/// Narrow interface over the host ledger.
///
/// Every method is synchronous and belongs to the caller's transaction.
/// Implementations must provide read-your-own-writes within a transaction;
/// atomicity and cross-transaction ordering are the host's concern.
///
/// Range scans use Fabric semantics: an empty `start` or `end` is unbounded,
/// `end` is exclusive, and composite keys are never returned by a plain
/// range scan.
pub trait LedgerPort: Send + Sync {
    fn backend(&self) -> Backend;

    /// Identifier of the current transaction.
    fn tx_id(&self) -> LedgerResult<String>;

    /// Timestamp of the current transaction.
    fn tx_timestamp(&self) -> LedgerResult<DateTime<Utc>>;

    /// Identity (MSP id) of the submitter of the current transaction.
    fn creator(&self) -> LedgerResult<String>;

    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    fn del_state(&self, key: &str) -> LedgerResult<()>;

    fn state_range(&self, start: &str, end: &str) -> LedgerResult<StateIter<'_>>;

    fn state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>>;

    fn get_private(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Hash commitment of a private value, never the value itself.
    fn get_private_hash(&self, collection: &str, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    fn put_private(&self, collection: &str, key: &str, value: &[u8]) -> LedgerResult<()>;

    fn del_private(&self, collection: &str, key: &str) -> LedgerResult<()>;

    fn private_range(&self, collection: &str, start: &str, end: &str)
        -> LedgerResult<StateIter<'_>>;

    fn private_by_partial_composite_key(
        &self,
        collection: &str,
        object_type: &str,
        attributes: &[&str],
    ) -> LedgerResult<StateIter<'_>>;

    /// Committed mutations of a public key, oldest first.
    fn history_for_key(&self, key: &str) -> LedgerResult<HistoryIter<'_>>;
}
