//! Ledger access port for the chaincode asset core.
//!
//! Everything above this crate talks to the ledger through [`LedgerPort`], a
//! narrow synchronous interface over the host ledger's primitives:
//!
//! - public state: `get_state` / `put_state` / `del_state` and range scans
//! - private data: plaintext and hash accessors per collection
//! - history: a forward-only iterator over a key's committed mutations
//!
//! # Modules
//!
//! - [`traits`] — [`LedgerPort`], [`LedgerIterator`] and record types
//! - [`iter`] — [`IteratorGuard`], which closes iterators on every exit path
//! - [`composite`] — composite key construction and splitting
//! - [`readonly`] — [`ReadOnlyLedger`], a guard that rejects writes
//! - [`memory`] — [`InMemoryLedger`], the simulated backend used in tests
//!
//! # Design Rules
//!
//! 1. All accessors may fail; failures are returned, never swallowed.
//! 2. Absence is `Ok(None)`, distinct from a failed read.
//! 3. Writes belong to the caller's transaction and become visible to later
//!    reads of the same transaction immediately.
//! 4. Iterators are scoped: acquired, drained or abandoned, then closed.

pub mod composite;
pub mod error;
pub mod iter;
pub mod memory;
pub mod readonly;
pub mod traits;

pub use composite::{create_composite_key, is_composite_key, split_composite_key};
pub use error::{LedgerError, LedgerOp, LedgerResult};
pub use iter::IteratorGuard;
pub use memory::InMemoryLedger;
pub use readonly::ReadOnlyLedger;
pub use traits::{
    Backend, HistoryEntry, HistoryIter, KeyValue, LedgerIterator, LedgerPort, StateIter,
};
