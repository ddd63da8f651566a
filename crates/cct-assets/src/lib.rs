//! Asset storage core: where an asset lives, whether it exists, and who
//! points at it.
//!
//! # Key Types
//!
//! - [`KeySpace`] — resolves `(asset type, key)` to a [`StorageAddress`]
//!   and answers existence probes without reading full values
//! - [`ReferenceIndex`] — reverse index from a referenced key to its
//!   referrers, kept as composite keys next to the primary data
//! - [`AssetStore`] — the write path: validates references, stamps
//!   metadata, keeps the index in step with every write and delete
//!
//! # Design Rules
//!
//! 1. An empty key or unregistered type is rejected before any ledger access.
//! 2. On a production backend, presence of private data is probed through
//!    the hash accessor only.
//! 3. Index maintenance happens in the same ledger transaction as the
//!    primary write; there is no out-of-band index.
//! 4. Zero referrers is an empty result, never an error.

pub mod error;
pub mod exists;
pub mod keyspace;
pub mod references;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use error::{AssetError, AssetResult};
pub use keyspace::{KeySpace, StorageAddress, StorageRoute};
pub use references::{ReferenceIndex, REFERENCE_INDEX};
pub use store::AssetStore;
