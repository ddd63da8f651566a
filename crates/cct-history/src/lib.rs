//! History reconstruction for public assets.
//!
//! Reads the ledger's per-key history and produces either the full ordered
//! list of snapshots and tombstones, or the state as of a target instant.
//!
//! "No history at all" is [`HistoryError::NotFound`]; "nothing before the
//! target" is a valid empty result ([`PointInTime::NotYetExisting`]).

pub mod error;
pub mod reconstruct;
pub mod record;

pub use error::{HistoryError, HistoryResult};
pub use reconstruct::HistoryReconstructor;
pub use record::{HistoryRecord, PointInTime, IS_DELETE_FIELD, TIMESTAMP_FIELD};
