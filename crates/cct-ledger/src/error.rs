use std::fmt;

use cct_types::ErrorKind;

/// Ledger accessor that an operation went through.
///
/// Used to attribute backend failures and, on the in-memory backend, to
/// count accesses and inject faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    GetState,
    PutState,
    DelState,
    RangeQuery,
    GetPrivate,
    GetPrivateHash,
    PutPrivate,
    DelPrivate,
    PrivateRangeQuery,
    HistoryQuery,
    /// Advancing a history iterator.
    HistoryNext,
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetState => "GetState",
            Self::PutState => "PutState",
            Self::DelState => "DelState",
            Self::RangeQuery => "GetStateByRange",
            Self::GetPrivate => "GetPrivateData",
            Self::GetPrivateHash => "GetPrivateDataHash",
            Self::PutPrivate => "PutPrivateData",
            Self::DelPrivate => "DelPrivateData",
            Self::PrivateRangeQuery => "GetPrivateDataByRange",
            Self::HistoryQuery => "GetHistoryForKey",
            Self::HistoryNext => "HistoryIterator.Next",
        };
        f.write_str(name)
    }
}

/// Errors produced by ledger accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{op} failed: {reason}")]
    Backend { op: LedgerOp, reason: String },

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("transaction {0} is already active")]
    TransactionActive(String),

    #[error("write rejected: transaction is read-only")]
    ReadOnly,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid composite key: {0}")]
    InvalidCompositeKey(String),

    #[error("iterator is closed")]
    IteratorClosed,

    #[error("ledger lock poisoned")]
    Poisoned,
}

impl LedgerError {
    pub fn backend(op: LedgerOp, reason: impl Into<String>) -> Self {
        Self::Backend {
            op,
            reason: reason.into(),
        }
    }

    /// Accessor failures are storage errors; nothing here is caller input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
