use cct_ledger::LedgerError;
use cct_types::{ErrorKind, TypeError};

/// Errors from key resolution, existence checks, the reference index and
/// the asset write path.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A ledger accessor failed; `context` says what the core was doing.
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: LedgerError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AssetError {
    pub fn storage(context: impl Into<String>, source: LedgerError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Type(e) => e.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage { source, .. } => source.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

impl From<LedgerError> for AssetError {
    fn from(source: LedgerError) -> Self {
        Self::storage("ledger access failed", source)
    }
}

/// Result alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
