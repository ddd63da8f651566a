use cct_assets::AssetError;
use cct_history::HistoryError;
use cct_ledger::LedgerError;
use cct_types::{ErrorKind, TypeError};

/// Errors from registry construction, argument parsing and transaction
/// handlers.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The registry or a transaction descriptor is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: LedgerError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl TxError {
    pub fn storage(context: impl Into<String>, source: LedgerError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Type(e) => e.kind(),
            Self::Asset(e) => e.kind(),
            Self::History(e) => e.kind(),
            Self::Storage { source, .. } => source.kind(),
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

impl From<LedgerError> for TxError {
    fn from(source: LedgerError) -> Self {
        Self::storage("ledger access failed", source)
    }
}

/// Result alias for transaction operations.
pub type TxResult<T> = Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_keep_their_status() {
        assert_eq!(TxError::from(HistoryError::NotFound).status(), 404);
        assert_eq!(TxError::from(AssetError::Conflict("x".into())).status(), 409);
        assert_eq!(TxError::Config("dup".into()).status(), 500);
        assert_eq!(TxError::from(LedgerError::ReadOnly).status(), 400);
    }

    #[test]
    fn transparent_variants_show_inner_message() {
        assert_eq!(TxError::from(HistoryError::NotFound).to_string(), "history not found");
    }
}
