use cct_assets::AssetError;
use cct_ledger::LedgerError;
use cct_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history not found")]
    NotFound,

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: LedgerError,
    },

    /// A history snapshot that is not a JSON object.
    #[error("snapshot of {key} committed by {tx_id} is not a JSON object: {reason}")]
    Decode {
        key: String,
        tx_id: String,
        reason: String,
    },

    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl HistoryError {
    pub fn storage(context: impl Into<String>, source: LedgerError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Decode { .. } => ErrorKind::Internal,
            Self::Asset(e) => e.kind(),
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;
