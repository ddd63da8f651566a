use std::path::PathBuf;

use cct_ledger::LedgerError;
use cct_tx::TxError;
use cct_types::{ErrorKind, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("asset type error: {0}")]
    Type(#[from] TypeError),

    #[error("transaction error: {0}")]
    Tx(#[from] TxError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Io { .. } | Self::Toml(_) => ErrorKind::Internal,
            Self::Type(e) => e.kind(),
            Self::Tx(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
