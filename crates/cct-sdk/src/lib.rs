//! Entry point for chaincodes built on the asset core.
//!
//! A chaincode supplies its asset types and application transactions; this
//! crate adds the built-in transactions, seals the registries and exposes a
//! single [`Chaincode::invoke`].
//!
//! # Key Types
//!
//! - [`ChaincodeConfig`] — header, dynamic asset types switch, logging
//! - [`Chaincode`] — sealed registries plus the dispatcher
//!
//! # Modules
//!
//! - [`config`] — TOML configuration
//! - [`logging`] — `tracing` subscriber bootstrap
//! - [`chaincode`] — the facade

pub mod chaincode;
pub mod config;
pub mod error;
pub mod logging;

pub use chaincode::Chaincode;
pub use config::{ChaincodeConfig, LogConfig};
pub use error::{SdkError, SdkResult};
pub use logging::init_tracing;

pub use cct_ledger::{InMemoryLedger, LedgerPort};
pub use cct_tx::{Args, Argument, ArgType, Header, Method, Response, Transaction, TxContext, TxError, TxResult};
pub use cct_types::{Asset, AssetProp, AssetType, AssetTypeRegistry, DataType, Key};
