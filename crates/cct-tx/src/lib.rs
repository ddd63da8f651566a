//! Transaction layer of the chaincode asset core.
//!
//! # Key Types
//!
//! - [`Transaction`] — descriptor (tag, method, arguments) plus handler
//! - [`Args`] — invocation arguments parsed against the declared [`Argument`]s
//! - [`TxRegistry`] — list of transactions, sealed once at startup
//! - [`Dispatcher`] — looks up, parses, runs and turns the outcome into a
//!   [`Response`]
//!
//! # Design Rules
//!
//! 1. The registry is built through [`TxRegistryBuilder`] and has no
//!    mutating methods after [`TxRegistryBuilder::seal`].
//! 2. Tags are unique across application, base and dynamic transactions.
//! 3. Read-only transactions run against a [`cct_ledger::ReadOnlyLedger`].
//! 4. Handlers return errors; the dispatcher maps them to a status.

pub mod argument;
pub mod builtin;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod registry;
pub mod transaction;

#[cfg(test)]
mod fixtures;

pub use argument::{ArgType, ArgValue, Args, Argument};
pub use dispatch::{Dispatcher, Response};
pub use error::{TxError, TxResult};
pub use header::{Header, CORE_VERSION};
pub use registry::{TxRegistry, TxRegistryBuilder};
pub use transaction::{Method, Transaction, TxContext, TxHandler};
