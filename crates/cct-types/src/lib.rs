//! Foundation types for the chaincode asset core.
//!
//! This crate provides the data model every other `cct-*` crate builds on.
//! Nothing in here touches the ledger: these are plain values plus the
//! schema rules that validate them at the boundary.
//!
//! # Key Types
//!
//! - [`Key`] — Minimal `(asset type, key string)` address of an asset
//! - [`Asset`] — Metadata header plus an open map of typed [`Value`]s
//! - [`AssetType`] — Per-type schema: privacy, properties, references
//! - [`DataType`] — Closed set of property types (`string`, `->person`, ...)
//! - [`AssetTypeRegistry`] — Validated, immutable catalog of asset types
//! - [`ErrorKind`] — Failure classes shared by all layers, with statuses

pub mod asset;
pub mod error;
pub mod key;
pub mod registry;
pub mod schema;
pub mod value;

pub use asset::{
    Asset, ASSET_TYPE_FIELD, KEY_FIELD, LAST_TOUCH_BY_FIELD, LAST_TX_FIELD, LAST_UPDATED_FIELD,
};
pub use error::{ErrorKind, TypeError};
pub use key::Key;
pub use registry::AssetTypeRegistry;
pub use schema::{AssetProp, AssetType, DataType};
pub use value::{format_timestamp, Value};
