//! Transactions every chaincode gets: introspection, reads, search, and the
//! optional runtime asset type management set.

mod dynamic;
mod history;
mod read;
mod schema;
mod search;

pub use dynamic::{load_dynamic_types, ASSET_TYPE_INDEX};

use cct_types::DataType;

use crate::argument::{ArgType, Argument};
use crate::transaction::{Method, Transaction};

/// Read-only introspection and query transactions.
pub fn base() -> Vec<Transaction> {
    vec![
        Transaction::new("getTx", schema::get_tx)
            .label("Get Tx")
            .description("List the registered transactions, or describe one")
            .method(Method::Get)
            .meta()
            .read_only()
            .arg(
                Argument::new("txName", ArgType::Scalar(DataType::String))
                    .description("Transaction to describe"),
            ),
        Transaction::new("getHeader", schema::get_header)
            .label("Get Header")
            .description("Identification of the deployed chaincode")
            .method(Method::Get)
            .meta()
            .read_only(),
        Transaction::new("getSchema", schema::get_schema)
            .label("Get Schema")
            .description("List the asset types, or describe one")
            .method(Method::Get)
            .meta()
            .read_only()
            .arg(
                Argument::new("assetType", ArgType::Scalar(DataType::String))
                    .description("Asset type to describe"),
            ),
        Transaction::new("getDataTypes", schema::get_data_types)
            .label("Get Data Types")
            .description("Data types usable in asset type properties")
            .method(Method::Get)
            .meta()
            .read_only(),
        Transaction::new("readAsset", read::read_asset)
            .label("Read Asset")
            .description("Current state of an asset")
            .method(Method::Get)
            .meta()
            .read_only()
            .arg(
                Argument::new("key", ArgType::Key)
                    .required()
                    .description("Key of the asset to be read"),
            ),
        Transaction::new("readAssetHistory", history::read_asset_history)
            .label("Read Asset History")
            .description("Every committed version of an asset, or its state at a given time")
            .method(Method::Get)
            .meta()
            .read_only()
            .arg(
                Argument::new("key", ArgType::Key)
                    .required()
                    .description("Key of the asset to be read"),
            )
            .arg(
                Argument::new("timeTarget", ArgType::Scalar(DataType::Datetime))
                    .description("Return the version current at this instant"),
            ),
        Transaction::new("search", search::search)
            .label("Search")
            .description("Assets of one type whose fields match a selector")
            .method(Method::Get)
            .meta()
            .read_only()
            .arg(Argument::new("assetType", ArgType::Scalar(DataType::String)).required())
            .arg(
                Argument::new("selector", ArgType::Scalar(DataType::Object))
                    .description("Field values that must match exactly"),
            )
            .arg(
                Argument::new("limit", ArgType::Scalar(DataType::Integer))
                    .description("Maximum number of results"),
            ),
    ]
}

/// Runtime asset type management. Registered only when enabled.
pub fn dynamic() -> Vec<Transaction> {
    let definitions = || {
        Argument::new("assetTypes", ArgType::list(ArgType::Scalar(DataType::Object))).required()
    };
    vec![
        Transaction::new("createAssetType", dynamic::create_asset_type)
            .label("Create Asset Type")
            .description("Define new asset types")
            .method(Method::Post)
            .meta()
            .arg(definitions()),
        Transaction::new("updateAssetType", dynamic::update_asset_type)
            .label("Update Asset Type")
            .description("Relabel dynamic asset types and append properties")
            .method(Method::Put)
            .meta()
            .arg(definitions()),
        Transaction::new("deleteAssetType", dynamic::delete_asset_type)
            .label("Delete Asset Type")
            .description("Remove dynamic asset types with no remaining assets")
            .method(Method::Delete)
            .meta()
            .arg(definitions()),
    ]
}
