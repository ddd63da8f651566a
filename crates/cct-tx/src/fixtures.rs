//! Test harness: a library schema, two application transactions, and a
//! helper that commits or rolls back around each invocation.

use cct_ledger::InMemoryLedger;
use cct_types::{AssetProp, AssetType, AssetTypeRegistry, DataType};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as Json;

use crate::argument::{ArgType, Args, Argument};
use crate::dispatch::{Dispatcher, Response};
use crate::error::TxResult;
use crate::header::Header;
use crate::registry::TxRegistry;
use crate::transaction::{Method, Transaction, TxContext};

pub fn types() -> AssetTypeRegistry {
    AssetTypeRegistry::new(vec![
        AssetType::new(
            "person",
            vec![
                AssetProp::new("id", DataType::String).key(),
                AssetProp::new("name", DataType::String),
            ],
        ),
        AssetType::new(
            "book",
            vec![
                AssetProp::new("title", DataType::String).key(),
                AssetProp::new("currentTenant", DataType::Reference("person".into())),
            ],
        ),
    ])
    .unwrap()
}

fn create_asset(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let asset = args.require("asset", Args::asset)?;
    Ok(ctx.store().put_new(asset.clone())?.to_json())
}

fn delete_asset(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let key = args.require("key", Args::key)?;
    Ok(ctx.store().delete(key)?.to_json())
}

/// Declared read-only but tries to write anyway.
fn sneaky_write(ctx: &TxContext<'_>, _: &Args) -> TxResult<Json> {
    ctx.ledger.put_state("person:sneaky", b"{}")?;
    Ok(Json::Null)
}

pub fn app_transactions() -> Vec<Transaction> {
    vec![
        Transaction::new("createAsset", create_asset)
            .method(Method::Post)
            .arg(Argument::new("asset", ArgType::Asset).required()),
        Transaction::new("deleteAsset", delete_asset)
            .method(Method::Delete)
            .arg(Argument::new("key", ArgType::Key).required()),
        Transaction::new("sneakyWrite", sneaky_write).read_only(),
    ]
}

pub fn dispatcher(dynamic_asset_types: bool) -> Dispatcher {
    let registry = TxRegistry::builder()
        .dynamic_asset_types(dynamic_asset_types)
        .register(app_transactions())
        .unwrap()
        .seal()
        .unwrap();
    let header = Header {
        name: "library-cc".into(),
        version: "1.2.0".into(),
        title: "Library".into(),
        orgs: vec!["org1MSP".into(), "org2MSP".into()],
    };
    Dispatcher::new(registry, types(), header)
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

/// Invoke inside a fresh ledger transaction, committing only on success.
pub fn invoke(
    dispatcher: &Dispatcher,
    ledger: &InMemoryLedger,
    secs: i64,
    tag: &str,
    args: Json,
) -> Response {
    ledger.begin(format!("tx-{secs}"), at(secs)).unwrap();
    let response = dispatcher.invoke(ledger, tag, args.to_string().as_bytes());
    if response.is_success() {
        ledger.commit().unwrap();
    } else {
        ledger.rollback().unwrap();
    }
    response
}

/// Payload of a successful response; panics with the message otherwise.
pub fn ok(response: Response) -> Json {
    assert!(
        response.is_success(),
        "expected success, got {}: {}",
        response.status,
        response.message
    );
    response.json().unwrap()
}
