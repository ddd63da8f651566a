//! Shared test schema: people, the books they rent, the libraries they run,
//! and a private vault that also points at people.

use cct_ledger::InMemoryLedger;
use cct_types::{Asset, AssetProp, AssetType, AssetTypeRegistry, DataType};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value as Json};

pub fn registry() -> AssetTypeRegistry {
    AssetTypeRegistry::new(vec![
        AssetType::new(
            "person",
            vec![
                AssetProp::new("id", DataType::String).key(),
                AssetProp::new("name", DataType::String).required(),
                AssetProp::new("height", DataType::Number),
            ],
        ),
        AssetType::new(
            "book",
            vec![
                AssetProp::new("title", DataType::String).key(),
                AssetProp::new("author", DataType::String).key(),
                AssetProp::new("currentTenant", DataType::Reference("person".into())),
                AssetProp::new("genres", DataType::List(Box::new(DataType::String))),
                AssetProp::new("published", DataType::Datetime),
            ],
        ),
        AssetType::new(
            "library",
            vec![
                AssetProp::new("name", DataType::String).key(),
                AssetProp::new("librarian", DataType::Reference("person".into())),
                AssetProp::new(
                    "books",
                    DataType::List(Box::new(DataType::Reference("book".into()))),
                ),
            ],
        ),
        AssetType::new(
            "vault",
            vec![
                AssetProp::new("code", DataType::String).key(),
                AssetProp::new("owner", DataType::Reference("person".into())),
            ],
        )
        .private_to(vec!["org1MSP".into()]),
    ])
    .unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn asset(raw: Json, types: &AssetTypeRegistry) -> Asset {
    Asset::from_json(&raw, types).unwrap()
}

pub fn person(types: &AssetTypeRegistry) -> Asset {
    asset(
        json!({ "@assetType": "person", "id": "31820792048", "name": "Maria", "height": 0.0 }),
        types,
    )
}

pub fn book(types: &AssetTypeRegistry, tenant: &Asset) -> Asset {
    asset(
        json!({
            "@assetType": "book",
            "title": "Meu Nome é Maria",
            "author": "Maria Viana",
            "currentTenant": { "@assetType": "person", "@key": tenant.key().key() },
            "genres": ["biography", "non-fiction"],
            "published": "2019-05-06T22:12:41Z"
        }),
        types,
    )
}

pub fn library(types: &AssetTypeRegistry, librarian: &Asset) -> Asset {
    asset(
        json!({
            "@assetType": "library",
            "name": "Biblioteca Maria da Silva",
            "librarian": { "@key": librarian.key().key() }
        }),
        types,
    )
}

pub fn vault(types: &AssetTypeRegistry, owner: &Asset) -> Asset {
    asset(
        json!({
            "@assetType": "vault",
            "code": "V-1",
            "owner": { "@key": owner.key().key() }
        }),
        types,
    )
}

pub fn ledger() -> InMemoryLedger {
    InMemoryLedger::new()
}
