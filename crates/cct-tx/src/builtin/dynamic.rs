use cct_assets::AssetStore;
use cct_ledger::{create_composite_key, IteratorGuard, LedgerPort};
use cct_types::{AssetProp, AssetType, AssetTypeRegistry};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value as Json};
use tracing::info;

use crate::argument::Args;
use crate::error::{TxError, TxResult};
use crate::transaction::TxContext;

/// Object type of the composite keys holding runtime-defined asset types:
/// `\0cct~assetType\0<tag>\0`.
pub const ASSET_TYPE_INDEX: &str = "cct~assetType";

/// Asset types defined at runtime and stored on the ledger.
pub fn load_dynamic_types(ledger: &dyn LedgerPort) -> TxResult<Vec<AssetType>> {
    let entries = ledger
        .state_by_partial_composite_key(ASSET_TYPE_INDEX, &[])
        .and_then(|it| IteratorGuard::new(it).drain())
        .map_err(|e| TxError::storage("unable to load dynamic asset types", e))?;
    entries
        .iter()
        .map(|entry| {
            let mut definition: AssetType = serde_json::from_slice(&entry.value).map_err(|e| {
                TxError::Internal(format!("stored asset type definition is invalid: {e}"))
            })?;
            definition.dynamic = true;
            Ok(definition)
        })
        .collect()
}

pub(super) fn create_asset_type(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let mut definitions = Vec::new();
    for raw in args.require("assetTypes", Args::objects)? {
        let mut definition: AssetType = from_map(raw, "asset type definition")?;
        definition.dynamic = true;
        if ctx.types.contains(&definition.tag) {
            return Err(TxError::Conflict(format!(
                "asset type '{}' already exists",
                definition.tag
            )));
        }
        definitions.push(definition);
    }
    ctx.types.with_overlay(definitions.clone())?;

    let mut created = Vec::with_capacity(definitions.len());
    for definition in &definitions {
        persist(ctx.ledger, definition)?;
        info!(asset_type = %definition.tag, "asset type created");
        created.push(to_json(definition)?);
    }
    Ok(Json::Array(created))
}

pub(super) fn update_asset_type(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let mut working = ctx.types.clone();
    let mut updated_types = Vec::new();
    for raw in args.require("assetTypes", Args::objects)? {
        let updated = apply_update(dynamic_type(&working, raw)?, raw)?;
        working = replace(&working, &updated.tag, Some(updated.clone()))?;
        persist(ctx.ledger, &updated)?;
        info!(asset_type = %updated.tag, props = updated.props.len(), "asset type updated");
        updated_types.push(to_json(&updated)?);
    }
    Ok(Json::Array(updated_types))
}

pub(super) fn delete_asset_type(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let mut working = ctx.types.clone();
    let mut deleted = Vec::new();
    for raw in args.require("assetTypes", Args::objects)? {
        let tag = dynamic_type(&working, raw)?.tag.clone();

        if let Some(referrer) = working.referrer_types(&tag).find(|t| t.tag != tag) {
            return Err(TxError::Conflict(format!(
                "asset type '{tag}' is referenced by '{}'",
                referrer.tag
            )));
        }
        if !AssetStore::new(ctx.ledger, &working).scan(&tag)?.is_empty() {
            return Err(TxError::Conflict(format!("asset type '{tag}' still has assets")));
        }

        ctx.ledger
            .del_state(&definition_key(&tag)?)
            .map_err(|e| TxError::storage("unable to delete asset type", e))?;
        working = replace(&working, &tag, None)?;
        info!(asset_type = %tag, "asset type deleted");
        deleted.push(json!({ "tag": tag }));
    }
    Ok(Json::Array(deleted))
}

/// The registered dynamic type named by `raw["tag"]`.
fn dynamic_type<'r>(types: &'r AssetTypeRegistry, raw: &Map<String, Json>) -> TxResult<&'r AssetType> {
    let tag = raw
        .get("tag")
        .and_then(Json::as_str)
        .ok_or_else(|| TxError::Validation("asset type definition needs a 'tag'".into()))?;
    let current = types
        .get(tag)
        .ok_or_else(|| TxError::NotFound(format!("asset type '{tag}' not found")))?;
    if !current.dynamic {
        return Err(TxError::Validation(format!(
            "asset type '{tag}' is not dynamic and cannot be changed at runtime"
        )));
    }
    Ok(current)
}

/// Relabel, change readers within the same visibility, and append optional
/// non-key properties. Key properties and data types never change.
fn apply_update(current: &AssetType, raw: &Map<String, Json>) -> TxResult<AssetType> {
    let mut updated = current.clone();
    if let Some(label) = raw.get("label").and_then(Json::as_str) {
        updated.label = label.to_string();
    }
    if let Some(description) = raw.get("description").and_then(Json::as_str) {
        updated.description = description.to_string();
    }
    if let Some(readers) = raw.get("readers") {
        let readers: Vec<String> = from_json(readers, "readers")?;
        if readers.is_empty() != current.readers.is_empty() {
            return Err(TxError::Validation(format!(
                "asset type '{}' cannot change between public and private",
                current.tag
            )));
        }
        updated.readers = readers;
    }
    if let Some(props) = raw.get("props") {
        let props: Vec<AssetProp> = from_json(props, "props")?;
        for prop in props {
            let existing = updated.props.iter().position(|p| p.tag == prop.tag);
            match existing {
                Some(i) if updated.props[i].is_key || prop.is_key => {
                    if updated.props[i] != prop {
                        return Err(TxError::Validation(format!(
                            "key property '{}' of '{}' cannot change",
                            prop.tag, current.tag
                        )));
                    }
                }
                Some(i) => {
                    let existing = &mut updated.props[i];
                    if existing.data_type != prop.data_type {
                        return Err(TxError::Validation(format!(
                            "property '{}' of '{}' cannot change its data type",
                            prop.tag, current.tag
                        )));
                    }
                    if !prop.label.is_empty() {
                        existing.label = prop.label;
                    }
                    if !prop.description.is_empty() {
                        existing.description = prop.description;
                    }
                }
                None if prop.is_key || prop.required => {
                    return Err(TxError::Validation(format!(
                        "new property '{}' of '{}' must be optional and not part of the key",
                        prop.tag, current.tag
                    )));
                }
                None => updated.props.push(prop),
            }
        }
    }
    Ok(updated)
}

/// `types` with `tag` removed and `replacement` added, checked again.
fn replace(
    types: &AssetTypeRegistry,
    tag: &str,
    replacement: Option<AssetType>,
) -> TxResult<AssetTypeRegistry> {
    let rest = types.iter().filter(|t| t.tag != tag).cloned();
    Ok(AssetTypeRegistry::new(rest.chain(replacement).collect())?)
}

fn persist(ledger: &dyn LedgerPort, definition: &AssetType) -> TxResult<()> {
    let bytes = serde_json::to_vec(definition).map_err(|e| TxError::Internal(e.to_string()))?;
    ledger
        .put_state(&definition_key(&definition.tag)?, &bytes)
        .map_err(|e| TxError::storage("unable to store asset type", e))
}

fn definition_key(tag: &str) -> TxResult<String> {
    create_composite_key(ASSET_TYPE_INDEX, &[tag]).map_err(|e| TxError::Validation(e.to_string()))
}

fn from_map<T: DeserializeOwned>(raw: &Map<String, Json>, what: &str) -> TxResult<T> {
    from_json(&Json::Object(raw.clone()), what)
}

fn from_json<T: DeserializeOwned>(raw: &Json, what: &str) -> TxResult<T> {
    serde_json::from_value(raw.clone()).map_err(|e| TxError::Validation(format!("invalid {what}: {e}")))
}

fn to_json(definition: &AssetType) -> TxResult<Json> {
    serde_json::to_value(definition).map_err(|e| TxError::Internal(e.to_string()))
}
