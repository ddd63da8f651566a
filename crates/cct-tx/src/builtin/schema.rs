use cct_types::DataType;
use serde_json::{json, Map, Value as Json};

use crate::argument::Args;
use crate::error::{TxError, TxResult};
use crate::transaction::TxContext;

pub(super) fn get_tx(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    match args.str("txName") {
        Some(name) => ctx
            .registry
            .lookup(name)
            .ok_or_else(|| TxError::NotFound(format!("transaction '{name}' not found")))?
            .to_json(),
        None => Ok(Json::Array(ctx.registry.iter().map(|tx| tx.summary_json()).collect())),
    }
}

pub(super) fn get_header(ctx: &TxContext<'_>, _: &Args) -> TxResult<Json> {
    Ok(ctx.header.to_json())
}

pub(super) fn get_schema(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    match args.str("assetType") {
        Some(tag) => {
            let definition = ctx
                .types
                .get(tag)
                .ok_or_else(|| TxError::NotFound(format!("asset type '{tag}' not found")))?;
            serde_json::to_value(definition).map_err(|e| TxError::Internal(e.to_string()))
        }
        None => Ok(Json::Array(
            ctx.types
                .iter()
                .map(|t| {
                    json!({
                        "tag": t.tag,
                        "label": t.label,
                        "description": t.description,
                        "readers": t.readers,
                        "dynamic": t.dynamic,
                    })
                })
                .collect(),
        )),
    }
}

pub(super) fn get_data_types(_: &TxContext<'_>, _: &Args) -> TxResult<Json> {
    let mut types = Map::new();
    for data_type in DataType::builtins() {
        types.insert(data_type.to_string(), Json::String(data_type.json_kind().into()));
    }
    types.insert("->assetType".into(), Json::String("object".into()));
    Ok(Json::Object(types))
}
