use serde_json::{json, Map, Value as Json};

use crate::argument::Args;
use crate::error::{TxError, TxResult};
use crate::transaction::TxContext;

/// Equality match of top-level fields over one asset type, in key order.
pub(super) fn search(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let asset_type = args.require("assetType", Args::str)?;
    let limit = match args.integer("limit") {
        Some(n) => Some(
            usize::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| TxError::Validation("limit must be a positive integer".into()))?,
        ),
        None => None,
    };
    let selector = args.object("selector");

    let mut result = Vec::new();
    for asset in ctx.store().scan(asset_type)? {
        if limit.is_some_and(|n| result.len() >= n) {
            break;
        }
        let json = asset.to_json();
        if selector.map_or(true, |selector| matches(&json, selector)) {
            result.push(json);
        }
    }
    Ok(json!({ "result": result }))
}

fn matches(asset: &Json, selector: &Map<String, Json>) -> bool {
    selector
        .iter()
        .all(|(field, expected)| asset.get(field) == Some(expected))
}
