use serde_json::Value as Json;

use crate::argument::Args;
use crate::error::TxResult;
use crate::transaction::TxContext;

pub(super) fn read_asset_history(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let key = args.require("key", Args::key)?;
    let history = ctx.history();
    match args.datetime("timeTarget") {
        Some(target) => Ok(history.as_of(key, target)?.to_json()),
        None => Ok(Json::Array(
            history
                .full_history(key)?
                .iter()
                .map(|record| record.to_json())
                .collect(),
        )),
    }
}
