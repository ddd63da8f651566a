use serde_json::Value as Json;

use crate::argument::Args;
use crate::error::TxResult;
use crate::transaction::TxContext;

pub(super) fn read_asset(ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
    let key = args.require("key", Args::key)?;
    Ok(ctx.store().require(key)?.to_json())
}
