use std::borrow::Cow;

use cct_ledger::{LedgerPort, ReadOnlyLedger};
use cct_types::AssetTypeRegistry;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::argument::Args;
use crate::builtin::load_dynamic_types;
use crate::error::{TxError, TxResult};
use crate::header::Header;
use crate::registry::TxRegistry;
use crate::transaction::{Transaction, TxContext};

/// Outcome of one invocation, in the host's response shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: 200,
            message: String::new(),
            payload,
        }
    }

    pub fn error(err: &TxError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
            payload: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Payload parsed as JSON.
    pub fn json(&self) -> serde_json::Result<Json> {
        serde_json::from_slice(&self.payload)
    }
}

/// Routes invocations to registered transactions.
///
/// Holds the sealed registries for the process lifetime; each invocation
/// borrows the caller's ledger for the duration of the call only.
pub struct Dispatcher {
    registry: TxRegistry,
    types: AssetTypeRegistry,
    header: Header,
}

impl Dispatcher {
    pub fn new(registry: TxRegistry, types: AssetTypeRegistry, header: Header) -> Self {
        Self {
            registry,
            types,
            header,
        }
    }

    pub fn registry(&self) -> &TxRegistry {
        &self.registry
    }

    pub fn types(&self) -> &AssetTypeRegistry {
        &self.types
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Run transaction `tag` with JSON-encoded `args`.
    ///
    /// Never panics on bad input: every failure becomes a non-2xx response.
    /// Writes made before a failure are left to the host to discard.
    pub fn invoke(&self, ledger: &dyn LedgerPort, tag: &str, args: &[u8]) -> Response {
        match self.try_invoke(ledger, tag, args) {
            Ok(payload) => {
                debug!(tx = tag, bytes = payload.len(), "transaction succeeded");
                Response::success(payload)
            }
            Err(e) => {
                warn!(tx = tag, status = e.status(), error = %e, "transaction failed");
                Response::error(&e)
            }
        }
    }

    fn try_invoke(&self, ledger: &dyn LedgerPort, tag: &str, raw: &[u8]) -> TxResult<Vec<u8>> {
        let tx = self
            .registry
            .lookup(tag)
            .ok_or_else(|| TxError::Validation("transaction not found".into()))?;

        let raw: Json = if raw.iter().all(u8::is_ascii_whitespace) {
            Json::Null
        } else {
            serde_json::from_slice(raw)
                .map_err(|e| TxError::Validation(format!("unable to parse arguments: {e}")))?
        };

        let types = self.effective_types(ledger)?;
        let args = Args::parse(&tx.args, &raw, &types)?;

        let result = if tx.read_only {
            self.run(tx, &ReadOnlyLedger::new(ledger), &types, &args)?
        } else {
            self.run(tx, ledger, &types, &args)?
        };
        serde_json::to_vec(&result).map_err(|e| TxError::Internal(e.to_string()))
    }

    fn run(
        &self,
        tx: &Transaction,
        ledger: &dyn LedgerPort,
        types: &AssetTypeRegistry,
        args: &Args,
    ) -> TxResult<Json> {
        let ctx = TxContext {
            ledger,
            types,
            registry: &self.registry,
            header: &self.header,
            tx,
        };
        tx.handler().call(&ctx, args)
    }

    /// Static types, combined with the ledger's dynamic ones when enabled.
    fn effective_types(&self, ledger: &dyn LedgerPort) -> TxResult<Cow<'_, AssetTypeRegistry>> {
        if !self.registry.dynamic_asset_types() {
            return Ok(Cow::Borrowed(&self.types));
        }
        let dynamic = load_dynamic_types(ledger)?;
        if dynamic.is_empty() {
            return Ok(Cow::Borrowed(&self.types));
        }
        let combined = self.types.with_overlay(dynamic).map_err(|e| {
            TxError::Internal(format!("stored asset types conflict with the schema: {e}"))
        })?;
        Ok(Cow::Owned(combined))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("asset_types", &self.types.len())
            .field("header", &self.header.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, invoke, ok};
    use cct_ledger::InMemoryLedger;
    use serde_json::json;

    #[test]
    fn unknown_transaction_is_a_validation_error() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let response = invoke(&dispatcher, &ledger, 1, "noSuchTx", json!({}));
        assert_eq!(response.status, 400);
        assert_eq!(response.message, "transaction not found");
        assert!(response.payload.is_empty());
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        ledger.begin("t1", fixtures::at(1)).unwrap();
        let response = dispatcher.invoke(&ledger, "getTx", b"{not json");
        ledger.rollback().unwrap();
        assert_eq!(response.status, 400);
        assert!(response.message.starts_with("unable to parse arguments"));
    }

    #[test]
    fn empty_argument_bytes_mean_no_arguments() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        ledger.begin("t1", fixtures::at(1)).unwrap();
        let response = dispatcher.invoke(&ledger, "getHeader", b"");
        ledger.rollback().unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn missing_required_argument() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let response = invoke(&dispatcher, &ledger, 1, "readAsset", json!({}));
        assert_eq!(response.status, 400);
        assert_eq!(response.message, "missing required argument 'key'");
    }

    #[test]
    fn read_only_transactions_cannot_write() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let response = invoke(&dispatcher, &ledger, 1, "sneakyWrite", json!({}));
        assert_eq!(response.status, 400);
        assert!(response.message.contains("read-only"));
        assert_eq!(ledger.committed_len(), 0);
    }

    #[test]
    fn write_then_read_round_trip() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let created = ok(invoke(
            &dispatcher,
            &ledger,
            1,
            "createAsset",
            json!({ "asset": { "@assetType": "person", "id": "1", "name": "Maria" } }),
        ));
        assert_eq!(created["@lastTx"], "createAsset");
        assert_eq!(created["@lastTouchBy"], "org1MSP");

        let read = ok(invoke(
            &dispatcher,
            &ledger,
            2,
            "readAsset",
            json!({ "key": { "@assetType": "person", "id": "1" } }),
        ));
        assert_eq!(read, created);
    }

    #[test]
    fn handler_errors_carry_their_status() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let person = json!({ "asset": { "@assetType": "person", "id": "1" } });
        ok(invoke(&dispatcher, &ledger, 1, "createAsset", person.clone()));

        let again = invoke(&dispatcher, &ledger, 2, "createAsset", person);
        assert_eq!(again.status, 409);

        let absent = invoke(
            &dispatcher,
            &ledger,
            3,
            "readAsset",
            json!({ "key": { "@key": "person:missing" } }),
        );
        assert_eq!(absent.status, 404);
    }

    #[test]
    fn failed_invocation_leaves_no_writes() {
        let dispatcher = fixtures::dispatcher(false);
        let ledger = InMemoryLedger::new();
        let response = invoke(
            &dispatcher,
            &ledger,
            1,
            "createAsset",
            json!({ "asset": {
                "@assetType": "book",
                "title": "Orphan",
                "currentTenant": { "@key": "person:nobody" }
            } }),
        );
        assert_eq!(response.status, 404);
        assert_eq!(ledger.committed_len(), 0);
    }

    #[test]
    fn response_json_helper() {
        let response = Response::success(br#"{"a":1}"#.to_vec());
        assert_eq!(response.json().unwrap(), json!({ "a": 1 }));
        let failure = Response::error(&TxError::NotFound("gone".into()));
        assert!(!failure.is_success());
        assert_eq!(failure.status, 404);
        assert_eq!(failure.message, "gone");
    }
}
