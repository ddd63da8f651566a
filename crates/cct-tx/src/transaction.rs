use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use cct_assets::AssetStore;
use cct_history::HistoryReconstructor;
use cct_ledger::LedgerPort;
use cct_types::AssetTypeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::argument::{Args, Argument};
use crate::error::{TxError, TxResult};
use crate::header::Header;
use crate::registry::TxRegistry;

/// Conventional HTTP verb a gateway should expose the transaction under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

/// Everything a handler may touch during one invocation.
pub struct TxContext<'a> {
    /// The caller's ledger; a read-only guard for read-only transactions.
    pub ledger: &'a dyn LedgerPort,
    /// Static asset types combined with any dynamic ones on the ledger.
    pub types: &'a AssetTypeRegistry,
    pub registry: &'a TxRegistry,
    pub header: &'a Header,
    pub tx: &'a Transaction,
}

impl<'a> TxContext<'a> {
    /// Asset store stamping writes with this transaction's tag.
    pub fn store(&self) -> AssetStore<'a, dyn LedgerPort + 'a> {
        AssetStore::new(self.ledger, self.types).with_tx_name(self.tx.tag.clone())
    }

    pub fn history(&self) -> HistoryReconstructor<'a, dyn LedgerPort + 'a> {
        HistoryReconstructor::new(self.ledger, self.types)
    }
}

/// Body of a transaction.
pub trait TxHandler: Send + Sync {
    fn call(&self, ctx: &TxContext<'_>, args: &Args) -> TxResult<Json>;
}

impl<F> TxHandler for F
where
    F: Fn(&TxContext<'_>, &Args) -> TxResult<Json> + Send + Sync,
{
    fn call(&self, ctx: &TxContext<'_>, args: &Args) -> TxResult<Json> {
        self(ctx, args)
    }
}

/// Registered metadata and handler of one invocable operation.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub tag: String,
    pub label: String,
    pub description: String,
    pub method: Method,
    /// Framework-provided rather than application-defined.
    pub meta_tx: bool,
    pub read_only: bool,
    pub args: Vec<Argument>,
    #[serde(skip)]
    handler: Arc<dyn TxHandler>,
}

impl Transaction {
    pub fn new(tag: impl Into<String>, handler: impl TxHandler + 'static) -> Self {
        let tag = tag.into();
        Self {
            label: tag.clone(),
            tag,
            description: String::new(),
            method: Method::default(),
            meta_tx: false,
            read_only: false,
            args: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Mark as read-only: the handler gets a ledger that rejects writes.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta_tx = true;
        self
    }

    pub fn arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    pub fn handler(&self) -> &dyn TxHandler {
        self.handler.as_ref()
    }

    /// `{tag, label, description}`, as listed by `getTx`.
    pub fn summary_json(&self) -> Json {
        json!({
            "tag": self.tag,
            "label": self.label,
            "description": self.description,
        })
    }

    /// Full descriptor without the handler.
    pub fn to_json(&self) -> TxResult<Json> {
        serde_json::to_value(self).map_err(|e| TxError::Internal(e.to_string()))
    }

    pub(crate) fn check(&self) -> TxResult<()> {
        if self.tag.is_empty() || self.tag.chars().any(char::is_whitespace) {
            return Err(TxError::Config(format!("invalid transaction tag '{}'", self.tag)));
        }
        let mut seen = HashSet::new();
        for arg in &self.args {
            if arg.tag.is_empty() {
                return Err(TxError::Config(format!(
                    "transaction '{}' declares an argument with an empty tag",
                    self.tag
                )));
            }
            if !seen.insert(arg.tag.as_str()) {
                return Err(TxError::Config(format!(
                    "transaction '{}' declares argument '{}' twice",
                    self.tag, arg.tag
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("tag", &self.tag)
            .field("method", &self.method)
            .field("read_only", &self.read_only)
            .field("args", &self.args.len())
            .finish()
    }
}
