use cct_ledger::{InMemoryLedger, LedgerPort};
use cct_tx::{Dispatcher, Header, Response, Transaction, TxRegistry};
use cct_types::AssetTypeRegistry;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::ChaincodeConfig;
use crate::error::SdkResult;

/// A configured chaincode: sealed asset types and transactions.
///
/// Built once when the process starts. Each call to [`Chaincode::invoke`]
/// borrows the host's ledger handle for that invocation only.
#[derive(Debug)]
pub struct Chaincode {
    dispatcher: Dispatcher,
}

impl Chaincode {
    pub fn new(
        config: &ChaincodeConfig,
        types: AssetTypeRegistry,
        transactions: Vec<Transaction>,
    ) -> SdkResult<Self> {
        let registry = TxRegistry::builder()
            .dynamic_asset_types(config.dynamic_asset_types)
            .register(transactions)?
            .seal()?;
        info!(
            name = %config.header.name,
            asset_types = types.len(),
            transactions = registry.len(),
            "chaincode ready"
        );
        Ok(Self {
            dispatcher: Dispatcher::new(registry, types, config.header.clone()),
        })
    }

    /// Like [`Chaincode::new`], reading the asset types from the file the
    /// configuration names.
    pub fn from_config(config: &ChaincodeConfig, transactions: Vec<Transaction>) -> SdkResult<Self> {
        let types = config.load_asset_types()?;
        Self::new(config, types, transactions)
    }

    pub fn header(&self) -> &Header {
        self.dispatcher.header()
    }

    pub fn types(&self) -> &AssetTypeRegistry {
        self.dispatcher.types()
    }

    pub fn transactions(&self) -> &TxRegistry {
        self.dispatcher.registry()
    }

    /// Run `tag` against the ledger of the current transaction.
    pub fn invoke(&self, ledger: &dyn LedgerPort, tag: &str, args: &[u8]) -> Response {
        self.dispatcher.invoke(ledger, tag, args)
    }

    /// Run `tag` in its own transaction on an in-memory ledger, committing
    /// its writes on success and discarding them otherwise.
    pub fn mock_invoke(
        &self,
        ledger: &InMemoryLedger,
        tx_id: &str,
        timestamp: DateTime<Utc>,
        tag: &str,
        args: &[u8],
    ) -> SdkResult<Response> {
        ledger.begin(tx_id, timestamp)?;
        let response = self.invoke(ledger, tag, args);
        if response.is_success() {
            ledger.commit()?;
        } else {
            ledger.rollback()?;
        }
        Ok(response)
    }
}
