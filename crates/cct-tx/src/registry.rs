use std::collections::HashSet;

use tracing::info;

use crate::builtin;
use crate::error::{TxError, TxResult};
use crate::transaction::Transaction;

/// Collects the application's transactions before the registry is sealed.
///
/// ```text
/// let registry = TxRegistry::builder()
///     .dynamic_asset_types(true)
///     .register(app_transactions)?
///     .seal()?;
/// ```
#[derive(Default)]
pub struct TxRegistryBuilder {
    dynamic_asset_types: bool,
    transactions: Option<Vec<Transaction>>,
}

impl TxRegistryBuilder {
    /// Also register the transactions that create, update and delete asset
    /// types at runtime.
    pub fn dynamic_asset_types(mut self, enabled: bool) -> Self {
        self.dynamic_asset_types = enabled;
        self
    }

    /// Register the application transactions. May be called once.
    pub fn register(mut self, transactions: Vec<Transaction>) -> TxResult<Self> {
        if self.transactions.is_some() {
            return Err(TxError::Config("transactions are already registered".into()));
        }
        self.transactions = Some(transactions);
        Ok(self)
    }

    /// Append the built-in transactions and freeze the list.
    ///
    /// Fails on malformed descriptors and on any tag registered twice,
    /// including an application transaction reusing a built-in tag.
    pub fn seal(self) -> TxResult<TxRegistry> {
        let mut transactions = self.transactions.unwrap_or_default();
        transactions.extend(builtin::base());
        if self.dynamic_asset_types {
            transactions.extend(builtin::dynamic());
        }

        let mut seen = HashSet::new();
        for tx in &transactions {
            tx.check()?;
            if !seen.insert(tx.tag.as_str()) {
                return Err(TxError::Config(format!(
                    "transaction '{}' is registered twice",
                    tx.tag
                )));
            }
        }

        info!(
            count = transactions.len(),
            dynamic_asset_types = self.dynamic_asset_types,
            "transaction registry sealed"
        );
        Ok(TxRegistry {
            transactions,
            dynamic_asset_types: self.dynamic_asset_types,
        })
    }
}

/// Sealed, read-only list of invocable transactions.
///
/// Order: application transactions as registered, then the base set, then
/// the dynamic asset type set when enabled.
pub struct TxRegistry {
    transactions: Vec<Transaction>,
    dynamic_asset_types: bool,
}

impl TxRegistry {
    pub fn builder() -> TxRegistryBuilder {
        TxRegistryBuilder::default()
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, tag: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.tag == tag)
    }

    /// An independent copy of the registered list.
    pub fn list(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn dynamic_asset_types(&self) -> bool {
        self.dynamic_asset_types
    }
}

impl std::fmt::Debug for TxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxRegistry")
            .field("transactions", &self.len())
            .field("dynamic_asset_types", &self.dynamic_asset_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Args;
    use crate::transaction::TxContext;
    use serde_json::Value as Json;

    fn noop(_: &TxContext<'_>, _: &Args) -> TxResult<Json> {
        Ok(Json::Null)
    }

    const BASE: [&str; 7] = [
        "getTx",
        "getHeader",
        "getSchema",
        "getDataTypes",
        "readAsset",
        "readAssetHistory",
        "search",
    ];

    fn tags(registry: &TxRegistry) -> Vec<&str> {
        registry.iter().map(|tx| tx.tag.as_str()).collect()
    }

    #[test]
    fn seal_appends_base_set_after_application_transactions() {
        let registry = TxRegistry::builder()
            .register(vec![Transaction::new("createBook", noop)])
            .unwrap()
            .seal()
            .unwrap();
        let mut expected = vec!["createBook"];
        expected.extend(BASE);
        assert_eq!(tags(&registry), expected);
        assert!(!registry.dynamic_asset_types());
    }

    #[test]
    fn dynamic_set_is_opt_in() {
        let registry = TxRegistry::builder()
            .dynamic_asset_types(true)
            .seal()
            .unwrap();
        assert_eq!(registry.len(), BASE.len() + 3);
        assert!(registry.lookup("createAssetType").is_some());
        assert!(registry.lookup("updateAssetType").is_some());
        assert!(registry.lookup("deleteAssetType").is_some());

        let plain = TxRegistry::builder().seal().unwrap();
        assert!(plain.lookup("createAssetType").is_none());
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = TxRegistry::builder().seal().unwrap();
        assert_eq!(registry.lookup("readAsset").unwrap().tag, "readAsset");
        assert!(registry.lookup("readasset").is_none());
        assert!(registry.lookup("read").is_none());
    }

    #[test]
    fn second_register_is_rejected() {
        let err = TxRegistry::builder()
            .register(vec![])
            .unwrap()
            .register(vec![])
            .err()
            .unwrap();
        assert!(matches!(err, TxError::Config(_)));
    }

    #[test]
    fn duplicate_tags_are_rejected_at_seal() {
        let err = TxRegistry::builder()
            .register(vec![Transaction::new("getTx", noop)])
            .unwrap()
            .seal()
            .unwrap_err();
        assert_eq!(err.to_string(), "configuration error: transaction 'getTx' is registered twice");
    }

    #[test]
    fn list_is_an_independent_copy() {
        let registry = TxRegistry::builder().seal().unwrap();
        let mut copy = registry.list();
        copy.clear();
        assert_eq!(registry.len(), BASE.len());
    }
}
