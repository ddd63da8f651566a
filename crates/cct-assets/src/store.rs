use cct_ledger::{IteratorGuard, LedgerPort};
use cct_types::{Asset, AssetTypeRegistry, Key};
use tracing::{debug, info};

use crate::error::{AssetError, AssetResult};
use crate::keyspace::{KeySpace, StorageAddress};
use crate::references::ReferenceIndex;

/// Asset write path over a ledger transaction.
///
/// Every write verifies that referenced assets exist, stamps the metadata
/// header from the transaction context and updates the reference index in
/// the same transaction. A failure leaves partial writes behind; the caller
/// must discard the transaction.
pub struct AssetStore<'a, L: ?Sized> {
    keyspace: KeySpace<'a, L>,
    index: ReferenceIndex<'a, L>,
    tx_name: Option<String>,
}

impl<'a, L: LedgerPort + ?Sized> AssetStore<'a, L> {
    pub fn new(ledger: &'a L, types: &'a AssetTypeRegistry) -> Self {
        Self {
            keyspace: KeySpace::new(ledger, types),
            index: ReferenceIndex::new(ledger, types),
            tx_name: None,
        }
    }

    /// Name recorded in `@lastTx`. Defaults to the ledger transaction id.
    pub fn with_tx_name(mut self, tx_name: impl Into<String>) -> Self {
        self.tx_name = Some(tx_name.into());
        self
    }

    pub fn keyspace(&self) -> KeySpace<'a, L> {
        self.keyspace
    }

    pub fn exists(&self, key: &Key) -> AssetResult<bool> {
        self.keyspace.exists(key.asset_type(), key.key())
    }

    pub fn get(&self, key: &Key) -> AssetResult<Option<Asset>> {
        let address = self.keyspace.resolve(key.asset_type(), key.key())?;
        self.load(&address, key)
    }

    /// Like [`Self::get`], failing with `NotFound` when absent.
    pub fn require(&self, key: &Key) -> AssetResult<Asset> {
        self.get(key)?
            .ok_or_else(|| AssetError::NotFound(format!("asset {key} not found")))
    }

    /// Create an asset; `Conflict` if its key already holds state.
    pub fn put_new(&self, asset: Asset) -> AssetResult<Asset> {
        self.write(asset, true)
    }

    /// Create or replace an asset.
    pub fn put(&self, asset: Asset) -> AssetResult<Asset> {
        self.write(asset, false)
    }

    /// Delete an asset and the index entries it holds.
    ///
    /// Refused with `Conflict` while any other asset still references it.
    pub fn delete(&self, key: &Key) -> AssetResult<Asset> {
        let address = self.keyspace.resolve(key.asset_type(), key.key())?;
        let asset = self
            .load(&address, key)?
            .ok_or_else(|| AssetError::NotFound(format!("asset {key} not found")))?;

        let referrers = self.index.referrers(key, &[])?;
        if !referrers.is_empty() {
            return Err(AssetError::Conflict(format!(
                "asset {key} is referenced by {} other asset(s)",
                referrers.len()
            )));
        }

        self.index.remove_all(key, &asset.references())?;
        self.keyspace.remove(&address)?;
        info!(key = %key, "asset deleted");
        Ok(asset)
    }

    pub fn referrers(&self, key: &Key, filter: &[&str]) -> AssetResult<Vec<Key>> {
        self.index.referrers(key, filter)
    }

    /// Every stored asset of `asset_type`, in key order.
    pub fn scan(&self, asset_type: &str) -> AssetResult<Vec<Asset>> {
        let types = self.keyspace.types();
        let definition = types.require(asset_type)?;
        let ledger = self.keyspace.ledger();
        let start = format!("{asset_type}:");
        let end = format!("{asset_type};");

        let iter = match definition.collection() {
            None => ledger.state_range(&start, &end),
            Some(collection) => ledger.private_range(collection, &start, &end),
        };
        let entries = iter
            .and_then(|it| IteratorGuard::new(it).drain())
            .map_err(|e| AssetError::storage("unable to scan assets", e))?;

        let assets = entries
            .iter()
            .map(|entry| decode(&entry.value, &entry.key, types))
            .collect::<AssetResult<Vec<_>>>()?;
        debug!(asset_type, count = assets.len(), "assets scanned");
        Ok(assets)
    }

    fn write(&self, mut asset: Asset, must_be_new: bool) -> AssetResult<Asset> {
        let key = asset.key().clone();
        let address = self.keyspace.resolve(key.asset_type(), key.key())?;
        let previous = self.load(&address, &key)?;
        if must_be_new && previous.is_some() {
            return Err(AssetError::Conflict(format!("asset {key} already exists")));
        }

        let references = asset.references();
        for target in &references {
            if !self.keyspace.exists(target.asset_type(), target.key())? {
                return Err(AssetError::NotFound(format!(
                    "referenced asset {target} of type '{}' not found",
                    target.asset_type()
                )));
            }
        }

        let ledger = self.keyspace.ledger();
        let context = |e| AssetError::storage("unable to read transaction context", e);
        let creator = ledger.creator().map_err(context)?;
        let tx_name = match &self.tx_name {
            Some(name) => name.clone(),
            None => ledger.tx_id().map_err(context)?,
        };
        let timestamp = ledger.tx_timestamp().map_err(context)?;
        asset.stamp(creator, tx_name, timestamp);

        self.keyspace.write(&address, &asset.encode()?)?;
        let before = previous.map(|p| p.references()).unwrap_or_default();
        self.index.sync(&key, &before, &references)?;

        info!(key = %key, created = must_be_new, references = references.len(), "asset written");
        Ok(asset)
    }

    fn load(&self, address: &StorageAddress, key: &Key) -> AssetResult<Option<Asset>> {
        match self.keyspace.read(address)? {
            Some(bytes) if !bytes.is_empty() => {
                decode(&bytes, key.key(), self.keyspace.types()).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Stored state failing to decode means the ledger holds something this
/// schema never wrote.
fn decode(bytes: &[u8], key: &str, types: &AssetTypeRegistry) -> AssetResult<Asset> {
    Asset::decode(bytes, types)
        .map_err(|e| AssetError::Internal(format!("stored state of {key} is not a valid asset: {e}")))
}
