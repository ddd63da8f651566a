use cct_ledger::LedgerPort;
use tracing::debug;

use crate::error::{AssetError, AssetResult};
use crate::keyspace::{KeySpace, StorageRoute};

const EXISTENCE_CONTEXT: &str = "unable to check asset existence";

impl<L: LedgerPort + ?Sized> KeySpace<'_, L> {
    /// Whether `key` currently holds state.
    ///
    /// Never reads a full private value on a production backend: the probe
    /// goes through the hash accessor there. A key never written, or
    /// written and then deleted, is `Ok(false)`.
    pub fn exists(&self, asset_type: &str, key: &str) -> AssetResult<bool> {
        let address = self.resolve(asset_type, key)?;
        let ledger = self.ledger();
        let probe = match &address.route {
            StorageRoute::Public => ledger.get_state(&address.key),
            StorageRoute::PrivatePlain { collection } => {
                ledger.get_private(collection, &address.key)
            }
            StorageRoute::PrivateHashed { collection } => {
                let hash = ledger.get_private_hash(collection, &address.key);
                if let Ok(Some(digest)) = &hash {
                    debug!(key, hash = %hex::encode(digest), "private hash probe");
                }
                hash
            }
        };
        let found = probe
            .map_err(|e| AssetError::storage(EXISTENCE_CONTEXT, e))?
            .is_some_and(|bytes| !bytes.is_empty());
        Ok(found)
    }
}
