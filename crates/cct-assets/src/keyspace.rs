use cct_ledger::{Backend, LedgerPort};
use cct_types::AssetTypeRegistry;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

/// Storage partition an asset lives in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageRoute {
    /// Public world state.
    Public,
    /// Private collection whose plaintext is visible to this peer.
    PrivatePlain { collection: String },
    /// Private collection where only the hash commitment may be probed.
    PrivateHashed { collection: String },
}

impl StorageRoute {
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Public => None,
            Self::PrivatePlain { collection } | Self::PrivateHashed { collection } => {
                Some(collection)
            }
        }
    }

    pub fn is_private(&self) -> bool {
        !matches!(self, Self::Public)
    }
}

/// Resolved location of an asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageAddress {
    pub key: String,
    pub route: StorageRoute,
}

/// Maps logical asset keys onto ledger storage.
///
/// Resolution is pure: it consults the asset type registry and the backend
/// kind, never ledger state.
pub struct KeySpace<'a, L: ?Sized> {
    ledger: &'a L,
    types: &'a AssetTypeRegistry,
}

impl<L: ?Sized> Clone for KeySpace<'_, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: ?Sized> Copy for KeySpace<'_, L> {}

impl<'a, L: LedgerPort + ?Sized> KeySpace<'a, L> {
    pub fn new(ledger: &'a L, types: &'a AssetTypeRegistry) -> Self {
        Self { ledger, types }
    }

    pub fn ledger(&self) -> &'a L {
        self.ledger
    }

    pub fn types(&self) -> &'a AssetTypeRegistry {
        self.types
    }

    /// Where the asset `key` of type `asset_type` is stored.
    ///
    /// Private types are routed to their collection; on a production
    /// backend the route is hashed, so presence probes go through the hash
    /// accessor.
    pub fn resolve(&self, asset_type: &str, key: &str) -> AssetResult<StorageAddress> {
        if key.is_empty() {
            return Err(AssetError::Validation("asset key must not be empty".into()));
        }
        let definition = self.types.get(asset_type).ok_or_else(|| {
            AssetError::Validation(format!("asset type '{asset_type}' is not registered"))
        })?;

        let route = match definition.collection() {
            None => StorageRoute::Public,
            Some(collection) => match self.ledger.backend() {
                Backend::Simulated => StorageRoute::PrivatePlain {
                    collection: collection.to_string(),
                },
                Backend::Production => StorageRoute::PrivateHashed {
                    collection: collection.to_string(),
                },
            },
        };
        debug!(asset_type, key, route = ?route, "resolved storage address");
        Ok(StorageAddress {
            key: key.to_string(),
            route,
        })
    }

    /// Full plaintext value at `address`, whatever the route's probe mode.
    pub fn read(&self, address: &StorageAddress) -> AssetResult<Option<Vec<u8>>> {
        let result = match address.route.collection() {
            None => self.ledger.get_state(&address.key),
            Some(collection) => self.ledger.get_private(collection, &address.key),
        };
        result.map_err(|e| AssetError::storage("unable to read asset", e))
    }

    pub fn write(&self, address: &StorageAddress, bytes: &[u8]) -> AssetResult<()> {
        let result = match address.route.collection() {
            None => self.ledger.put_state(&address.key, bytes),
            Some(collection) => self.ledger.put_private(collection, &address.key, bytes),
        };
        result.map_err(|e| AssetError::storage("unable to write asset", e))
    }

    pub fn remove(&self, address: &StorageAddress) -> AssetResult<()> {
        let result = match address.route.collection() {
            None => self.ledger.del_state(&address.key),
            Some(collection) => self.ledger.del_private(collection, &address.key),
        };
        result.map_err(|e| AssetError::storage("unable to delete asset", e))
    }
}
