use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::asset::{ASSET_TYPE_FIELD, KEY_FIELD};
use crate::error::TypeError;
use crate::value::Value;

/// Minimal identifier of an asset: its type tag and its storage key.
///
/// A `Key` addresses an asset without carrying its state. It is never
/// persisted as a record of its own; it serializes to the same
/// `{"@assetType", "@key"}` shape used for reference properties.
///
/// Ordering: `asset_type` → `key`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "@assetType")]
    asset_type: String,
    #[serde(rename = "@key")]
    key: String,
}

impl Key {
    /// Create a key from an explicit type tag and key string.
    pub fn new(asset_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            key: key.into(),
        }
    }

    /// Derive the deterministic key of an asset from its key property values.
    ///
    /// The key string is `"<tag>:<uuid>"` where the UUID is a v5 digest (OID
    /// namespace) of the values' key strings concatenated in property
    /// declaration order. The tag only appears in the prefix.
    pub fn derive<'v>(asset_type: &str, key_values: impl IntoIterator<Item = &'v Value>) -> Self {
        let seed: String = key_values.into_iter().map(Value::key_string).collect();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self::new(asset_type, format!("{asset_type}:{id}"))
    }

    /// Parse the `{"@assetType": ..., "@key": ...}` shape.
    pub fn from_json(raw: &Json) -> Result<Self, TypeError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| TypeError::InvalidKey("expected an object".into()))?;
        let asset_type = obj
            .get(ASSET_TYPE_FIELD)
            .and_then(Json::as_str)
            .ok_or_else(|| TypeError::InvalidKey(format!("missing '{ASSET_TYPE_FIELD}'")))?;
        let key = obj
            .get(KEY_FIELD)
            .and_then(Json::as_str)
            .ok_or_else(|| TypeError::InvalidKey(format!("missing '{KEY_FIELD}'")))?;
        Ok(Self::new(asset_type, key))
    }

    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        obj.insert(ASSET_TYPE_FIELD.into(), Json::String(self.asset_type.clone()));
        obj.insert(KEY_FIELD.into(), Json::String(self.key.clone()));
        Json::Object(obj)
    }

    /// Type tag of the addressed asset.
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Storage key of the addressed asset.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if the key string is empty.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
