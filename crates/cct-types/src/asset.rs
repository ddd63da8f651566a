use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json};

use crate::error::TypeError;
use crate::key::Key;
use crate::registry::AssetTypeRegistry;
use crate::schema::AssetType;
use crate::value::{format_timestamp, Value};

/// Reserved field holding the asset's storage key.
pub const KEY_FIELD: &str = "@key";
/// Reserved field holding the asset's type tag.
pub const ASSET_TYPE_FIELD: &str = "@assetType";
/// Reserved field holding the identity that last modified the asset.
pub const LAST_TOUCH_BY_FIELD: &str = "@lastTouchBy";
/// Reserved field holding the transaction that last modified the asset.
pub const LAST_TX_FIELD: &str = "@lastTx";
/// Reserved field holding the timestamp of the last modification.
pub const LAST_UPDATED_FIELD: &str = "@lastUpdated";

/// A schema-validated asset: fixed metadata header plus typed properties.
///
/// The key (and therefore the type) is fixed at construction; there is no
/// way to change it afterwards, and key properties cannot be overwritten
/// through [`Asset::set`].
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    key: Key,
    last_touch_by: Option<String>,
    last_tx: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    fields: BTreeMap<String, Value>,
}

impl Asset {
    /// Build an asset of `asset_type` from already-typed fields.
    pub fn new(asset_type: &AssetType, fields: BTreeMap<String, Value>) -> Result<Self, TypeError> {
        if let Some(unknown) = fields.keys().find(|name| asset_type.prop(name).is_none()) {
            return Err(TypeError::UnknownProperty {
                asset_type: asset_type.tag.clone(),
                prop: unknown.clone(),
            });
        }
        asset_type.check_required(&fields)?;
        let key = asset_type.key_for(&fields)?;
        Ok(Self {
            key,
            last_touch_by: None,
            last_tx: None,
            last_updated: None,
            fields,
        })
    }

    /// Parse and validate a raw JSON asset.
    ///
    /// `@assetType` is required. The key is always derived from the key
    /// properties; a supplied `@key` must match it.
    pub fn from_json(raw: &Json, types: &AssetTypeRegistry) -> Result<Self, TypeError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| TypeError::Serialization("asset must be a JSON object".into()))?;
        let tag = obj
            .get(ASSET_TYPE_FIELD)
            .and_then(Json::as_str)
            .ok_or_else(|| TypeError::invalid_value(ASSET_TYPE_FIELD, "missing asset type"))?;
        let asset_type = types.require(tag)?;
        let fields = asset_type.parse_fields(obj, types)?;
        let mut asset = Self::new(asset_type, fields)?;

        if let Some(given) = obj.get(KEY_FIELD) {
            if given.as_str() != Some(asset.key.key()) {
                return Err(TypeError::InvalidKey(format!(
                    "supplied {KEY_FIELD} {given} does not match derived key {}",
                    asset.key
                )));
            }
        }

        asset.last_touch_by = string_field(obj, LAST_TOUCH_BY_FIELD);
        asset.last_tx = string_field(obj, LAST_TX_FIELD);
        asset.last_updated = match obj.get(LAST_UPDATED_FIELD).and_then(Json::as_str) {
            Some(text) => Some(
                DateTime::parse_from_rfc3339(text)
                    .map_err(|e| TypeError::invalid_value(LAST_UPDATED_FIELD, e.to_string()))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        Ok(asset)
    }

    /// Decode stored ledger bytes.
    pub fn decode(bytes: &[u8], types: &AssetTypeRegistry) -> Result<Self, TypeError> {
        let raw: Json =
            serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::from_json(&raw, types)
    }

    /// Encode for storage on the ledger.
    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(&self.to_json()).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        obj.insert(KEY_FIELD.into(), Json::String(self.key.key().to_string()));
        obj.insert(
            ASSET_TYPE_FIELD.into(),
            Json::String(self.key.asset_type().to_string()),
        );
        if let Some(by) = &self.last_touch_by {
            obj.insert(LAST_TOUCH_BY_FIELD.into(), Json::String(by.clone()));
        }
        if let Some(tx) = &self.last_tx {
            obj.insert(LAST_TX_FIELD.into(), Json::String(tx.clone()));
        }
        if let Some(at) = &self.last_updated {
            obj.insert(LAST_UPDATED_FIELD.into(), Json::String(format_timestamp(at)));
        }
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.to_json());
        }
        Json::Object(obj)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn asset_type(&self) -> &str {
        self.key.asset_type()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Set a non-key property.
    pub fn set(
        &mut self,
        asset_type: &AssetType,
        field: &str,
        value: Value,
    ) -> Result<(), TypeError> {
        let prop = asset_type.prop(field).ok_or_else(|| TypeError::UnknownProperty {
            asset_type: asset_type.tag.clone(),
            prop: field.to_string(),
        })?;
        if prop.is_key {
            return Err(TypeError::invalid_value(field, "key properties are immutable"));
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    /// Every asset key this asset currently references.
    pub fn references(&self) -> BTreeSet<Key> {
        let mut out = BTreeSet::new();
        for value in self.fields.values() {
            value.collect_references(&mut out);
        }
        out
    }

    pub fn last_touch_by(&self) -> Option<&str> {
        self.last_touch_by.as_deref()
    }

    pub fn last_tx(&self) -> Option<&str> {
        self.last_tx.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Record who modified the asset, in which transaction, and when.
    pub fn stamp(&mut self, touched_by: impl Into<String>, tx: impl Into<String>, at: DateTime<Utc>) {
        self.last_touch_by = Some(touched_by.into());
        self.last_tx = Some(tx.into());
        self.last_updated = Some(at);
    }
}

fn string_field(obj: &Map<String, Json>, name: &str) -> Option<String> {
    obj.get(name).and_then(Json::as_str).map(str::to_string)
}
