use std::collections::BTreeMap;

use crate::error::TypeError;
use crate::schema::AssetType;

/// Validated catalog of asset types.
///
/// Built once at process start with [`AssetTypeRegistry::new`] and read-only
/// afterwards: there are no mutating methods. Runtime-defined types are
/// combined through [`AssetTypeRegistry::with_overlay`], which returns a new
/// registry and leaves the original untouched.
///
/// Iteration is in tag order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetTypeRegistry {
    types: BTreeMap<String, AssetType>,
}

impl AssetTypeRegistry {
    /// Build a registry, running the startup consistency check.
    ///
    /// Rejects duplicate tags, malformed types and references to types that
    /// are not part of the registry.
    pub fn new(types: Vec<AssetType>) -> Result<Self, TypeError> {
        let mut map = BTreeMap::new();
        for asset_type in types {
            asset_type.check()?;
            if map.contains_key(&asset_type.tag) {
                return Err(TypeError::InvalidSchema(format!(
                    "asset type '{}' is declared twice",
                    asset_type.tag
                )));
            }
            map.insert(asset_type.tag.clone(), asset_type);
        }

        for asset_type in map.values() {
            for (prop, target) in asset_type.reference_props() {
                if !map.contains_key(target) {
                    return Err(TypeError::InvalidSchema(format!(
                        "property '{}' of '{}' references unknown asset type '{}'",
                        prop.tag, asset_type.tag, target
                    )));
                }
            }
        }

        Ok(Self { types: map })
    }

    /// Build a registry from a JSON array of type definitions.
    pub fn from_json(text: &str) -> Result<Self, TypeError> {
        let types: Vec<AssetType> =
            serde_json::from_str(text).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::new(types)
    }

    /// A new registry containing these types plus `extra`.
    pub fn with_overlay(&self, extra: Vec<AssetType>) -> Result<Self, TypeError> {
        if extra.is_empty() {
            return Ok(self.clone());
        }
        let mut all: Vec<AssetType> = self.types.values().cloned().collect();
        all.extend(extra);
        Self::new(all)
    }

    pub fn get(&self, tag: &str) -> Option<&AssetType> {
        self.types.get(tag)
    }

    /// Like [`Self::get`], failing with [`TypeError::UnknownAssetType`].
    pub fn require(&self, tag: &str) -> Result<&AssetType, TypeError> {
        self.get(tag)
            .ok_or_else(|| TypeError::UnknownAssetType(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetType> {
        self.types.values()
    }

    /// Types with at least one property referencing `target`.
    pub fn referrer_types<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a AssetType> {
        self.types.values().filter(move |t| t.references_type(target))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
