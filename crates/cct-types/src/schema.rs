use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::asset::{ASSET_TYPE_FIELD, KEY_FIELD};
use crate::error::TypeError;
use crate::key::Key;
use crate::registry::AssetTypeRegistry;
use crate::value::Value;

/// Declared type of an asset property.
///
/// Textual form (as written in schema definitions):
///
/// | Text        | Variant                          |
/// |-------------|----------------------------------|
/// | `string`    | [`DataType::String`]             |
/// | `number`    | [`DataType::Number`]             |
/// | `integer`   | [`DataType::Integer`]            |
/// | `boolean`   | [`DataType::Boolean`]            |
/// | `datetime`  | [`DataType::Datetime`]           |
/// | `@object`   | [`DataType::Object`]             |
/// | `->person`  | [`DataType::Reference`]          |
/// | `[]string`  | [`DataType::List`] of the inner  |
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Integer,
    Boolean,
    Datetime,
    Object,
    Reference(String),
    List(Box<DataType>),
}

impl DataType {
    /// The asset type this property points at, looking through lists.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            DataType::Reference(tag) => Some(tag),
            DataType::List(inner) => inner.referenced_type(),
            _ => None,
        }
    }

    /// JSON kind a value of this type is carried as.
    pub fn json_kind(&self) -> &'static str {
        match self {
            DataType::String | DataType::Datetime => "string",
            DataType::Number | DataType::Integer => "number",
            DataType::Boolean => "boolean",
            DataType::Object | DataType::Reference(_) => "object",
            DataType::List(_) => "array",
        }
    }

    /// Built-in scalar types, in the order they are documented.
    pub fn builtins() -> [DataType; 6] {
        [
            DataType::String,
            DataType::Number,
            DataType::Integer,
            DataType::Boolean,
            DataType::Datetime,
            DataType::Object,
        ]
    }

    /// Check a raw JSON value against this type and convert it.
    pub fn parse_value(
        &self,
        prop: &str,
        raw: &Json,
        types: &AssetTypeRegistry,
    ) -> Result<Value, TypeError> {
        match self {
            DataType::String => raw
                .as_str()
                .map(Value::from)
                .ok_or_else(|| TypeError::invalid_value(prop, "expected a string")),
            DataType::Number => {
                let n = raw
                    .as_f64()
                    .ok_or_else(|| TypeError::invalid_value(prop, "expected a number"))?;
                if !n.is_finite() {
                    return Err(TypeError::invalid_value(prop, "number must be finite"));
                }
                Ok(Value::Number(n))
            }
            DataType::Integer => {
                if let Some(i) = raw.as_i64() {
                    return Ok(Value::Integer(i));
                }
                match raw.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::Integer(f as i64))
                    }
                    _ => Err(TypeError::invalid_value(prop, "expected an integer")),
                }
            }
            DataType::Boolean => raw
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| TypeError::invalid_value(prop, "expected a boolean")),
            DataType::Datetime => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| TypeError::invalid_value(prop, "expected an RFC 3339 string"))?;
                let parsed = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| TypeError::invalid_value(prop, e.to_string()))?;
                Ok(Value::Datetime(parsed.with_timezone(&Utc)))
            }
            DataType::Object => raw
                .as_object()
                .cloned()
                .map(Value::Object)
                .ok_or_else(|| TypeError::invalid_value(prop, "expected an object")),
            DataType::Reference(target) => parse_reference(prop, target, raw, types),
            DataType::List(inner) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| TypeError::invalid_value(prop, "expected an array"))?;
                items
                    .iter()
                    .map(|item| inner.parse_value(prop, item, types))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
        }
    }
}

/// A reference is given either by `@key` or by the key properties of the
/// referenced type, from which the key is derived.
fn parse_reference(
    prop: &str,
    target: &str,
    raw: &Json,
    types: &AssetTypeRegistry,
) -> Result<Value, TypeError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| TypeError::invalid_value(prop, "expected a reference object"))?;

    if let Some(given) = obj.get(ASSET_TYPE_FIELD) {
        if given.as_str() != Some(target) {
            return Err(TypeError::invalid_value(
                prop,
                format!("reference must point to '{target}', got {given}"),
            ));
        }
    }

    if let Some(key) = obj.get(KEY_FIELD) {
        let key = key
            .as_str()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TypeError::invalid_value(prop, "reference key must be a non-empty string"))?;
        return Ok(Value::Reference(Key::new(target, key)));
    }

    let referenced = types.require(target)?;
    let key_fields = referenced.parse_key_fields(obj, types)?;
    Ok(Value::Reference(referenced.key_for(&key_fields)?))
}

impl FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = s.strip_prefix("[]") {
            return Ok(DataType::List(Box::new(inner.parse()?)));
        }
        if let Some(tag) = s.strip_prefix("->") {
            if tag.is_empty() {
                return Err(TypeError::InvalidDataType(s.to_string()));
            }
            return Ok(DataType::Reference(tag.to_string()));
        }
        match s {
            "string" => Ok(DataType::String),
            "number" => Ok(DataType::Number),
            "integer" => Ok(DataType::Integer),
            "boolean" => Ok(DataType::Boolean),
            "datetime" => Ok(DataType::Datetime),
            "@object" => Ok(DataType::Object),
            other => Err(TypeError::InvalidDataType(other.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String => f.write_str("string"),
            DataType::Number => f.write_str("number"),
            DataType::Integer => f.write_str("integer"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::Datetime => f.write_str("datetime"),
            DataType::Object => f.write_str("@object"),
            DataType::Reference(tag) => write!(f, "->{tag}"),
            DataType::List(inner) => write!(f, "[]{inner}"),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One property of an asset type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProp {
    pub tag: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Key properties are implicitly required.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_key: bool,
    pub data_type: DataType,
}

impl AssetProp {
    pub fn new(tag: impl Into<String>, data_type: DataType) -> Self {
        Self {
            tag: tag.into(),
            label: String::new(),
            description: String::new(),
            required: false,
            is_key: false,
            data_type,
        }
    }

    /// Mark as a key property.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.required = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn must_be_present(&self) -> bool {
        self.required || self.is_key
    }
}

/// Schema of one asset type.
///
/// A type with a non-empty `readers` list is private: its state lives in a
/// confidential collection named after the type tag instead of public state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetType {
    pub tag: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readers: Vec<String>,
    pub props: Vec<AssetProp>,
    /// Defined at runtime through the dynamic asset type transactions.
    #[serde(default)]
    pub dynamic: bool,
}

impl AssetType {
    pub fn new(tag: impl Into<String>, props: Vec<AssetProp>) -> Self {
        let tag = tag.into();
        Self {
            label: tag.clone(),
            tag,
            description: String::new(),
            readers: Vec::new(),
            props,
            dynamic: false,
        }
    }

    /// Make the type private, readable by the given organizations.
    pub fn private_to(mut self, readers: Vec<String>) -> Self {
        self.readers = readers;
        self
    }

    pub fn is_private(&self) -> bool {
        !self.readers.is_empty()
    }

    /// Name of the private collection holding this type, if private.
    pub fn collection(&self) -> Option<&str> {
        self.is_private().then_some(self.tag.as_str())
    }

    pub fn prop(&self, tag: &str) -> Option<&AssetProp> {
        self.props.iter().find(|p| p.tag == tag)
    }

    pub fn key_props(&self) -> impl Iterator<Item = &AssetProp> {
        self.props.iter().filter(|p| p.is_key)
    }

    /// Properties that hold references, with the type they point at.
    pub fn reference_props(&self) -> impl Iterator<Item = (&AssetProp, &str)> {
        self.props
            .iter()
            .filter_map(|p| p.data_type.referenced_type().map(|t| (p, t)))
    }

    /// Returns `true` if any property of this type references `target`.
    pub fn references_type(&self, target: &str) -> bool {
        self.reference_props().any(|(_, t)| t == target)
    }

    /// Validate and convert the non-metadata fields of a raw asset.
    ///
    /// Fields starting with `@` are metadata and skipped; unknown properties
    /// and missing required properties are rejected.
    pub fn parse_fields(
        &self,
        raw: &Map<String, Json>,
        types: &AssetTypeRegistry,
    ) -> Result<BTreeMap<String, Value>, TypeError> {
        let mut fields = BTreeMap::new();
        for (name, value) in raw {
            if name.starts_with('@') {
                continue;
            }
            let prop = self.prop(name).ok_or_else(|| TypeError::UnknownProperty {
                asset_type: self.tag.clone(),
                prop: name.clone(),
            })?;
            if value.is_null() {
                continue;
            }
            fields.insert(name.clone(), prop.data_type.parse_value(name, value, types)?);
        }
        self.check_required(&fields)?;
        Ok(fields)
    }

    /// Parse only the key properties out of a raw object.
    pub fn parse_key_fields(
        &self,
        raw: &Map<String, Json>,
        types: &AssetTypeRegistry,
    ) -> Result<BTreeMap<String, Value>, TypeError> {
        let mut fields = BTreeMap::new();
        for prop in self.key_props() {
            let value = raw.get(&prop.tag).ok_or_else(|| TypeError::MissingProperty {
                asset_type: self.tag.clone(),
                prop: prop.tag.clone(),
            })?;
            fields.insert(
                prop.tag.clone(),
                prop.data_type.parse_value(&prop.tag, value, types)?,
            );
        }
        Ok(fields)
    }

    pub fn check_required(&self, fields: &BTreeMap<String, Value>) -> Result<(), TypeError> {
        match self
            .props
            .iter()
            .find(|p| p.must_be_present() && !fields.contains_key(&p.tag))
        {
            Some(missing) => Err(TypeError::MissingProperty {
                asset_type: self.tag.clone(),
                prop: missing.tag.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Derive the key of an asset of this type from its fields.
    pub fn key_for(&self, fields: &BTreeMap<String, Value>) -> Result<Key, TypeError> {
        let mut key_values = Vec::new();
        for prop in self.key_props() {
            let value = fields.get(&prop.tag).ok_or_else(|| TypeError::MissingProperty {
                asset_type: self.tag.clone(),
                prop: prop.tag.clone(),
            })?;
            key_values.push(value);
        }
        Ok(Key::derive(&self.tag, key_values))
    }

    /// Self-consistency checks that do not need the rest of the registry.
    pub(crate) fn check(&self) -> Result<(), TypeError> {
        if self.tag.is_empty() {
            return Err(TypeError::InvalidSchema("asset type tag is empty".into()));
        }
        if self.tag.starts_with('@') {
            return Err(TypeError::InvalidSchema(format!(
                "asset type tag '{}' must not start with '@'",
                self.tag
            )));
        }
        if self.tag.contains(['\u{0}', ':']) {
            return Err(TypeError::InvalidSchema(format!(
                "asset type tag '{}' contains a reserved character",
                self.tag
            )));
        }
        if self.key_props().next().is_none() {
            return Err(TypeError::InvalidSchema(format!(
                "asset type '{}' declares no key property",
                self.tag
            )));
        }
        let mut seen = HashSet::new();
        for prop in &self.props {
            if prop.tag.is_empty() || prop.tag.starts_with('@') {
                return Err(TypeError::InvalidSchema(format!(
                    "asset type '{}' has an invalid property tag '{}'",
                    self.tag, prop.tag
                )));
            }
            if !seen.insert(prop.tag.as_str()) {
                return Err(TypeError::InvalidSchema(format!(
                    "asset type '{}' declares property '{}' twice",
                    self.tag, prop.tag
                )));
            }
        }
        Ok(())
    }
}
