use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use cct_types::{Asset, AssetTypeRegistry, DataType, Key, TypeError, Value, ASSET_TYPE_FIELD, KEY_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::error::{TxError, TxResult};

/// Declared type of a transaction argument.
///
/// Textual forms: the scalar data type names, `@object`, `@key`, `@asset`,
/// `->tag` for a key of one asset type, and `[]<inner>` for lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgType {
    Scalar(DataType),
    /// Key of an asset of any registered type.
    Key,
    /// Key of an asset of the named type.
    Reference(String),
    /// A full asset, validated against its type.
    Asset,
    List(Box<ArgType>),
}

impl ArgType {
    pub fn list(inner: ArgType) -> Self {
        Self::List(Box::new(inner))
    }

    fn parse(&self, tag: &str, raw: &Json, types: &AssetTypeRegistry) -> TxResult<ArgValue> {
        let invalid = |e: TypeError| TxError::Validation(format!("invalid argument '{tag}': {e}"));
        match self {
            Self::Scalar(data_type) => data_type
                .parse_value(tag, raw, types)
                .map(ArgValue::Scalar)
                .map_err(invalid),
            Self::Key => parse_key(raw, None, types).map(ArgValue::Key).map_err(invalid),
            Self::Reference(target) => parse_key(raw, Some(target), types)
                .map(ArgValue::Key)
                .map_err(invalid),
            Self::Asset => Asset::from_json(raw, types)
                .map(|a| ArgValue::Asset(Box::new(a)))
                .map_err(invalid),
            Self::List(inner) => {
                let items = raw.as_array().ok_or_else(|| {
                    TxError::Validation(format!("invalid argument '{tag}': expected an array"))
                })?;
                items
                    .iter()
                    .map(|item| inner.parse(tag, item, types))
                    .collect::<TxResult<Vec<_>>>()
                    .map(ArgValue::List)
            }
        }
    }
}

/// Accepts `{"@key"}` (type taken from `@assetType` or the key prefix) or
/// `{"@assetType", <key properties>}`.
fn parse_key(raw: &Json, expected: Option<&str>, types: &AssetTypeRegistry) -> Result<Key, TypeError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| TypeError::InvalidKey("expected an object".into()))?;
    let given_key = obj.get(KEY_FIELD).and_then(Json::as_str);
    let asset_type = obj
        .get(ASSET_TYPE_FIELD)
        .and_then(Json::as_str)
        .or_else(|| given_key.and_then(|k| k.split_once(':')).map(|(tag, _)| tag))
        .or(expected)
        .ok_or_else(|| TypeError::InvalidKey(format!("missing '{ASSET_TYPE_FIELD}'")))?;
    if let Some(expected) = expected {
        if asset_type != expected {
            return Err(TypeError::InvalidKey(format!(
                "expected a key of '{expected}', got '{asset_type}'"
            )));
        }
    }
    let definition = types.require(asset_type)?;

    match given_key {
        Some(key) if key.is_empty() => Err(TypeError::InvalidKey("key must not be empty".into())),
        Some(key) => Ok(Key::new(asset_type, key)),
        None => {
            let key_fields = definition.parse_key_fields(obj, types)?;
            definition.key_for(&key_fields)
        }
    }
}

impl FromStr for ArgType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = s.strip_prefix("[]") {
            return Ok(Self::list(inner.parse()?));
        }
        match s {
            "@key" => Ok(Self::Key),
            "@asset" => Ok(Self::Asset),
            _ => match s.parse::<DataType>()? {
                DataType::Reference(tag) => Ok(Self::Reference(tag)),
                scalar => Ok(Self::Scalar(scalar)),
            },
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(data_type) => write!(f, "{data_type}"),
            Self::Key => f.write_str("@key"),
            Self::Reference(tag) => write!(f, "->{tag}"),
            Self::Asset => f.write_str("@asset"),
            Self::List(inner) => write!(f, "[]{inner}"),
        }
    }
}

impl Serialize for ArgType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArgType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Declared argument of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub tag: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub data_type: ArgType,
    #[serde(default)]
    pub required: bool,
}

impl Argument {
    pub fn new(tag: impl Into<String>, data_type: ArgType) -> Self {
        let tag = tag.into();
        Self {
            label: tag.clone(),
            tag,
            description: String::new(),
            data_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A parsed argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Scalar(Value),
    Key(Key),
    Asset(Box<Asset>),
    List(Vec<ArgValue>),
}

/// Parsed arguments of one invocation, by tag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, ArgValue>,
}

impl Args {
    /// Parse a raw JSON argument object against the declared arguments.
    ///
    /// Missing or `null` required arguments are rejected; undeclared
    /// arguments are ignored.
    pub fn parse(declared: &[Argument], raw: &Json, types: &AssetTypeRegistry) -> TxResult<Self> {
        let empty = Map::new();
        let obj = match raw {
            Json::Null => &empty,
            Json::Object(obj) => obj,
            _ => return Err(TxError::Validation("arguments must be a JSON object".into())),
        };

        let mut values = BTreeMap::new();
        for arg in declared {
            match obj.get(&arg.tag) {
                None | Some(Json::Null) if arg.required => {
                    return Err(TxError::Validation(format!(
                        "missing required argument '{}'",
                        arg.tag
                    )));
                }
                None | Some(Json::Null) => {}
                Some(raw) => {
                    values.insert(arg.tag.clone(), arg.data_type.parse(&arg.tag, raw, types)?);
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, tag: &str) -> Option<&ArgValue> {
        self.values.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.values.contains_key(tag)
    }

    pub fn str(&self, tag: &str) -> Option<&str> {
        match self.get(tag)? {
            ArgValue::Scalar(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn integer(&self, tag: &str) -> Option<i64> {
        match self.get(tag)? {
            ArgValue::Scalar(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn datetime(&self, tag: &str) -> Option<DateTime<Utc>> {
        match self.get(tag)? {
            ArgValue::Scalar(value) => value.as_datetime(),
            _ => None,
        }
    }

    pub fn object(&self, tag: &str) -> Option<&Map<String, Json>> {
        match self.get(tag)? {
            ArgValue::Scalar(Value::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn key(&self, tag: &str) -> Option<&Key> {
        match self.get(tag)? {
            ArgValue::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn asset(&self, tag: &str) -> Option<&Asset> {
        match self.get(tag)? {
            ArgValue::Asset(asset) => Some(asset),
            _ => None,
        }
    }

    /// Elements of a `[]@object` argument.
    pub fn objects(&self, tag: &str) -> Option<Vec<&Map<String, Json>>> {
        match self.get(tag)? {
            ArgValue::List(items) => items
                .iter()
                .map(|item| match item {
                    ArgValue::Scalar(Value::Object(obj)) => Some(obj),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Required-argument accessor for handlers, failing with a validation
    /// error instead of `None`.
    pub fn require<'a, T>(
        &'a self,
        tag: &str,
        get: impl FnOnce(&'a Self, &str) -> Option<T>,
    ) -> TxResult<T> {
        get(self, tag).ok_or_else(|| {
            TxError::Validation(format!("argument '{tag}' is missing or has the wrong type"))
        })
    }
}
