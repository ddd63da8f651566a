use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};

use crate::key::Key;

/// A single property value of an asset.
///
/// The set is closed on purpose: every value that reaches the ledger has been
/// checked against its [`DataType`](crate::DataType) first, so downstream code
/// never has to guess what a JSON string was meant to be.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Datetime(DateTime<Utc>),
    /// Free-form nested object (`@object` properties).
    Object(Map<String, Json>),
    /// Pointer to another asset.
    Reference(Key),
    List(Vec<Value>),
}

impl Value {
    /// Render as the JSON stored on the ledger.
    pub fn to_json(&self) -> Json {
        match self {
            Value::String(s) => Json::String(s.clone()),
            Value::Number(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
            Value::Integer(i) => Json::Number((*i).into()),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Datetime(t) => Json::String(format_datetime(t)),
            Value::Object(map) => Json::Object(map.clone()),
            Value::Reference(key) => key.to_json(),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Text contributed to a key seed: references collapse to their key
    /// string, booleans to `t`/`f`, timestamps to RFC 3339, lists to the
    /// concatenation of their items.
    pub(crate) fn key_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => String::from(if *b { "t" } else { "f" }),
            Value::Datetime(t) => format_datetime(t),
            Value::Object(map) => Json::Object(map.clone()).to_string(),
            Value::Reference(key) => key.key().to_string(),
            Value::List(items) => items.iter().map(Value::key_string).collect(),
        }
    }

    /// Collect every reference held by this value, including inside lists.
    pub fn collect_references(&self, out: &mut BTreeSet<Key>) {
        match self {
            Value::Reference(key) => {
                out.insert(key.clone());
            }
            Value::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            _ => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Key> {
        match self {
            Value::Reference(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Datetime(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Datetime(t)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        Value::Reference(key)
    }
}

fn format_datetime(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Second-precision RFC 3339 rendering used for reported timestamps.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
