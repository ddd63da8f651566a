use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json};

use cct_types::format_timestamp;

/// Field injected into every history object with the commit time.
pub const TIMESTAMP_FIELD: &str = "_timestamp";
/// Field marking a tombstone (and, for point-in-time results, a live state).
pub const IS_DELETE_FIELD: &str = "_isDelete";

/// One committed mutation of an asset, decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryRecord {
    Snapshot {
        tx_id: String,
        timestamp: DateTime<Utc>,
        fields: Map<String, Json>,
    },
    Tombstone {
        tx_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl HistoryRecord {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Snapshot { timestamp, .. } | Self::Tombstone { timestamp, .. } => *timestamp,
        }
    }

    pub fn tx_id(&self) -> &str {
        match self {
            Self::Snapshot { tx_id, .. } | Self::Tombstone { tx_id, .. } => tx_id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Tombstone { .. })
    }

    /// Snapshot fields plus `_timestamp`, or `{"_isDelete": true, "_timestamp"}`.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Snapshot {
                timestamp, fields, ..
            } => {
                let mut obj = fields.clone();
                obj.insert(TIMESTAMP_FIELD.into(), Json::String(format_timestamp(timestamp)));
                Json::Object(obj)
            }
            Self::Tombstone { timestamp, .. } => tombstone_json(timestamp),
        }
    }
}

/// State of an asset as of a target instant.
#[derive(Clone, Debug, PartialEq)]
pub enum PointInTime {
    /// No mutation strictly before the target.
    NotYetExisting,
    /// The latest mutation before the target was a delete.
    Deleted { timestamp: DateTime<Utc> },
    State {
        timestamp: DateTime<Utc>,
        fields: Map<String, Json>,
    },
}

impl PointInTime {
    pub fn to_json(&self) -> Json {
        match self {
            Self::NotYetExisting => Json::Object(Map::new()),
            Self::Deleted { timestamp } => tombstone_json(timestamp),
            Self::State { timestamp, fields } => {
                let mut obj = fields.clone();
                obj.insert(IS_DELETE_FIELD.into(), Json::Bool(false));
                obj.insert(TIMESTAMP_FIELD.into(), Json::String(format_timestamp(timestamp)));
                Json::Object(obj)
            }
        }
    }
}

fn tombstone_json(timestamp: &DateTime<Utc>) -> Json {
    let mut obj = Map::new();
    obj.insert(IS_DELETE_FIELD.into(), Json::Bool(true));
    obj.insert(TIMESTAMP_FIELD.into(), Json::String(format_timestamp(timestamp)));
    Json::Object(obj)
}
