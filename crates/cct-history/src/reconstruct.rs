use cct_assets::KeySpace;
use cct_ledger::{HistoryEntry, IteratorGuard, LedgerPort};
use cct_types::{AssetTypeRegistry, Key};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};
use crate::record::{HistoryRecord, PointInTime};

/// Rebuilds asset history from the ledger's per-key history iterator.
///
/// Both queries are a single forward pass over the key's history, so the
/// cost is linear in the number of recorded mutations.
pub struct HistoryReconstructor<'a, L: ?Sized> {
    keyspace: KeySpace<'a, L>,
}

impl<'a, L: LedgerPort + ?Sized> HistoryReconstructor<'a, L> {
    pub fn new(ledger: &'a L, types: &'a AssetTypeRegistry) -> Self {
        Self {
            keyspace: KeySpace::new(ledger, types),
        }
    }

    /// Every committed mutation of `key`, oldest first.
    pub fn full_history(&self, key: &Key) -> HistoryResult<Vec<HistoryRecord>> {
        let mut history = self.open(key)?;
        let mut records = Vec::new();
        for entry in history.by_ref() {
            let entry = entry.map_err(|e| HistoryError::storage("error iterating history", e))?;
            records.push(decode_record(key, entry)?);
        }
        history
            .close()
            .map_err(|e| HistoryError::storage("failed to close history iterator", e))?;

        if records.is_empty() {
            return Err(HistoryError::NotFound);
        }
        debug!(key = %key, records = records.len(), "history read");
        Ok(records)
    }

    /// State of `key` as of `target`.
    ///
    /// Selects the mutation with the greatest timestamp strictly before
    /// `target`; on equal timestamps the earliest committed one wins.
    pub fn as_of(&self, key: &Key, target: DateTime<Utc>) -> HistoryResult<PointInTime> {
        let mut history = self.open(key)?;
        let mut seen = 0usize;
        let mut closest: Option<HistoryEntry> = None;
        for entry in history.by_ref() {
            let entry = entry.map_err(|e| HistoryError::storage("error iterating history", e))?;
            seen += 1;
            let closer = closest
                .as_ref()
                .map_or(true, |best| entry.timestamp > best.timestamp);
            if entry.timestamp < target && closer {
                closest = Some(entry);
            }
        }
        history
            .close()
            .map_err(|e| HistoryError::storage("failed to close history iterator", e))?;

        if seen == 0 {
            return Err(HistoryError::NotFound);
        }
        let result = match closest {
            None => PointInTime::NotYetExisting,
            Some(entry) => match decode_record(key, entry)? {
                HistoryRecord::Tombstone { timestamp, .. } => PointInTime::Deleted { timestamp },
                HistoryRecord::Snapshot {
                    timestamp, fields, ..
                } => PointInTime::State { timestamp, fields },
            },
        };
        debug!(
            key = %key,
            target = %target,
            scanned = seen,
            outcome = outcome(&result),
            "point-in-time resolved"
        );
        Ok(result)
    }

    fn open(&self, key: &Key) -> HistoryResult<IteratorGuard<'a, HistoryEntry>> {
        let address = self.keyspace.resolve(key.asset_type(), key.key())?;
        if address.route.is_private() {
            debug!(key = %key, "private data keeps no history");
            return Err(HistoryError::NotFound);
        }
        let iter = self
            .keyspace
            .ledger()
            .history_for_key(&address.key)
            .map_err(|e| HistoryError::storage("failed to read asset history", e))?;
        Ok(IteratorGuard::new(iter))
    }
}

fn outcome(result: &PointInTime) -> &'static str {
    match result {
        PointInTime::NotYetExisting => "not-yet-existing",
        PointInTime::Deleted { .. } => "deleted",
        PointInTime::State { .. } => "state",
    }
}

fn decode_record(key: &Key, entry: HistoryEntry) -> HistoryResult<HistoryRecord> {
    let HistoryEntry {
        tx_id,
        timestamp,
        value,
    } = entry;
    let Some(bytes) = value else {
        return Ok(HistoryRecord::Tombstone { tx_id, timestamp });
    };
    let fields = match serde_json::from_slice::<Json>(&bytes) {
        Ok(Json::Object(fields)) => fields,
        Ok(other) => {
            return Err(HistoryError::Decode {
                key: key.key().to_string(),
                tx_id,
                reason: format!("found {}", json_kind(&other)),
            })
        }
        Err(e) => {
            return Err(HistoryError::Decode {
                key: key.key().to_string(),
                tx_id,
                reason: e.to_string(),
            })
        }
    };
    Ok(HistoryRecord::Snapshot {
        tx_id,
        timestamp,
        fields,
    })
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cct_assets::AssetStore;
    use cct_ledger::{InMemoryLedger, LedgerOp};
    use cct_types::{Asset, AssetProp, AssetType, DataType, ErrorKind};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    fn registry() -> AssetTypeRegistry {
        AssetTypeRegistry::new(vec![
            AssetType::new(
                "person",
                vec![
                    AssetProp::new("id", DataType::String).key(),
                    AssetProp::new("name", DataType::String),
                ],
            ),
            AssetType::new("secret", vec![AssetProp::new("id", DataType::String).key()])
                .private_to(vec!["org1MSP".into()]),
        ])
        .unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn person(types: &AssetTypeRegistry, name: &str) -> Asset {
        Asset::from_json(&json!({ "@assetType": "person", "id": "1", "name": name }), types)
            .unwrap()
    }

    /// Write at t=10, delete at t=20, write a new value at t=30.
    fn write_delete_write(types: &AssetTypeRegistry) -> (InMemoryLedger, Key) {
        let ledger = InMemoryLedger::new();
        let original = person(types, "Maria");
        let key = original.key().clone();
        ledger
            .transaction("t1", t(10), |l| AssetStore::new(l, types).put_new(original))
            .unwrap();
        ledger
            .transaction("t2", t(20), |l| AssetStore::new(l, types).delete(&key))
            .unwrap();
        ledger
            .transaction("t3", t(30), |l| {
                AssetStore::new(l, types).put_new(person(types, "Joana"))
            })
            .unwrap();
        (ledger, key)
    }

    fn name_of(result: &PointInTime) -> Option<&str> {
        match result {
            PointInTime::State { fields, .. } => fields.get("name").and_then(Json::as_str),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Full history
    // -----------------------------------------------------------------------

    #[test]
    fn full_history_lists_writes_and_tombstones_in_commit_order() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        let records = HistoryReconstructor::new(&ledger, &types)
            .full_history(&key)
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(!records[0].is_delete());
        assert!(records[1].is_delete());
        assert!(!records[2].is_delete());
        assert_eq!(records[0].to_json()["name"], "Maria");
        assert_eq!(records[0].to_json()["_timestamp"], "2024-01-01T00:00:10Z");
        assert_eq!(
            records[1].to_json(),
            json!({ "_isDelete": true, "_timestamp": "2024-01-01T00:00:20Z" })
        );
        assert_eq!(records[2].tx_id(), "t3");
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn no_history_is_not_found() {
        let types = registry();
        let ledger = InMemoryLedger::new();
        let reconstructor = HistoryReconstructor::new(&ledger, &types);
        let key = Key::new("person", "person:never");

        let err = reconstructor.full_history(&key).unwrap_err();
        assert_eq!(err.to_string(), "history not found");
        assert_eq!(err.status(), 404);
        assert!(matches!(
            reconstructor.as_of(&key, t(100)),
            Err(HistoryError::NotFound)
        ));
    }

    // -----------------------------------------------------------------------
    // Point in time
    // -----------------------------------------------------------------------

    #[test]
    fn point_in_time_across_write_delete_write() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        let reconstructor = HistoryReconstructor::new(&ledger, &types);

        assert_eq!(reconstructor.as_of(&key, t(5)).unwrap(), PointInTime::NotYetExisting);
        assert_eq!(name_of(&reconstructor.as_of(&key, t(15)).unwrap()), Some("Maria"));
        assert_eq!(
            reconstructor.as_of(&key, t(25)).unwrap(),
            PointInTime::Deleted { timestamp: t(20) }
        );
        assert_eq!(name_of(&reconstructor.as_of(&key, t(35)).unwrap()), Some("Joana"));
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn target_equal_to_commit_time_excludes_that_commit() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        let reconstructor = HistoryReconstructor::new(&ledger, &types);
        assert_eq!(reconstructor.as_of(&key, t(10)).unwrap(), PointInTime::NotYetExisting);
        assert_eq!(name_of(&reconstructor.as_of(&key, t(20)).unwrap()), Some("Maria"));
    }

    #[test]
    fn point_in_time_json_marks_live_state() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        let json = HistoryReconstructor::new(&ledger, &types)
            .as_of(&key, t(15))
            .unwrap()
            .to_json();
        assert_eq!(json["_isDelete"], false);
        assert_eq!(json["_timestamp"], "2024-01-01T00:00:10Z");
        assert_eq!(json["@lastTx"], "t1");
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    #[test]
    fn iteration_failure_is_storage_error_and_closes_iterator() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        ledger.fail_on(LedgerOp::HistoryNext);
        let err = HistoryReconstructor::new(&ledger, &types)
            .full_history(&key)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().starts_with("error iterating history"));
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn history_query_failure_is_storage_error() {
        let types = registry();
        let (ledger, key) = write_delete_write(&types);
        ledger.fail_on(LedgerOp::HistoryQuery);
        let err = HistoryReconstructor::new(&ledger, &types)
            .as_of(&key, t(15))
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn undecodable_snapshot_is_internal() {
        let types = registry();
        let ledger = InMemoryLedger::new();
        ledger
            .transaction("t1", t(1), |l| l.put_state("person:raw", b"[1,2]"))
            .unwrap();
        let err = HistoryReconstructor::new(&ledger, &types)
            .full_history(&Key::new("person", "person:raw"))
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.to_string().contains("found an array"));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let types = registry();
        let ledger = InMemoryLedger::new();
        let reconstructor = HistoryReconstructor::new(&ledger, &types);
        assert_eq!(
            reconstructor.full_history(&Key::new("person", "")).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            reconstructor.full_history(&Key::new("ghost", "ghost:1")).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(ledger.op_count(LedgerOp::HistoryQuery), 0);
    }

    #[test]
    fn private_types_have_no_history() {
        let types = registry();
        let ledger = InMemoryLedger::new();
        let reconstructor = HistoryReconstructor::new(&ledger, &types);
        let key = Key::new("secret", "secret:1");

        let err = reconstructor.full_history(&key).unwrap_err();
        assert!(matches!(err, HistoryError::NotFound));
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "history not found");
        assert!(matches!(
            reconstructor.as_of(&key, t(10)),
            Err(HistoryError::NotFound)
        ));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn as_of_matches_latest_mutation_before_target(
            ops in prop::collection::vec((1i64..5, any::<bool>()), 1..12),
            target in 0i64..70,
        ) {
            let types = registry();
            let ledger = InMemoryLedger::new();
            let key = Key::new("person", "person:p");
            let mut at = 0;
            let mut expected = PointInTime::NotYetExisting;
            for (i, (gap, delete)) in ops.iter().enumerate() {
                at += gap;
                let name = format!("v{i}");
                ledger
                    .transaction(format!("t{i}"), t(at), |l| {
                        if *delete {
                            l.del_state(key.key())
                        } else {
                            l.put_state(key.key(), json!({ "name": name }).to_string().as_bytes())
                        }
                    })
                    .unwrap();
                if at < target {
                    expected = if *delete {
                        PointInTime::Deleted { timestamp: t(at) }
                    } else {
                        PointInTime::State {
                            timestamp: t(at),
                            fields: json!({ "name": name }).as_object().cloned().unwrap(),
                        }
                    };
                }
            }

            let result = HistoryReconstructor::new(&ledger, &types)
                .as_of(&key, t(target))
                .unwrap();
            prop_assert_eq!(result, expected);
            prop_assert_eq!(ledger.open_iterators(), 0);
        }
    }
}
