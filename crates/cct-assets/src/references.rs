use std::collections::BTreeSet;

use cct_ledger::{create_composite_key, split_composite_key, IteratorGuard, LedgerPort, StateIter};
use cct_types::{AssetTypeRegistry, Key};
use tracing::debug;

use crate::error::{AssetError, AssetResult};
use crate::keyspace::KeySpace;

/// Object type of reference index composite keys.
///
/// An entry is `\0cct~ref\0<referenced key>\0<referrer type>\0<referrer key>\0`
/// with a single marker byte as value: presence of the key is the signal.
pub const REFERENCE_INDEX: &str = "cct~ref";

const MARKER: &[u8] = &[0x00];

/// Reverse index from a referenced asset key to the assets referencing it.
///
/// Entries of public referrers live in world state; entries of private
/// referrers live in the referrer's own collection, so the index never
/// leaks a private asset's key into public state.
pub struct ReferenceIndex<'a, L: ?Sized> {
    keyspace: KeySpace<'a, L>,
}

impl<'a, L: LedgerPort + ?Sized> ReferenceIndex<'a, L> {
    pub fn new(ledger: &'a L, types: &'a AssetTypeRegistry) -> Self {
        Self {
            keyspace: KeySpace::new(ledger, types),
        }
    }

    /// Bring the entries held by `referrer` from `before` to `after`.
    ///
    /// Must run in the same ledger transaction as the referrer's state write.
    pub fn sync(&self, referrer: &Key, before: &BTreeSet<Key>, after: &BTreeSet<Key>) -> AssetResult<()> {
        let collection = self.collection_of(referrer)?;
        let ledger = self.keyspace.ledger();

        for target in after.difference(before) {
            let entry = entry_key(referrer, target)?;
            let written = match collection {
                None => ledger.put_state(&entry, MARKER),
                Some(collection) => ledger.put_private(collection, &entry, MARKER),
            };
            written.map_err(|e| AssetError::storage("unable to update reference index", e))?;
            debug!(referrer = %referrer, target = %target, "reference indexed");
        }

        for target in before.difference(after) {
            let entry = entry_key(referrer, target)?;
            let removed = match collection {
                None => ledger.del_state(&entry),
                Some(collection) => ledger.del_private(collection, &entry),
            };
            removed.map_err(|e| AssetError::storage("unable to update reference index", e))?;
            debug!(referrer = %referrer, target = %target, "reference removed");
        }
        Ok(())
    }

    /// Drop every entry held by `referrer`.
    pub fn remove_all(&self, referrer: &Key, references: &BTreeSet<Key>) -> AssetResult<()> {
        self.sync(referrer, references, &BTreeSet::new())
    }

    /// Keys of the assets currently referencing `target`.
    ///
    /// An empty `filter` returns every referrer; otherwise only referrers
    /// whose type is in `filter`. Results are ordered by referrer type then
    /// key, public referrers before private ones.
    pub fn referrers(&self, target: &Key, filter: &[&str]) -> AssetResult<Vec<Key>> {
        self.keyspace.resolve(target.asset_type(), target.key())?;
        let wanted = |asset_type: &str| filter.is_empty() || filter.contains(&asset_type);
        let ledger = self.keyspace.ledger();
        let mut found = Vec::new();

        let public = ledger
            .state_by_partial_composite_key(REFERENCE_INDEX, &[target.key()])
            .map_err(|e| AssetError::storage("unable to query referrers", e))?;
        collect(public, &wanted, &mut found)?;

        let private_referrers = self
            .keyspace
            .types()
            .referrer_types(target.asset_type())
            .filter(|t| wanted(&t.tag));
        for referrer_type in private_referrers {
            let Some(collection) = referrer_type.collection() else {
                continue;
            };
            let entries = ledger
                .private_by_partial_composite_key(collection, REFERENCE_INDEX, &[target.key()])
                .map_err(|e| AssetError::storage("unable to query referrers", e))?;
            collect(entries, &wanted, &mut found)?;
        }

        debug!(target = %target, count = found.len(), "referrers resolved");
        Ok(found)
    }

    fn collection_of(&self, referrer: &Key) -> AssetResult<Option<&'a str>> {
        let definition = self
            .keyspace
            .types()
            .get(referrer.asset_type())
            .ok_or_else(|| {
                AssetError::Validation(format!(
                    "asset type '{}' is not registered",
                    referrer.asset_type()
                ))
            })?;
        Ok(definition.collection())
    }
}

fn entry_key(referrer: &Key, target: &Key) -> AssetResult<String> {
    if referrer.is_empty() || target.is_empty() {
        return Err(AssetError::Internal(format!(
            "empty key reached the reference index ({referrer} -> {target})"
        )));
    }
    create_composite_key(REFERENCE_INDEX, &[target.key(), referrer.asset_type(), referrer.key()])
        .map_err(|e| AssetError::Validation(e.to_string()))
}

fn collect(
    entries: StateIter<'_>,
    wanted: &impl Fn(&str) -> bool,
    found: &mut Vec<Key>,
) -> AssetResult<()> {
    let entries = IteratorGuard::new(entries)
        .drain()
        .map_err(|e| AssetError::storage("unable to query referrers", e))?;
    for entry in entries {
        let (_, attributes) = split_composite_key(&entry.key)
            .map_err(|e| AssetError::Internal(format!("malformed reference index entry: {e}")))?;
        let [_, referrer_type, referrer_key] = attributes.as_slice() else {
            return Err(AssetError::Internal(format!(
                "reference index entry has {} attributes, expected 3",
                attributes.len()
            )));
        };
        if wanted(referrer_type) {
            found.push(Key::new(referrer_type.clone(), referrer_key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::AssetStore;
    use cct_ledger::{InMemoryLedger, LedgerOp};
    use proptest::prelude::*;

    fn seeded(types: &AssetTypeRegistry) -> (InMemoryLedger, Key, Vec<Key>) {
        let ledger = fixtures::ledger();
        let person = fixtures::person(types);
        let book = fixtures::book(types, &person);
        let library = fixtures::library(types, &person);
        let vault = fixtures::vault(types, &person);
        let referrers = vec![book.key().clone(), library.key().clone(), vault.key().clone()];
        ledger
            .transaction("setup", fixtures::at(0), |l| {
                let store = AssetStore::new(l, types);
                store.put_new(person.clone())?;
                store.put_new(book)?;
                store.put_new(library)?;
                store.put_new(vault)?;
                Ok::<_, AssetError>(())
            })
            .unwrap();
        (ledger, person.key().clone(), referrers)
    }

    #[test]
    fn referrers_are_ordered_public_then_private() {
        let types = fixtures::registry();
        let (ledger, person, expected) = seeded(&types);
        let index = ReferenceIndex::new(&ledger, &types);
        assert_eq!(index.referrers(&person, &[]).unwrap(), expected);
        assert_eq!(index.referrers(&person, &[]).unwrap(), expected);
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn filter_restricts_by_type() {
        let types = fixtures::registry();
        let (ledger, person, expected) = seeded(&types);
        let index = ReferenceIndex::new(&ledger, &types);
        assert_eq!(index.referrers(&person, &["book"]).unwrap(), vec![expected[0].clone()]);
        assert_eq!(index.referrers(&person, &["library"]).unwrap(), vec![expected[1].clone()]);
        assert_eq!(
            index.referrers(&person, &["book", "library"]).unwrap(),
            expected[..2].to_vec()
        );
        assert!(index.referrers(&person, &["person"]).unwrap().is_empty());
    }

    #[test]
    fn private_collections_are_skipped_when_filtered_out() {
        let types = fixtures::registry();
        let (ledger, person, _) = seeded(&types);
        ledger.reset_op_counts();
        ReferenceIndex::new(&ledger, &types)
            .referrers(&person, &["book"])
            .unwrap();
        assert_eq!(ledger.op_count(LedgerOp::PrivateRangeQuery), 0);
    }

    #[test]
    fn private_referrer_entries_stay_out_of_world_state() {
        let types = fixtures::registry();
        let ledger = fixtures::ledger();
        let person = fixtures::person(&types);
        let vault = fixtures::vault(&types, &person);
        ledger
            .transaction("setup", fixtures::at(0), |l| {
                let store = AssetStore::new(l, &types);
                store.put_new(person.clone())?;
                store.put_new(vault.clone())
            })
            .unwrap();
        assert_eq!(ledger.committed_len(), 1);
        assert_eq!(
            ReferenceIndex::new(&ledger, &types).referrers(person.key(), &[]).unwrap(),
            vec![vault.key().clone()]
        );
    }

    #[test]
    fn no_referrers_is_empty_not_error() {
        let types = fixtures::registry();
        let ledger = fixtures::ledger();
        let lonely = Key::new("person", "person:nobody");
        assert!(ReferenceIndex::new(&ledger, &types)
            .referrers(&lonely, &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_targets_are_validation_errors() {
        let types = fixtures::registry();
        let ledger = fixtures::ledger();
        let index = ReferenceIndex::new(&ledger, &types);
        assert!(matches!(
            index.referrers(&Key::new("person", ""), &[]),
            Err(AssetError::Validation(_))
        ));
        assert!(matches!(
            index.referrers(&Key::new("ghost", "ghost:1"), &[]),
            Err(AssetError::Validation(_))
        ));
    }

    #[test]
    fn query_failure_is_storage_error() {
        let types = fixtures::registry();
        let (ledger, person, _) = seeded(&types);
        ledger.fail_on(LedgerOp::RangeQuery);
        let err = ReferenceIndex::new(&ledger, &types)
            .referrers(&person, &[])
            .unwrap_err();
        assert!(err.to_string().starts_with("unable to query referrers"));
    }

    #[test]
    fn sync_moves_entries_between_targets() {
        let types = fixtures::registry();
        let ledger = fixtures::ledger();
        let index = ReferenceIndex::new(&ledger, &types);
        let book = Key::new("book", "book:1");
        let ana = Key::new("person", "person:ana");
        let bia = Key::new("person", "person:bia");

        ledger
            .transaction("t1", fixtures::at(1), |_| {
                index.sync(&book, &BTreeSet::new(), &BTreeSet::from([ana.clone()]))
            })
            .unwrap();
        ledger
            .transaction("t2", fixtures::at(2), |_| {
                index.sync(&book, &BTreeSet::from([ana.clone()]), &BTreeSet::from([bia.clone()]))
            })
            .unwrap();

        assert!(index.referrers(&ana, &[]).unwrap().is_empty());
        assert_eq!(index.referrers(&bia, &[]).unwrap(), vec![book]);
    }

    proptest! {
        #[test]
        fn filtered_result_is_subset_of_full(mask in 0u8..8) {
            let names = ["book", "library", "vault"];
            let filter: Vec<&str> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| *n)
                .collect();

            let types = fixtures::registry();
            let (ledger, person, all) = seeded(&types);
            let index = ReferenceIndex::new(&ledger, &types);
            let filtered = index.referrers(&person, &filter).unwrap();

            let expected: Vec<Key> = all
                .into_iter()
                .filter(|k| filter.is_empty() || filter.contains(&k.asset_type()))
                .collect();
            prop_assert_eq!(filtered, expected);
        }
    }
}
