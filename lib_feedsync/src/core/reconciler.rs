//! # Batch Reconciler
//!
//! Merges a freshly fetched batch into an existing, ordered sequence of records.
//!
//! ## Rules:
//! - Identity is the only key. No two output records share an `id`.
//! - **Last write wins**: an incoming record replaces an existing one with the same
//!   `id`, including duplicates inside the batch itself (the later copy wins).
//! - **Stable positions**: a replaced record keeps the position of the first
//!   occurrence of its `id`; ids never seen before are appended in batch order.
//!   Nothing is re-sorted by timestamp.
//!
//! The work is a single pass over `existing` then `incoming` through an
//! insertion-ordered map, so it is linear in the combined length. It is pure and
//! synchronous; records without identity cannot reach it because `Record` always
//! carries one (see `records_from_batch`).

use indexmap::IndexMap;

use crate::model::{Record, RecordId};

/// What a merge did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records in the incoming batch.
    pub received: usize,
    /// Ids that were not present before.
    pub added: usize,
    /// Incoming records that replaced an entry with the same id.
    pub updated: usize,
}

/// Merges `incoming` into `existing` and returns the materialized sequence.
pub fn merge(
    existing: impl IntoIterator<Item = Record>,
    incoming: impl IntoIterator<Item = Record>,
) -> Vec<Record> {
    let mut index: IndexMap<RecordId, Record> = IndexMap::new();
    merge_into(&mut index, existing);
    merge_into(&mut index, incoming);
    index.into_values().collect()
}

/// In-place form of [`merge`] over an id-keyed, insertion-ordered map.
pub fn merge_into(
    index: &mut IndexMap<RecordId, Record>,
    incoming: impl IntoIterator<Item = Record>,
) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for record in incoming {
        summary.received += 1;
        // `insert` on an existing key swaps the value and keeps the slot.
        match index.insert(record.id.clone(), record) {
            Some(_) => summary.updated += 1,
            None => summary.added += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn rec(id: i64, content: &str) -> Record {
        Record::new(id, content, "ada")
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn duplicate_updates_in_place_and_new_ids_append() {
        let merged = merge(vec![rec(1, "a")], vec![rec(2, "b"), rec(1, "a2")]);
        assert_eq!(merged, vec![rec(1, "a2"), rec(2, "b")]);
    }

    #[test]
    fn later_duplicate_within_batch_wins_at_first_position() {
        let merged = merge(Vec::new(), vec![rec(5, "x"), rec(6, "y"), rec(5, "x2")]);
        assert_eq!(merged, vec![rec(5, "x2"), rec(6, "y")]);
    }

    #[test]
    fn empty_batch_leaves_sequence_untouched() {
        let existing = vec![rec(3, "c"), rec(1, "a")];
        assert_eq!(merge(existing.clone(), Vec::new()), existing);
    }

    #[test]
    fn summary_counts_added_and_updated() {
        let mut index = IndexMap::new();
        merge_into(&mut index, vec![rec(1, "a"), rec(2, "b")]);
        let summary = merge_into(&mut index, vec![rec(2, "b2"), rec(3, "c")]);
        assert_eq!(summary, MergeSummary { received: 2, added: 1, updated: 1 });
    }

    fn unique_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
        prop::collection::btree_map(0_i64..60, "[a-z]{1,6}", 0..max)
            .prop_map(|m| m.into_iter().map(|(id, c)| rec(id, &c)).collect())
    }

    proptest! {
        #[test]
        fn property_merge_is_the_union_of_ids_without_duplicates(
            existing in unique_records(20),
            incoming in prop::collection::vec((0_i64..60, "[a-z]{1,6}"), 0..30),
        ) {
            let incoming: Vec<Record> = incoming.iter().map(|(id, c)| rec(*id, c)).collect();
            let merged = merge(existing.clone(), incoming.clone());

            let expected: BTreeSet<String> = ids(&existing).into_iter().chain(ids(&incoming)).collect();
            let got: Vec<String> = ids(&merged);
            let got_set: BTreeSet<String> = got.iter().cloned().collect();
            prop_assert_eq!(got.len(), got_set.len());
            prop_assert_eq!(got_set, expected);
        }

        #[test]
        fn property_refetch_of_known_ids_is_last_write_wins_without_reordering(
            existing in unique_records(20),
            suffix in "[0-9]{1,3}",
        ) {
            // Same ids, different content, reversed order.
            let incoming: Vec<Record> = existing
                .iter()
                .rev()
                .map(|r| Record::new(r.id.clone(), format!("{}-{suffix}", r.content), r.author.clone()))
                .collect();
            let merged = merge(existing.clone(), incoming.clone());

            prop_assert_eq!(ids(&merged), ids(&existing));
            for record in &merged {
                let winner = incoming.iter().find(|r| r.id == record.id).unwrap();
                prop_assert_eq!(&record.content, &winner.content);
            }
        }

        #[test]
        fn property_new_ids_are_appended_in_batch_order(
            existing in unique_records(10),
            fresh in prop::collection::btree_set(100_i64..200, 0..10),
        ) {
            let incoming: Vec<Record> = fresh.iter().map(|id| rec(*id, "new")).collect();
            let merged = merge(existing.clone(), incoming.clone());
            let expected: Vec<String> = ids(&existing).into_iter().chain(ids(&incoming)).collect();
            prop_assert_eq!(ids(&merged), expected);
        }
    }
}
