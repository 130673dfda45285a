//! # Record Store
//!
//! The locally materialized feed: records keyed by identity, kept in display
//! order. Two ways in, with different ordering rules:
//! - `merge_batch` (synchronization): existing entries keep their slot, new ids
//!   are appended in arrival order.
//! - `prepend` (a record the user just created): goes to the front.
//!
//! The store never re-sorts by timestamp; order is an artifact of arrival.

use indexmap::IndexMap;

use crate::core::reconciler::{self, MergeSummary};
use crate::model::{Record, RecordId};

/// Ordered, deduplicated collection of feed records.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    entries: IndexMap<RecordId, Record>,
}

impl RecordStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a batch with last-write-wins semantics. See [`reconciler`].
    pub fn merge_batch(&mut self, batch: Vec<Record>) -> MergeSummary {
        reconciler::merge_into(&mut self.entries, batch)
    }

    /// Inserts a freshly created record at the front.
    ///
    /// A created record should be new; if its id is already present the old entry
    /// is replaced and moved to the front so ids stay unique. Returns the replaced
    /// record in that case.
    pub fn prepend(&mut self, record: Record) -> Option<Record> {
        self.entries.shift_insert(0, record.id.clone(), record)
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.entries.get(id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.values()
    }

    /// Copies the display-ordered sequence.
    pub fn to_vec(&self) -> Vec<Record> {
        self.entries.values().cloned().collect()
    }
}
