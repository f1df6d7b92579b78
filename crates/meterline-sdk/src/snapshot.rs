//! Checkpoint snapshots handed to exporters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use meterline_api::{Descriptor, LabelSet};
use serde::Serialize;

use crate::aggregator::Aggregation;

/// Aggregate of one (instrument, label set) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Instrument the values were recorded against
    pub descriptor: Arc<Descriptor>,
    /// Label set the values were recorded under
    pub labels: LabelSet,
    /// Aggregated value
    pub aggregation: Aggregation,
}

/// Read-only result of one checkpoint.
///
/// Records are ordered by instrument, then by label set. The snapshot is
/// moved into its consumer; nothing else keeps a reference to it.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    collected_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl Snapshot {
    /// Build a snapshot from already-ordered records
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            collected_at: Utc::now(),
            records,
        }
    }

    /// Snapshot with no records
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// When the checkpoint was taken
    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Records in canonical order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the period saw no recordings
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the record for `name` and `labels`
    pub fn find(&self, name: &str, labels: &LabelSet) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.descriptor.name() == name && &r.labels == labels)
    }
}

impl IntoIterator for Snapshot {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
