// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Ungrouped batcher.
//!
//! Keeps one aggregation record per distinct (instrument, label set) pair
//! for the current period. Label sets are never merged, even when they share
//! keys.
//!
//! Records live in a sharded map of `Arc` cells, so a new key only locks
//! one shard and a map resize never moves a cell another thread is
//! updating. The active period sits behind an `RwLock`: accumulators hold
//! it shared for the duration of one update, and `checkpoint` takes it
//! exclusively only long enough to swap in an empty period. Every
//! accumulate therefore lands in exactly one period.

use std::sync::Arc;

use dashmap::DashMap;
use meterline_api::{Descriptor, LabelSet, Number};
use parking_lot::RwLock;
use tracing::trace;

use crate::aggregator::AggregatorCell;
use crate::snapshot::{Record, Snapshot};

type RecordKey = (Arc<Descriptor>, LabelSet);

#[derive(Default)]
struct Period {
    records: DashMap<RecordKey, Arc<AggregatorCell>>,
}

/// Processor aggregating recordings per instrument and label set.
#[derive(Default)]
pub struct UngroupedBatcher {
    active: RwLock<Period>,
}

impl UngroupedBatcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `value` into the record for `descriptor` and `labels`.
    pub fn accumulate(&self, descriptor: &Arc<Descriptor>, labels: &LabelSet, value: Number) {
        let period = self.active.read();
        let key = (Arc::clone(descriptor), labels.clone());

        let existing = period.records.get(&key).map(|cell| Arc::clone(cell.value()));
        let cell = match existing {
            Some(cell) => cell,
            None => Arc::clone(
                period
                    .records
                    .entry(key)
                    .or_insert_with(|| Arc::new(AggregatorCell::for_descriptor(descriptor)))
                    .value(),
            ),
        };

        cell.update(value);
    }

    /// Take every record of the current period and start an empty one.
    pub fn checkpoint(&self) -> Snapshot {
        let finished = std::mem::take(&mut *self.active.write());

        let mut records: Vec<Record> = finished
            .records
            .into_iter()
            .filter_map(|((descriptor, labels), cell)| {
                cell.aggregation().map(|aggregation| Record {
                    descriptor,
                    labels,
                    aggregation,
                })
            })
            .collect();

        records.sort_by(|a, b| {
            a.descriptor
                .cmp(&b.descriptor)
                .then_with(|| a.labels.cmp(&b.labels))
        });

        trace!(records = records.len(), "Checkpoint taken");
        Snapshot::new(records)
    }

    /// Number of live records in the current period
    pub fn len(&self) -> usize {
        self.active.read().records.len()
    }

    /// Whether the current period has no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UngroupedBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UngroupedBatcher")
            .field("records", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Aggregation, Summary};
    use meterline_api::{InstrumentKind, NumberKind};

    fn counter(name: &str) -> Arc<Descriptor> {
        Arc::new(Descriptor::new(name, InstrumentKind::Counter, NumberKind::I64, true))
    }

    fn measure(name: &str) -> Arc<Descriptor> {
        Arc::new(Descriptor::new(name, InstrumentKind::Measure, NumberKind::I64, true))
    }

    #[test]
    fn test_label_sets_are_not_merged() {
        let batcher = UngroupedBatcher::new();
        let c = counter("testCounter");
        let labels1 = LabelSet::new([("dim1", "value1"), ("dim2", "value1")]);
        let labels2 = LabelSet::new([("dim1", "value2"), ("dim2", "value2")]);

        for _ in 0..10 {
            batcher.accumulate(&c, &labels1, Number::I64(100));
            batcher.accumulate(&c, &labels1, Number::I64(10));
            batcher.accumulate(&c, &labels2, Number::I64(200));
            batcher.accumulate(&c, &labels2, Number::I64(10));
        }

        let snapshot = batcher.checkpoint();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.find("testCounter", &labels1).map(|r| r.aggregation),
            Some(Aggregation::Sum(Number::I64(1100)))
        );
        assert_eq!(
            snapshot.find("testCounter", &labels2).map(|r| r.aggregation),
            Some(Aggregation::Sum(Number::I64(2100)))
        );
    }

    #[test]
    fn test_checkpoint_resets() {
        let batcher = UngroupedBatcher::new();
        let m = measure("latency");
        batcher.accumulate(&m, &LabelSet::empty(), Number::I64(5));

        assert_eq!(batcher.len(), 1);
        assert_eq!(batcher.checkpoint().len(), 1);
        assert!(batcher.is_empty());
        assert!(batcher.checkpoint().is_empty());
    }

    #[test]
    fn test_snapshot_isolation() {
        let batcher = UngroupedBatcher::new();
        let m = measure("latency");
        let labels = LabelSet::new([("dim1", "value1")]);

        batcher.accumulate(&m, &labels, Number::I64(10));
        let first = batcher.checkpoint();
        batcher.accumulate(&m, &labels, Number::I64(20));

        assert_eq!(
            first.find("latency", &labels).map(|r| r.aggregation),
            Some(Aggregation::Summary(Summary::new(Number::I64(10))))
        );

        let second = batcher.checkpoint();
        assert_eq!(
            second.find("latency", &labels).map(|r| r.aggregation),
            Some(Aggregation::Summary(Summary::new(Number::I64(20))))
        );
    }

    #[test]
    fn test_records_are_ordered() {
        let batcher = UngroupedBatcher::new();
        let b = counter("b");
        let a = counter("a");
        batcher.accumulate(&b, &LabelSet::new([("k", "2")]), Number::I64(1));
        batcher.accumulate(&b, &LabelSet::new([("k", "1")]), Number::I64(1));
        batcher.accumulate(&a, &LabelSet::empty(), Number::I64(1));

        let snapshot = batcher.checkpoint();
        let order: Vec<String> = snapshot
            .records()
            .iter()
            .map(|r| format!("{}{}", r.descriptor.name(), r.labels))
            .collect();
        assert_eq!(order, vec!["a{}", "b{k=1}", "b{k=2}"]);
    }
}
