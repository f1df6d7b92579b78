//! Per-record aggregation state.
//!
//! Counters aggregate into a lock-free sum cell. Summaries and last values
//! need several fields to move together and sit behind a per-record mutex,
//! so contention is bounded by one instrument/label-set pair.

use std::sync::atomic::{AtomicU64, Ordering};

use meterline_api::{Descriptor, InstrumentKind, Number, NumberKind};
use parking_lot::Mutex;
use serde::Serialize;

/// Sum, count, minimum and maximum of the values recorded into a measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of all values
    pub sum: Number,
    /// Number of values
    pub count: u64,
    /// Smallest value
    pub min: Number,
    /// Largest value
    pub max: Number,
}

impl Summary {
    /// Summary of a single value
    pub fn new(value: Number) -> Self {
        Self {
            sum: value,
            count: 1,
            min: value,
            max: value,
        }
    }

    /// Fold in one more value
    pub fn update(&mut self, value: Number) {
        self.sum = self.sum.plus(value);
        self.count = self.count.saturating_add(1);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Fold in another summary
    pub fn merge(&mut self, other: &Summary) {
        self.sum = self.sum.plus(other.sum);
        self.count = self.count.saturating_add(other.count);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Finished aggregate of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Aggregation {
    /// Counter total
    Sum(Number),
    /// Measure distribution
    Summary(Summary),
    /// Most recent observer value
    LastValue(Number),
}

impl Aggregation {
    /// Combine `other` into `self`.
    ///
    /// Sums add, summaries merge, last values are replaced. Mismatched
    /// variants replace `self` with `other`.
    pub fn merge(&mut self, other: &Aggregation) {
        match (self, other) {
            (Aggregation::Sum(a), Aggregation::Sum(b)) => *a = a.plus(*b),
            (Aggregation::Summary(a), Aggregation::Summary(b)) => a.merge(b),
            (this, other) => *this = *other,
        }
    }

    /// Label for logs and exposition type lines
    pub fn as_label(&self) -> &'static str {
        match self {
            Aggregation::Sum(_) => "sum",
            Aggregation::Summary(_) => "summary",
            Aggregation::LastValue(_) => "last_value",
        }
    }
}

/// Sum stored as raw bits in an atomic word.
#[derive(Debug)]
pub(crate) struct AtomicSum {
    kind: NumberKind,
    bits: AtomicU64,
}

impl AtomicSum {
    pub(crate) fn new(kind: NumberKind) -> Self {
        Self {
            kind,
            bits: AtomicU64::new(Number::zero(kind).to_bits()),
        }
    }

    pub(crate) fn add(&self, value: Number) {
        match self.kind {
            // Two's complement addition on the raw word is i64 wrapping_add.
            NumberKind::I64 => {
                self.bits
                    .fetch_add(value.convert(NumberKind::I64).to_bits(), Ordering::AcqRel);
            }
            NumberKind::F64 => {
                let _ = self
                    .bits
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                        Some(Number::from_bits(NumberKind::F64, bits).plus(value).to_bits())
                    });
            }
        }
    }

    pub(crate) fn load(&self) -> Number {
        Number::from_bits(self.kind, self.bits.load(Ordering::Acquire))
    }
}

/// Mutable aggregation cell for one (instrument, label set) pair.
#[derive(Debug)]
pub(crate) enum AggregatorCell {
    Sum(AtomicSum),
    Summary(Mutex<Option<Summary>>),
    LastValue(Mutex<Option<Number>>),
}

impl AggregatorCell {
    pub(crate) fn for_descriptor(descriptor: &Descriptor) -> Self {
        match descriptor.kind() {
            InstrumentKind::Counter => AggregatorCell::Sum(AtomicSum::new(descriptor.number_kind())),
            InstrumentKind::Measure => AggregatorCell::Summary(Mutex::new(None)),
            InstrumentKind::Observer => AggregatorCell::LastValue(Mutex::new(None)),
        }
    }

    pub(crate) fn update(&self, value: Number) {
        match self {
            AggregatorCell::Sum(sum) => sum.add(value),
            AggregatorCell::Summary(summary) => {
                let mut summary = summary.lock();
                match summary.as_mut() {
                    Some(s) => s.update(value),
                    None => *summary = Some(Summary::new(value)),
                }
            }
            AggregatorCell::LastValue(last) => *last.lock() = Some(value),
        }
    }

    /// Finished aggregate, `None` if nothing was recorded.
    pub(crate) fn aggregation(&self) -> Option<Aggregation> {
        match self {
            AggregatorCell::Sum(sum) => Some(Aggregation::Sum(sum.load())),
            AggregatorCell::Summary(summary) => {
                let summary = *summary.lock();
                summary.map(Aggregation::Summary)
            }
            AggregatorCell::LastValue(last) => {
                let last = *last.lock();
                last.map(Aggregation::LastValue)
            }
        }
    }
}
