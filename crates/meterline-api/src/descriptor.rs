//! Instrument identity.

use serde::{Deserialize, Serialize};

use crate::number::NumberKind;

/// Kind of instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Cumulative sum of deltas
    Counter,
    /// Distribution of individually recorded values
    Measure,
    /// Callback-driven value polled at collection time
    Observer,
}

impl InstrumentKind {
    /// Get string label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Measure => "measure",
            InstrumentKind::Observer => "observer",
        }
    }
}

/// Identity of one instrument: name, kind, numeric kind and the
/// non-negative restriction flag.
///
/// For counters the flag means *monotonic*, for measures and observers it
/// means *absolute*. Either way a restricted instrument drops negative
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Descriptor {
    name: String,
    kind: InstrumentKind,
    number_kind: NumberKind,
    non_negative: bool,
}

impl Descriptor {
    /// Create a descriptor
    pub fn new(
        name: impl Into<String>,
        kind: InstrumentKind,
        number_kind: NumberKind,
        non_negative: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            number_kind,
            non_negative,
        }
    }

    /// Instrument name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instrument kind
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// Numeric kind
    pub fn number_kind(&self) -> NumberKind {
        self.number_kind
    }

    /// Whether negative values are rejected
    pub fn is_non_negative(&self) -> bool {
        self.non_negative
    }

    /// Monotonic counter
    pub fn is_monotonic(&self) -> bool {
        self.kind == InstrumentKind::Counter && self.non_negative
    }

    /// Absolute measure or observer
    pub fn is_absolute(&self) -> bool {
        self.kind != InstrumentKind::Counter && self.non_negative
    }
}
