//! Numeric values recorded by instruments.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric kind an instrument is typed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    /// Signed 64-bit integer
    I64,
    /// 64-bit float
    F64,
}

impl NumberKind {
    /// Get string label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            NumberKind::I64 => "i64",
            NumberKind::F64 => "f64",
        }
    }
}

/// A single recorded value.
///
/// Integer arithmetic wraps instead of panicking; recording must never
/// bring down the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer value
    I64(i64),
    /// Floating point value
    F64(f64),
}

impl Number {
    /// Zero of the given kind
    pub fn zero(kind: NumberKind) -> Self {
        match kind {
            NumberKind::I64 => Number::I64(0),
            NumberKind::F64 => Number::F64(0.0),
        }
    }

    /// Kind of this value
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::I64(_) => NumberKind::I64,
            Number::F64(_) => NumberKind::F64,
        }
    }

    /// Lossy conversion to `f64`
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::I64(v) => v as f64,
            Number::F64(v) => v,
        }
    }

    /// Strictly below zero. `NaN` and `-0.0` are not negative.
    pub fn is_negative(&self) -> bool {
        match *self {
            Number::I64(v) => v < 0,
            Number::F64(v) => v < 0.0,
        }
    }

    /// Convert to `kind`, truncating floats when going to integers.
    pub fn convert(self, kind: NumberKind) -> Self {
        match (self, kind) {
            (Number::I64(v), NumberKind::F64) => Number::F64(v as f64),
            (Number::F64(v), NumberKind::I64) => Number::I64(v as i64),
            (n, _) => n,
        }
    }

    /// Sum in the kind of `self`.
    pub fn plus(self, other: Number) -> Self {
        match (self, other.convert(self.kind())) {
            (Number::I64(a), Number::I64(b)) => Number::I64(a.wrapping_add(b)),
            (Number::F64(a), Number::F64(b)) => Number::F64(a + b),
            (a, _) => a,
        }
    }

    /// Smaller of the two, in the kind of `self`.
    pub fn min(self, other: Number) -> Self {
        let other = other.convert(self.kind());
        match self.partial_cmp(&other) {
            Some(Ordering::Greater) => other,
            _ => self,
        }
    }

    /// Larger of the two, in the kind of `self`.
    pub fn max(self, other: Number) -> Self {
        let other = other.convert(self.kind());
        match self.partial_cmp(&other) {
            Some(Ordering::Less) => other,
            _ => self,
        }
    }

    /// Raw bits for storage in an atomic cell.
    pub fn to_bits(&self) -> u64 {
        match *self {
            Number::I64(v) => v as u64,
            Number::F64(v) => v.to_bits(),
        }
    }

    /// Inverse of [`Number::to_bits`].
    pub fn from_bits(kind: NumberKind, bits: u64) -> Self {
        match kind {
            NumberKind::I64 => Number::I64(bits as i64),
            NumberKind::F64 => Number::F64(f64::from_bits(bits)),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::I64(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::F64(value)
    }
}

/// Exposition-friendly rendering: integers as integers, floats in their
/// shortest round-trip form, non-finite values as `NaN`, `+Inf`, `-Inf`.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::I64(v) => write!(f, "{}", v),
            Number::F64(v) if v.is_nan() => f.write_str("NaN"),
            Number::F64(v) if v == f64::INFINITY => f.write_str("+Inf"),
            Number::F64(v) if v == f64::NEG_INFINITY => f.write_str("-Inf"),
            Number::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types an instrument can be typed over.
pub trait Numeric: Copy + Send + Sync + fmt::Debug + 'static {
    /// Kind recorded for this type
    const KIND: NumberKind;

    /// Wrap into a [`Number`]
    fn into_number(self) -> Number;
}

impl Numeric for i64 {
    const KIND: NumberKind = NumberKind::I64;

    fn into_number(self) -> Number {
        Number::I64(self)
    }
}

impl Numeric for f64 {
    const KIND: NumberKind = NumberKind::F64;

    fn into_number(self) -> Number {
        Number::F64(self)
    }
}
