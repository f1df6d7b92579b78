//! meterline API
//!
//! Instruments, label sets and the deferred-binding meter that let
//! application code record measurements before a backend is attached.
//!
//! # Example
//!
//! ```
//! use meterline_api::{Meter, ProxyMeter};
//!
//! let meter = ProxyMeter::new();
//! let requests = meter.create_i64_counter("requests", true);
//! let labels = meter.get_label_set(&[("route", "/")]);
//!
//! // Nothing is attached yet, so this is silently dropped.
//! requests.add(1, &labels);
//! assert!(requests.is_noop());
//! ```

pub mod descriptor;
pub mod global;
pub mod instrument;
pub mod labels;
pub mod meter;
pub mod noop;
pub mod number;
pub mod proxy;

pub use descriptor::{Descriptor, InstrumentKind};
pub use instrument::{
    BoundCounter, BoundMeasure, Counter, InstrumentCore, Measure, Observer, ObserverCallback,
    ObserverResult,
};
pub use labels::LabelSet;
pub use meter::{Meter, MeterProvider};
pub use noop::{NoopInstrument, NoopMeter, NoopMeterProvider};
pub use number::{Number, NumberKind, Numeric};
pub use proxy::{MeterBinding, ProxyMeter, ProxyMeterProvider};
