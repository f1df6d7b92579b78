//! Meter and meter provider interfaces.

use std::sync::Arc;

use crate::instrument::{Counter, Measure, Observer, ObserverCallback};
use crate::labels::LabelSet;

/// Factory for label sets and instruments.
///
/// Instruments are meant to be long-lived: create them once and keep the
/// handles. Creating an instrument twice under the same name hands back an
/// instrument backed by the same aggregation state.
pub trait Meter: Send + Sync {
    /// Build a canonical label set from raw pairs
    fn get_label_set(&self, labels: &[(&str, &str)]) -> LabelSet;

    /// Integer counter. A monotonic counter drops negative deltas.
    fn create_i64_counter(&self, name: &str, monotonic: bool) -> Counter<i64>;

    /// Float counter. A monotonic counter drops negative deltas.
    fn create_f64_counter(&self, name: &str, monotonic: bool) -> Counter<f64>;

    /// Integer measure. An absolute measure drops negative values.
    fn create_i64_measure(&self, name: &str, absolute: bool) -> Measure<i64>;

    /// Float measure. An absolute measure drops negative values.
    fn create_f64_measure(&self, name: &str, absolute: bool) -> Measure<f64>;

    /// Integer observer polled once per collection
    fn create_i64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<i64>,
    ) -> Observer<i64>;

    /// Float observer polled once per collection
    fn create_f64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<f64>,
    ) -> Observer<f64>;
}

/// Hands out meters by instrumentation name.
pub trait MeterProvider: Send + Sync {
    /// Meter for the given instrumentation library
    fn meter(&self, instrumentation_name: &str) -> Arc<dyn Meter>;
}
