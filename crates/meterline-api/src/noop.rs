//! Implementations that discard everything.

use std::sync::Arc;

use crate::descriptor::Descriptor;
use crate::instrument::{Counter, InstrumentCore, Measure, Observer, ObserverCallback};
use crate::labels::LabelSet;
use crate::meter::{Meter, MeterProvider};
use crate::number::Numeric;

/// Instrument core that drops every recording.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstrument;

impl<T: Numeric> InstrumentCore<T> for NoopInstrument {
    fn descriptor(&self) -> Option<&Descriptor> {
        None
    }

    fn record(&self, _value: T, _labels: &LabelSet) {}
}

/// Meter whose instruments are all no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMeter;

impl Meter for NoopMeter {
    fn get_label_set(&self, _labels: &[(&str, &str)]) -> LabelSet {
        LabelSet::empty()
    }

    fn create_i64_counter(&self, _name: &str, _monotonic: bool) -> Counter<i64> {
        Counter::noop()
    }

    fn create_f64_counter(&self, _name: &str, _monotonic: bool) -> Counter<f64> {
        Counter::noop()
    }

    fn create_i64_measure(&self, _name: &str, _absolute: bool) -> Measure<i64> {
        Measure::noop()
    }

    fn create_f64_measure(&self, _name: &str, _absolute: bool) -> Measure<f64> {
        Measure::noop()
    }

    fn create_i64_observer(
        &self,
        _name: &str,
        _absolute: bool,
        _callback: ObserverCallback<i64>,
    ) -> Observer<i64> {
        Observer::noop()
    }

    fn create_f64_observer(
        &self,
        _name: &str,
        _absolute: bool,
        _callback: ObserverCallback<f64>,
    ) -> Observer<f64> {
        Observer::noop()
    }
}

/// Provider handing out [`NoopMeter`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMeterProvider;

impl MeterProvider for NoopMeterProvider {
    fn meter(&self, _instrumentation_name: &str) -> Arc<dyn Meter> {
        Arc::new(NoopMeter)
    }
}
