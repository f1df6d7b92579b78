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
//! SDK meter and meter provider.
//!
//! Instruments created here record straight into the provider's batcher.
//! Instruments are cached at provider scope by name, so every meter asking
//! for the same instrument shares its aggregation. A name keeps the kind it
//! was first created with; conflicting requests get no-op instruments.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use meterline_api::{
    Counter, Descriptor, InstrumentCore, InstrumentKind, LabelSet, Measure, Meter, MeterProvider,
    NumberKind, Numeric, Observer, ObserverCallback, ObserverResult,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::batcher::UngroupedBatcher;
use crate::config::PushConfig;
use crate::controller::{Collect, PushController};
use crate::error::SdkError;
use crate::export::{ExportError, ExportResult, Pushable};
use crate::snapshot::Snapshot;
use crate::stats::PipelineStats;

/// Instrument core that feeds the batcher.
struct SdkInstrument {
    descriptor: Arc<Descriptor>,
    batcher: Arc<UngroupedBatcher>,
    stats: PipelineStats,
}

impl<T: Numeric> InstrumentCore<T> for SdkInstrument {
    fn descriptor(&self) -> Option<&Descriptor> {
        Some(&*self.descriptor)
    }

    fn record(&self, value: T, labels: &LabelSet) {
        let value = value.into_number();
        if self.descriptor.is_non_negative() && value.is_negative() {
            self.stats.record_rejected(self.descriptor.kind());
            debug!(
                instrument = %self.descriptor.name(),
                kind = self.descriptor.kind().as_label(),
                value = %value,
                "Dropped negative value"
            );
            return;
        }

        self.batcher.accumulate(&self.descriptor, labels, value);
    }
}

/// Registered observer callback, type-erased over its number type.
trait ObserverRunner: Send + Sync {
    fn run(&self);
}

struct SdkObserver<T: Numeric> {
    name: String,
    result: ObserverResult<T>,
    callback: ObserverCallback<T>,
}

impl<T: Numeric> ObserverRunner for SdkObserver<T> {
    fn run(&self) {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.callback)(&self.result)));
        if outcome.is_err() {
            warn!(observer = %self.name, "Observer callback panicked; skipping it this collection");
        }
    }
}

/// State shared by the provider, its meters and the push controller.
pub(crate) struct SdkState {
    batcher: Arc<UngroupedBatcher>,
    stats: PipelineStats,
    instruments: DashMap<String, Arc<SdkInstrument>>,
    observers: RwLock<Vec<Arc<dyn ObserverRunner>>>,
}

impl SdkState {
    fn new(batcher: Arc<UngroupedBatcher>, stats: PipelineStats) -> Self {
        Self {
            batcher,
            stats,
            instruments: DashMap::new(),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Instrument registered under `name`, creating it on first use.
    ///
    /// Names are unique per provider. A request for an existing name with
    /// another instrument or number kind gets `None`.
    fn instrument(
        &self,
        name: &str,
        kind: InstrumentKind,
        number_kind: NumberKind,
        non_negative: bool,
    ) -> Option<Arc<SdkInstrument>> {
        let entry = self.instruments.entry(name.to_string()).or_insert_with(|| {
            Arc::new(SdkInstrument {
                descriptor: Arc::new(Descriptor::new(name, kind, number_kind, non_negative)),
                batcher: Arc::clone(&self.batcher),
                stats: self.stats.clone(),
            })
        });
        let instrument = Arc::clone(entry.value());
        drop(entry);

        let existing = &instrument.descriptor;
        if existing.kind() != kind || existing.number_kind() != number_kind {
            debug!(
                instrument = %name,
                registered = existing.kind().as_label(),
                registered_number = existing.number_kind().as_label(),
                requested = kind.as_label(),
                requested_number = number_kind.as_label(),
                "Instrument name already registered with another kind; returning a no-op"
            );
            return None;
        }

        if existing.is_non_negative() != non_negative {
            debug!(
                instrument = %name,
                "Instrument already exists with a different sign restriction; keeping the first definition"
            );
        }
        Some(instrument)
    }

    fn counter<T: Numeric>(&self, name: &str, monotonic: bool) -> Counter<T> {
        match self.instrument(name, InstrumentKind::Counter, T::KIND, monotonic) {
            Some(instrument) => Counter::<T>::new(instrument),
            None => Counter::noop(),
        }
    }

    fn measure<T: Numeric>(&self, name: &str, absolute: bool) -> Measure<T> {
        match self.instrument(name, InstrumentKind::Measure, T::KIND, absolute) {
            Some(instrument) => Measure::<T>::new(instrument),
            None => Measure::noop(),
        }
    }

    fn observer<T: Numeric>(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<T>,
    ) -> Observer<T> {
        let Some(instrument) = self.instrument(name, InstrumentKind::Observer, T::KIND, absolute)
        else {
            return Observer::noop();
        };
        let descriptor = Descriptor::clone(&instrument.descriptor);

        self.observers.write().push(Arc::new(SdkObserver {
            name: name.to_string(),
            result: ObserverResult::<T>::new(instrument),
            callback,
        }));

        Observer::new(descriptor)
    }

    fn run_observers(&self) {
        // Callbacks may create instruments, so they run outside the lock.
        let observers: Vec<_> = self.observers.read().iter().cloned().collect();
        for observer in observers {
            observer.run();
        }
    }
}

impl Collect for SdkState {
    fn collect(&self) -> Snapshot {
        self.run_observers();
        let snapshot = self.batcher.checkpoint();
        self.stats.record_checkpoint(snapshot.len());
        snapshot
    }
}

/// Meter handed out by [`MeterProviderSdk`].
pub struct MeterSdk {
    instrumentation_name: String,
    state: Arc<SdkState>,
}

impl MeterSdk {
    /// Instrumentation library this meter was created for
    pub fn instrumentation_name(&self) -> &str {
        &self.instrumentation_name
    }
}

impl std::fmt::Debug for MeterSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterSdk")
            .field("instrumentation_name", &self.instrumentation_name)
            .finish()
    }
}

impl Meter for MeterSdk {
    fn get_label_set(&self, labels: &[(&str, &str)]) -> LabelSet {
        LabelSet::new(labels.iter().copied())
    }

    fn create_i64_counter(&self, name: &str, monotonic: bool) -> Counter<i64> {
        self.state.counter(name, monotonic)
    }

    fn create_f64_counter(&self, name: &str, monotonic: bool) -> Counter<f64> {
        self.state.counter(name, monotonic)
    }

    fn create_i64_measure(&self, name: &str, absolute: bool) -> Measure<i64> {
        self.state.measure(name, absolute)
    }

    fn create_f64_measure(&self, name: &str, absolute: bool) -> Measure<f64> {
        self.state.measure(name, absolute)
    }

    fn create_i64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<i64>,
    ) -> Observer<i64> {
        self.state.observer(name, absolute, callback)
    }

    fn create_f64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<f64>,
    ) -> Observer<f64> {
        self.state.observer(name, absolute, callback)
    }
}

/// Builder for [`MeterProviderSdk`].
pub struct MeterProviderBuilder {
    batcher: Option<Arc<UngroupedBatcher>>,
    exporter: Option<Arc<dyn Pushable>>,
    push: PushConfig,
    stats: Option<PipelineStats>,
}

impl MeterProviderBuilder {
    /// Use an existing batcher instead of a fresh one
    pub fn with_batcher(mut self, batcher: Arc<UngroupedBatcher>) -> Self {
        self.batcher = Some(batcher);
        self
    }

    /// Push checkpoints to `exporter` on the configured interval
    pub fn with_exporter<E: Pushable + 'static>(mut self, exporter: Arc<E>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Push interval and shutdown behaviour
    pub fn with_push_config(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }

    /// Push interval in (fractional) seconds
    pub fn with_push_interval_secs(mut self, interval_secs: f64) -> Self {
        self.push.interval_secs = interval_secs;
        self
    }

    /// Share an existing stats registry
    pub fn with_stats(mut self, stats: PipelineStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Assemble the provider.
    ///
    /// With an exporter configured this spawns the push controller and must
    /// be called from within a tokio runtime.
    pub fn build(self) -> Result<MeterProviderSdk, SdkError> {
        let stats = match self.stats {
            Some(stats) => stats,
            None => PipelineStats::new()?,
        };
        let batcher = self.batcher.unwrap_or_default();
        let state = Arc::new(SdkState::new(batcher, stats.clone()));

        let controller = match self.exporter {
            Some(exporter) => {
                let source: Arc<dyn Collect> = Arc::clone(&state) as Arc<dyn Collect>;
                Some(PushController::start(source, exporter, &self.push, stats)?)
            }
            None => None,
        };

        Ok(MeterProviderSdk {
            state,
            meters: DashMap::new(),
            controller: tokio::sync::Mutex::new(controller),
        })
    }
}

/// Meter provider backed by an [`UngroupedBatcher`].
///
/// Without an exporter the provider is collected on demand through
/// [`MeterProviderSdk::collect`]; with one, a [`PushController`] collects
/// and exports on a timer until [`MeterProviderSdk::shutdown`].
pub struct MeterProviderSdk {
    state: Arc<SdkState>,
    meters: DashMap<String, Arc<MeterSdk>>,
    controller: tokio::sync::Mutex<Option<PushController>>,
}

impl MeterProviderSdk {
    /// Start building a provider
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder {
            batcher: None,
            exporter: None,
            push: PushConfig::default(),
            stats: None,
        }
    }

    /// Provider without a push exporter
    pub fn new() -> Result<Self, SdkError> {
        Self::builder().build()
    }

    /// Run observer callbacks and take a checkpoint
    pub fn collect(&self) -> Snapshot {
        self.state.collect()
    }

    /// The provider's batcher
    pub fn batcher(&self) -> &Arc<UngroupedBatcher> {
        &self.state.batcher
    }

    /// Pipeline self-telemetry
    pub fn stats(&self) -> &PipelineStats {
        &self.state.stats
    }

    /// Collect and export right away, outside the regular schedule.
    pub async fn flush(&self) -> ExportResult {
        match self.controller.lock().await.as_ref() {
            Some(controller) => controller.flush().await,
            None => Err(ExportError::Shutdown),
        }
    }

    /// Stop the push controller and wait for it to finish.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let controller = self.controller.lock().await.take();
        if let Some(controller) = controller {
            controller.shutdown().await;
            info!("Meter provider shut down");
        }
    }
}

impl std::fmt::Debug for MeterProviderSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterProviderSdk")
            .field("meters", &self.meters.len())
            .field("instruments", &self.state.instruments.len())
            .finish_non_exhaustive()
    }
}

impl MeterProvider for MeterProviderSdk {
    fn meter(&self, instrumentation_name: &str) -> Arc<dyn Meter> {
        let meter = self
            .meters
            .entry(instrumentation_name.to_string())
            .or_insert_with(|| {
                Arc::new(MeterSdk {
                    instrumentation_name: instrumentation_name.to_string(),
                    state: Arc::clone(&self.state),
                })
            });
        Arc::clone(meter.value()) as Arc<dyn Meter>
    }
}
