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
//! Deferred binding.
//!
//! Application code can grab a meter and create instruments before any
//! backend exists. Until a real meter is attached every factory call hands
//! out a no-op. Attaching happens at most once; the first caller wins and
//! later attempts are ignored.
//!
//! Factory methods read the binding when they run and the returned handle
//! keeps whatever they got, so instruments created while unbound are never
//! rebound after the fact.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::instrument::{Counter, Measure, Observer, ObserverCallback};
use crate::labels::LabelSet;
use crate::meter::{Meter, MeterProvider};

/// State of a [`ProxyMeter`] at a point in time.
#[derive(Clone)]
pub enum MeterBinding {
    /// No backend attached yet; instruments are no-ops
    Unbound,
    /// Backend attached
    Bound(Arc<dyn Meter>),
}

impl MeterBinding {
    /// Whether a backend is attached
    pub fn is_bound(&self) -> bool {
        matches!(self, MeterBinding::Bound(_))
    }
}

impl std::fmt::Debug for MeterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeterBinding::Unbound => f.write_str("Unbound"),
            MeterBinding::Bound(_) => f.write_str("Bound"),
        }
    }
}

/// Meter that acts as a no-op until a real meter is attached.
#[derive(Default)]
pub struct ProxyMeter {
    real: OnceLock<Arc<dyn Meter>>,
}

impl ProxyMeter {
    /// Create an unbound proxy
    pub fn new() -> Self {
        Self::default()
    }

    /// Current binding
    pub fn binding(&self) -> MeterBinding {
        match self.real.get() {
            Some(real) => MeterBinding::Bound(Arc::clone(real)),
            None => MeterBinding::Unbound,
        }
    }

    /// Attach the real meter.
    ///
    /// Returns `true` if this call performed the binding, `false` if the
    /// proxy was already bound (the argument is then dropped).
    pub fn attach_real_meter(&self, real: Arc<dyn Meter>) -> bool {
        match self.real.set(real) {
            Ok(()) => {
                debug!("Proxy meter bound to real meter");
                true
            }
            Err(_) => {
                debug!("Proxy meter already bound, ignoring attach");
                false
            }
        }
    }
}

impl std::fmt::Debug for ProxyMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyMeter")
            .field("binding", &self.binding())
            .finish()
    }
}

impl Meter for ProxyMeter {
    fn get_label_set(&self, labels: &[(&str, &str)]) -> LabelSet {
        match self.binding() {
            MeterBinding::Bound(real) => real.get_label_set(labels),
            MeterBinding::Unbound => LabelSet::empty(),
        }
    }

    fn create_i64_counter(&self, name: &str, monotonic: bool) -> Counter<i64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_i64_counter(name, monotonic),
            MeterBinding::Unbound => Counter::noop(),
        }
    }

    fn create_f64_counter(&self, name: &str, monotonic: bool) -> Counter<f64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_f64_counter(name, monotonic),
            MeterBinding::Unbound => Counter::noop(),
        }
    }

    fn create_i64_measure(&self, name: &str, absolute: bool) -> Measure<i64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_i64_measure(name, absolute),
            MeterBinding::Unbound => Measure::noop(),
        }
    }

    fn create_f64_measure(&self, name: &str, absolute: bool) -> Measure<f64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_f64_measure(name, absolute),
            MeterBinding::Unbound => Measure::noop(),
        }
    }

    fn create_i64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<i64>,
    ) -> Observer<i64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_i64_observer(name, absolute, callback),
            MeterBinding::Unbound => Observer::noop(),
        }
    }

    fn create_f64_observer(
        &self,
        name: &str,
        absolute: bool,
        callback: ObserverCallback<f64>,
    ) -> Observer<f64> {
        match self.binding() {
            MeterBinding::Bound(real) => real.create_f64_observer(name, absolute, callback),
            MeterBinding::Unbound => Observer::noop(),
        }
    }
}

/// Provider that hands out [`ProxyMeter`]s until a real provider is attached.
///
/// Meters obtained before binding are bound in place when the real
/// provider arrives, so instruments created from them afterwards are live.
#[derive(Default)]
pub struct ProxyMeterProvider {
    real: OnceLock<Arc<dyn MeterProvider>>,
    pending: Mutex<HashMap<String, Arc<ProxyMeter>>>,
}

impl ProxyMeterProvider {
    /// Create an unbound provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a real provider is attached
    pub fn is_bound(&self) -> bool {
        self.real.get().is_some()
    }

    /// Attach the real provider. Only the first call has an effect.
    pub fn attach_real_provider(&self, real: Arc<dyn MeterProvider>) -> bool {
        if self.real.set(real).is_err() {
            debug!("Proxy meter provider already bound, ignoring attach");
            return false;
        }

        let Some(real) = self.real.get() else {
            return false;
        };

        let pending = self.pending.lock();
        for (name, proxy) in pending.iter() {
            proxy.attach_real_meter(real.meter(name));
        }
        debug!(meters = pending.len(), "Proxy meter provider bound");
        true
    }
}

impl std::fmt::Debug for ProxyMeterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyMeterProvider")
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl MeterProvider for ProxyMeterProvider {
    fn meter(&self, instrumentation_name: &str) -> Arc<dyn Meter> {
        let mut pending = self.pending.lock();

        // Checked under the lock so a concurrent attach cannot miss a new proxy.
        if let Some(real) = self.real.get() {
            return real.meter(instrumentation_name);
        }

        let proxy = pending
            .entry(instrumentation_name.to_string())
            .or_insert_with(|| Arc::new(ProxyMeter::new()));
        Arc::clone(proxy) as Arc<dyn Meter>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop::NoopMeter;

    #[test]
    fn test_unbound_proxy_is_noop() {
        let proxy = ProxyMeter::new();
        assert!(!proxy.binding().is_bound());

        let counter = proxy.create_i64_counter("requests", true);
        assert!(counter.is_noop());
        assert!(proxy.get_label_set(&[("k", "v")]).is_empty());
    }

    #[test]
    fn test_first_attach_wins() {
        let proxy = ProxyMeter::new();
        assert!(proxy.attach_real_meter(Arc::new(NoopMeter)));
        assert!(!proxy.attach_real_meter(Arc::new(NoopMeter)));
        assert!(proxy.binding().is_bound());
    }

    #[test]
    fn test_provider_returns_same_proxy_while_unbound() {
        let provider = ProxyMeterProvider::new();
        let a = provider.meter("lib");
        let b = provider.meter("lib");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!provider.is_bound());
    }
}
