//! Process-wide meter provider.
//!
//! Libraries fetch meters from here without knowing whether the
//! application ever installs a backend.

use std::sync::{Arc, LazyLock};

use crate::meter::{Meter, MeterProvider};
use crate::proxy::ProxyMeterProvider;

static GLOBAL_PROVIDER: LazyLock<ProxyMeterProvider> = LazyLock::new(ProxyMeterProvider::new);

/// The global proxy provider
pub fn meter_provider() -> &'static ProxyMeterProvider {
    &GLOBAL_PROVIDER
}

/// Meter from the global provider
pub fn meter(instrumentation_name: &str) -> Arc<dyn Meter> {
    GLOBAL_PROVIDER.meter(instrumentation_name)
}

/// Install the real provider behind the global proxy. Only the first call
/// has an effect.
pub fn set_meter_provider(provider: Arc<dyn MeterProvider>) -> bool {
    GLOBAL_PROVIDER.attach_real_provider(provider)
}
