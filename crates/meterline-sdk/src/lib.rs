//! meterline SDK
//!
//! Aggregation and export pipeline behind the `meterline-api` instruments.
//!
//! # Features
//!
//! - **Ungrouped batching**: one record per instrument and label set, reset
//!   on every checkpoint
//! - **Push scheduling**: a tokio task collects and exports on a fixed
//!   interval
//! - **Pipeline stats**: export outcomes and dropped recordings tracked in a
//!   Prometheus registry
//! - **Configuration**: TOML/JSON files with `METERLINE_*` environment
//!   overrides
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meterline_api::{global, MeterProvider};
//! use meterline_observability::{init_tracing, LogFormat};
//! use meterline_sdk::{LoggingExporter, MeterProviderSdk};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing(LogFormat::Compact, Some("info"))?;
//!
//!     let provider = Arc::new(
//!         MeterProviderSdk::builder()
//!             .with_exporter(Arc::new(LoggingExporter::new()))
//!             .with_push_interval_secs(10.0)
//!             .build()?,
//!     );
//!     global::set_meter_provider(Arc::clone(&provider) as Arc<dyn MeterProvider>);
//!
//!     let meter = global::meter("checkout");
//!     let orders = meter.create_i64_counter("orders", true);
//!     orders.add(1, &meter.get_label_set(&[("region", "eu")]));
//!
//!     provider.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod batcher;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod meter;
pub mod snapshot;
pub mod stats;

pub use aggregator::{Aggregation, Summary};
pub use batcher::UngroupedBatcher;
pub use config::{ConfigFormat, PrometheusConfig, PushConfig, SdkConfig, HEALTH_PATH};
pub use controller::{Collect, PushController};
pub use error::{ConfigError, ConfigResult, SdkError};
pub use export::{
    ExportError, ExportResult, Exposition, InMemoryExporter, LoggingExporter, Pushable, Servable,
};
pub use meter::{MeterProviderBuilder, MeterProviderSdk, MeterSdk};
pub use snapshot::{Record, Snapshot};
pub use stats::PipelineStats;
