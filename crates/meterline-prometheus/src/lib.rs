//! meterline Prometheus exporter
//!
//! Pull-side exposition for the meterline pipeline.
//!
//! # Features
//!
//! - **Retained state**: every pushed checkpoint is merged, so scrapes see
//!   cumulative counters and summaries
//! - **Text exposition**: `# TYPE` lines, escaped labels, min/max as
//!   quantiles `0` and `1`
//! - **HTTP Endpoint**: Axum-based scrape route plus `/health`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use meterline_prometheus::{MetricsServer, PrometheusExporter};
//! use meterline_sdk::MeterProviderSdk;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let exporter = Arc::new(PrometheusExporter::new());
//!     let provider = MeterProviderSdk::builder()
//!         .with_exporter(Arc::clone(&exporter))
//!         .with_push_interval_secs(5.0)
//!         .build()?;
//!
//!     let server = MetricsServer::new(exporter, 9184);
//!     tokio::spawn(async move { server.serve().await });
//!
//!     // Record through provider.meter(..) as usual.
//!     Ok(())
//! }
//! ```

pub mod exporter;
pub mod renderer;
pub mod server;

pub use exporter::PrometheusExporter;
pub use renderer::CONTENT_TYPE;
pub use server::MetricsServer;
