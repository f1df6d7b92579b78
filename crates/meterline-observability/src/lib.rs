//! meterline Observability
//!
//! Structured logging setup shared by meterline binaries and tests.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, JSON, and compact output formats
//! - **Environment-based Filtering**: `RUST_LOG` or `METERLINE_LOG_LEVEL`
//! - **Structured Logging**: JSON output for machine-readable logs
//!
//! # Example
//!
//! ```ignore
//! use meterline_observability::{init_tracing_with_config, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing_with_config(&LogConfig::from_env()?)?;
//!     tracing::info!("Pipeline starting");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod initialization;
pub mod macros;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{build_subscriber, init_tracing, init_tracing_with_config};

/// Writer type taken by [`build_subscriber`]
pub use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Tracing re-exports for convenience
pub use tracing::{debug, error, info, trace, warn, Level};
