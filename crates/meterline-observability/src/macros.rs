//! Convenience macros for structured logging.
//!
//! Field lists use `key => value` pairs so call sites read the same at
//! every level.

/// Log an info message with structured fields
///
/// # Example
///
/// ```ignore
/// log_info!("Checkpoint exported" => {
///     records = 12,
///     exporter = "prometheus",
/// });
/// ```
#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        tracing::info!($msg)
    };
    ($msg:expr => { $($key:ident = $value:expr),* $(,)? }) => {
        tracing::info!($($key = $value,)* $msg)
    };
}

/// Log a debug message with structured fields
#[macro_export]
macro_rules! log_debug {
    ($msg:expr) => {
        tracing::debug!($msg)
    };
    ($msg:expr => { $($key:ident = $value:expr),* $(,)? }) => {
        tracing::debug!($($key = $value,)* $msg)
    };
}

/// Log a warning message with structured fields
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        tracing::warn!($msg)
    };
    ($msg:expr => { $($key:ident = $value:expr),* $(,)? }) => {
        tracing::warn!($($key = $value,)* $msg)
    };
}

/// Log an error message with structured fields
#[macro_export]
macro_rules! log_error {
    ($msg:expr) => {
        tracing::error!($msg)
    };
    ($msg:expr => { $($key:ident = $value:expr),* $(,)? }) => {
        tracing::error!($($key = $value,)* $msg)
    };
}
