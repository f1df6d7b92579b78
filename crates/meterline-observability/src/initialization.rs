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
//! Subscriber setup.
//!
//! [`build_subscriber`] assembles the filter and formatting layer for a
//! [`LogConfig`]; [`init_tracing_with_config`] installs it globally.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Initialize tracing with the specified format and optional filter.
///
/// # Arguments
///
/// * `format` - The output format for logs
/// * `level` - Optional filter (e.g., "info", "meterline_sdk=debug"). If None, uses RUST_LOG
///
/// # Example
///
/// ```ignore
/// use meterline_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("debug")).unwrap();
/// tracing::info!("Pipeline starting");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(&config)
}

/// Install a global subscriber built from `config`.
///
/// Fails with [`LogError::AlreadyInitialized`] if one is already set.
pub fn init_tracing_with_config(config: &LogConfig) -> Result<(), LogError> {
    build_subscriber(config, writer_for(config.output))?
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

/// Build a subscriber for `config` writing to `writer`, without installing it.
pub fn build_subscriber(
    config: &LogConfig,
    writer: BoxMakeWriter,
) -> Result<impl Subscriber + Send + Sync + 'static, LogError> {
    let env_filter = build_env_filter(config)?;
    Ok(Registry::default()
        .with(env_filter)
        .with(format_layer(config, writer)))
}

fn format_layer(config: &LogConfig, writer: BoxMakeWriter) -> BoxedLayer {
    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(config.use_color)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_thread_names(true)
                .with_span_events(FmtSpan::ACTIVE)
                .pretty();
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(config.use_color)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_span_events(FmtSpan::CLOSE)
                .compact();
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_span_events(FmtSpan::CLOSE);
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
    }
}

fn writer_for(output: LogOutput) -> BoxMakeWriter {
    match output {
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
    }
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let filter = config.get_effective_level();

    EnvFilter::try_new(&filter).map_err(|e| LogError::InvalidFilter {
        reason: e.to_string(),
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Global installation is covered in tests/; it can only happen once per process.

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("meterline_sdk=trace,info")).is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let result = build_env_filter(&LogConfig::new().with_level("meterline_sdk=notalevel"));
        assert!(matches!(result, Err(LogError::InvalidFilter { .. })));
    }

    #[test]
    fn test_every_format_builds() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let config = LogConfig::new().with_format(format).with_timestamps(false);
            assert!(build_subscriber(&config, BoxMakeWriter::new(io::sink)).is_ok());
        }
    }
}
