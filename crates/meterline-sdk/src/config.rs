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
//! Pipeline configuration
//!
//! Settings can come from a TOML or JSON file and be overridden through
//! `METERLINE_` environment variables.
//!
//! ```toml
//! [push]
//! interval_secs = 60.0
//! flush_on_shutdown = true
//!
//! [prometheus]
//! enabled = true
//! bind_address = "127.0.0.1"
//! port = 9184
//! path = "/metrics"
//! include_pipeline_metrics = false
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Route of the liveness check served next to the exposition
pub const HEALTH_PATH: &str = "/health";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Push scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Interval between checkpoints, in (fractional) seconds
    pub interval_secs: f64,

    /// Run one last collect and export when the controller shuts down
    pub flush_on_shutdown: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60.0,
            flush_on_shutdown: true,
        }
    }
}

impl PushConfig {
    /// Create new config with the given interval
    pub fn with_interval_secs(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            ..Default::default()
        }
    }

    /// Interval as a [`Duration`]. Must be finite and above zero.
    pub fn interval(&self) -> ConfigResult<Duration> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(ConfigError::invalid_value(
                "push.interval_secs",
                format!("expected a positive number of seconds, got {}", self.interval_secs),
            ));
        }

        let interval = Duration::try_from_secs_f64(self.interval_secs)
            .map_err(|e| ConfigError::invalid_value("push.interval_secs", e.to_string()))?;

        if interval.is_zero() {
            return Err(ConfigError::invalid_value(
                "push.interval_secs",
                format!("{} seconds rounds down to zero", self.interval_secs),
            ));
        }

        if std::time::Instant::now().checked_add(interval).is_none() {
            return Err(ConfigError::invalid_value(
                "push.interval_secs",
                format!("{} seconds is too far in the future to schedule", self.interval_secs),
            ));
        }

        Ok(interval)
    }
}

/// Pull endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Serve the scrape endpoint
    pub enabled: bool,

    /// Bind address (default: 127.0.0.1)
    pub bind_address: String,

    /// Port for the scrape endpoint
    pub port: u16,

    /// Route the exposition is served on
    pub path: String,

    /// Append the pipeline's own health metrics to every scrape
    pub include_pipeline_metrics: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1".to_string(),
            port: 9184,
            path: "/metrics".to_string(),
            include_pipeline_metrics: false,
        }
    }
}

impl PrometheusConfig {
    /// Create new config with port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get bind address with port
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Push scheduler
    pub push: PushConfig,

    /// Pull endpoint
    pub prometheus: PrometheusConfig,
}

impl SdkConfig {
    /// Load configuration from a file, detecting the format from its extension
    pub async fn load_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        Self::load_from_string(&content, format)
    }

    /// Load configuration from a string and validate it
    pub fn load_from_string(content: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let config: SdkConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML configuration
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::load_from_string(content, ConfigFormat::Toml)
    }

    /// Check value constraints
    pub fn validate(&self) -> ConfigResult<()> {
        self.push.interval()?;

        if self.prometheus.enabled && self.prometheus.port == 0 {
            return Err(ConfigError::invalid_value(
                "prometheus.port",
                "port must be between 1 and 65535",
            ));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "prometheus.path",
                format!("route must start with '/', got '{}'", self.prometheus.path),
            ));
        }

        if self.prometheus.path == HEALTH_PATH {
            return Err(ConfigError::invalid_value(
                "prometheus.path",
                format!("'{}' is reserved for the health check", HEALTH_PATH),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Push settings
        if let Some(value) = lookup("METERLINE_PUSH_INTERVAL_SECS") {
            self.push.interval_secs = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "METERLINE_PUSH_INTERVAL_SECS",
                    &value,
                    "expected a number of seconds",
                )
            })?;
        }
        if let Some(value) = lookup("METERLINE_FLUSH_ON_SHUTDOWN") {
            self.push.flush_on_shutdown = parse_bool("METERLINE_FLUSH_ON_SHUTDOWN", &value)?;
        }

        // Prometheus settings
        if let Some(value) = lookup("METERLINE_PROMETHEUS_ENABLED") {
            self.prometheus.enabled = parse_bool("METERLINE_PROMETHEUS_ENABLED", &value)?;
        }
        if let Some(value) = lookup("METERLINE_PROMETHEUS_BIND_ADDRESS") {
            self.prometheus.bind_address = value;
        }
        if let Some(value) = lookup("METERLINE_PROMETHEUS_PORT") {
            self.prometheus.port = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "METERLINE_PROMETHEUS_PORT",
                    &value,
                    "expected valid port number (1-65535)",
                )
            })?;
        }

        self.validate()
    }
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable_name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable_name,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SdkConfig::default();
        assert_eq!(config.push.interval_secs, 60.0);
        assert!(config.push.flush_on_shutdown);
        assert_eq!(config.prometheus.socket_addr(), "127.0.0.1:9184");
        assert_eq!(config.prometheus.path, "/metrics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fractional_interval() {
        let push = PushConfig::with_interval_secs(0.05);
        assert_eq!(push.interval().unwrap(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_interval() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(PushConfig::with_interval_secs(secs).interval().is_err());
        }
    }

    #[test]
    fn test_interval_out_of_schedulable_range() {
        assert!(PushConfig::with_interval_secs(1e-10).interval().is_err());
        assert!(PushConfig::with_interval_secs(1e19).interval().is_err());

        assert!(SdkConfig::from_toml_str("[push]\ninterval_secs = 1e-10").is_err());
        assert!(SdkConfig::from_toml_str("[push]\ninterval_secs = 1e19").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
        [push]
        interval_secs = 0.5

        [prometheus]
        port = 9999
        include_pipeline_metrics = true
        "#;
        let config = SdkConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.push.interval().unwrap(), Duration::from_millis(500));
        assert!(config.push.flush_on_shutdown);
        assert_eq!(config.prometheus.port, 9999);
        assert!(config.prometheus.include_pipeline_metrics);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"push": {"interval_secs": 2.0, "flush_on_shutdown": false}}"#;
        let config = SdkConfig::load_from_string(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.push.interval_secs, 2.0);
        assert!(!config.push.flush_on_shutdown);
    }

    #[test]
    fn test_rejects_bad_path() {
        let toml = r#"
        [prometheus]
        path = "metrics"
        "#;
        assert!(SdkConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_health_path() {
        let toml = r#"
        [prometheus]
        path = "/health"
        "#;
        assert!(SdkConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("meterline.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("meterline.json").unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path("meterline.xml").is_err());
        assert!(ConfigFormat::from_path("meterline").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("METERLINE_PUSH_INTERVAL_SECS", "0.25"),
            ("METERLINE_FLUSH_ON_SHUTDOWN", "off"),
            ("METERLINE_PROMETHEUS_PORT", "9300"),
            ("METERLINE_PROMETHEUS_BIND_ADDRESS", "0.0.0.0"),
        ]
        .into_iter()
        .collect();

        let mut config = SdkConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.push.interval_secs, 0.25);
        assert!(!config.push.flush_on_shutdown);
        assert_eq!(config.prometheus.socket_addr(), "0.0.0.0:9300");
    }

    #[test]
    fn test_override_parse_error() {
        let mut config = SdkConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "METERLINE_PROMETHEUS_PORT").then(|| "not-a-port".to_string())
        });

        match result {
            Err(ConfigError::EnvVarParsingError { variable_name, .. }) => {
                assert_eq!(variable_name, "METERLINE_PROMETHEUS_PORT");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meterline.toml");
        tokio::fs::write(&path, "[push]\ninterval_secs = 1.5\n")
            .await
            .unwrap();

        let config = SdkConfig::load_file(&path).await.unwrap();
        assert_eq!(config.push.interval_secs, 1.5);

        let missing = SdkConfig::load_file(dir.path().join("missing.toml")).await;
        assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
    }
}
