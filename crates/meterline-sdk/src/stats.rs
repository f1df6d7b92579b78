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
//! Self-telemetry for the pipeline itself
//!
//! Tracks export outcomes, dropped recordings and checkpoint sizes in a
//! Prometheus registry so the pipeline can report on its own health.

use meterline_api::InstrumentKind;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Pipeline health metrics
///
/// Thread-safe registry that can be cloned and shared across the batcher,
/// the instruments and the push controller.
#[derive(Clone)]
pub struct PipelineStats {
    inner: Arc<PipelineStatsInner>,
}

struct PipelineStatsInner {
    /// Prometheus registry
    registry: Registry,

    /// Export attempts by outcome
    exports_total: CounterVec,
    /// Records handed to exporters
    exported_records_total: Counter,
    /// Recordings dropped for violating the instrument's sign restriction
    rejected_recordings_total: CounterVec,
    /// Records in the most recent checkpoint
    checkpoint_records: Gauge,
}

impl PipelineStats {
    /// Create new pipeline stats with their own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let exports_total = CounterVec::new(
            Opts::new(
                "meterline_exports_total",
                "Checkpoint exports by outcome",
            ),
            &["status"],
        )?;
        registry.register(Box::new(exports_total.clone()))?;

        let exported_records_total = Counter::with_opts(Opts::new(
            "meterline_exported_records_total",
            "Records handed to push exporters",
        ))?;
        registry.register(Box::new(exported_records_total.clone()))?;

        let rejected_recordings_total = CounterVec::new(
            Opts::new(
                "meterline_rejected_recordings_total",
                "Negative values dropped by monotonic counters and absolute instruments",
            ),
            &["instrument_kind"],
        )?;
        registry.register(Box::new(rejected_recordings_total.clone()))?;

        let checkpoint_records = Gauge::with_opts(Opts::new(
            "meterline_checkpoint_records",
            "Number of records in the most recent checkpoint",
        ))?;
        registry.register(Box::new(checkpoint_records.clone()))?;

        Ok(Self {
            inner: Arc::new(PipelineStatsInner {
                registry,
                exports_total,
                exported_records_total,
                rejected_recordings_total,
                checkpoint_records,
            }),
        })
    }

    /// Get reference to Prometheus registry for gathering metrics
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Record the outcome of one export
    pub fn record_export(&self, success: bool, records: usize) {
        let status = if success { "success" } else { "failure" };
        self.inner.exports_total.with_label_values(&[status]).inc();

        if success {
            self.inner.exported_records_total.inc_by(records as f64);
        }
    }

    /// Record a dropped recording
    pub fn record_rejected(&self, kind: InstrumentKind) {
        self.inner
            .rejected_recordings_total
            .with_label_values(&[kind.as_label()])
            .inc();
    }

    /// Record the size of a checkpoint
    pub fn record_checkpoint(&self, records: usize) {
        self.inner.checkpoint_records.set(records as f64);
    }

    /// Exports with the given outcome so far
    pub fn exports(&self, success: bool) -> u64 {
        let status = if success { "success" } else { "failure" };
        self.inner.exports_total.with_label_values(&[status]).get() as u64
    }

    /// Dropped recordings for `kind` so far
    pub fn rejected(&self, kind: InstrumentKind) -> u64 {
        self.inner
            .rejected_recordings_total
            .with_label_values(&[kind.as_label()])
            .get() as u64
    }

    /// Encode the registry in Prometheus text format
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStats").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = PipelineStats::new();
        assert!(stats.is_ok());
    }

    #[test]
    fn test_export_outcomes() {
        let stats = PipelineStats::new().unwrap();

        stats.record_export(true, 10);
        stats.record_export(true, 5);
        stats.record_export(false, 7);

        assert_eq!(stats.exports(true), 2);
        assert_eq!(stats.exports(false), 1);
        assert_eq!(stats.inner.exported_records_total.get(), 15.0);
    }

    #[test]
    fn test_rejections_by_kind() {
        let stats = PipelineStats::new().unwrap();

        stats.record_rejected(InstrumentKind::Counter);
        stats.record_rejected(InstrumentKind::Counter);
        stats.record_rejected(InstrumentKind::Measure);

        assert_eq!(stats.rejected(InstrumentKind::Counter), 2);
        assert_eq!(stats.rejected(InstrumentKind::Measure), 1);
        assert_eq!(stats.rejected(InstrumentKind::Observer), 0);
    }

    #[test]
    fn test_encode_text() {
        let stats = PipelineStats::new().unwrap();
        stats.record_export(true, 3);
        stats.record_checkpoint(3);

        let text = stats.encode_text().unwrap();
        assert!(text.contains("# TYPE meterline_exports_total counter"));
        assert!(text.contains("meterline_exports_total{status=\"success\"} 1"));
        assert!(text.contains("meterline_checkpoint_records 3"));
    }
}
