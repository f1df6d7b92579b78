//! Exporter capabilities.
//!
//! Push targets receive checkpoints from the [`PushController`] on a timer;
//! pull targets keep what was pushed into them and serve it on request. A
//! backend implements whichever of the two it supports.
//!
//! [`PushController`]: crate::controller::PushController

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::snapshot::{Record, Snapshot};

/// Failure reported by a push exporter.
///
/// Failures are returned as values; the controller logs them and moves on
/// to the next period.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend rejected the batch: {0}")]
    Rejected(String),

    #[error("Exporter is shut down")]
    Shutdown,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of one export
pub type ExportResult = Result<(), ExportError>;

/// Backend that accepts pushed checkpoints.
///
/// Failures should be returned as [`ExportError`]. The push controller runs
/// each export in its own task and reports a panic as a failed export.
#[async_trait]
pub trait Pushable: Send + Sync {
    /// Export one checkpoint.
    async fn export(&self, snapshot: Snapshot) -> ExportResult;
}

/// Rendered body plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposition {
    /// Response body
    pub body: String,
    /// Value for the `Content-Type` header
    pub content_type: &'static str,
}

/// Backend that serves its retained state on request.
pub trait Servable: Send + Sync {
    /// Render the most recently completed state
    fn render(&self) -> Exposition;
}

/// Push exporter that writes every record to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExporter;

impl LoggingExporter {
    /// Create a new logging exporter
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Pushable for LoggingExporter {
    async fn export(&self, snapshot: Snapshot) -> ExportResult {
        let collected_at = snapshot.collected_at().to_rfc3339();
        for record in snapshot {
            let json = serde_json::to_string(&record.aggregation).map_err(anyhow::Error::from)?;
            info!(
                target: "meterline::export",
                collected_at = %collected_at,
                instrument = %record.descriptor.name(),
                labels = %record.labels,
                aggregation = %json,
                "metric"
            );
        }
        Ok(())
    }
}

/// Push exporter that keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl InMemoryExporter {
    /// Create an empty exporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots received
    pub fn exports(&self) -> usize {
        self.snapshots.lock().len()
    }

    /// All records received so far, in arrival order
    pub fn records(&self) -> Vec<Record> {
        self.snapshots
            .lock()
            .iter()
            .flat_map(|s| s.records().iter().cloned())
            .collect()
    }

    /// Drain the received snapshots
    pub fn take(&self) -> Vec<Snapshot> {
        std::mem::take(&mut *self.snapshots.lock())
    }
}

#[async_trait]
impl Pushable for InMemoryExporter {
    async fn export(&self, snapshot: Snapshot) -> ExportResult {
        self.snapshots.lock().push(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregation;
    use meterline_api::{Descriptor, InstrumentKind, LabelSet, Number, NumberKind};
    use std::sync::Arc;

    fn snapshot_with(value: i64) -> Snapshot {
        Snapshot::new(vec![Record {
            descriptor: Arc::new(Descriptor::new(
                "requests",
                InstrumentKind::Counter,
                NumberKind::I64,
                true,
            )),
            labels: LabelSet::new([("route", "/")]),
            aggregation: Aggregation::Sum(Number::I64(value)),
        }])
    }

    #[tokio::test]
    async fn test_in_memory_exporter() {
        let exporter = InMemoryExporter::new();
        exporter.export(snapshot_with(1)).await.unwrap();
        exporter.export(Snapshot::empty()).await.unwrap();
        exporter.export(snapshot_with(2)).await.unwrap();

        assert_eq!(exporter.exports(), 3);
        let values: Vec<_> = exporter.records().iter().map(|r| r.aggregation).collect();
        assert_eq!(
            values,
            vec![
                Aggregation::Sum(Number::I64(1)),
                Aggregation::Sum(Number::I64(2))
            ]
        );

        assert_eq!(exporter.take().len(), 3);
        assert_eq!(exporter.exports(), 0);
    }

    #[test]
    fn test_logging_exporter() {
        let exporter = LoggingExporter::new();
        assert!(tokio_test::block_on(exporter.export(snapshot_with(5))).is_ok());
    }

    #[test]
    fn test_export_error_display() {
        let err = ExportError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert_eq!(ExportError::Shutdown.to_string(), "Exporter is shut down");
    }
}
