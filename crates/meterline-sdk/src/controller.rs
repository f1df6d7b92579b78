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
//! Periodic push scheduler.
//!
//! A [`PushController`] owns one tokio task that collects from a source and
//! hands the snapshot to a push exporter on every tick. Export failures are
//! logged and counted; the next tick runs regardless. Each export runs in
//! its own task, so a panicking exporter counts as a failed export.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batcher::UngroupedBatcher;
use crate::config::PushConfig;
use crate::error::{ConfigError, SdkError};
use crate::export::{ExportError, ExportResult, Pushable};
use crate::snapshot::Snapshot;
use crate::stats::PipelineStats;

/// Something that can produce a checkpoint.
pub trait Collect: Send + Sync + 'static {
    /// Close the current period and return its records
    fn collect(&self) -> Snapshot;
}

impl Collect for UngroupedBatcher {
    fn collect(&self) -> Snapshot {
        self.checkpoint()
    }
}

type FlushRequest = oneshot::Sender<ExportResult>;

/// Push scheduler handle.
///
/// Dropping the handle cancels the task without waiting for it; use
/// [`PushController::shutdown`] to join it.
pub struct PushController {
    cancel: CancellationToken,
    flush_tx: mpsc::Sender<FlushRequest>,
    task: Option<JoinHandle<()>>,
    interval: Duration,
}

impl PushController {
    /// Spawn the scheduler on the current tokio runtime.
    pub fn start(
        source: Arc<dyn Collect>,
        exporter: Arc<dyn Pushable>,
        config: &PushConfig,
        stats: PipelineStats,
    ) -> Result<Self, SdkError> {
        let interval = config.interval()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SdkError::NoRuntime)?;
        let first_tick = Instant::now().checked_add(interval).ok_or_else(|| {
            ConfigError::invalid_value(
                "push.interval_secs",
                format!("{:?} is too far in the future to schedule", interval),
            )
        })?;

        let cancel = CancellationToken::new();
        let (flush_tx, flush_rx) = mpsc::channel(8);

        let worker = PushWorker {
            source,
            exporter,
            stats,
        };
        let task = runtime.spawn(worker.run(
            first_tick,
            interval,
            config.flush_on_shutdown,
            cancel.clone(),
            flush_rx,
        ));

        info!(interval_secs = interval.as_secs_f64(), "Push controller started");

        Ok(Self {
            cancel,
            flush_tx,
            task: Some(task),
            interval,
        })
    }

    /// Configured push interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Collect and export right away and wait for the result.
    pub async fn flush(&self) -> ExportResult {
        let (done_tx, done_rx) = oneshot::channel();
        self.flush_tx
            .send(done_tx)
            .await
            .map_err(|_| ExportError::Shutdown)?;
        done_rx.await.map_err(|_| ExportError::Shutdown)?
    }

    /// Stop the scheduler and wait for its task to exit.
    ///
    /// An export already in flight completes; no export starts afterwards
    /// except the final flush when `flush_on_shutdown` is set.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Push task ended abnormally");
            }
        }
        info!("Push controller stopped");
    }
}

impl Drop for PushController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PushController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushController")
            .field("interval", &self.interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

struct PushWorker {
    source: Arc<dyn Collect>,
    exporter: Arc<dyn Pushable>,
    stats: PipelineStats,
}

impl PushWorker {
    async fn run(
        self,
        first_tick: Instant,
        interval: Duration,
        flush_on_shutdown: bool,
        cancel: CancellationToken,
        mut flush_rx: mpsc::Receiver<FlushRequest>,
    ) {
        let mut ticker = interval_at(first_tick, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(done) = flush_rx.recv() => {
                    let result = self.push_once().await;
                    let _ = done.send(result);
                }
                _ = ticker.tick() => {
                    let _ = self.push_once().await;
                }
            }
        }

        if flush_on_shutdown {
            debug!("Flushing before shutdown");
            let _ = self.push_once().await;
        }
    }

    async fn push_once(&self) -> ExportResult {
        let snapshot = self.source.collect();
        let records = snapshot.len();

        // A panicking exporter must not take the scheduler down with it.
        let exporter = Arc::clone(&self.exporter);
        let outcome = tokio::spawn(async move { exporter.export(snapshot).await })
            .await
            .unwrap_or_else(|e| {
                Err(ExportError::Other(anyhow::anyhow!("exporter task failed: {}", e)))
            });

        match outcome {
            Ok(()) => {
                self.stats.record_export(true, records);
                debug!(records, "Exported checkpoint");
                Ok(())
            }
            Err(e) => {
                self.stats.record_export(false, records);
                warn!(error = %e, records, "Export failed; continuing with the next period");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::InMemoryExporter;
    use async_trait::async_trait;
    use meterline_api::{Descriptor, InstrumentKind, LabelSet, Number, NumberKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics on its first export, succeeds afterwards.
    #[derive(Default)]
    struct PanicOnceExporter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Pushable for PanicOnceExporter {
        async fn export(&self, _snapshot: Snapshot) -> ExportResult {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("exporter bug");
            }
            Ok(())
        }
    }

    fn batcher_with_one_record() -> Arc<UngroupedBatcher> {
        let batcher = Arc::new(UngroupedBatcher::new());
        let descriptor = Arc::new(Descriptor::new(
            "ticks",
            InstrumentKind::Counter,
            NumberKind::I64,
            true,
        ));
        batcher.accumulate(&descriptor, &LabelSet::empty(), Number::I64(1));
        batcher
    }

    #[test]
    fn test_start_needs_runtime() {
        let result = PushController::start(
            Arc::new(UngroupedBatcher::new()),
            Arc::new(InMemoryExporter::new()),
            &PushConfig::with_interval_secs(1.0),
            PipelineStats::new().unwrap(),
        );
        assert!(matches!(result, Err(SdkError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_start_rejects_bad_interval() {
        let result = PushController::start(
            Arc::new(UngroupedBatcher::new()),
            Arc::new(InMemoryExporter::new()),
            &PushConfig::with_interval_secs(0.0),
            PipelineStats::new().unwrap(),
        );
        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_unschedulable_interval() {
        for secs in [1e-10, 1e19] {
            let result = PushController::start(
                Arc::new(UngroupedBatcher::new()),
                Arc::new(InMemoryExporter::new()),
                &PushConfig::with_interval_secs(secs),
                PipelineStats::new().unwrap(),
            );
            assert!(matches!(result, Err(SdkError::Config(_))), "interval {}", secs);
        }
    }

    #[tokio::test]
    async fn test_panicking_exporter_does_not_stop_scheduler() {
        let stats = PipelineStats::new().unwrap();
        let controller = PushController::start(
            batcher_with_one_record(),
            Arc::new(PanicOnceExporter::default()),
            &PushConfig {
                interval_secs: 3600.0,
                flush_on_shutdown: false,
            },
            stats.clone(),
        )
        .unwrap();

        assert!(matches!(controller.flush().await, Err(ExportError::Other(_))));
        assert!(controller.flush().await.is_ok());
        assert_eq!(stats.exports(false), 1);
        assert_eq!(stats.exports(true), 1);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_flush_exports_immediately() {
        let exporter = Arc::new(InMemoryExporter::new());
        let controller = PushController::start(
            batcher_with_one_record(),
            Arc::clone(&exporter) as Arc<dyn Pushable>,
            &PushConfig {
                interval_secs: 3600.0,
                flush_on_shutdown: false,
            },
            PipelineStats::new().unwrap(),
        )
        .unwrap();

        controller.flush().await.unwrap();
        assert_eq!(exporter.exports(), 1);
        assert_eq!(exporter.records().len(), 1);

        controller.shutdown().await;
        assert_eq!(exporter.exports(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_when_configured() {
        let exporter = Arc::new(InMemoryExporter::new());
        let controller = PushController::start(
            batcher_with_one_record(),
            Arc::clone(&exporter) as Arc<dyn Pushable>,
            &PushConfig {
                interval_secs: 3600.0,
                flush_on_shutdown: true,
            },
            PipelineStats::new().unwrap(),
        )
        .unwrap();

        controller.shutdown().await;
        assert_eq!(exporter.exports(), 1);
        assert_eq!(exporter.records().len(), 1);
    }
}
