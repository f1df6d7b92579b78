//! Retaining exporter that serves Prometheus text.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use meterline_api::{InstrumentKind, LabelSet, NumberKind};
use meterline_sdk::{
    Aggregation, ExportResult, Exposition, PipelineStats, PrometheusConfig, Pushable, Servable,
    Snapshot,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::renderer::{self, CONTENT_TYPE};

type SeriesKey = (String, LabelSet);

/// Retained series plus the kind each exposed family was first pushed as.
#[derive(Default)]
struct Retained {
    families: HashMap<String, (InstrumentKind, NumberKind)>,
    series: BTreeMap<SeriesKey, Aggregation>,
}

/// Exporter that keeps the cumulative state of every pushed checkpoint and
/// renders it on scrape.
///
/// Each pushed snapshot is merged into the retained state: sums add,
/// summaries merge, last values are replaced. Rendering only reads, so two
/// scrapes with no push in between return identical bodies.
///
/// Series are keyed by their exposed (sanitised) name. A family keeps the
/// instrument and number kind it was first pushed with; records of the same
/// name with another kind are dropped.
#[derive(Default)]
pub struct PrometheusExporter {
    state: RwLock<Retained>,
    pipeline_stats: Option<PipelineStats>,
}

impl PrometheusExporter {
    /// Create an exporter with empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exporter honouring `include_pipeline_metrics`
    pub fn from_config(config: &PrometheusConfig, stats: &PipelineStats) -> Self {
        let exporter = Self::new();
        if config.include_pipeline_metrics {
            exporter.with_pipeline_stats(stats.clone())
        } else {
            exporter
        }
    }

    /// Append the pipeline's own metrics to every scrape
    pub fn with_pipeline_stats(mut self, stats: PipelineStats) -> Self {
        self.pipeline_stats = Some(stats);
        self
    }

    /// Number of retained series
    pub fn series_count(&self) -> usize {
        self.state.read().series.len()
    }

    /// Merge one checkpoint into the retained state
    pub fn merge(&self, snapshot: Snapshot) {
        let mut state = self.state.write();
        let Retained { families, series } = &mut *state;

        for record in snapshot {
            let name = renderer::sanitize_name(record.descriptor.name());
            let kind = (record.descriptor.kind(), record.descriptor.number_kind());

            let family = *families.entry(name.clone()).or_insert(kind);
            if family != kind {
                debug!(
                    metric = %name,
                    registered = family.0.as_label(),
                    pushed = kind.0.as_label(),
                    "Dropping record that conflicts with an existing family"
                );
                continue;
            }

            series
                .entry((name, record.labels))
                .and_modify(|retained| retained.merge(&record.aggregation))
                .or_insert(record.aggregation);
        }
    }

    /// Render the retained state as Prometheus text
    pub fn render_text(&self) -> String {
        let mut body = {
            let state = self.state.read();
            renderer::render(
                state
                    .series
                    .iter()
                    .map(|((name, labels), aggregation)| (name.as_str(), labels, aggregation)),
            )
        };

        if let Some(stats) = &self.pipeline_stats {
            match stats.encode_text() {
                Ok(text) => body.push_str(&text),
                Err(e) => warn!(error = %e, "Failed to encode pipeline metrics"),
            }
        }

        body
    }
}

impl std::fmt::Debug for PrometheusExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusExporter")
            .field("series", &self.series_count())
            .field("pipeline_stats", &self.pipeline_stats.is_some())
            .finish()
    }
}

#[async_trait]
impl Pushable for PrometheusExporter {
    async fn export(&self, snapshot: Snapshot) -> ExportResult {
        debug!(records = snapshot.len(), "Merging checkpoint");
        self.merge(snapshot);
        Ok(())
    }
}

impl Servable for PrometheusExporter {
    fn render(&self) -> Exposition {
        Exposition {
            body: self.render_text(),
            content_type: CONTENT_TYPE,
        }
    }
}
