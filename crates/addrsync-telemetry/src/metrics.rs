//! Prometheus metrics registry for addrsync
//!
//! Counters and histograms for the synchronization pipeline. The registry
//! implements [`IMetricsSink`] so it can be handed straight to the
//! coordinator.

use std::time::Duration;

use addrsync_core::{
    domain::{ChangeKind, ContentType},
    ports::{CloudResult, IMetricsSink, SyncMetric},
};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: registry notifications by (kind, content_type)
    pub changes_received_total: IntCounterVec,
    /// Counter: changes that left the pipeline by (kind, content_type, result)
    pub changes_completed_total: IntCounterVec,
    /// Counter: requeued changes by (kind, content_type, result)
    pub change_retries_total: IntCounterVec,
    /// Counter: failed cloud requests by result
    pub network_errors_total: IntCounterVec,
    /// Counter: entries the cloud refused by content_type
    pub failed_entries_total: IntCounterVec,
    /// Histogram: time from notification to completion, by kind
    pub change_latency_seconds: HistogramVec,
    /// Histogram: duration of one batch POST
    pub batch_upload_seconds: Histogram,
    /// Histogram: batches per completed upload, by content_type
    pub upload_batches: HistogramVec,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("addrsync".to_string()), None)?;

        let changes_received_total = IntCounterVec::new(
            Opts::new("changes_received_total", "Address book changes received"),
            &["kind", "content_type"],
        )?;
        registry.register(Box::new(changes_received_total.clone()))?;

        let changes_completed_total = IntCounterVec::new(
            Opts::new("changes_completed_total", "Address book changes completed"),
            &["kind", "content_type", "result"],
        )?;
        registry.register(Box::new(changes_completed_total.clone()))?;

        let change_retries_total = IntCounterVec::new(
            Opts::new("change_retries_total", "Address book changes requeued"),
            &["kind", "content_type", "result"],
        )?;
        registry.register(Box::new(change_retries_total.clone()))?;

        let network_errors_total = IntCounterVec::new(
            Opts::new("network_errors_total", "Failed cloud requests"),
            &["result"],
        )?;
        registry.register(Box::new(network_errors_total.clone()))?;

        let failed_entries_total = IntCounterVec::new(
            Opts::new("failed_entries_total", "Entries rejected by the cloud"),
            &["content_type"],
        )?;
        registry.register(Box::new(failed_entries_total.clone()))?;

        let change_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "change_latency_seconds",
                "Time from change notification to completion in seconds",
            )
            .buckets(vec![0.5, 1.0, 5.0, 30.0, 120.0, 600.0, f64::INFINITY]),
            &["kind"],
        )?;
        registry.register(Box::new(change_latency_seconds.clone()))?;

        let batch_upload_seconds = Histogram::with_opts(
            HistogramOpts::new("batch_upload_seconds", "Entries batch upload duration in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, f64::INFINITY]),
        )?;
        registry.register(Box::new(batch_upload_seconds.clone()))?;

        let upload_batches = HistogramVec::new(
            HistogramOpts::new("upload_batches", "Batches per address book upload")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 50.0, f64::INFINITY]),
            &["content_type"],
        )?;
        registry.register(Box::new(upload_batches.clone()))?;

        Ok(Self {
            registry,
            changes_received_total,
            changes_completed_total,
            change_retries_total,
            network_errors_total,
            failed_entries_total,
            change_latency_seconds,
            batch_upload_seconds,
            upload_batches,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record a registry notification.
    pub fn record_change_received(&self, kind: ChangeKind, content_type: ContentType) {
        self.changes_received_total
            .with_label_values(&[kind.as_str(), content_type.as_str()])
            .inc();
    }

    /// Record a change leaving the pipeline.
    ///
    /// Batch counts are only observed for successful uploads.
    pub fn record_change_completed(
        &self,
        kind: ChangeKind,
        content_type: ContentType,
        result: CloudResult,
        num_batches: usize,
        latency: Duration,
    ) {
        self.changes_completed_total
            .with_label_values(&[kind.as_str(), content_type.as_str(), result.as_str()])
            .inc();
        self.change_latency_seconds
            .with_label_values(&[kind.as_str()])
            .observe(latency.as_secs_f64());

        if kind == ChangeKind::Add && result.is_success() && num_batches > 0 {
            self.upload_batches
                .with_label_values(&[content_type.as_str()])
                .observe(num_batches as f64);
        }
    }

    /// Record a requeued change.
    pub fn record_change_retried(
        &self,
        kind: ChangeKind,
        content_type: ContentType,
        result: CloudResult,
    ) {
        self.change_retries_total
            .with_label_values(&[kind.as_str(), content_type.as_str(), result.as_str()])
            .inc();
    }

    pub fn record_network_error(&self, result: CloudResult) {
        self.network_errors_total
            .with_label_values(&[result.as_str()])
            .inc();
    }

    pub fn record_failed_entries(&self, content_type: ContentType, count: usize) {
        self.failed_entries_total
            .with_label_values(&[content_type.as_str()])
            .inc_by(count as u64);
    }

    /// Observe a batch upload duration.
    pub fn observe_batch_upload(&self, duration: Duration) {
        self.batch_upload_seconds.observe(duration.as_secs_f64());
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl IMetricsSink for MetricsRegistry {
    fn record(&self, metric: SyncMetric) {
        match metric {
            SyncMetric::ChangeReceived { kind, content_type } => {
                self.record_change_received(kind, content_type);
            }
            SyncMetric::ChangeCompleted {
                kind,
                content_type,
                result,
                num_batches,
                latency,
                ..
            } => self.record_change_completed(kind, content_type, result, num_batches, latency),
            SyncMetric::ChangeRetried {
                kind,
                content_type,
                result,
                ..
            } => self.record_change_retried(kind, content_type, result),
            SyncMetric::BatchUploaded { duration } => self.observe_batch_upload(duration),
            SyncMetric::NetworkError { result } => self.record_network_error(result),
            SyncMetric::FailedEntries {
                content_type,
                count,
                payload,
            } => {
                debug!(%content_type, count, %payload, "Failed entries report");
                self.record_failed_entries(content_type, count);
            }
        }
    }
}
