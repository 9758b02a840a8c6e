//! Metrics sink port
//!
//! The coordinator reports what it did as [`SyncMetric`] events. Recording
//! is fire-and-forget: a sink must not block or fail the caller.

use std::time::Duration;

use crate::{
    domain::{ChangeKind, ContentType},
    ports::cloud_agent::CloudResult,
};

/// An observable event of the synchronization pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMetric {
    /// The registry announced an add or remove
    ChangeReceived {
        kind: ChangeKind,
        content_type: ContentType,
    },
    /// A change left the pipeline (success or terminal failure)
    ChangeCompleted {
        kind: ChangeKind,
        content_type: ContentType,
        result: CloudResult,
        num_batches: usize,
        retry_count: u32,
        latency: Duration,
    },
    /// A change failed with a retryable result and was requeued
    ChangeRetried {
        kind: ChangeKind,
        content_type: ContentType,
        result: CloudResult,
        retry_count: u32,
    },
    /// One batch POST finished, whatever its outcome
    BatchUploaded { duration: Duration },
    /// A request failed at the HTTP or transport level
    NetworkError { result: CloudResult },
    /// The service rejected individual entries of an accepted batch
    FailedEntries {
        content_type: ContentType,
        count: usize,
        payload: String,
    },
}

pub trait IMetricsSink: Send + Sync {
    fn record(&self, metric: SyncMetric);
}

/// Sink that drops every metric
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl IMetricsSink for NoopMetricsSink {
    fn record(&self, _metric: SyncMetric) {}
}
