//! Background worker draining the change queue
//!
//! One task per coordinator. It waits until the gate is open (auth
//! `Refreshed`, network `Connected`), takes the front change and runs it to
//! completion against the cloud agent. Retryable failures put the change
//! back at the front and pause the worker with exponential backoff.

use std::{
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use addrsync_core::{
    config::UploadConfig,
    domain::{AddressBookEntity, Change, ChangeKind, CloudAddressBookId, EntriesDocument, Entry},
    ports::{
        CloudAgentError, CloudResult, HttpResponse, IAddressBookRegistry, ICloudAgent,
        IMetricsSink, SyncMetric,
    },
};
use tracing::{debug, info, instrument, warn};

use crate::{
    collector::{EntriesCollector, EntryLimits},
    coordinator::Shared,
};

/// Exponent cap keeping the shift in range
const MAX_BACKOFF_EXPONENT: u32 = 20;

enum Work {
    Purge,
    /// A change and the auth generation it was taken under
    Change(Change, u64),
}

/// How a change left the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeOutcome {
    /// Done for good, successfully or not
    Completed {
        result: CloudResult,
        num_batches: usize,
    },
    /// Transient failure; requeue and back off
    Retry(CloudResult),
    /// Authorization was lost mid-flight; the change belongs to the old session
    Abandoned,
}

impl ChangeOutcome {
    fn success(num_batches: usize) -> Self {
        ChangeOutcome::Completed {
            result: CloudResult::Success,
            num_batches,
        }
    }

    fn from_error(err: &CloudAgentError) -> Self {
        if err.is_retryable() {
            ChangeOutcome::Retry(err.result())
        } else {
            ChangeOutcome::Completed {
                result: err.result(),
                num_batches: 0,
            }
        }
    }
}

enum BatchOutcome {
    Finished(CloudResult),
    Retry(CloudResult),
}

/// Steps of a single batch upload
enum UploadFlowState {
    Post,
    Parse(HttpResponse),
    Error(CloudResult),
    Finish(CloudResult),
}

/// Pause before the `attempt`-th retry: `base * 2^(attempt - 1)`, capped
pub(crate) fn retry_delay(config: &UploadConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let delay_ms = config
        .retry_base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.retry_max_delay_ms);
    Duration::from_millis(delay_ms)
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    agent: Arc<dyn ICloudAgent>,
    registry: Weak<dyn IAddressBookRegistry>,
    metrics: Arc<dyn IMetricsSink>,
    config: UploadConfig,
    purge_pending: bool,
    purge_failures: u32,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        agent: Arc<dyn ICloudAgent>,
        registry: Weak<dyn IAddressBookRegistry>,
        metrics: Arc<dyn IMetricsSink>,
        config: UploadConfig,
    ) -> Self {
        Self {
            shared,
            agent,
            registry,
            metrics,
            purge_pending: config.purge_on_start,
            purge_failures: 0,
            config,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Sync worker started");

        while let Some(work) = self.next_work().await {
            match work {
                Work::Purge => self.run_purge().await,
                Work::Change(change, generation) => self.run_change(change, generation).await,
            }
        }

        info!("Sync worker stopped");
    }

    /// Wait for the gate to open and hand out the next piece of work
    async fn next_work(&mut self) -> Option<Work> {
        loop {
            if self.shared.shutdown.is_cancelled() {
                return None;
            }
            {
                let mut state = self.shared.lock();
                if state.can_sync() {
                    if self.purge_pending {
                        return Some(Work::Purge);
                    }
                    if let Some(change) = state.queue.pop_front() {
                        return Some(Work::Change(change, state.auth_generation));
                    }
                }
            }

            tokio::select! {
                _ = self.shared.woken() => {}
                _ = self.shared.shutdown.cancelled() => return None,
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let delay = retry_delay(&self.config, attempt);
        debug!(attempt, ?delay, "Backing off");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.shared.shutdown.cancelled() => {}
        }
    }

    // ========================================================================
    // Changes
    // ========================================================================

    async fn run_change(&mut self, mut change: Change, generation: u64) {
        let kind = change.kind();
        let content_type = change.entity().content_type();

        let outcome = tokio::select! {
            outcome = self.process(&change, generation) => outcome,
            _ = self.shared.shutdown.cancelled() => {
                info!(source_id = %change.source_id(), %kind, "Shutdown; abandoning in-flight change");
                return;
            }
        };

        match outcome {
            ChangeOutcome::Completed {
                result,
                num_batches,
            } => {
                if result.is_success() {
                    info!(source_id = %change.source_id(), %kind, num_batches, "Change completed");
                } else {
                    warn!(source_id = %change.source_id(), %kind, %result, "Change failed permanently");
                }
                self.metrics.record(SyncMetric::ChangeCompleted {
                    kind,
                    content_type,
                    result,
                    num_batches,
                    retry_count: change.retry_count(),
                    latency: change.age(),
                });
            }
            ChangeOutcome::Retry(result) => {
                change.record_failure();
                let retry_count = change.retry_count();
                let source_id = change.source_id().to_string();

                let requeued = {
                    let mut state = self.shared.lock();
                    (state.auth_generation == generation)
                        .then(|| state.queue.requeue_failed(change))
                };
                let Some(requeued) = requeued else {
                    info!(%source_id, %kind, %result, "Authorization lost; dropping failed change");
                    return;
                };

                self.metrics.record(SyncMetric::ChangeRetried {
                    kind,
                    content_type,
                    result,
                    retry_count,
                });
                if requeued {
                    warn!(%source_id, %kind, %result, retry_count, "Change failed; will retry");
                } else {
                    info!(%source_id, %kind, %result, "Change failed but newer work supersedes it");
                }
                self.backoff(retry_count).await;
            }
            ChangeOutcome::Abandoned => {
                info!(source_id = %change.source_id(), %kind, "Authorization lost; change abandoned");
            }
        }
    }

    async fn process(&self, change: &Change, generation: u64) -> ChangeOutcome {
        match change.kind() {
            ChangeKind::Add => self.handle_upload(change.entity(), generation).await,
            ChangeKind::Remove => self.handle_remove(change.entity()).await,
        }
    }

    /// Ensure the account can hold address books, provisioning it if allowed
    async fn ensure_account_provisioned(&self) -> Result<(), CloudResult> {
        if self.agent.is_account_provisioned().await {
            return Ok(());
        }
        if self.config.auto_provision {
            match self.agent.auto_provision_account().await {
                Ok(()) => {
                    info!("Account auto-provisioned");
                    return Ok(());
                }
                Err(err) => warn!(error = %err, "Auto-provisioning failed"),
            }
        }
        Err(CloudResult::AccountNotProvisioned)
    }

    /// Pull the book's entries from the registry; `None` drops the change
    fn collect_entries(&self, entity: &AddressBookEntity) -> Option<Vec<Entry>> {
        let Some(registry) = self.registry.upgrade() else {
            warn!("Address book registry is gone; dropping change");
            return None;
        };

        let mut collector =
            EntriesCollector::new(entity.content_type(), EntryLimits::from(&self.config));
        if !registry.get_entries(entity.source_id(), &mut collector) {
            warn!("Registry could not supply entries; dropping change");
            return None;
        }
        if collector.rejected() > 0 {
            warn!(rejected = collector.rejected(), "Some entry values were rejected");
        }
        if collector.is_empty() {
            info!("Address book has no entries to upload");
            return None;
        }
        Some(collector.into_entries())
    }

    async fn delete_existing(&self, entity: &AddressBookEntity) -> Result<(), CloudAgentError> {
        let existing = self
            .agent
            .get_cloud_address_book_id(entity.source_id(), entity.content_type())
            .await?;
        if let Some(id) = existing {
            debug!(cloud_id = %id, "Replacing existing cloud address book");
            self.agent.delete_cloud_address_book(&id).await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(source_id = %entity.source_id(), content_type = %entity.content_type()))]
    async fn handle_upload(
        &self,
        entity: &Arc<AddressBookEntity>,
        generation: u64,
    ) -> ChangeOutcome {
        if let Err(result) = self.ensure_account_provisioned().await {
            return ChangeOutcome::Retry(result);
        }

        let Some(entries) = self.collect_entries(entity) else {
            return ChangeOutcome::success(0);
        };

        if self.config.replace_existing {
            if let Err(err) = self.delete_existing(entity).await {
                warn!(error = %err, "Could not remove previous cloud copy");
                return ChangeOutcome::from_error(&err);
            }
        }

        let id = match self
            .agent
            .create_and_get_cloud_address_book(entity.source_id(), entity.content_type())
            .await
        {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "Could not create cloud address book");
                return ChangeOutcome::from_error(&err);
            }
        };
        {
            let mut state = self.shared.lock();
            if state.auth_generation != generation {
                return ChangeOutcome::Abandoned;
            }
            state
                .known_books
                .insert(entity.source_id().to_string(), Arc::clone(entity));
        }

        let batches = EntriesDocument::batches(entries, self.config.batch_size);
        let num_batches = batches.len();
        for (index, batch) in batches.iter().enumerate() {
            match self.upload_batch(entity, &id, batch).await {
                BatchOutcome::Finished(CloudResult::Success) => {
                    debug!(batch = index + 1, num_batches, "Batch uploaded");
                }
                BatchOutcome::Finished(result) => {
                    warn!(batch = index + 1, num_batches, %result, "Batch rejected; abandoning upload");
                    return ChangeOutcome::Completed {
                        result,
                        num_batches: index + 1,
                    };
                }
                BatchOutcome::Retry(result) => return ChangeOutcome::Retry(result),
            }
        }

        info!(cloud_id = %id, num_batches, "Address book uploaded");
        ChangeOutcome::success(num_batches)
    }

    async fn upload_batch(
        &self,
        entity: &AddressBookEntity,
        id: &CloudAddressBookId,
        batch: &EntriesDocument,
    ) -> BatchOutcome {
        let mut state = UploadFlowState::Post;
        loop {
            state = match state {
                UploadFlowState::Post => {
                    let started = Instant::now();
                    let response = self.agent.upload_document_to_cloud(batch, id).await;
                    self.metrics.record(SyncMetric::BatchUploaded {
                        duration: started.elapsed(),
                    });
                    match response {
                        Ok(response) => UploadFlowState::Parse(response),
                        Err(err) => {
                            warn!(error = %err, "Batch upload request failed");
                            self.metrics
                                .record(SyncMetric::NetworkError { result: err.result() });
                            UploadFlowState::Error(err.result())
                        }
                    }
                }
                UploadFlowState::Parse(response) => {
                    let result = self.agent.http_response_code_to_result(&response);
                    if result.is_success() {
                        self.report_failed_entries(entity, &response);
                        UploadFlowState::Finish(result)
                    } else {
                        warn!(status = response.status, %result, "Batch upload rejected");
                        self.metrics.record(SyncMetric::NetworkError { result });
                        if result.is_retryable() {
                            UploadFlowState::Error(result)
                        } else {
                            UploadFlowState::Finish(result)
                        }
                    }
                }
                UploadFlowState::Error(result) => return BatchOutcome::Retry(result),
                UploadFlowState::Finish(result) => return BatchOutcome::Finished(result),
            };
        }
    }

    /// Entries the service refused inside an accepted batch are reported,
    /// never retried.
    fn report_failed_entries(&self, entity: &AddressBookEntity, response: &HttpResponse) {
        match self.agent.parse_create_address_book_entry_response(response) {
            Ok(failed) if failed.is_empty() => {}
            Ok(failed) => {
                let payload = self.agent.build_failed_entries_json(&failed);
                warn!(count = failed.len(), "Cloud rejected some entries");
                self.metrics.record(SyncMetric::FailedEntries {
                    content_type: entity.content_type(),
                    count: failed.len(),
                    payload,
                });
            }
            Err(err) => {
                warn!(error = %err, "Could not parse upload response");
                self.metrics.record(SyncMetric::NetworkError {
                    result: CloudResult::ParseFailed,
                });
            }
        }
    }

    #[instrument(skip_all, fields(source_id = %entity.source_id(), content_type = %entity.content_type()))]
    async fn handle_remove(&self, entity: &Arc<AddressBookEntity>) -> ChangeOutcome {
        let source_id = entity.source_id();
        let uploaded = self.shared.lock().known_books.contains_key(source_id);
        if !uploaded {
            info!("Address book never uploaded; nothing to delete");
            return ChangeOutcome::success(0);
        }

        let id = match self
            .agent
            .get_cloud_address_book_id(source_id, entity.content_type())
            .await
        {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!("Cloud address book already gone");
                self.forget(source_id);
                return ChangeOutcome::success(0);
            }
            Err(err) => {
                warn!(error = %err, "Could not look up cloud address book");
                return ChangeOutcome::from_error(&err);
            }
        };

        match self.agent.delete_cloud_address_book(&id).await {
            Ok(()) => {
                info!(cloud_id = %id, "Cloud address book deleted");
                self.forget(source_id);
                ChangeOutcome::success(0)
            }
            Err(err) => {
                warn!(cloud_id = %id, error = %err, "Could not delete cloud address book");
                ChangeOutcome::from_error(&err)
            }
        }
    }

    fn forget(&self, source_id: &str) {
        self.shared.lock().known_books.remove(source_id);
    }

    // ========================================================================
    // Start-up purge
    // ========================================================================

    async fn run_purge(&mut self) {
        let result = tokio::select! {
            result = self.purge_cloud_address_books() => result,
            _ = self.shared.shutdown.cancelled() => return,
        };

        match result {
            Ok(deleted) => {
                self.purge_pending = false;
                info!(deleted, "Start-up purge finished");
            }
            Err(err) if !err.is_retryable() => {
                self.purge_pending = false;
                warn!(error = %err, "Start-up purge abandoned");
            }
            Err(err) => {
                self.purge_failures = self.purge_failures.saturating_add(1);
                warn!(error = %err, attempt = self.purge_failures, "Start-up purge failed; will retry");
                self.backoff(self.purge_failures).await;
            }
        }
    }

    /// Delete every managed cloud book left over from earlier sessions
    async fn purge_cloud_address_books(&self) -> Result<usize, CloudAgentError> {
        if !self.agent.is_account_provisioned().await {
            info!("Account not provisioned; nothing to purge");
            return Ok(0);
        }

        let books = self.agent.list_cloud_address_books().await?;
        let mut deleted = 0;
        for book in books.iter().filter(|book| book.content_type.is_some()) {
            debug!(cloud_id = %book.id, source_id = %book.source_id, "Purging cloud address book");
            self.agent.delete_cloud_address_book(&book.id).await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}
