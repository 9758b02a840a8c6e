//! addrsync engine - address book synchronization coordinator
//!
//! Turns registry notifications into cloud operations:
//! - coalesces add/remove notifications into a pending-change queue
//! - gates work on authorization and network connectivity
//! - uploads entries in batches and retries transient failures with
//!   exponential backoff
//!
//! ## Modules
//!
//! - [`coordinator`] - Public entry point; observer of registry, auth and network
//! - [`queue`] - Pending-change queue with coalescing rules
//! - [`collector`] - Validating entries factory handed to the registry
//! - `worker` - Background task that drains the queue

pub mod collector;
pub mod coordinator;
pub mod queue;
mod worker;

use thiserror::Error;

pub use collector::{EntriesCollector, EntryLimits};
pub use coordinator::{SyncCollaborators, SyncCoordinator};
pub use queue::{ChangeQueue, Enqueued};

/// Errors raised while starting the coordinator
#[derive(Debug, Error)]
pub enum EngineError {
    /// The upload configuration cannot drive a worker
    #[error("Invalid upload configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available for the sync worker")]
    NoRuntime,
}
