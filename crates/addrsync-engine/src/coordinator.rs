//! Synchronization coordinator
//!
//! [`SyncCoordinator`] observes the address book registry, the auth
//! subsystem and (optionally) the network, and mirrors local address books
//! to the cloud through an [`ICloudAgent`].
//!
//! ## Flow
//!
//! ```text
//! registry ──add/remove──→ ChangeQueue ──→ worker ──→ ICloudAgent
//!                               ↑             │
//!        auth / network ──gate──┘   retry ────┘
//! ```
//!
//! Notifications only touch the queue under a short lock and wake the worker;
//! all network I/O happens on the worker task. The worker runs only while
//! auth is `Refreshed` and the network is `Connected`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use addrsync_core::{
    config::UploadConfig,
    domain::{AddressBookEntity, Change, ChangeKind},
    ports::{
        AuthState, IAddressBookObserver, IAddressBookRegistry, IAuthDelegate, IAuthObserver,
        ICloudAgent, IMetricsSink, INetworkObservable, INetworkObserver,
        NetworkInterfaceChangeStatus, NetworkStatus, SyncMetric,
    },
};
use tokio::{runtime::Handle, sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    queue::{ChangeQueue, Enqueued},
    worker::Worker,
    EngineError,
};

// ============================================================================
// Shared state
// ============================================================================

/// Mutable state shared by the notification handlers and the worker
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) queue: ChangeQueue,
    pub(crate) auth_state: AuthState,
    pub(crate) network_status: NetworkStatus,
    /// Books uploaded during this session, by source id
    pub(crate) known_books: HashMap<String, Arc<AddressBookEntity>>,
    /// Bumped whenever authorization is lost; work started under an older
    /// generation must not touch the queue or `known_books`
    pub(crate) auth_generation: u64,
}

impl SyncState {
    /// Whether the worker may talk to the cloud
    pub(crate) fn can_sync(&self) -> bool {
        self.auth_state.is_refreshed() && self.network_status.is_connected()
    }
}

pub(crate) struct Shared {
    state: Mutex<SyncState>,
    wake: Notify,
    pub(crate) shutdown: CancellationToken,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wake(&self) {
        self.wake.notify_one();
    }

    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Services the coordinator depends on
pub struct SyncCollaborators {
    pub agent: Arc<dyn ICloudAgent>,
    pub registry: Arc<dyn IAddressBookRegistry>,
    pub auth: Arc<dyn IAuthDelegate>,
    /// `None` when the platform offers no connectivity reporting
    pub network: Option<Arc<dyn INetworkObservable>>,
    pub metrics: Arc<dyn IMetricsSink>,
}

/// Keeps cloud address books in step with the local registry
pub struct SyncCoordinator {
    shared: Arc<Shared>,
    agent: Arc<dyn ICloudAgent>,
    metrics: Arc<dyn IMetricsSink>,
    registry: Weak<dyn IAddressBookRegistry>,
    auth: Weak<dyn IAuthDelegate>,
    network: Option<Weak<dyn INetworkObservable>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyncCoordinator {
    /// Starts the worker and registers with the registry, auth and network
    ///
    /// The auth state is read from the delegate. `network_status` seeds the
    /// connectivity gate; pass [`NetworkStatus::Connected`] when
    /// `collaborators.network` is `None`, since no update will ever arrive.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &UploadConfig,
        collaborators: SyncCollaborators,
        network_status: NetworkStatus,
    ) -> Result<Arc<Self>, EngineError> {
        validate(config)?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let SyncCollaborators {
            agent,
            registry,
            auth,
            network,
            metrics,
        } = collaborators;

        let auth_state = auth.auth_state();
        info!(
            %auth_state,
            %network_status,
            batch_size = config.batch_size,
            purge_on_start = config.purge_on_start,
            "Starting address book sync coordinator"
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(SyncState {
                auth_state,
                network_status,
                ..SyncState::default()
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        let worker = Worker::new(
            Arc::clone(&shared),
            Arc::clone(&agent),
            Arc::downgrade(&registry),
            Arc::clone(&metrics),
            config.clone(),
        );

        let coordinator = Arc::new(Self {
            shared,
            agent,
            metrics,
            registry: Arc::downgrade(&registry),
            auth: Arc::downgrade(&auth),
            network: network.as_ref().map(Arc::downgrade),
            worker: Mutex::new(Some(runtime.spawn(worker.run()))),
        });

        registry.add_observer(coordinator.clone());
        auth.add_auth_observer(coordinator.clone());
        if let Some(network) = &network {
            network.add_observer(coordinator.clone());
        }

        Ok(coordinator)
    }

    /// A book appeared or changed in the registry
    pub fn on_book_added(&self, entity: Arc<AddressBookEntity>) {
        if self.is_shut_down() {
            debug!(source_id = %entity.source_id(), "Ignoring add after shutdown");
            return;
        }
        self.metrics.record(SyncMetric::ChangeReceived {
            kind: ChangeKind::Add,
            content_type: entity.content_type(),
        });

        let outcome = self.shared.lock().queue.enqueue_add(Arc::clone(&entity));
        match outcome {
            Enqueued::AlreadyPending => {
                debug!(source_id = %entity.source_id(), "Add already pending");
            }
            _ => {
                info!(
                    source_id = %entity.source_id(),
                    content_type = %entity.content_type(),
                    "Address book add queued"
                );
                self.shared.wake();
            }
        }
    }

    /// A book disappeared from the registry
    pub fn on_book_removed(&self, entity: Arc<AddressBookEntity>) {
        if self.is_shut_down() {
            debug!(source_id = %entity.source_id(), "Ignoring remove after shutdown");
            return;
        }
        self.metrics.record(SyncMetric::ChangeReceived {
            kind: ChangeKind::Remove,
            content_type: entity.content_type(),
        });

        let outcome = {
            let mut state = self.shared.lock();
            let in_cloud = state.known_books.contains_key(entity.source_id());
            state.queue.enqueue_remove(Arc::clone(&entity), in_cloud)
        };

        let source_id = entity.source_id();
        match outcome {
            Enqueued::AlreadyPending => debug!(source_id, "Remove already pending"),
            Enqueued::CancelledPendingAdd => {
                info!(source_id, "Pending add cancelled; book never reached the cloud");
            }
            Enqueued::ReplacedPendingAdd | Enqueued::Queued => {
                info!(source_id, "Address book remove queued");
                self.shared.wake();
            }
        }
    }

    pub fn on_auth_state_changed(&self, auth_state: AuthState) {
        let dropped = {
            let mut state = self.shared.lock();
            if state.auth_state == auth_state {
                return;
            }
            state.auth_state = auth_state;

            match auth_state {
                AuthState::Uninitialized | AuthState::UnrecoverableError => {
                    state.auth_generation = state.auth_generation.wrapping_add(1);
                    state.known_books.clear();
                    Some(state.queue.clear())
                }
                AuthState::Refreshed | AuthState::Expired => None,
            }
        };

        match dropped {
            Some(dropped) => {
                // The account may have changed; cached identity is stale
                self.agent.reset();
                info!(%auth_state, dropped, "Authorization lost; pending changes cleared");
            }
            None if auth_state.is_refreshed() => {
                info!("Authorization refreshed; resuming sync");
                self.shared.wake();
            }
            None => info!(%auth_state, "Authorization state changed; sync paused"),
        }
    }

    pub fn on_network_status_changed(&self, status: NetworkStatus) {
        {
            let mut state = self.shared.lock();
            if state.network_status == status {
                return;
            }
            state.network_status = status;
        }

        if status.is_connected() {
            info!("Network connected; resuming sync");
            self.shared.wake();
        } else {
            info!(%status, "Network status changed");
        }
    }

    pub fn on_network_interface_change(
        &self,
        interface: &str,
        status: NetworkInterfaceChangeStatus,
    ) {
        debug!(interface, ?status, "Network interface change");
    }

    /// Snapshot of the pending changes, front first
    pub fn pending_changes(&self) -> Vec<Change> {
        self.shared.lock().queue.iter().cloned().collect()
    }

    /// Source ids of books uploaded during this session, sorted
    pub fn known_books(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.lock().known_books.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Stops the worker, unregisters every observer and drops pending work
    ///
    /// An in-flight cloud call is abandoned. Calling this twice is a no-op.
    pub async fn shutdown(self: &Arc<Self>) {
        if self.is_shut_down() {
            return;
        }
        info!("Shutting down address book sync coordinator");
        self.shared.shutdown.cancel();
        self.shared.wake();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "Sync worker ended abnormally");
            }
        }

        if let Some(registry) = self.registry.upgrade() {
            let observer: Arc<dyn IAddressBookObserver> = self.clone();
            registry.remove_observer(&observer);
        }
        if let Some(auth) = self.auth.upgrade() {
            let observer: Arc<dyn IAuthObserver> = self.clone();
            auth.remove_auth_observer(&observer);
        }
        if let Some(network) = self.network.as_ref().and_then(Weak::upgrade) {
            let observer: Arc<dyn INetworkObserver> = self.clone();
            network.remove_observer(&observer);
        }

        let dropped = self.shared.lock().queue.clear();
        info!(dropped, "Address book sync coordinator stopped");
    }
}

fn validate(config: &UploadConfig) -> Result<(), EngineError> {
    if config.batch_size == 0 {
        return Err(EngineError::InvalidConfig(
            "batch_size must be greater than 0".to_string(),
        ));
    }
    if config.retry_max_delay_ms < config.retry_base_delay_ms {
        return Err(EngineError::InvalidConfig(
            "retry_max_delay_ms must not be below retry_base_delay_ms".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Observer adapters
// ============================================================================

impl IAddressBookObserver for SyncCoordinator {
    fn address_book_added(&self, entity: Arc<AddressBookEntity>) {
        self.on_book_added(entity);
    }

    fn address_book_removed(&self, entity: Arc<AddressBookEntity>) {
        self.on_book_removed(entity);
    }
}

impl IAuthObserver for SyncCoordinator {
    fn on_auth_state_change(&self, state: AuthState) {
        self.on_auth_state_changed(state);
    }
}

impl INetworkObserver for SyncCoordinator {
    fn on_network_info_changed(&self, status: NetworkStatus) {
        self.on_network_status_changed(status);
    }

    fn on_network_interface_change_status_changed(
        &self,
        interface: &str,
        status: NetworkInterfaceChangeStatus,
    ) {
        self.on_network_interface_change(interface, status);
    }
}
