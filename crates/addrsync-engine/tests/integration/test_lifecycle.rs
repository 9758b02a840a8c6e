//! Start-up, authorization loss and shutdown

use std::sync::Arc;

use addrsync_core::{
    config::UploadConfig,
    domain::ContentType,
    ports::{AuthState, CloudResult, NetworkStatus, NoopMetricsSink},
};
use addrsync_engine::{EngineError, SyncCollaborators, SyncCoordinator};

use crate::common::{
    settle, start, start_online, start_with_agent, test_config, wait_until, FakeAuth,
    FakeCloudAgent, FakeRegistry,
};

#[tokio::test]
async fn test_auth_loss_clears_queue_and_resets_agent() {
    let h = start(test_config(), AuthState::Refreshed, NetworkStatus::Disconnected);
    let first = h.registry.put_contacts("b1", 1);
    let second = h.registry.put_contacts("b2", 1);
    h.registry.add(&first);
    h.registry.add(&second);
    assert_eq!(h.coordinator.pending_changes().len(), 2);

    h.auth.set_state(AuthState::Uninitialized);

    assert!(h.coordinator.pending_changes().is_empty());
    assert_eq!(h.agent.resets(), 1);

    // Nothing is left to send once both gates open again
    h.network.set_status(NetworkStatus::Connected);
    h.auth.set_state(AuthState::Refreshed);
    settle().await;
    assert!(h.agent.calls().is_empty());
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_unrecoverable_auth_error_forgets_uploaded_books() {
    let h = start_online(test_config());
    let entity = h.registry.put_contacts("b1", 1);
    h.registry.add(&entity);
    wait_until(|| h.metrics.completed().len() == 1).await;
    assert_eq!(h.coordinator.known_books(), vec!["b1"]);

    h.auth.set_state(AuthState::UnrecoverableError);

    assert!(h.coordinator.known_books().is_empty());
    assert_eq!(h.agent.resets(), 1);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_expired_auth_pauses_without_clearing() {
    let h = start(test_config(), AuthState::Refreshed, NetworkStatus::Disconnected);
    let entity = h.registry.put_contacts("b1", 1);
    h.registry.add(&entity);

    h.auth.set_state(AuthState::Expired);

    assert_eq!(h.coordinator.pending_changes().len(), 1);
    assert_eq!(h.agent.resets(), 0);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_auth_loss_during_create_keeps_book_unknown() {
    let h = start_online(test_config());
    h.agent.switch_auth_during("create", &h.auth, AuthState::Uninitialized);
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    wait_until(|| h.agent.resets() == 1).await;
    settle().await;

    assert!(h.coordinator.known_books().is_empty());
    assert!(h.agent.calls_starting_with("upload:").is_empty());
    assert!(h.metrics.completed().is_empty());
    assert!(h.coordinator.pending_changes().is_empty());
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_auth_loss_during_failed_upload_drops_change() {
    let h = start_online(test_config());
    h.agent.switch_auth_during("upload", &h.auth, AuthState::UnrecoverableError);
    h.agent.fail_next("upload", CloudResult::ServerError);
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    wait_until(|| h.agent.resets() == 1).await;
    settle().await;

    assert!(h.coordinator.pending_changes().is_empty());
    assert!(h.coordinator.known_books().is_empty());
    assert!(h.metrics.retried().is_empty());

    // A fresh session does not resume the old upload
    h.auth.set_state(AuthState::Refreshed);
    settle().await;
    assert_eq!(h.agent.calls_starting_with("upload:").len(), 1);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_unregisters_observers() {
    let h = start_online(test_config());
    assert_eq!(h.registry.observer_count(), 1);
    assert_eq!(h.auth.observer_count(), 1);
    assert_eq!(h.network.observer_count(), 1);

    h.coordinator.shutdown().await;
    h.coordinator.shutdown().await;

    assert!(h.coordinator.is_shut_down());
    assert_eq!(h.registry.observer_count(), 0);
    assert_eq!(h.auth.observer_count(), 0);
    assert_eq!(h.network.observer_count(), 0);

    h.coordinator.on_book_added(h.registry.put_contacts("b1", 1));
    assert!(h.coordinator.pending_changes().is_empty());
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let config = UploadConfig {
        retry_base_delay_ms: 600_000,
        retry_max_delay_ms: 600_000,
        ..test_config()
    };
    let h = start_online(config);
    h.agent.set_upload_status(503);
    let entity = h.registry.put_contacts("b1", 1);
    h.registry.add(&entity);
    wait_until(|| !h.metrics.retried().is_empty()).await;

    tokio::time::timeout(std::time::Duration::from_secs(5), h.coordinator.shutdown())
        .await
        .expect("shutdown should not wait for the backoff");
}

#[tokio::test]
async fn test_purge_deletes_only_managed_books_before_uploading() {
    let agent = FakeCloudAgent::new();
    agent.seed_listed("ab-contacts", Some(ContentType::Contact));
    agent.seed_listed("ab-nav", Some(ContentType::NavigationFavorite));
    agent.seed_listed("ab-personal", None);

    let config = UploadConfig {
        purge_on_start: true,
        ..test_config()
    };
    let h = start_with_agent(
        agent,
        config,
        AuthState::Expired,
        NetworkStatus::Connected,
    );
    let entity = h.registry.put_contacts("b1", 1);
    h.registry.add(&entity);

    h.auth.set_state(AuthState::Refreshed);
    wait_until(|| h.metrics.completed().len() == 1).await;

    let calls = h.agent.calls();
    assert_eq!(
        &calls[..3],
        &["list", "delete:ab-contacts", "delete:ab-nav"]
    );
    assert!(!calls.contains(&"delete:ab-personal".to_string()));
    assert!(calls.contains(&"create:b1".to_string()));
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_purge_skipped_for_unprovisioned_account() {
    let agent = FakeCloudAgent::new();
    agent.set_provisioned(false);
    agent.seed_listed("ab-contacts", Some(ContentType::Contact));

    let config = UploadConfig {
        purge_on_start: true,
        ..test_config()
    };
    let h = start_with_agent(agent, config, AuthState::Refreshed, NetworkStatus::Connected);
    settle().await;

    assert!(h.agent.calls().is_empty());
    h.coordinator.shutdown().await;
}

#[test]
fn test_start_outside_runtime_fails() {
    let registry = FakeRegistry::new();
    let result = SyncCoordinator::start(
        &test_config(),
        SyncCollaborators {
            agent: FakeCloudAgent::new(),
            registry,
            auth: FakeAuth::new(AuthState::Refreshed),
            network: None,
            metrics: Arc::new(NoopMetricsSink),
        },
        NetworkStatus::Connected,
    );
    assert!(matches!(result, Err(EngineError::NoRuntime)));
}

#[tokio::test]
async fn test_start_rejects_zero_batch_size() {
    let config = UploadConfig {
        batch_size: 0,
        ..test_config()
    };
    let result = SyncCoordinator::start(
        &config,
        SyncCollaborators {
            agent: FakeCloudAgent::new(),
            registry: FakeRegistry::new(),
            auth: FakeAuth::new(AuthState::Refreshed),
            network: None,
            metrics: Arc::new(NoopMetricsSink),
        },
        NetworkStatus::Connected,
    );
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}
