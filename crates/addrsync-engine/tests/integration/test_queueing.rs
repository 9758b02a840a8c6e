//! Coalescing and gating of registry notifications

use addrsync_core::{
    domain::ChangeKind,
    ports::{AuthState, CloudResult, NetworkStatus},
};

use crate::common::{book, settle, start, start_online, test_config, wait_until};

#[tokio::test]
async fn test_repeated_adds_coalesce_into_one_upload() {
    let h = start(test_config(), AuthState::Expired, NetworkStatus::Connected);
    let entity = h.registry.put_contacts("b1", 1);

    for _ in 0..4 {
        h.registry.add(&entity);
    }
    assert_eq!(h.coordinator.pending_changes().len(), 1);

    h.auth.set_state(AuthState::Refreshed);
    wait_until(|| h.metrics.completed().len() == 1).await;
    settle().await;

    assert_eq!(h.agent.calls_starting_with("create:").len(), 1);
    assert_eq!(h.metrics.completed().len(), 1);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_add_then_remove_before_upload_makes_no_cloud_calls() {
    let h = start(test_config(), AuthState::Expired, NetworkStatus::Connected);
    let entity = h.registry.put_contacts("b1", 3);

    h.registry.add(&entity);
    h.registry.remove(&entity);
    assert!(h.coordinator.pending_changes().is_empty());

    h.auth.set_state(AuthState::Refreshed);
    settle().await;

    assert!(h.agent.calls().is_empty());
    assert!(h.metrics.completed().is_empty());
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_nothing_is_sent_until_auth_refreshed() {
    let h = start(test_config(), AuthState::Uninitialized, NetworkStatus::Connected);
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    settle().await;
    assert!(h.agent.calls().is_empty());
    assert_eq!(h.coordinator.pending_changes().len(), 1);

    h.auth.set_state(AuthState::Refreshed);
    wait_until(|| h.metrics.completed().len() == 1).await;
    assert_eq!(h.agent.calls_starting_with("create:"), vec!["create:b1"]);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_nothing_is_sent_until_network_connected() {
    let h = start(test_config(), AuthState::Refreshed, NetworkStatus::Disconnected);
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    h.network.set_status(NetworkStatus::Connecting);
    settle().await;
    assert!(h.agent.calls().is_empty());

    h.network.set_status(NetworkStatus::Connected);
    wait_until(|| h.metrics.completed().len() == 1).await;
    assert_eq!(h.agent.calls_starting_with("create:"), vec!["create:b1"]);
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_changes_are_processed_in_arrival_order() {
    let h = start(test_config(), AuthState::Expired, NetworkStatus::Connected);
    let first = h.registry.put_contacts("b1", 1);
    let second = h.registry.put_contacts("b2", 1);
    h.registry.add(&first);
    h.registry.add(&second);

    h.auth.set_state(AuthState::Refreshed);
    wait_until(|| h.metrics.completed().len() == 2).await;

    assert_eq!(
        h.agent.calls_starting_with("create:"),
        vec!["create:b1", "create:b2"]
    );
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_every_notification_is_counted() {
    let h = start_online(test_config());
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    wait_until(|| h.metrics.completed().len() == 1).await;
    h.registry.remove(&entity);
    wait_until(|| h.metrics.completed().len() == 2).await;

    let received = h
        .metrics
        .all()
        .into_iter()
        .filter(|m| matches!(m, addrsync_core::ports::SyncMetric::ChangeReceived { .. }))
        .count();
    assert_eq!(received, 2);
    assert_eq!(
        h.metrics.completed(),
        vec![
            (ChangeKind::Add, CloudResult::Success, 1),
            (ChangeKind::Remove, CloudResult::Success, 0)
        ]
    );
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_remove_of_unknown_book_while_gated_is_queued_once() {
    let h = start(test_config(), AuthState::Expired, NetworkStatus::Connected);
    let entity = book("b1");

    h.registry.remove(&entity);
    h.registry.remove(&entity);

    let pending = h.coordinator.pending_changes();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind(), ChangeKind::Remove);
    h.coordinator.shutdown().await;
}
