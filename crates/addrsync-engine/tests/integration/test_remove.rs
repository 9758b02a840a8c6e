//! Removing address books from the cloud

use addrsync_core::{domain::ChangeKind, ports::CloudResult};

use crate::common::{book, parked_retry_config, start_online, test_config, wait_until};

#[tokio::test]
async fn test_remove_of_never_uploaded_book_sends_nothing() {
    let h = start_online(test_config());

    h.registry.remove(&book("b1"));
    wait_until(|| h.metrics.completed().len() == 1).await;

    assert!(h.agent.calls().is_empty());
    assert_eq!(
        h.metrics.completed(),
        vec![(ChangeKind::Remove, CloudResult::Success, 0)]
    );
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_remove_after_upload_deletes_cloud_book() {
    let h = start_online(test_config());
    let entity = h.registry.put_contacts("b1", 2);

    h.registry.add(&entity);
    wait_until(|| h.metrics.completed().len() == 1).await;
    assert_eq!(h.coordinator.known_books(), vec!["b1"]);

    h.registry.remove(&entity);
    wait_until(|| h.metrics.completed().len() == 2).await;

    assert_eq!(
        h.agent.calls_starting_with("delete:"),
        vec!["delete:ab-b1"]
    );
    assert!(h.coordinator.known_books().is_empty());
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_remove_of_book_already_gone_from_cloud() {
    let h = start_online(test_config());
    let entity = h.registry.put_contacts("b1", 1);

    h.registry.add(&entity);
    wait_until(|| h.metrics.completed().len() == 1).await;

    // Deleted by another client
    h.agent.drop_book("b1");
    h.registry.remove(&entity);
    wait_until(|| h.metrics.completed().len() == 2).await;

    assert_eq!(h.agent.calls().last().map(String::as_str), Some("lookup:b1"));
    assert!(h.agent.calls_starting_with("delete:").is_empty());
    assert!(h.coordinator.known_books().is_empty());
    h.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_failed_delete_is_requeued_at_front() {
    let h = start_online(parked_retry_config());
    let entity = h.registry.put_contacts("b1", 1);
    h.registry.add(&entity);
    wait_until(|| h.metrics.completed().len() == 1).await;

    h.agent.fail_next("delete", CloudResult::DeleteFailed);
    h.registry.remove(&entity);
    wait_until(|| !h.metrics.retried().is_empty()).await;

    assert_eq!(h.metrics.retried(), vec![(CloudResult::DeleteFailed, 1)]);
    let pending = h.coordinator.pending_changes();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind(), ChangeKind::Remove);
    assert_eq!(pending[0].retry_count(), 1);
    // Still in the cloud until a delete succeeds
    assert_eq!(h.coordinator.known_books(), vec!["b1"]);
    h.coordinator.shutdown().await;
}
