//! Pending-change queue
//!
//! A double-ended queue of [`Change`]s with the coalescing rules applied at
//! enqueue time:
//!
//! - at most one pending ADD per source id
//! - a REMOVE arriving while an ADD for the same book is still pending
//!   cancels that ADD
//! - a failed change goes back to the front unless newer work for the same
//!   book has been queued meanwhile

use std::{collections::VecDeque, sync::Arc};

use addrsync_core::domain::{AddressBookEntity, Change, ChangeKind};

/// What an enqueue call did to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new change was appended
    Queued,
    /// An equivalent change is already pending; nothing changed
    AlreadyPending,
    /// A pending ADD was dropped and no REMOVE is needed
    CancelledPendingAdd,
    /// A pending ADD was dropped and a REMOVE was appended because the book
    /// already exists in the cloud
    ReplacedPendingAdd,
}

/// FIFO of pending changes, retried changes first
#[derive(Debug, Default)]
pub struct ChangeQueue {
    changes: VecDeque<Change>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Whether a change of `kind` for `source_id` is pending
    pub fn contains(&self, kind: ChangeKind, source_id: &str) -> bool {
        self.changes
            .iter()
            .any(|change| change.matches(kind, source_id))
    }

    /// Queue an ADD unless one is already pending for this book
    pub fn enqueue_add(&mut self, entity: Arc<AddressBookEntity>) -> Enqueued {
        if self.contains(ChangeKind::Add, entity.source_id()) {
            return Enqueued::AlreadyPending;
        }
        self.changes.push_back(Change::add(entity));
        Enqueued::Queued
    }

    /// Queue a REMOVE, coalescing with a pending ADD for the same book
    ///
    /// `in_cloud` tells whether the book is known to exist in the cloud from
    /// an earlier upload; cancelling the pending ADD is then not enough.
    pub fn enqueue_remove(&mut self, entity: Arc<AddressBookEntity>, in_cloud: bool) -> Enqueued {
        let source_id = entity.source_id();

        if self.remove(ChangeKind::Add, source_id).is_some() {
            if !in_cloud {
                return Enqueued::CancelledPendingAdd;
            }
            if !self.contains(ChangeKind::Remove, source_id) {
                self.changes.push_back(Change::remove(entity));
            }
            return Enqueued::ReplacedPendingAdd;
        }

        if self.contains(ChangeKind::Remove, source_id) {
            return Enqueued::AlreadyPending;
        }
        self.changes.push_back(Change::remove(entity));
        Enqueued::Queued
    }

    /// Put a failed change back at the front for retry.
    ///
    /// Returns `false` (and drops the change) when a REMOVE for the book is
    /// pending, or, for a failed ADD, when a newer ADD is pending.
    pub fn requeue_failed(&mut self, change: Change) -> bool {
        let source_id = change.source_id();
        let superseded = self.contains(ChangeKind::Remove, source_id)
            || (change.kind() == ChangeKind::Add && self.contains(ChangeKind::Add, source_id));

        if superseded {
            return false;
        }
        self.changes.push_front(change);
        true
    }

    pub fn pop_front(&mut self) -> Option<Change> {
        self.changes.pop_front()
    }

    /// Remove the first pending change of `kind` for `source_id`
    pub fn remove(&mut self, kind: ChangeKind, source_id: &str) -> Option<Change> {
        let index = self
            .changes
            .iter()
            .position(|change| change.matches(kind, source_id))?;
        self.changes.remove(index)
    }

    /// Drop every pending change, returning how many there were
    pub fn clear(&mut self) -> usize {
        let dropped = self.changes.len();
        self.changes.clear();
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }
}
