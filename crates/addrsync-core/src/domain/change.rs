//! Queued address book changes

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use chrono::{DateTime, Utc};

use super::entity::AddressBookEntity;

/// What happened to an address book locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Remove,
}

impl ChangeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Remove => "remove",
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending add or remove of one address book
///
/// Created when the registry announces a change, mutated only by the
/// synchronization worker (retry bookkeeping), and dropped once processed or
/// coalesced away.
#[derive(Debug, Clone)]
pub struct Change {
    kind: ChangeKind,
    entity: Arc<AddressBookEntity>,
    retry_count: u32,
    created_at: DateTime<Utc>,
}

impl Change {
    /// Create a change captured now
    pub fn new(kind: ChangeKind, entity: Arc<AddressBookEntity>) -> Self {
        Self {
            kind,
            entity,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn add(entity: Arc<AddressBookEntity>) -> Self {
        Self::new(ChangeKind::Add, entity)
    }

    pub fn remove(entity: Arc<AddressBookEntity>) -> Self {
        Self::new(ChangeKind::Remove, entity)
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub fn entity(&self) -> &Arc<AddressBookEntity> {
        &self.entity
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        self.entity.source_id()
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this change targets the same book with the same kind
    #[must_use]
    pub fn matches(&self, kind: ChangeKind, source_id: &str) -> bool {
        self.kind == kind && self.entity.source_id() == source_id
    }

    /// Record one more failed attempt
    pub fn record_failure(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Time elapsed since the change was captured
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or_default()
    }
}
