//! Address book registry port (driving/primary port)
//!
//! The platform registry owns the local address books. It announces
//! additions and removals to observers and hands out entries on demand
//! through an [`IAddressBookEntriesFactory`] supplied by the caller.

use std::sync::Arc;

use crate::domain::{AddressBookEntity, PostalAddress};

/// Receives address book lifecycle notifications
pub trait IAddressBookObserver: Send + Sync {
    fn address_book_added(&self, entity: Arc<AddressBookEntity>);

    fn address_book_removed(&self, entity: Arc<AddressBookEntity>);
}

/// Sink for the entries of one address book
///
/// Each call returns `false` when the value is rejected (limits exceeded,
/// unsupported address type, duplicate name); the entry is left unchanged.
pub trait IAddressBookEntriesFactory {
    /// Set a single display name as the entry's first name
    fn add_name(&mut self, entry_id: &str, name: &str) -> bool;

    fn add_name_parts(
        &mut self,
        entry_id: &str,
        first_name: &str,
        last_name: &str,
        nick_name: &str,
    ) -> bool;

    fn add_phone(&mut self, entry_id: &str, label: &str, number: &str) -> bool;

    fn add_postal_address(&mut self, entry_id: &str, label: &str, address: &PostalAddress)
        -> bool;
}

/// Source of truth for locally available address books
pub trait IAddressBookRegistry: Send + Sync {
    fn add_observer(&self, observer: Arc<dyn IAddressBookObserver>);

    fn remove_observer(&self, observer: &Arc<dyn IAddressBookObserver>);

    /// Feed every entry of `source_id` into `factory`.
    ///
    /// Returns `false` if the book could not be read completely.
    fn get_entries(&self, source_id: &str, factory: &mut dyn IAddressBookEntriesFactory) -> bool;
}
