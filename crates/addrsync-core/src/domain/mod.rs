//! Domain entities
//!
//! This module contains the core domain types for addrsync:
//! - Address book entities and their content types
//! - Queued changes (add/remove) with retry bookkeeping
//! - The entries document uploaded to the cloud
//! - Newtypes for cloud-side identifiers
//! - Domain-specific error types

pub mod change;
pub mod entity;
pub mod entries;
pub mod errors;
pub mod newtypes;

pub use change::{Change, ChangeKind};
pub use entity::{AddressBookEntity, AddressType, ContentType};
pub use entries::{
    Coordinate, EntriesDocument, Entry, EntryAddress, EntryData, EntryName, PhoneNumber,
    PostalAddress, PostalAddressEntry, PostalAddressValue,
};
pub use errors::DomainError;
pub use newtypes::CloudAddressBookId;
