//! Entries collector
//!
//! [`EntriesCollector`] is the [`IAddressBookEntriesFactory`] the worker hands
//! to the registry. It checks every value against the upload limits before
//! accepting it, and keeps entries in the order the registry first mentions
//! them.

use std::collections::HashMap;

use addrsync_core::{
    config::UploadConfig,
    domain::{
        AddressType, ContentType, Entry, EntryAddress, EntryName, PhoneNumber, PostalAddress,
        PostalAddressEntry,
    },
    ports::IAddressBookEntriesFactory,
};
use tracing::debug;

/// Size limits applied to collected entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLimits {
    pub max_entry_id_length: usize,
    pub max_field_characters: usize,
    pub max_addresses_per_entry: usize,
}

impl From<&UploadConfig> for EntryLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_entry_id_length: config.max_entry_id_length,
            max_field_characters: config.max_field_characters,
            max_addresses_per_entry: config.max_addresses_per_entry,
        }
    }
}

impl Default for EntryLimits {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

/// Collects the entries of one address book
#[derive(Debug)]
pub struct EntriesCollector {
    content_type: ContentType,
    limits: EntryLimits,
    entries: Vec<Entry>,
    /// entry source id -> position in `entries`
    index: HashMap<String, usize>,
    rejected: usize,
}

impl EntriesCollector {
    pub fn new(content_type: ContentType, limits: EntryLimits) -> Self {
        Self {
            content_type,
            limits,
            entries: Vec::new(),
            index: HashMap::new(),
            rejected: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of values refused so far
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    fn reject(&mut self, entry_id: &str, reason: &str) -> bool {
        self.rejected += 1;
        debug!(entry_id, reason, content_type = %self.content_type, "Entry value rejected");
        false
    }

    fn valid_entry_id(&self, entry_id: &str) -> bool {
        !entry_id.is_empty() && entry_id.chars().count() <= self.limits.max_entry_id_length
    }

    fn entry_mut(&mut self, entry_id: &str) -> &mut Entry {
        let position = match self.index.get(entry_id) {
            Some(&position) => position,
            None => {
                self.entries.push(Entry::new(entry_id));
                let position = self.entries.len() - 1;
                self.index.insert(entry_id.to_string(), position);
                position
            }
        };
        &mut self.entries[position]
    }

    fn has_name(&self, entry_id: &str) -> bool {
        self.index
            .get(entry_id)
            .is_some_and(|&position| self.entries[position].data.name.is_some())
    }

    fn address_count(&self, entry_id: &str) -> usize {
        self.index
            .get(entry_id)
            .map_or(0, |&position| self.entries[position].data.addresses.len())
    }

    fn set_name(&mut self, entry_id: &str, name: EntryName) -> bool {
        if self.has_name(entry_id) {
            return self.reject(entry_id, "name already set");
        }
        self.entry_mut(entry_id).data.name = Some(name);
        true
    }

    /// Shared checks for any address; `true` when it may be appended
    fn accepts_address(&mut self, entry_id: &str, address_type: AddressType) -> bool {
        if !self.valid_entry_id(entry_id) {
            return self.reject(entry_id, "invalid entry id");
        }
        if !self.content_type.supports(address_type) {
            return self.reject(entry_id, "address type not supported by book");
        }
        if self.address_count(entry_id) >= self.limits.max_addresses_per_entry {
            return self.reject(entry_id, "too many addresses");
        }
        true
    }
}

impl IAddressBookEntriesFactory for EntriesCollector {
    fn add_name(&mut self, entry_id: &str, name: &str) -> bool {
        if !self.valid_entry_id(entry_id) {
            return self.reject(entry_id, "invalid entry id");
        }
        if name.chars().count() > self.limits.max_field_characters {
            return self.reject(entry_id, "name too long");
        }
        self.set_name(entry_id, EntryName::from_parts(name, "", ""))
    }

    fn add_name_parts(
        &mut self,
        entry_id: &str,
        first_name: &str,
        last_name: &str,
        nick_name: &str,
    ) -> bool {
        if !self.valid_entry_id(entry_id) {
            return self.reject(entry_id, "invalid entry id");
        }

        let max = self.limits.max_field_characters;
        let lengths = [first_name, last_name, nick_name].map(|part| part.chars().count());
        if lengths.iter().any(|&length| length > max) || lengths.iter().sum::<usize>() > max {
            return self.reject(entry_id, "name too long");
        }

        self.set_name(
            entry_id,
            EntryName::from_parts(first_name, last_name, nick_name),
        )
    }

    fn add_phone(&mut self, entry_id: &str, label: &str, number: &str) -> bool {
        if !self.accepts_address(entry_id, AddressType::PhoneNumber) {
            return false;
        }
        self.entry_mut(entry_id)
            .data
            .addresses
            .push(EntryAddress::PhoneNumber(PhoneNumber::new(label, number)));
        true
    }

    fn add_postal_address(
        &mut self,
        entry_id: &str,
        label: &str,
        address: &PostalAddress,
    ) -> bool {
        if !self.accepts_address(entry_id, AddressType::PostalAddress) {
            return false;
        }
        if address.total_characters() > self.limits.max_field_characters {
            return self.reject(entry_id, "postal address too long");
        }
        if !(-90.0..=90.0).contains(&address.latitude_in_degrees) {
            return self.reject(entry_id, "latitude out of range");
        }
        if !(-180.0..=180.0).contains(&address.longitude_in_degrees) {
            return self.reject(entry_id, "longitude out of range");
        }
        if address.accuracy_in_meters.is_nan() || address.accuracy_in_meters < 0.0 {
            return self.reject(entry_id, "negative accuracy");
        }

        self.entry_mut(entry_id)
            .data
            .addresses
            .push(EntryAddress::PostalAddress(PostalAddressEntry::new(
                label, address,
            )));
        true
    }
}
