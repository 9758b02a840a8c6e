//! Entries document model
//!
//! The JSON body uploaded to the cloud for one batch of address book entries:
//!
//! ```json
//! { "entries": [ { "entrySourceId": "001",
//!                  "data": { "name": { "firstName": "Ada" },
//!                            "addresses": [ { "addressType": "phonenumber",
//!                                             "rawType": "HOME", "value": "555" } ] } } ] }
//! ```
//!
//! Empty strings are never serialized; optional fields are omitted instead.

use serde::{Deserialize, Serialize};

use super::entity::AddressType;

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// Registry-side input
// ============================================================================

/// Postal address as offered by the platform registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostalAddress {
    pub address_line1: String,
    pub address_line2: String,
    pub address_line3: String,
    pub city: String,
    pub state_or_region: String,
    pub district_or_county: String,
    pub postal_code: String,
    pub country_code: String,
    pub latitude_in_degrees: f64,
    pub longitude_in_degrees: f64,
    /// Zero when unknown
    pub accuracy_in_meters: f64,
}

impl PostalAddress {
    /// Combined character count of all textual fields
    #[must_use]
    pub fn total_characters(&self) -> usize {
        [
            &self.address_line1,
            &self.address_line2,
            &self.address_line3,
            &self.city,
            &self.state_or_region,
            &self.district_or_county,
            &self.postal_code,
            &self.country_code,
        ]
        .iter()
        .map(|field| field.chars().count())
        .sum()
    }
}

// ============================================================================
// Wire model
// ============================================================================

/// One upload batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntriesDocument {
    pub entries: Vec<Entry>,
}

impl EntriesDocument {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split entries into documents of at most `batch_size` entries each,
    /// preserving order. A zero batch size is treated as one.
    pub fn batches(entries: Vec<Entry>, batch_size: usize) -> Vec<EntriesDocument> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(entries.len().div_ceil(batch_size));
        let mut current = Vec::with_capacity(batch_size.min(entries.len()));

        for entry in entries {
            current.push(entry);
            if current.len() == batch_size {
                batches.push(EntriesDocument::new(std::mem::take(&mut current)));
            }
        }
        if !current.is_empty() {
            batches.push(EntriesDocument::new(current));
        }

        batches
    }
}

/// A single contact or navigation favorite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub entry_source_id: String,
    pub data: EntryData,
}

impl Entry {
    pub fn new(entry_source_id: impl Into<String>) -> Self {
        Self {
            entry_source_id: entry_source_id.into(),
            data: EntryData::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<EntryName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<EntryAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
}

impl EntryName {
    pub fn from_parts(first_name: &str, last_name: &str, nick_name: &str) -> Self {
        Self {
            first_name: non_empty(first_name),
            last_name: non_empty(last_name),
            nick_name: non_empty(nick_name),
        }
    }
}

/// Address attached to an entry, tagged by `addressType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "addressType")]
pub enum EntryAddress {
    #[serde(rename = "phonenumber")]
    PhoneNumber(PhoneNumber),
    #[serde(rename = "postaladdress")]
    PostalAddress(PostalAddressEntry),
}

impl EntryAddress {
    #[must_use]
    pub fn address_type(&self) -> AddressType {
        match self {
            EntryAddress::PhoneNumber(_) => AddressType::PhoneNumber,
            EntryAddress::PostalAddress(_) => AddressType::PostalAddress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PhoneNumber {
    pub fn new(label: &str, number: &str) -> Self {
        Self {
            raw_type: non_empty(label),
            value: non_empty(number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddressEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<String>,
    pub postal_address: PostalAddressValue,
}

impl PostalAddressEntry {
    pub fn new(label: &str, address: &PostalAddress) -> Self {
        Self {
            raw_type: non_empty(label),
            postal_address: PostalAddressValue {
                address_line1: non_empty(&address.address_line1),
                address_line2: non_empty(&address.address_line2),
                address_line3: non_empty(&address.address_line3),
                city: non_empty(&address.city),
                state_or_region: non_empty(&address.state_or_region),
                district_or_county: non_empty(&address.district_or_county),
                postal_code: non_empty(&address.postal_code),
                country_code: non_empty(&address.country_code),
                coordinate: Coordinate {
                    latitude_in_degrees: address.latitude_in_degrees,
                    longitude_in_degrees: address.longitude_in_degrees,
                    accuracy_in_meters: (address.accuracy_in_meters > 0.0)
                        .then_some(address.accuracy_in_meters),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddressValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_or_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_or_county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude_in_degrees: f64,
    pub longitude_in_degrees: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_in_meters: Option<f64>,
}
