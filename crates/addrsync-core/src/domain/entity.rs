//! Address book entity and content types
//!
//! An [`AddressBookEntity`] is the local description of one address book as
//! announced by the platform registry. It is immutable after construction and
//! shared (`Arc`) between the registry, queued changes, and the coordinator's
//! map of books known to exist in the cloud.

use std::{
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// ContentType
// ============================================================================

/// Kind of entries an address book holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Phone contacts
    Contact,
    /// Navigation favorites (postal addresses)
    NavigationFavorite,
}

impl ContentType {
    /// Every content type managed by the engine
    pub const ALL: [ContentType; 2] = [ContentType::Contact, ContentType::NavigationFavorite];

    /// Stable name used by the cloud API for this address book type
    #[must_use]
    pub fn cloud_type_name(&self) -> &'static str {
        match self {
            ContentType::Contact => "automotive",
            ContentType::NavigationFavorite => "automotivePostalAddress",
        }
    }

    /// Parse the cloud API's address book type name
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownContentType`] for any type the engine
    /// does not manage.
    pub fn from_cloud_type_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "automotive" => Ok(ContentType::Contact),
            "automotivePostalAddress" => Ok(ContentType::NavigationFavorite),
            other => Err(DomainError::UnknownContentType(other.to_string())),
        }
    }

    /// Short label used in logs and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Contact => "contact",
            ContentType::NavigationFavorite => "navigation",
        }
    }

    /// Whether entries of this book may carry the given address type
    #[must_use]
    pub fn supports(&self, address_type: AddressType) -> bool {
        matches!(
            (self, address_type),
            (ContentType::Contact, AddressType::PhoneNumber)
                | (ContentType::NavigationFavorite, AddressType::PostalAddress)
        )
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cloud_type_name(s)
    }
}

// ============================================================================
// AddressType
// ============================================================================

/// Kind of address attached to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    PhoneNumber,
    PostalAddress,
}

impl AddressType {
    /// Name used in the `addressType` field of uploaded entries
    #[must_use]
    pub fn cloud_name(&self) -> &'static str {
        match self {
            AddressType::PhoneNumber => "phonenumber",
            AddressType::PostalAddress => "postaladdress",
        }
    }
}

// ============================================================================
// AddressBookEntity
// ============================================================================

/// A locally sourced address book
///
/// Identity is the `source_id`: two entities with the same source id are
/// equal regardless of name or content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressBookEntity {
    source_id: String,
    name: String,
    content_type: ContentType,
}

impl AddressBookEntity {
    /// Create a new entity
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidSourceId`] if `source_id` is empty.
    pub fn new(
        source_id: impl Into<String>,
        name: impl Into<String>,
        content_type: ContentType,
    ) -> Result<Self, DomainError> {
        let source_id = source_id.into();
        if source_id.trim().is_empty() {
            return Err(DomainError::InvalidSourceId(
                "source id cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            source_id,
            name: name.into(),
            content_type,
        })
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

impl PartialEq for AddressBookEntity {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id
    }
}

impl Eq for AddressBookEntity {}

impl Hash for AddressBookEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_id.hash(state);
    }
}
