//! Validated newtypes for cloud-side identifiers

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Server-assigned identifier of a cloud address book
///
/// Opaque to the engine; re-resolved at the start of every upload cycle and
/// never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CloudAddressBookId(String);

impl CloudAddressBookId {
    /// Create a new CloudAddressBookId
    ///
    /// # Errors
    /// Returns error if the id is empty
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidCloudAddressBookId(
                "cloud address book id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CloudAddressBookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CloudAddressBookId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CloudAddressBookId> for String {
    fn from(id: CloudAddressBookId) -> Self {
        id.0
    }
}
