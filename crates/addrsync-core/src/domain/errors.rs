//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Address book source id is empty or malformed
    #[error("Invalid source id: {0}")]
    InvalidSourceId(String),

    /// Cloud address book id is empty or malformed
    #[error("Invalid cloud address book id: {0}")]
    InvalidCloudAddressBookId(String),

    /// The cloud reported an address book type this engine does not manage
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
