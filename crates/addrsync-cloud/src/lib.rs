//! addrsync Cloud - Address book cloud service client
//!
//! Provides the REST implementation of the `ICloudAgent` port:
//! - Account identity resolution and provisioning
//! - Create / look up / list / delete of cloud address books
//! - Entry batch upload with per-entry failure parsing
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with common headers and request-level retries
//! - [`account`] - Signed-in account and identity resolution
//! - [`address_book`] - Cloud address book CRUD
//! - [`entries`] - Entry upload and response parsing
//! - [`agent`] - [`agent::RestCloudAgent`], the port implementation

pub mod account;
pub mod address_book;
pub mod agent;
pub mod client;
pub mod entries;

use addrsync_core::{
    domain::DomainError,
    ports::{CloudAgentError, CloudResult},
};
use thiserror::Error;

pub use agent::RestCloudAgent;

/// Errors that can occur when communicating with the address book service
#[derive(Debug, Error)]
pub enum CloudError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No bearer token is available from the auth delegate
    #[error("No auth token available")]
    MissingToken,

    /// The signed-in account cannot use the address book service yet
    #[error("Account not provisioned: {0}")]
    AccountNotProvisioned(String),

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service returned a value the domain rejects
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CloudError {
    /// Classification used by the coordinator's retry policy
    pub fn classify(&self) -> CloudResult {
        match self {
            CloudError::Http { status, .. } => CloudResult::from_http_status(*status),
            CloudError::Network(_) => CloudResult::NetworkError,
            CloudError::MissingToken => CloudResult::AuthUnavailable,
            CloudError::AccountNotProvisioned(_) => CloudResult::AccountNotProvisioned,
            CloudError::InvalidResponse(_) | CloudError::Domain(_) => CloudResult::ParseFailed,
        }
    }

    /// Convert into a port error, labelling HTTP-less failures of a
    /// create/delete with the given fallback classification
    pub(crate) fn into_agent_error(self, fallback: CloudResult) -> CloudAgentError {
        let result = match &self {
            CloudError::Network(_) | CloudError::InvalidResponse(_) => fallback,
            _ => self.classify(),
        };
        CloudAgentError::new(result, self.to_string())
    }
}

impl From<CloudError> for CloudAgentError {
    fn from(err: CloudError) -> Self {
        CloudAgentError::new(err.classify(), err.to_string())
    }
}
