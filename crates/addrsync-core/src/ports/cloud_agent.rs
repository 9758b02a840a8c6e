//! Cloud agent port (driven/secondary port)
//!
//! Defines the interface the synchronization coordinator uses to talk to the
//! address book cloud service. The REST implementation lives in
//! `addrsync-cloud`.
//!
//! ## Design Notes
//!
//! - Every network failure surfaces as a [`CloudAgentError`] carrying a
//!   [`CloudResult`] classification; the coordinator's retry decision is made
//!   from that classification alone.
//! - `upload_document_to_cloud` returns the raw [`HttpResponse`] on any HTTP
//!   outcome so the coordinator can run its own parse/classify step.

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CloudAddressBookId, ContentType, EntriesDocument};

// ============================================================================
// HttpResponse
// ============================================================================

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

// ============================================================================
// CloudResult
// ============================================================================

/// Classification of a cloud operation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudResult {
    Success,
    AccountNotProvisioned,
    CreateFailed,
    DeleteFailed,
    ParseFailed,
    MissingContent,
    UnhandledRedirect,
    BadRequest,
    Forbidden,
    /// No bearer token was available locally; the request was never sent
    AuthUnavailable,
    Throttled,
    ServerError,
    /// The request never produced an HTTP response
    NetworkError,
    Unknown,
}

impl CloudResult {
    /// Map an HTTP status code to its classification
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200 | 201 => CloudResult::Success,
            204 => CloudResult::MissingContent,
            300..=399 => CloudResult::UnhandledRedirect,
            401 | 403 => CloudResult::Forbidden,
            429 => CloudResult::Throttled,
            400..=499 => CloudResult::BadRequest,
            500..=599 => CloudResult::ServerError,
            _ => CloudResult::Unknown,
        }
    }

    /// Whether the failed operation may succeed if attempted again unchanged
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CloudResult::Throttled
                | CloudResult::ServerError
                | CloudResult::NetworkError
                | CloudResult::AuthUnavailable
                | CloudResult::AccountNotProvisioned
                | CloudResult::CreateFailed
                | CloudResult::DeleteFailed
        )
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        *self == CloudResult::Success
    }

    /// Label used in logs and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudResult::Success => "success",
            CloudResult::AccountNotProvisioned => "account_not_provisioned",
            CloudResult::CreateFailed => "create_failed",
            CloudResult::DeleteFailed => "delete_failed",
            CloudResult::ParseFailed => "parse_failed",
            CloudResult::MissingContent => "missing_content",
            CloudResult::UnhandledRedirect => "unhandled_redirect",
            CloudResult::BadRequest => "bad_request",
            CloudResult::Forbidden => "forbidden",
            CloudResult::AuthUnavailable => "auth_unavailable",
            CloudResult::Throttled => "throttled",
            CloudResult::ServerError => "server_error",
            CloudResult::NetworkError => "network_error",
            CloudResult::Unknown => "unknown",
        }
    }
}

impl Display for CloudResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CloudAgentError
// ============================================================================

/// A failed cloud operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{result}: {message}")]
pub struct CloudAgentError {
    result: CloudResult,
    message: String,
}

impl CloudAgentError {
    pub fn new(result: CloudResult, message: impl Into<String>) -> Self {
        Self {
            result,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn result(&self) -> CloudResult {
        self.result
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.result.is_retryable()
    }
}

// ============================================================================
// CloudAddressBook
// ============================================================================

/// A cloud-side address book as listed by the service
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAddressBook {
    pub id: CloudAddressBookId,
    pub source_id: String,
    pub name: String,
    /// `None` for address book types this engine does not manage
    pub content_type: Option<ContentType>,
}

// ============================================================================
// ICloudAgent trait
// ============================================================================

/// Cloud address book service
///
/// Only the coordinator's worker calls into the agent, one operation at a
/// time. Implementations may cache account identity internally; `reset`
/// discards that cache.
#[async_trait]
pub trait ICloudAgent: Send + Sync {
    /// Whether the signed-in account can use the address book service.
    /// Fails closed: any transport or parse error yields `false`.
    async fn is_account_provisioned(&self) -> bool;

    /// Ask the service to provision the signed-in account
    async fn auto_provision_account(&self) -> Result<(), CloudAgentError>;

    /// Create the cloud book for `source_id`, or return the existing one
    async fn create_and_get_cloud_address_book(
        &self,
        source_id: &str,
        content_type: ContentType,
    ) -> Result<CloudAddressBookId, CloudAgentError>;

    /// Look up the cloud book for `source_id` without creating it
    async fn get_cloud_address_book_id(
        &self,
        source_id: &str,
        content_type: ContentType,
    ) -> Result<Option<CloudAddressBookId>, CloudAgentError>;

    /// All address books of the signed-in account
    async fn list_cloud_address_books(&self) -> Result<Vec<CloudAddressBook>, CloudAgentError>;

    /// Delete a cloud book; an already-absent book counts as deleted
    async fn delete_cloud_address_book(&self, id: &CloudAddressBookId)
        -> Result<(), CloudAgentError>;

    /// POST one batch of entries. Any HTTP response is `Ok`; `Err` means the
    /// request did not complete.
    async fn upload_document_to_cloud(
        &self,
        document: &EntriesDocument,
        id: &CloudAddressBookId,
    ) -> Result<HttpResponse, CloudAgentError>;

    /// Source ids of entries the service rejected individually
    fn parse_create_address_book_entry_response(
        &self,
        response: &HttpResponse,
    ) -> Result<Vec<String>, CloudAgentError>;

    /// Diagnostic payload describing rejected entries
    fn build_failed_entries_json(&self, failed_entries: &[String]) -> String;

    fn http_response_code_to_result(&self, response: &HttpResponse) -> CloudResult {
        CloudResult::from_http_status(response.status)
    }

    /// Forget cached account identity
    fn reset(&self);
}
