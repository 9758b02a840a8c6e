//! Entry upload and response parsing
//!
//! `POST /users/{pceId}/addressbooks/{addressBookId}/entries` accepts one
//! [`EntriesDocument`] and answers with a per-entry status list:
//!
//! ```json
//! { "references": [ { "entryId": "e1", "entrySourceId": "001",
//!                     "status": "SUCCESS", "reason": null } ] }
//! ```
//!
//! A batch can succeed at the HTTP level while individual entries carry
//! `"status": "FAILURE"`; those are reported back, never retried.

use addrsync_core::{
    domain::{CloudAddressBookId, EntriesDocument},
    ports::HttpResponse,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{client::CloudClient, CloudError};

const FAILED_ENTRY_REASON: &str = "Failed to Upload";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEntriesResponse {
    #[serde(default)]
    references: Vec<EntryReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryReference {
    #[serde(default)]
    entry_source_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailedEntriesReport<'a> {
    failed_contact: Vec<FailedEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct FailedEntry<'a> {
    id: &'a str,
    reason: &'a str,
}

/// POST one batch of entries, returning the raw response
pub async fn upload(
    client: &CloudClient,
    pce_id: &str,
    id: &CloudAddressBookId,
    document: &EntriesDocument,
) -> Result<HttpResponse, CloudError> {
    let path = format!("/users/{pce_id}/addressbooks/{}/entries", id.as_str());
    let body =
        serde_json::to_value(document).map_err(|e| CloudError::InvalidResponse(e.to_string()))?;

    debug!(cloud_id = %id, entries = document.len(), "Uploading entries batch");
    client.send(Method::POST, &path, &[], Some(&body)).await
}

/// Source ids of entries the service rejected
///
/// A body without a non-empty `references` array is a parse failure.
pub fn parse_failed_entries(response: &HttpResponse) -> Result<Vec<String>, CloudError> {
    let parsed: CreateEntriesResponse = serde_json::from_str(&response.body)
        .map_err(|e| CloudError::InvalidResponse(e.to_string()))?;

    if parsed.references.is_empty() {
        return Err(CloudError::InvalidResponse(
            "references not found".to_string(),
        ));
    }

    Ok(parsed
        .references
        .into_iter()
        .filter(|reference| reference.status == "FAILURE")
        .map(|reference| {
            debug!(
                entry_source_id = %reference.entry_source_id,
                reason = reference.reason.as_deref().unwrap_or("unspecified"),
                "Entry rejected by cloud"
            );
            reference.entry_source_id
        })
        .collect())
}

/// Diagnostic payload: `{"failedContact":[{"id":..,"reason":"Failed to Upload"}]}`
pub fn build_failed_entries_json(failed_entries: &[String]) -> String {
    let report = FailedEntriesReport {
        failed_contact: failed_entries
            .iter()
            .map(|id| FailedEntry {
                id,
                reason: FAILED_ENTRY_REASON,
            })
            .collect(),
    };
    serde_json::to_string(&report).unwrap_or_default()
}
