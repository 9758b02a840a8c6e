//! Cloud address book operations
//!
//! All paths are scoped by the account's `pceId`:
//! - `POST   /users/{pceId}/addressbooks` - create
//! - `GET    /users/{pceId}/addressbooks?addressBookSourceIds={id}` - look up
//! - `GET    /users/{pceId}/addressbooks` - list
//! - `DELETE /users/{pceId}/addressbooks/{addressBookId}` - delete

use addrsync_core::{
    domain::{CloudAddressBookId, ContentType},
    ports::CloudAddressBook,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    client::{ensure_success, parse_json, CloudClient},
    CloudError,
};

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    address_book_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressBooksResponse {
    address_books: Vec<AddressBookResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressBookResponse {
    address_book_id: String,
    #[serde(default)]
    address_book_type: String,
    #[serde(default)]
    address_book_source_id: String,
    #[serde(default)]
    address_book_name: String,
}

impl AddressBookResponse {
    fn into_cloud_address_book(self) -> Result<CloudAddressBook, CloudError> {
        Ok(CloudAddressBook {
            id: CloudAddressBookId::new(self.address_book_id)?,
            content_type: ContentType::from_cloud_type_name(&self.address_book_type).ok(),
            source_id: self.address_book_source_id,
            name: self.address_book_name,
        })
    }
}

fn address_books_path(pce_id: &str) -> String {
    format!("/users/{pce_id}/addressbooks")
}

// ============================================================================
// Operations
// ============================================================================

/// Result of a create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(CloudAddressBookId),
    /// The service already holds a book with this source id and type
    AlreadyExists,
}

/// Create an address book
pub async fn create(
    client: &CloudClient,
    pce_id: &str,
    source_id: &str,
    content_type: ContentType,
    name: &str,
) -> Result<CreateOutcome, CloudError> {
    let body = json!({
        "addressBookSourceId": source_id,
        "addressBookName": name,
        "addressBookType": content_type.cloud_type_name(),
    });
    let response = client
        .send(Method::POST, &address_books_path(pce_id), &[], Some(&body))
        .await?;

    if response.status == 409 {
        debug!(source_id, "Cloud address book already exists");
        return Ok(CreateOutcome::AlreadyExists);
    }
    ensure_success(&response)?;

    let created: CreateResponse = parse_json(&response)?;
    let id = created
        .address_book_id
        .ok_or_else(|| CloudError::InvalidResponse("addressBookId not present".to_string()))?;

    let id = CloudAddressBookId::new(id)?;
    info!(source_id, cloud_id = %id, "Created cloud address book");
    Ok(CreateOutcome::Created(id))
}

/// Find the cloud book of the given type registered under `source_id`
pub async fn find(
    client: &CloudClient,
    pce_id: &str,
    source_id: &str,
    content_type: ContentType,
) -> Result<Option<CloudAddressBookId>, CloudError> {
    let response: AddressBooksResponse = client
        .get_json(
            &address_books_path(pce_id),
            &[("addressBookSourceIds", source_id)],
        )
        .await?;

    let wanted = content_type.cloud_type_name();
    response
        .address_books
        .into_iter()
        .find(|book| book.address_book_type == wanted)
        .map(|book| CloudAddressBookId::new(book.address_book_id))
        .transpose()
        .map_err(CloudError::from)
}

/// List every address book of the account
pub async fn list(client: &CloudClient, pce_id: &str) -> Result<Vec<CloudAddressBook>, CloudError> {
    let response: AddressBooksResponse = client.get_json(&address_books_path(pce_id), &[]).await?;

    response
        .address_books
        .into_iter()
        .map(AddressBookResponse::into_cloud_address_book)
        .collect()
}

/// Delete an address book; a 404 means it is already gone
pub async fn delete(
    client: &CloudClient,
    pce_id: &str,
    id: &CloudAddressBookId,
) -> Result<(), CloudError> {
    let path = format!("{}/{}", address_books_path(pce_id), id.as_str());
    let response = client.send(Method::DELETE, &path, &[], None).await?;

    match response.status {
        200 | 202 | 204 => {
            info!(cloud_id = %id, "Deleted cloud address book");
            Ok(())
        }
        404 => {
            debug!(cloud_id = %id, "Cloud address book already absent");
            Ok(())
        }
        status => Err(CloudError::Http {
            status,
            body: response.body,
        }),
    }
}
