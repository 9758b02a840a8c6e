//! Integration tests for entry batch uploads

use addrsync_core::{
    domain::{CloudAddressBookId, EntriesDocument, Entry, EntryAddress, EntryName, PhoneNumber},
    ports::{CloudResult, ICloudAgent},
};
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

fn entries_path(id: &str) -> String {
    format!("{}/{id}/entries", common::address_books_path())
}

fn document() -> EntriesDocument {
    let mut entry = Entry::new("001");
    entry.data.name = Some(EntryName::from_parts("Ada", "Lovelace", ""));
    entry
        .data
        .addresses
        .push(EntryAddress::PhoneNumber(PhoneNumber::new("MOBILE", "555-0100")));
    EntriesDocument::new(vec![entry, Entry::new("002")])
}

#[tokio::test]
async fn test_upload_posts_document_and_reports_partial_failures() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(entries_path("ab-1")))
        .and(body_json(serde_json::json!({
            "entries": [
                {
                    "entrySourceId": "001",
                    "data": {
                        "name": { "firstName": "Ada", "lastName": "Lovelace" },
                        "addresses": [
                            { "addressType": "phonenumber", "rawType": "MOBILE", "value": "555-0100" }
                        ]
                    }
                },
                { "entrySourceId": "002", "data": {} }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "references": [
                { "entryId": "e-1", "entrySourceId": "001", "status": "SUCCESS", "reason": null },
                { "entryId": "e-2", "entrySourceId": "002", "status": "FAILURE", "reason": "no data" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let response = agent
        .upload_document_to_cloud(&document(), &id)
        .await
        .expect("upload completes");

    assert_eq!(
        agent.http_response_code_to_result(&response),
        CloudResult::Success
    );
    let failed = agent
        .parse_create_address_book_entry_response(&response)
        .expect("response parses");
    assert_eq!(failed, vec!["002".to_string()]);
}

#[tokio::test]
async fn test_upload_server_error_is_returned_as_response() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(entries_path("ab-1")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let response = agent
        .upload_document_to_cloud(&document(), &id)
        .await
        .expect("HTTP errors are responses, not transport failures");

    assert_eq!(response.status, 503);
    assert_eq!(
        agent.http_response_code_to_result(&response),
        CloudResult::ServerError
    );
}

#[tokio::test]
async fn test_upload_retries_transient_server_error() {
    let server = MockServer::start().await;
    common::mount_provisioned_account(&server).await;
    let agent = common::agent_with_retries(&server, 1);

    Mock::given(method("POST"))
        .and(path(entries_path("ab-1")))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(entries_path("ab-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "references": [
                { "entryId": "e-1", "entrySourceId": "001", "status": "SUCCESS" }
            ]
        })))
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let response = agent
        .upload_document_to_cloud(&document(), &id)
        .await
        .expect("upload completes");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_success_without_references_is_parse_failure() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(entries_path("ab-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let response = agent
        .upload_document_to_cloud(&document(), &id)
        .await
        .expect("upload completes");

    let err = agent
        .parse_create_address_book_entry_response(&response)
        .unwrap_err();
    assert_eq!(err.result(), CloudResult::ParseFailed);
}

#[tokio::test]
async fn test_upload_to_unreachable_server_is_network_error() {
    let server = MockServer::start().await;
    common::mount_provisioned_account(&server).await;
    let agent = common::agent_with_retries(&server, 0);

    // Resolve identity while the server is still up
    assert!(agent.is_account_provisioned().await);
    drop(server);

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let err = agent
        .upload_document_to_cloud(&document(), &id)
        .await
        .unwrap_err();
    assert_eq!(err.result(), CloudResult::NetworkError);
    assert!(err.is_retryable());
}
