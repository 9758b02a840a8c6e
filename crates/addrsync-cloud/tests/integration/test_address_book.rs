//! Integration tests for cloud address book create, lookup, list and delete

use addrsync_core::{
    domain::{CloudAddressBookId, ContentType},
    ports::{CloudResult, ICloudAgent},
};
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::common;

fn books_body(books: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "addressBooks": books }))
}

#[tokio::test]
async fn test_create_returns_new_id() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(common::address_books_path()))
        .and(body_json(serde_json::json!({
            "addressBookSourceId": "book-1",
            "addressBookName": "AutoSDK",
            "addressBookType": "automotive"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "addressBookId": "ab-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = agent
        .create_and_get_cloud_address_book("book-1", ContentType::Contact)
        .await
        .expect("create succeeds");
    assert_eq!(id.as_str(), "ab-1");
}

#[tokio::test]
async fn test_create_twice_returns_same_id() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(common::address_books_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "addressBookId": "ab-1" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(common::address_books_path()))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(common::address_books_path()))
        .and(query_param("addressBookSourceIds", "book-1"))
        .respond_with(books_body(serde_json::json!([{
            "addressBookId": "ab-1",
            "addressBookType": "automotive",
            "addressBookSourceId": "book-1",
            "addressBookName": "AutoSDK"
        }])))
        .mount(&server)
        .await;

    let first = agent
        .create_and_get_cloud_address_book("book-1", ContentType::Contact)
        .await
        .expect("first create");
    let second = agent
        .create_and_get_cloud_address_book("book-1", ContentType::Contact)
        .await
        .expect("second create");

    assert_eq!(first, second);
    assert_eq!(second.as_str(), "ab-1");
}

#[tokio::test]
async fn test_create_bad_request_is_not_retryable() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(common::address_books_path()))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = agent
        .create_and_get_cloud_address_book("book-1", ContentType::Contact)
        .await
        .unwrap_err();
    assert_eq!(err.result(), CloudResult::BadRequest);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_create_without_id_in_body_is_create_failed() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("POST"))
        .and(path(common::address_books_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let err = agent
        .create_and_get_cloud_address_book("book-1", ContentType::Contact)
        .await
        .unwrap_err();
    assert_eq!(err.result(), CloudResult::CreateFailed);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_lookup_matches_content_type() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("GET"))
        .and(path(common::address_books_path()))
        .and(query_param("addressBookSourceIds", "book-1"))
        .respond_with(books_body(serde_json::json!([
            {
                "addressBookId": "ab-contacts",
                "addressBookType": "automotive",
                "addressBookSourceId": "book-1",
                "addressBookName": "AutoSDK"
            },
            {
                "addressBookId": "ab-places",
                "addressBookType": "automotivePostalAddress",
                "addressBookSourceId": "book-1",
                "addressBookName": "AutoSDK"
            }
        ])))
        .mount(&server)
        .await;

    let id = agent
        .get_cloud_address_book_id("book-1", ContentType::NavigationFavorite)
        .await
        .expect("lookup succeeds");
    assert_eq!(id.unwrap().as_str(), "ab-places");
}

#[tokio::test]
async fn test_lookup_absent_book_returns_none() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("GET"))
        .and(path(common::address_books_path()))
        .and(query_param("addressBookSourceIds", "book-9"))
        .respond_with(books_body(serde_json::json!([])))
        .mount(&server)
        .await;

    let id = agent
        .get_cloud_address_book_id("book-9", ContentType::Contact)
        .await
        .expect("lookup succeeds");
    assert!(id.is_none());
}

#[tokio::test]
async fn test_list_reports_managed_and_unmanaged_books() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("GET"))
        .and(path(common::address_books_path()))
        .respond_with(books_body(serde_json::json!([
            {
                "addressBookId": "ab-1",
                "addressBookType": "automotive",
                "addressBookSourceId": "book-1",
                "addressBookName": "AutoSDK"
            },
            {
                "addressBookId": "ab-2",
                "addressBookType": "phone",
                "addressBookSourceId": "sim",
                "addressBookName": "Phone"
            }
        ])))
        .mount(&server)
        .await;

    let books = agent.list_cloud_address_books().await.expect("list succeeds");
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].content_type, Some(ContentType::Contact));
    assert_eq!(books[0].source_id, "book-1");
    assert_eq!(books[1].content_type, None);
}

#[tokio::test]
async fn test_delete_absent_book_is_success() {
    let (server, agent) = common::setup_provisioned().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/ab-gone", common::address_books_path())))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-gone".to_string()).unwrap();
    agent
        .delete_cloud_address_book(&id)
        .await
        .expect("404 counts as deleted");
}

#[tokio::test]
async fn test_delete_server_error_is_retried_then_reported() {
    let server = wiremock::MockServer::start().await;
    common::mount_provisioned_account(&server).await;
    let agent = common::agent_with_retries(&server, 2);

    Mock::given(method("DELETE"))
        .and(path(format!("{}/ab-1", common::address_books_path())))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let id = CloudAddressBookId::new("ab-1".to_string()).unwrap();
    let err = agent.delete_cloud_address_book(&id).await.unwrap_err();
    assert_eq!(err.result(), CloudResult::ServerError);
    assert!(err.is_retryable());
}
