//! Integration tests for bucket listing

use rostersnap_core::domain::errors::RemoteError;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_list_returns_normalized_records() {
    let (server, client) = common::setup_storage_mock().await;

    common::mount_list(
        &server,
        serde_json::json!([
            {"name": "Alice.PNG", "id": "a1", "metadata": {"size": 4096}},
            {"name": "bob.jpg", "id": "b1", "metadata": {"size": 2048}},
            {"name": "carol.png"},
            {"name": "dave.jpg", "metadata": {"size": 2048}}
        ]),
    )
    .await;

    let records = client.list_objects().await.expect("list failed");
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].name, "Alice.PNG");
    assert_eq!(records[0].key, "alice.png");
    assert_eq!(records[1].key, "bob.jpg");
    // Entries without an id field are objects, not folders.
    assert_eq!(records[2].key, "carol.png");
    assert_eq!(records[3].key, "dave.jpg");
}

#[tokio::test]
async fn test_list_sends_expected_body() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{}", common::BUCKET)))
        .and(body_json(serde_json::json!({
            "prefix": "",
            "limit": 1000,
            "offset": 0,
            "sortBy": {"column": "name", "order": "asc"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client.list_objects().await.expect("list failed");
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_list_skips_folders_and_placeholders() {
    let (server, client) = common::setup_storage_mock().await;

    common::mount_list(
        &server,
        serde_json::json!([
            {"name": "2023", "id": null, "metadata": null},
            {"name": ".emptyFolderPlaceholder", "id": "p1"},
            {"name": "carol.jpg", "id": "c1"}
        ]),
    )
    .await;

    let records = client.list_objects().await.expect("list failed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "carol.jpg");
}

#[tokio::test]
async fn test_list_error_carries_status_and_message() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{}", common::BUCKET)))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "statusCode": "403",
            "error": "Unauthorized",
            "message": "new row violates row-level security policy"
        })))
        .mount(&server)
        .await;

    let err = client.list_objects().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("row-level security"));
}

#[tokio::test]
async fn test_list_server_error_is_transient() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{}", common::BUCKET)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.list_objects().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_list_malformed_body_is_invalid_response() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{}", common::BUCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_objects().await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let (server, client) = common::setup_storage_mock().await;
    drop(server);

    let err = client.list_objects().await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
    assert!(err.is_transient());
}
