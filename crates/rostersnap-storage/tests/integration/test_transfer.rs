//! Integration tests for uploads and downloads
//!
//! Exercises both the raw client and the `IRemoteBucket` adapter.

use rostersnap_core::ports::remote_bucket::{IRemoteBucket, ObjectAccess};
use rostersnap_storage::SupabaseBucket;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

// ============================================================================
// Download tests
// ============================================================================

#[tokio::test]
async fn test_public_download_returns_content() {
    let (server, client) = common::setup_storage_mock().await;

    let content = common::jpeg_bytes(4096);
    common::mount_public_download(&server, "bob.png", &content).await;

    let data = client.download_public("bob.png").await.expect("download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_public_download_sends_no_credentials() {
    let (server, client) = common::setup_storage_mock().await;

    common::mount_public_download(&server, "bob.png", &common::jpeg_bytes(2048)).await;
    client.download_public("bob.png").await.expect("download failed");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("apikey").is_none());
}

#[tokio::test]
async fn test_authenticated_download_returns_content() {
    let (server, client) = common::setup_storage_mock().await;

    let content = common::jpeg_bytes(3000);
    common::mount_authenticated_download(&server, "alice.jpg", &content).await;

    let data = client
        .download_authenticated("alice.jpg")
        .await
        .expect("download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_not_found() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/storage/v1/object/public/{}/ghost.jpg",
            common::BUCKET
        )))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "statusCode": "404",
            "error": "not_found",
            "message": "Object not found"
        })))
        .mount(&server)
        .await;

    let err = client.download_public("ghost.jpg").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "HTTP 404: Object not found");
}

#[tokio::test]
async fn test_bucket_adapter_routes_access() {
    let (server, client) = common::setup_storage_mock().await;

    let public = common::jpeg_bytes(2048);
    let private = common::jpeg_bytes(4096);
    common::mount_public_download(&server, "dan.jpg", &public).await;
    common::mount_authenticated_download(&server, "dan.jpg", &private).await;

    let bucket = SupabaseBucket::new(client);
    let via_public = bucket
        .download_object("dan.jpg", ObjectAccess::Public)
        .await
        .unwrap();
    let via_auth = bucket
        .download_object("dan.jpg", ObjectAccess::Authenticated)
        .await
        .unwrap();

    assert_eq!(via_public.len(), 2048);
    assert_eq!(via_auth.len(), 4096);
}

// ============================================================================
// Upload tests
// ============================================================================

#[tokio::test]
async fn test_upload_sends_upsert_and_content_type() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/{}/janesmith.jpg", common::BUCKET)))
        .and(header("x-upsert", "true"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Key": "player-photos/janesmith.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = common::jpeg_bytes(1500);
    client
        .upload_object("janesmith.jpg", &data, "image/jpeg")
        .await
        .expect("upload failed");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests[0].body, data);
}

#[tokio::test]
async fn test_upload_encodes_object_name() {
    let (server, client) = common::setup_storage_mock().await;

    common::mount_upload(&server, "o%27brien%20sean.jpg").await;

    client
        .upload_object("o'brien sean.jpg", &common::jpeg_bytes(1200), "image/jpeg")
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_upload_unauthorized_is_permanent() {
    let (server, client) = common::setup_storage_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/{}/x.jpg", common::BUCKET)))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid JWT"))
        .mount(&server)
        .await;

    let err = client
        .upload_object("x.jpg", b"data", "image/jpeg")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_transient());
    assert_eq!(err.to_string(), "HTTP 401: invalid JWT");
}

#[tokio::test]
async fn test_bucket_adapter_upload() {
    let (server, client) = common::setup_storage_mock().await;

    common::mount_upload(&server, "erin.png").await;

    let bucket = SupabaseBucket::new(client);
    bucket
        .upload_object("erin.png", &common::jpeg_bytes(2000), "image/png")
        .await
        .expect("upload failed");
}
