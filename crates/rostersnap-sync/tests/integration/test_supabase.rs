//! End-to-end sync against a wiremock Supabase Storage server

use std::sync::Arc;
use std::time::Duration;

use rostersnap_core::config::StorageCredentials;
use rostersnap_core::domain::newtypes::LogicalPhotoName;
use rostersnap_core::ports::photo_store::IPhotoStore;
use rostersnap_storage::{StorageClient, SupabaseBucket};
use rostersnap_sync::rate_limit::RequestGate;
use rostersnap_sync::retry::RetryPolicy;
use rostersnap_sync::validator::ContentValidator;
use rostersnap_sync::{SyncEngine, SyncResult};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const BUCKET: &str = "player-photos";

fn engine(server: &MockServer, store: Arc<dyn IPhotoStore>) -> SyncEngine {
    let client = StorageClient::new(StorageCredentials {
        base_url: server.uri(),
        api_key: "anon".to_string(),
        bucket: BUCKET.to_string(),
        list_limit: 1000,
    });
    SyncEngine::new(
        Arc::new(SupabaseBucket::new(client)),
        store,
        Arc::new(RequestGate::new(Duration::from_millis(5))),
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
        ContentValidator::default(),
    )
}

#[tokio::test]
async fn test_full_sync_over_http() {
    let server = MockServer::start().await;
    let (_dir, store) = common::store().await;
    store
        .save_capture(&LogicalPhotoName::new("alice").unwrap(), &common::jpeg(2048))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{BUCKET}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "bob.png", "id": "b1"},
            {"name": "archive", "id": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/object/public/{BUCKET}/bob.png")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::png(3000)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/{BUCKET}/alice.jpg")))
        .and(header("x-upsert", "true"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Key": "player-photos/alice.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, store.clone());
    let result = engine.run_full_sync(None, None).await.unwrap();

    assert_eq!(
        result,
        SyncResult {
            downloaded: 1,
            uploaded: 1,
            skipped: 0,
            failed: 0
        }
    );
    assert!(store.root().join("bob.png").exists());
    assert!(store.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_html_from_public_url_falls_back_to_authenticated() {
    let server = MockServer::start().await;
    let (_dir, store) = common::store().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{BUCKET}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"name": "carol.jpg", "id": "c1"}])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/object/public/{BUCKET}/carol.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::error_page()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/object/{BUCKET}/carol.jpg")))
        .and(header("apikey", "anon"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::jpeg(4096)))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, store.clone());
    let summary = engine.download_missing(None, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    let data = tokio::fs::read(store.root().join("carol.jpg")).await.unwrap();
    assert_eq!(data.len(), 4096);
}

#[tokio::test]
async fn test_server_errors_retried_then_listing_fails() {
    let server = MockServer::start().await;
    let (_dir, store) = common::store().await;

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{BUCKET}")))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let engine = engine(&server, store);
    let err = engine.download_missing(None, None).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to list remote objects: HTTP 503: Service Unavailable"
    );
}
