//! Shared test helpers for Supabase Storage integration tests
//!
//! Provides wiremock-based mock server setup for the storage endpoints.
//! Each helper mounts the necessary mock endpoints on a server returned by
//! [`setup_storage_mock`].

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rostersnap_core::config::StorageCredentials;
use rostersnap_storage::client::StorageClient;

pub const BUCKET: &str = "player-photos";
pub const API_KEY: &str = "test-anon-key";

/// Starts a mock server and returns a (MockServer, StorageClient) tuple
/// pointing at it.
pub async fn setup_storage_mock() -> (MockServer, StorageClient) {
    let server = MockServer::start().await;
    let client = StorageClient::new(StorageCredentials {
        base_url: server.uri(),
        api_key: API_KEY.to_string(),
        bucket: BUCKET.to_string(),
        list_limit: 1000,
    });
    (server, client)
}

/// Mounts the list endpoint returning `entries`, requiring auth headers.
pub async fn mount_list(server: &MockServer, entries: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/list/{BUCKET}")))
        .and(header("apikey", API_KEY))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(server)
        .await;
}

/// Mounts the public download endpoint for one object.
pub async fn mount_public_download(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/object/public/{BUCKET}/{name}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

/// Mounts the authenticated download endpoint for one object.
pub async fn mount_authenticated_download(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/object/{BUCKET}/{name}")))
        .and(header("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Mounts the upload endpoint for one object, requiring the upsert header.
pub async fn mount_upload(server: &MockServer, encoded_name: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/{BUCKET}/{encoded_name}")))
        .and(header("x-upsert", "true"))
        .and(header("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Key": format!("{BUCKET}/{encoded_name}")
        })))
        .mount(server)
        .await;
}

/// Bytes that look like a JPEG
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len, 0xAB);
    data
}
