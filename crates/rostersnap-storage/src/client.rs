//! Supabase Storage client
//!
//! Provides a typed HTTP client for the Supabase Storage object API.
//! Handles the `apikey`/bearer headers, endpoint construction, object-name
//! encoding, and mapping of non-success responses to [`RemoteError`].
//!
//! Every method performs exactly one HTTP request; throttling and retries
//! belong to the caller.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rostersnap_core::config::Config;
//! use rostersnap_storage::client::StorageClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default(&Config::default_path());
//! let client = StorageClient::new(config.storage.credentials()?);
//! for object in client.list_objects().await? {
//!     println!("{}", object.name);
//! }
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rostersnap_core::config::StorageCredentials;
use rostersnap_core::domain::errors::RemoteError;
use rostersnap_core::domain::photo::RemoteObjectRecord;

/// Placeholder object Supabase creates to materialize empty folders
const EMPTY_FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Longest error body kept in a [`RemoteError::Status`] message
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// Storage API wire types
// ============================================================================

/// Body of `POST /storage/v1/object/list/{bucket}`
#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    #[serde(rename = "sortBy")]
    sort_by: SortBy<'a>,
}

#[derive(Debug, Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

/// One entry of the list response
///
/// Folders come back with an explicit `id: null`. An entry without an `id`
/// field at all is still an object.
#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(default, deserialize_with = "present")]
    id: Option<Option<String>>,
}

impl ListEntry {
    fn is_folder(&self) -> bool {
        matches!(self.id, Some(None))
    }
}

/// Marks a field that appeared in the body, so `null` and absent differ
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Error body returned by the storage API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// ============================================================================
// StorageClient
// ============================================================================

/// HTTP client for one Supabase Storage bucket
///
/// Only constructible from [`StorageCredentials`], so an instance always
/// has a base URL and API key.
#[derive(Debug, Clone)]
pub struct StorageClient {
    /// The underlying HTTP client
    client: Client,
    /// Project base URL, without trailing slash
    base_url: String,
    /// API key, sent as `apikey` and as the bearer token
    api_key: String,
    /// Bucket name
    bucket: String,
    /// `limit` sent with listing requests
    list_limit: u32,
}

impl StorageClient {
    /// Creates a client for the bucket described by `credentials`
    pub fn new(credentials: StorageCredentials) -> Self {
        Self::with_http_client(Client::new(), credentials)
    }

    /// Creates a client that reuses an existing `reqwest::Client`
    pub fn with_http_client(client: Client, credentials: StorageCredentials) -> Self {
        Self {
            client,
            base_url: credentials.base_url,
            api_key: credentials.api_key,
            bucket: credentials.bucket,
            list_limit: credentials.list_limit,
        }
    }

    /// Bucket this client talks to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------------
    // URL construction
    // ------------------------------------------------------------------------

    /// `{base}/storage/v1/object/list/{bucket}`
    pub fn list_url(&self) -> String {
        format!(
            "{}/storage/v1/object/list/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        )
    }

    /// `{base}/storage/v1/object/{bucket}/{name}`, used for upload and
    /// authenticated download
    pub fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_name(name)
        )
    }

    /// `{base}/storage/v1/object/public/{bucket}/{name}`
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_name(name)
        )
    }

    /// Creates a request builder carrying the `apikey` and bearer headers
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Lists the bucket's objects, dropping folders and folder placeholders
    ///
    /// A single request of at most `list_limit` entries; no pagination.
    pub async fn list_objects(&self) -> Result<Vec<RemoteObjectRecord>, RemoteError> {
        let url = self.list_url();
        debug!(bucket = %self.bucket, limit = self.list_limit, "Listing bucket objects");

        let body = ListRequest {
            prefix: "",
            limit: self.list_limit,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let response = check_status(response).await?;

        let entries: Vec<ListEntry> = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("list response: {e}")))?;

        let records = object_records(entries);
        debug!(bucket = %self.bucket, count = records.len(), "Listed bucket objects");
        Ok(records)
    }

    /// Uploads `data` as `name` with upsert semantics
    pub async fn upload_object(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RemoteError> {
        let url = self.object_url(name);
        debug!(object = name, size = data.len(), content_type, "Uploading object");

        let response = self
            .request(Method::POST, &url)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;

        debug!(object = name, "Uploaded object");
        Ok(())
    }

    /// Downloads an object through its public URL, without auth headers
    pub async fn download_public(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.public_url(name);
        let request = self.client.request(Method::GET, &url);
        self.download(name, request, "public").await
    }

    /// Downloads an object through its authenticated URL
    pub async fn download_authenticated(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.object_url(name);
        let request = self.request(Method::GET, &url);
        self.download(name, request, "authenticated").await
    }

    async fn download(
        &self,
        name: &str,
        request: RequestBuilder,
        access: &str,
    ) -> Result<Vec<u8>, RemoteError> {
        debug!(object = name, access, "Downloading object");

        let response = request.send().await.map_err(send_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(send_error)?;

        debug!(object = name, access, size = bytes.len(), "Downloaded object");
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Percent-encodes each path segment of an object name, keeping `/`
fn encode_object_name(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Converts list entries to records, dropping folders and placeholders
fn object_records(entries: Vec<ListEntry>) -> Vec<RemoteObjectRecord> {
    entries
        .into_iter()
        .filter(|entry| !entry.is_folder())
        .filter(|entry| {
            let name = entry.name.trim();
            !name.is_empty() && !name.ends_with(EMPTY_FOLDER_PLACEHOLDER)
        })
        .map(|entry| RemoteObjectRecord::new(entry.name))
        .collect()
}

fn send_error(err: reqwest::Error) -> RemoteError {
    RemoteError::Network(err.to_string())
}

/// Passes 2xx responses through; converts anything else to
/// [`RemoteError::Status`]
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let body = body.trim();

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("empty response body")
            .to_string(),
        _ => body.to_string(),
    };

    RemoteError::Status {
        status: status.as_u16(),
        message: message.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}
