//! Remote bucket port (driven/secondary port)
//!
//! This module defines the interface for the remote object store that
//! holds the player photos. The primary implementation targets Supabase
//! Storage over HTTP.
//!
//! ## Design Notes
//!
//! - Unlike the photo store port, errors are a typed [`RemoteError`] so the
//!   retry policy can classify them without inspecting message text.
//! - Each method performs exactly one request. Rate limiting and retries
//!   are applied by the caller, not by implementations.

use crate::domain::errors::RemoteError;
use crate::domain::photo::RemoteObjectRecord;

/// Which endpoint a download is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAccess {
    /// Unauthenticated public object URL
    Public,
    /// Authenticated object URL (API key headers)
    Authenticated,
}

impl ObjectAccess {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Authenticated => "authenticated",
        }
    }
}

/// Port trait for remote bucket operations
#[async_trait::async_trait]
pub trait IRemoteBucket: Send + Sync {
    /// Lists the objects currently present in the bucket
    ///
    /// Every record carries its normalized comparison key.
    async fn list_objects(&self) -> Result<Vec<RemoteObjectRecord>, RemoteError>;

    /// Uploads an object, overwriting any existing object of the same name
    ///
    /// # Arguments
    /// * `name` - Object name (unencoded)
    /// * `data` - Object bytes
    /// * `content_type` - MIME type of the bytes
    async fn upload_object(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RemoteError>;

    /// Downloads an object's bytes through the given endpoint
    async fn download_object(
        &self,
        name: &str,
        access: ObjectAccess,
    ) -> Result<Vec<u8>, RemoteError>;
}
