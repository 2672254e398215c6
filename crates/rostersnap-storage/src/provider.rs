//! SupabaseBucket - IRemoteBucket implementation for Supabase Storage
//!
//! Wraps the [`StorageClient`] to fulfil the [`IRemoteBucket`] port
//! contract.
//!
//! ## Design Notes
//!
//! - Construction goes through [`StorageConfig::credentials`], so a bucket
//!   without a URL or API key can never be built and no request is sent.
//! - [`ObjectAccess`] selects between the public and authenticated
//!   download endpoints; the fallback order is decided by the sync engine.

use async_trait::async_trait;
use tracing::debug;

use rostersnap_core::config::StorageConfig;
use rostersnap_core::domain::errors::RemoteError;
use rostersnap_core::domain::photo::RemoteObjectRecord;
use rostersnap_core::ports::remote_bucket::{IRemoteBucket, ObjectAccess};

use crate::client::StorageClient;

/// Supabase Storage implementation of [`IRemoteBucket`]
#[derive(Debug, Clone)]
pub struct SupabaseBucket {
    client: StorageClient,
}

impl SupabaseBucket {
    /// Creates a bucket adapter from an existing client
    pub fn new(client: StorageClient) -> Self {
        Self { client }
    }

    /// Creates a bucket adapter from configuration
    ///
    /// # Errors
    /// Returns [`RemoteError::NotConfigured`] if the base URL or API key
    /// is missing.
    pub fn from_config(config: &StorageConfig) -> Result<Self, RemoteError> {
        let credentials = config.credentials()?;
        debug!(
            base_url = %credentials.base_url,
            bucket = %credentials.bucket,
            "Configured Supabase bucket"
        );
        Ok(Self::new(StorageClient::new(credentials)))
    }

    /// Returns the underlying client
    pub fn client(&self) -> &StorageClient {
        &self.client
    }
}

#[async_trait]
impl IRemoteBucket for SupabaseBucket {
    async fn list_objects(&self) -> Result<Vec<RemoteObjectRecord>, RemoteError> {
        self.client.list_objects().await
    }

    async fn upload_object(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RemoteError> {
        self.client.upload_object(name, data, content_type).await
    }

    async fn download_object(
        &self,
        name: &str,
        access: ObjectAccess,
    ) -> Result<Vec<u8>, RemoteError> {
        match access {
            ObjectAccess::Public => self.client.download_public(name).await,
            ObjectAccess::Authenticated => self.client.download_authenticated(name).await,
        }
    }
}
