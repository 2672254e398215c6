//! Local photo store port (driven/secondary port)
//!
//! This module defines the interface for the on-device photo cache: a
//! directory of captured or downloaded photo files plus a durable queue of
//! files awaiting upload.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because store errors are adapter-specific.
//! - The pending queue survives process restarts. A path appears in it at
//!   most once, and only until its upload is confirmed.
//! - Capturing a photo for a logical name overwrites the previous file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::LogicalPhotoName;

/// An entry of the pending-upload queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpload {
    /// Absolute path of the photo awaiting upload
    pub path: PathBuf,
    /// When the photo was enqueued
    pub queued_at: DateTime<Utc>,
}

/// Port trait for the local photo store
#[async_trait::async_trait]
pub trait IPhotoStore: Send + Sync {
    /// Directory holding the photo files
    fn root(&self) -> &Path;

    /// Lists every photo file in the store, sorted by path
    async fn list_all(&self) -> anyhow::Result<Vec<PathBuf>>;

    /// Lists the pending-upload queue in enqueue order
    async fn list_pending(&self) -> anyhow::Result<Vec<PendingUpload>>;

    /// Finds the local file for a logical name
    ///
    /// When both extensions exist, the jpg file wins.
    async fn find(&self, name: &LogicalPhotoName) -> anyhow::Result<Option<PathBuf>>;

    /// Saves a captured photo as `<name>.jpg` and enqueues it for upload
    async fn save_capture(&self, name: &LogicalPhotoName, data: &[u8])
        -> anyhow::Result<PathBuf>;

    /// Writes downloaded bytes under `file_name`; not enqueued
    async fn write_download(&self, file_name: &str, data: &[u8]) -> anyhow::Result<PathBuf>;

    /// Removes a path from the pending queue after a confirmed upload
    async fn mark_uploaded(&self, path: &Path) -> anyhow::Result<()>;

    /// Deletes a photo file and drops it from the pending queue
    async fn delete(&self, path: &Path) -> anyhow::Result<()>;
}
