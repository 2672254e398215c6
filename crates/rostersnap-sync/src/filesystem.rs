//! Local photo store adapter (secondary/driven adapter)
//!
//! Implements [`IPhotoStore`] on a plain directory using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Layout**: photos are `<root>/<name>.<ext>`; only `jpg`, `jpeg` and
//!   `png` files count as photos. Hidden files are ignored.
//! - **Pending queue**: `<root>/.pending-uploads.json`, an ordered JSON list
//!   of `{path, queued_at}` entries, unique by path.
//! - **Atomic writes**: photos and the queue are written to a temp file and
//!   renamed over the target, so a crash never leaves a torn file.
//! - Queue read-modify-write cycles are serialized by an async mutex.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use rostersnap_core::domain::newtypes::LogicalPhotoName;
use rostersnap_core::domain::photo::{LocalPhotoRecord, PhotoExtension};
use rostersnap_core::ports::photo_store::{IPhotoStore, PendingUpload};

/// File name of the durable pending-upload queue inside the store root
pub const PENDING_QUEUE_FILE: &str = ".pending-uploads.json";

// ============================================================================
// LocalPhotoStore
// ============================================================================

/// Directory-backed photo store with a durable pending-upload queue
#[derive(Debug)]
pub struct LocalPhotoStore {
    root: PathBuf,
    queue_lock: Mutex<()>,
}

impl LocalPhotoStore {
    /// Creates a store rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue_lock: Mutex::new(()),
        }
    }

    /// Creates a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root)
            .await
            .with_context(|| format!("Failed to create photo directory {}", store.root.display()))?;
        Ok(store)
    }

    /// Path of the pending-upload queue file
    pub fn queue_path(&self) -> PathBuf {
        self.root.join(PENDING_QUEUE_FILE)
    }

    /// Every photo as a record, with its pending flag resolved
    pub async fn records(&self) -> Result<Vec<LocalPhotoRecord>> {
        let pending: HashSet<PathBuf> = self
            .list_pending()
            .await?
            .into_iter()
            .map(|entry| entry.path)
            .collect();

        Ok(self
            .list_all()
            .await?
            .iter()
            .filter_map(|path| LocalPhotoRecord::from_path(path, pending.contains(path)))
            .collect())
    }

    async fn read_queue(&self) -> Result<Vec<PendingUpload>> {
        let path = self.queue_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Corrupt pending-upload queue {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn write_queue(&self, entries: &[PendingUpload]) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        write_atomic(&self.queue_path(), &data).await
    }

    async fn enqueue(&self, path: &Path) -> Result<()> {
        let _guard = self.queue_lock.lock().await;
        let mut entries = self.read_queue().await?;
        if entries.iter().any(|entry| entry.path == path) {
            debug!(path = %path.display(), "Already pending");
            return Ok(());
        }
        entries.push(PendingUpload {
            path: path.to_path_buf(),
            queued_at: Utc::now(),
        });
        self.write_queue(&entries).await
    }

    async fn dequeue(&self, path: &Path) -> Result<bool> {
        let _guard = self.queue_lock.lock().await;
        let mut entries = self.read_queue().await?;
        let before = entries.len();
        entries.retain(|entry| entry.path != path);
        if entries.len() == before {
            return Ok(false);
        }
        self.write_queue(&entries).await?;
        Ok(true)
    }

    /// Resolves a bare file name inside the root, refusing anything that
    /// would escape it
    fn photo_path(&self, file_name: &str) -> Result<PathBuf> {
        let candidate = Path::new(file_name);
        match candidate.file_name().and_then(|n| n.to_str()) {
            Some(name) if name == file_name && !name.starts_with('.') => {
                Ok(self.root.join(name))
            }
            _ => bail!("Invalid photo file name: {file_name:?}"),
        }
    }
}

// ============================================================================
// IPhotoStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IPhotoStore for LocalPhotoStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn list_all(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list {}", self.root.display()))
            }
        };

        let mut photos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || PhotoExtension::from_file_name(&name).is_none() {
                continue;
            }
            if entry.file_type().await?.is_file() {
                photos.push(entry.path());
            }
        }
        photos.sort();
        Ok(photos)
    }

    async fn list_pending(&self) -> Result<Vec<PendingUpload>> {
        let _guard = self.queue_lock.lock().await;
        self.read_queue().await
    }

    async fn find(&self, name: &LogicalPhotoName) -> Result<Option<PathBuf>> {
        let best = self
            .list_all()
            .await?
            .into_iter()
            .filter_map(|path| {
                let record = LocalPhotoRecord::from_path(&path, false)?;
                let ext = PhotoExtension::from_file_name(&record.file_name)?;
                (record.match_key() == name.as_str()).then_some((ext.rank(), path))
            })
            .min();
        Ok(best.map(|(_, path)| path))
    }

    #[instrument(skip(self, data), fields(name = %name, bytes = data.len()))]
    async fn save_capture(&self, name: &LogicalPhotoName, data: &[u8]) -> Result<PathBuf> {
        let target = self.root.join(name.file_name(PhotoExtension::Jpg));

        // One file per logical name: drop any other extension first.
        for existing in self.list_all().await? {
            let same_name = LocalPhotoRecord::from_path(&existing, false)
                .and_then(|record| record.logical_name())
                .is_some_and(|n| &n == name);
            if same_name && existing != target {
                debug!(replaced = %existing.display(), "Replacing previous photo");
                self.delete(&existing).await?;
            }
        }

        write_atomic(&target, data).await?;
        self.enqueue(&target).await?;
        debug!(path = %target.display(), "Captured photo queued for upload");
        Ok(target)
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn write_download(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let target = self.photo_path(file_name)?;
        write_atomic(&target, data).await?;
        Ok(target)
    }

    async fn mark_uploaded(&self, path: &Path) -> Result<()> {
        if !self.dequeue(path).await? {
            warn!(path = %path.display(), "Marked uploaded but was not pending");
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()))
            }
        }
        self.dequeue(path).await?;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Writes `data` to `target` via a sibling temp file and rename
async fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, target)
        .await
        .with_context(|| format!("Failed to move {} into place", tmp_path.display()))?;
    Ok(())
}
