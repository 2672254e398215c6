//! Photo synchronization engine
//!
//! The [`SyncEngine`] reconciles the local photo store against the remote
//! bucket. It owns no persistent state: the store owns the files and the
//! pending-upload queue, the bucket owns the remote objects, and a crash
//! mid-run is recovered by simply running again.
//!
//! ## Sync Flow
//!
//! 1. **Download** (fill local gaps): list the bucket, diff against the
//!    local photos by match key, fetch what is missing, validate it.
//! 2. **Upload** (push local state): send every queued capture with upsert
//!    semantics and dequeue it once confirmed.
//!
//! Both phases walk `Idle → Listing → Diffing → Transferring → Reporting
//! → Idle`. Items are processed one at a time; every remote call goes
//! through the shared [`RequestGate`] and the [`RetryPolicy`].
//!
//! ## Download fallbacks
//!
//! - Roster filter matched nothing but the bucket is not empty: every
//!   remote photo becomes a candidate (naming mismatch, over-fetch).
//! - Bucket listing is empty but a roster was given: each expected name is
//!   requested directly, jpg then png ([`DownloadPlan::DirectFetch`]).
//! - Each object is fetched from the public URL first and from the
//!   authenticated URL if that fails or its content is rejected.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use rostersnap_core::config::Config;
use rostersnap_core::domain::errors::RemoteError;
use rostersnap_core::domain::newtypes::LogicalPhotoName;
use rostersnap_core::domain::photo::{LocalPhotoRecord, PhotoExtension, RemoteObjectRecord};
use rostersnap_core::ports::photo_store::IPhotoStore;
use rostersnap_core::ports::remote_bucket::{IRemoteBucket, ObjectAccess};

use crate::rate_limit::RequestGate;
use crate::retry::{with_retry, RetryPolicy};
use crate::validator::{ContentValidator, RejectReason};
use crate::SyncError;

/// Progress callback, invoked with messages like `"Uploading 2/5"`
pub type Progress<'a> = &'a (dyn Fn(&str) + Send + Sync);

// ============================================================================
// Phase state
// ============================================================================

/// Observable state of a sync invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Listing,
    Diffing,
    Transferring,
    Reporting,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listing => "listing",
            Self::Diffing => "diffing",
            Self::Transferring => "transferring",
            Self::Reporting => "reporting",
        }
    }
}

/// One of the two phases of a full sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Download,
    Upload,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// Returns the phase to `Idle` when an invocation ends, however it ends
struct PhaseReset<'a>(&'a Mutex<SyncPhase>);

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = SyncPhase::Idle;
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of [`SyncEngine::upload_pending`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub uploaded: u32,
    pub failed: u32,
}

/// Outcome of [`SyncEngine::download_missing`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub downloaded: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Merged outcome of a full sync; a report only, never persisted
///
/// Zero `failed` does not guarantee every expected photo exists: a roster
/// name absent from the bucket is neither downloaded nor failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub downloaded: u32,
    pub uploaded: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl SyncResult {
    /// Merges both phase summaries; failed counts add up
    pub fn from_phases(download: DownloadSummary, upload: UploadSummary) -> Self {
        Self {
            downloaded: download.downloaded,
            uploaded: upload.uploaded,
            skipped: download.skipped,
            failed: download.failed + upload.failed,
        }
    }
}

impl From<DownloadSummary> for SyncResult {
    fn from(download: DownloadSummary) -> Self {
        Self::from_phases(download, UploadSummary::default())
    }
}

impl From<UploadSummary> for SyncResult {
    fn from(upload: UploadSummary) -> Self {
        Self::from_phases(DownloadSummary::default(), upload)
    }
}

// ============================================================================
// Download planning
// ============================================================================

/// What the download phase will do, decided before any transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPlan {
    /// Fetch listed objects
    Listed {
        /// Candidates missing locally, grouped by name with jpg first
        to_fetch: Vec<RemoteObjectRecord>,
        /// Candidates already present locally
        skipped: u32,
        /// The roster filter matched nothing, so every remote photo became
        /// a candidate
        widened: bool,
    },
    /// The listing was empty: request each expected name directly
    DirectFetch {
        /// Expected names missing locally
        names: Vec<LogicalPhotoName>,
        /// Expected names already present locally
        skipped: u32,
    },
}

/// Computes the download plan from the remote listing, the match keys of
/// the local photos and the optional roster
///
/// Remote objects without a photo extension are never candidates.
pub fn plan_downloads(
    remote: &[RemoteObjectRecord],
    local_keys: &HashSet<String>,
    expected: Option<&[LogicalPhotoName]>,
) -> DownloadPlan {
    let expected = expected.filter(|names| !names.is_empty());

    if remote.is_empty() {
        return match expected {
            Some(names) => plan_direct_fetch(names, local_keys),
            None => DownloadPlan::Listed {
                to_fetch: Vec::new(),
                skipped: 0,
                widened: false,
            },
        };
    }

    let photos = remote.iter().filter(|record| record.logical_name().is_some());

    let mut widened = false;
    let mut candidates: Vec<RemoteObjectRecord> = match expected {
        Some(names) => {
            let wanted: HashSet<&LogicalPhotoName> = names.iter().collect();
            let matched: Vec<RemoteObjectRecord> = photos
                .clone()
                .filter(|record| record.logical_name().is_some_and(|n| wanted.contains(&n)))
                .cloned()
                .collect();
            if matched.is_empty() {
                widened = true;
                photos.cloned().collect()
            } else {
                matched
            }
        }
        None => photos.cloned().collect(),
    };

    candidates.sort_by_key(|record| {
        (
            record.match_key(),
            record.extension().map_or(usize::MAX, |ext| ext.rank()),
        )
    });

    let (present, to_fetch): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|record| local_keys.contains(&record.match_key()));

    DownloadPlan::Listed {
        to_fetch,
        skipped: present.len() as u32,
        widened,
    }
}

fn plan_direct_fetch(names: &[LogicalPhotoName], local_keys: &HashSet<String>) -> DownloadPlan {
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    let mut skipped = 0;

    for name in names {
        if !seen.insert(name) {
            continue;
        }
        if local_keys.contains(name.as_str()) {
            skipped += 1;
        } else {
            missing.push(name.clone());
        }
    }

    DownloadPlan::DirectFetch {
        names: missing,
        skipped,
    }
}

// ============================================================================
// Fetch errors
// ============================================================================

/// Why a single object could not be committed locally
#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("content rejected: {0}")]
    Rejected(RejectReason),

    #[error("local store: {0:#}")]
    Store(anyhow::Error),
}

impl FetchError {
    fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Remote(err) if err.is_not_found())
    }

    fn is_rejected(&self) -> bool {
        matches!(self, FetchError::Rejected(_))
    }
}

fn list_error(err: RemoteError) -> SyncError {
    match err {
        RemoteError::NotConfigured(message) => SyncError::NotConfigured(message),
        RemoteError::Status { status, message } => SyncError::ListFailed {
            status: Some(status),
            message,
        },
        other => SyncError::ListFailed {
            status: None,
            message: other.to_string(),
        },
    }
}

fn report(on_progress: Option<Progress<'_>>, message: &str) {
    if let Some(callback) = on_progress {
        callback(message);
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Bi-directional photo synchronization engine
///
/// ## Dependencies
///
/// - `bucket`: remote object operations (list, upload, download)
/// - `store`: local photo files and the pending-upload queue
/// - `gate`: shared request spacing, possibly used by other engines
/// - `retry`: backoff policy wrapped around every remote call
/// - `validator`: content sniffing for downloads
pub struct SyncEngine {
    bucket: Arc<dyn IRemoteBucket>,
    store: Arc<dyn IPhotoStore>,
    gate: Arc<RequestGate>,
    retry: RetryPolicy,
    validator: ContentValidator,
    phase: Mutex<SyncPhase>,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` with the given collaborators
    pub fn new(
        bucket: Arc<dyn IRemoteBucket>,
        store: Arc<dyn IPhotoStore>,
        gate: Arc<RequestGate>,
        retry: RetryPolicy,
        validator: ContentValidator,
    ) -> Self {
        Self {
            bucket,
            store,
            gate,
            retry,
            validator,
            phase: Mutex::new(SyncPhase::Idle),
        }
    }

    /// Creates an engine with gate, retry and validator settings from
    /// `config`
    ///
    /// # Errors
    /// Returns [`SyncError::NotConfigured`] if the storage URL or API key is
    /// missing, before any request is made.
    pub fn from_config(
        config: &Config,
        bucket: Arc<dyn IRemoteBucket>,
        store: Arc<dyn IPhotoStore>,
    ) -> Result<Self, SyncError> {
        config.storage.credentials().map_err(list_error)?;

        Ok(Self::new(
            bucket,
            store,
            Arc::new(RequestGate::new(config.sync.rate_limit())),
            RetryPolicy::from_config(&config.sync),
            ContentValidator::from_config(&config.validation),
        ))
    }

    /// Current phase of the running invocation, `Idle` between runs
    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    fn set_phase(&self, phase: SyncPhase) {
        let mut current = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = current.as_str(), to = phase.as_str(), "Sync phase");
        *current = phase;
    }

    /// Runs one remote call through the gate, retrying transient failures
    async fn call_remote<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, RemoteError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        with_retry(&self.retry, label, || {
            let attempt = operation();
            self.gate.schedule(move || attempt)
        })
        .await
    }

    // ========================================================================
    // Full sync
    // ========================================================================

    /// Runs the download phase, then the upload phase
    ///
    /// The phases are independent: a failing phase does not stop the other.
    ///
    /// # Errors
    /// Returns [`SyncError::PhaseFailed`] carrying the other phase's counts
    /// if exactly one phase fails. If both fail, the download failure is
    /// returned and the upload failure is logged.
    #[tracing::instrument(skip_all)]
    pub async fn run_full_sync(
        &self,
        on_progress: Option<Progress<'_>>,
        expected: Option<&[LogicalPhotoName]>,
    ) -> Result<SyncResult, SyncError> {
        let download = self.download_missing(on_progress, expected).await;
        let upload = self.upload_pending(on_progress).await;

        match (download, upload) {
            (Ok(download), Ok(upload)) => {
                let result = SyncResult::from_phases(download, upload);
                info!(
                    downloaded = result.downloaded,
                    uploaded = result.uploaded,
                    skipped = result.skipped,
                    failed = result.failed,
                    "Sync complete"
                );
                Ok(result)
            }
            (Err(err), Ok(upload)) => Err(SyncError::PhaseFailed {
                phase: TransferDirection::Download,
                partial: upload.into(),
                source: Box::new(err),
            }),
            (Ok(download), Err(err)) => Err(SyncError::PhaseFailed {
                phase: TransferDirection::Upload,
                partial: download.into(),
                source: Box::new(err),
            }),
            (Err(download_err), Err(upload_err)) => {
                warn!(error = %upload_err, "Upload phase also failed");
                Err(SyncError::PhaseFailed {
                    phase: TransferDirection::Download,
                    partial: SyncResult::default(),
                    source: Box::new(download_err),
                })
            }
        }
    }

    // ========================================================================
    // Upload path
    // ========================================================================

    /// Uploads every queued photo, in queue order
    ///
    /// Only queued files are candidates, so files uploaded in an earlier
    /// run are never sent again. A failed item stays queued for the next
    /// run and does not stop the batch.
    #[tracing::instrument(skip_all)]
    pub async fn upload_pending(
        &self,
        on_progress: Option<Progress<'_>>,
    ) -> Result<UploadSummary, SyncError> {
        let _reset = PhaseReset(&self.phase);
        let mut summary = UploadSummary::default();

        self.set_phase(SyncPhase::Listing);
        let pending = self
            .store
            .list_pending()
            .await
            .map_err(SyncError::LocalStore)?;

        // The queue already is the diff.
        self.set_phase(SyncPhase::Diffing);
        debug!(pending = pending.len(), "Pending uploads");

        self.set_phase(SyncPhase::Transferring);
        let total = pending.len();
        for (index, entry) in pending.iter().enumerate() {
            report(on_progress, &format!("Uploading {}/{}", index + 1, total));
            match self.upload_one(&entry.path).await {
                Ok(()) => summary.uploaded += 1,
                Err(err) => {
                    let error = format!("{err:#}");
                    warn!(path = %entry.path.display(), %error, "Upload failed");
                    summary.failed += 1;
                }
            }
        }

        self.set_phase(SyncPhase::Reporting);
        info!(
            uploaded = summary.uploaded,
            failed = summary.failed,
            "Upload phase complete"
        );
        Ok(summary)
    }

    async fn upload_one(&self, path: &Path) -> anyhow::Result<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Pending path has no file name: {}", path.display()))?;
        let content_type = PhotoExtension::from_file_name(file_name)
            .map_or("application/octet-stream", |ext| ext.content_type());

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        self.call_remote(&format!("upload {file_name}"), || {
            self.bucket.upload_object(file_name, &data, content_type)
        })
        .await?;

        // Upsert makes a repeat upload harmless if dequeueing fails.
        if let Err(err) = self.store.mark_uploaded(path).await {
            let error = format!("{err:#}");
            warn!(path = %path.display(), %error, "Uploaded but still queued");
        }
        debug!(object = file_name, "Uploaded");
        Ok(())
    }

    // ========================================================================
    // Download path
    // ========================================================================

    /// Downloads remote photos that are missing locally
    ///
    /// `expected` restricts candidates to the given roster names. A local
    /// `x.jpg` satisfies a remote `x.png` and vice versa.
    ///
    /// # Errors
    /// Returns [`SyncError::ListFailed`] if the listing fails after retries
    /// and [`SyncError::LocalStore`] if local photos cannot be listed.
    /// Per-item failures are only counted.
    #[tracing::instrument(skip_all)]
    pub async fn download_missing(
        &self,
        on_progress: Option<Progress<'_>>,
        expected: Option<&[LogicalPhotoName]>,
    ) -> Result<DownloadSummary, SyncError> {
        let _reset = PhaseReset(&self.phase);

        self.set_phase(SyncPhase::Listing);
        let remote = self
            .call_remote("list", || self.bucket.list_objects())
            .await
            .map_err(list_error)?;
        let local = self.store.list_all().await.map_err(SyncError::LocalStore)?;

        self.set_phase(SyncPhase::Diffing);
        let local_keys: HashSet<String> = local
            .iter()
            .filter_map(|path| LocalPhotoRecord::from_path(path, false))
            .map(|record| record.match_key())
            .collect();
        let plan = plan_downloads(&remote, &local_keys, expected);
        debug!(remote = remote.len(), local = local_keys.len(), "Computed download plan");

        self.set_phase(SyncPhase::Transferring);
        let summary = match plan {
            DownloadPlan::Listed {
                to_fetch,
                skipped,
                widened,
            } => {
                if widened {
                    warn!(
                        remote = remote.len(),
                        "No remote object matched the expected names; considering all remote photos"
                    );
                }
                self.download_listed(&to_fetch, skipped, on_progress).await
            }
            DownloadPlan::DirectFetch { names, skipped } => {
                warn!(
                    expected = names.len() + skipped as usize,
                    "Remote listing is empty; requesting expected photos directly"
                );
                self.download_direct(&names, skipped, on_progress).await
            }
        };

        self.set_phase(SyncPhase::Reporting);
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Download phase complete"
        );
        Ok(summary)
    }

    async fn download_listed(
        &self,
        to_fetch: &[RemoteObjectRecord],
        skipped: u32,
        on_progress: Option<Progress<'_>>,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary {
            skipped,
            ..DownloadSummary::default()
        };
        let mut committed: HashSet<String> = HashSet::new();
        let total = to_fetch.len();

        for (index, record) in to_fetch.iter().enumerate() {
            report(on_progress, &format!("Downloading {}/{}", index + 1, total));

            let key = record.match_key();
            if committed.contains(&key) {
                debug!(object = %record.name, "Another extension already downloaded");
                summary.skipped += 1;
                continue;
            }

            match self.fetch_object(&record.name, &record.key).await {
                Ok(_) => {
                    summary.downloaded += 1;
                    committed.insert(key);
                }
                Err(err) => {
                    warn!(object = %record.name, error = %err, "Download failed");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    async fn download_direct(
        &self,
        names: &[LogicalPhotoName],
        skipped: u32,
        on_progress: Option<Progress<'_>>,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary {
            skipped,
            ..DownloadSummary::default()
        };
        let total = names.len();

        for (index, name) in names.iter().enumerate() {
            report(on_progress, &format!("Downloading {}/{}", index + 1, total));

            let mut failure = None;
            let mut fetched = false;
            for file_name in name.candidate_file_names() {
                match self.fetch_object(&file_name, &file_name).await {
                    Ok(_) => {
                        fetched = true;
                        break;
                    }
                    Err(err) if err.is_not_found() => {}
                    Err(err) => failure = Some(err),
                }
            }

            if fetched {
                summary.downloaded += 1;
            } else if let Some(err) = failure {
                warn!(name = %name, error = %err, "Direct download failed");
                summary.failed += 1;
            } else {
                debug!(name = %name, "No remote photo under any extension");
            }
        }

        summary
    }

    /// Fetches one object into the store, public URL first
    async fn fetch_object(&self, remote_name: &str, file_name: &str) -> Result<PathBuf, FetchError> {
        match self.fetch_via(remote_name, file_name, ObjectAccess::Public).await {
            Ok(path) => Ok(path),
            Err(FetchError::Store(err)) => Err(FetchError::Store(err)),
            Err(public_err) => {
                debug!(object = remote_name, error = %public_err, "Public fetch failed; trying authenticated");
                match self
                    .fetch_via(remote_name, file_name, ObjectAccess::Authenticated)
                    .await
                {
                    Ok(path) => Ok(path),
                    Err(FetchError::Store(err)) => Err(FetchError::Store(err)),
                    // Content was served and rejected: a later miss must not
                    // read as "absent remotely".
                    Err(auth_err) if public_err.is_rejected() => {
                        debug!(object = remote_name, error = %auth_err, "Authenticated fetch failed");
                        Err(public_err)
                    }
                    Err(auth_err) => Err(auth_err),
                }
            }
        }
    }

    /// Downloads through one endpoint, writes the file and validates it
    ///
    /// Bytes are checked before they reach the store; the written file is
    /// checked again and deleted if rejected.
    async fn fetch_via(
        &self,
        remote_name: &str,
        file_name: &str,
        access: ObjectAccess,
    ) -> Result<PathBuf, FetchError> {
        let label = format!("download {remote_name} ({})", access.as_str());
        let data = self
            .call_remote(&label, || self.bucket.download_object(remote_name, access))
            .await?;

        if let Err(reason) = self.validator.inspect_bytes(&data) {
            warn!(
                object = remote_name,
                access = access.as_str(),
                reason = %reason,
                "Downloaded content rejected"
            );
            return Err(FetchError::Rejected(reason));
        }

        let path = self
            .store
            .write_download(file_name, &data)
            .await
            .map_err(FetchError::Store)?;

        match self.validator.inspect(&path).await {
            Ok(()) => {
                debug!(object = remote_name, access = access.as_str(), "Downloaded");
                Ok(path)
            }
            Err(reason) => {
                warn!(
                    object = remote_name,
                    access = access.as_str(),
                    reason = %reason,
                    "Downloaded content rejected"
                );
                self.store.delete(&path).await.map_err(FetchError::Store)?;
                Err(FetchError::Rejected(reason))
            }
        }
    }
}
