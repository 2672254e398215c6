//! Rostersnap Sync - Photo synchronization engine
//!
//! Provides:
//! - Rate-limited, serialized access to the remote bucket
//! - Bounded exponential-backoff retry of transient failures
//! - Validation of downloaded image content
//! - A file-backed local photo store with a durable upload queue
//! - Bi-directional synchronization (download missing, upload pending)
//!
//! ## Modules
//!
//! - [`engine`] - Sync engine orchestrating the download and upload phases
//! - [`filesystem`] - Local photo store adapter (atomic writes, pending queue)
//! - [`rate_limit`] - Request gate enforcing a minimum spacing between requests
//! - [`retry`] - Retry policy with capped exponential backoff
//! - [`validator`] - Downloaded content validator

pub mod engine;
pub mod filesystem;
pub mod rate_limit;
pub mod retry;
pub mod validator;

use thiserror::Error;

pub use engine::{
    DownloadPlan, DownloadSummary, SyncEngine, SyncPhase, SyncResult, TransferDirection,
    UploadSummary,
};

/// Errors that can occur during synchronization operations
///
/// Failures of individual items never surface here; they are counted in
/// the phase summaries. Only whole-phase failures are returned.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote storage URL or API key is missing
    #[error("Remote storage not configured: {0}")]
    NotConfigured(String),

    /// The remote listing failed after retries
    #[error("Failed to list remote objects: {}", describe_list_failure(.status, .message))]
    ListFailed {
        /// HTTP status, if the remote answered
        status: Option<u16>,
        /// Backend message or transport error
        message: String,
    },

    /// The local photo store could not be read or updated
    #[error("Local photo store error: {0:#}")]
    LocalStore(anyhow::Error),

    /// One phase of a full sync failed; the other phase still ran
    #[error("{phase} phase failed")]
    PhaseFailed {
        /// The phase that failed
        phase: TransferDirection,
        /// Counts from the phase that completed
        partial: SyncResult,
        /// Why the phase failed
        source: Box<SyncError>,
    },
}

fn describe_list_failure(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status}: {message}"),
        None => message.to_string(),
    }
}

impl SyncError {
    /// Returns true if the error was caused by missing configuration
    pub fn is_not_configured(&self) -> bool {
        match self {
            SyncError::NotConfigured(_) => true,
            SyncError::PhaseFailed { source, .. } => source.is_not_configured(),
            _ => false,
        }
    }
}
