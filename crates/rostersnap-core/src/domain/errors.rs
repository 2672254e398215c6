//! Domain error types
//!
//! This module defines error types for domain validation and the
//! classification of failures reported by the remote object store.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A player name normalized to nothing usable
    #[error("Invalid photo name: {0}")]
    InvalidPhotoName(String),
}

// ============================================================================
// RemoteError
// ============================================================================

/// Coarse classification of a [`RemoteError`]
///
/// Drives whether an operation is retried and how the failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Storage URL or key is missing; fatal, never retried
    ConfigMissing,
    /// Connection failure, 408, 429 or 5xx; retried with backoff
    TransientNetwork,
    /// Any other 4xx or an unreadable response; surfaced immediately
    PermanentRemote,
}

/// Errors returned by a remote bucket adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote store has no URL or API key configured
    #[error("Remote storage not configured: {0}")]
    NotConfigured(String),

    /// The request failed before a response was obtained
    #[error("Network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The response arrived but could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Classifies this error into the sync error taxonomy
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::NotConfigured(_) => RemoteErrorKind::ConfigMissing,
            RemoteError::Network(_) => RemoteErrorKind::TransientNetwork,
            RemoteError::Status { status, .. } => {
                if *status == 408 || *status == 429 || (500..600).contains(status) {
                    RemoteErrorKind::TransientNetwork
                } else {
                    RemoteErrorKind::PermanentRemote
                }
            }
            RemoteError::InvalidResponse(_) => RemoteErrorKind::PermanentRemote,
        }
    }

    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        self.kind() == RemoteErrorKind::TransientNetwork
    }

    /// Returns the HTTP status, if the remote answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 404 response
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
