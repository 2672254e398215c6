//! Downloaded content validator
//!
//! Object storage can answer with an HTML error page wrapped in a success
//! status (bucket policy problems, expired links). HTTP status alone is not
//! trusted: every downloaded file is sniffed before it is accepted.
//!
//! A file is rejected if it is missing, smaller than the minimum size, or,
//! when no larger than the inspection limit, either lacks a PNG/JPEG
//! signature or contains HTML / access-denied markers.

use std::path::Path;

use rostersnap_core::config::ValidationConfig;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG start-of-image marker followed by a segment marker
pub const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Lowercase markers of an error page
const ERROR_PAGE_MARKERS: &[&str] = &["<!doctype html", "<html", "access denied", "accessdenied"];

/// Why a downloaded file was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("file does not exist")]
    Missing,

    #[error("file is {size} bytes, below the {min} byte minimum")]
    TooSmall { size: u64, min: u64 },

    #[error("content is not a PNG or JPEG image")]
    NotAnImage,

    #[error("content looks like an error page ({marker})")]
    ErrorPage { marker: &'static str },

    #[error("file could not be read: {0}")]
    Unreadable(String),
}

/// Sniffs downloaded files before they are accepted into the photo store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentValidator {
    min_size: u64,
    inspect_limit: u64,
}

impl ContentValidator {
    pub fn new(min_size: u64, inspect_limit: u64) -> Self {
        Self {
            min_size,
            inspect_limit,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.min_size_bytes, config.inspect_limit_bytes)
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    pub fn inspect_limit(&self) -> u64 {
        self.inspect_limit
    }

    /// Returns true if the file at `path` is an acceptable image
    pub async fn is_valid_download(&self, path: &Path) -> bool {
        self.inspect(path).await.is_ok()
    }

    /// Checks the file at `path`, returning why it was rejected
    pub async fn inspect(&self, path: &Path) -> Result<(), RejectReason> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(RejectReason::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RejectReason::Missing)
            }
            Err(e) => return Err(RejectReason::Unreadable(e.to_string())),
        };

        let size = metadata.len();
        if size < self.min_size {
            return Err(RejectReason::TooSmall {
                size,
                min: self.min_size,
            });
        }

        if size > self.inspect_limit {
            debug!(path = %path.display(), size, "File above inspection limit, accepted on size");
            return Ok(());
        }

        let mut data = Vec::with_capacity(size as usize);
        tokio::fs::File::open(path)
            .await
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?
            .take(self.inspect_limit)
            .read_to_end(&mut data)
            .await
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?;

        inspect_content(&data)
    }

    /// Applies the size and content checks to in-memory bytes
    pub fn inspect_bytes(&self, data: &[u8]) -> Result<(), RejectReason> {
        let size = data.len() as u64;
        if size < self.min_size {
            return Err(RejectReason::TooSmall {
                size,
                min: self.min_size,
            });
        }
        if size > self.inspect_limit {
            return Ok(());
        }
        inspect_content(data)
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

/// Returns true if `data` starts with a PNG signature or JPEG SOI marker
pub fn has_image_signature(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE) || data.starts_with(&JPEG_SOI)
}

fn inspect_content(data: &[u8]) -> Result<(), RejectReason> {
    let text = String::from_utf8_lossy(data).to_lowercase();
    if let Some(marker) = ERROR_PAGE_MARKERS.iter().copied().find(|m| text.contains(m)) {
        return Err(RejectReason::ErrorPage { marker });
    }
    if !has_image_signature(data) {
        return Err(RejectReason::NotAnImage);
    }
    Ok(())
}
