//! Photo records and the cross-extension matching rules
//!
//! A player photo is one logical entity with two possible physical
//! extensions. Local files and remote objects are compared by their
//! *match key*: the logical name when the extension is an accepted photo
//! extension, otherwise the lowercase basename.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::newtypes::LogicalPhotoName;

// ============================================================================
// PhotoExtension
// ============================================================================

/// Accepted physical extensions for a logical photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoExtension {
    /// Primary capture format
    Jpg,
    /// Legacy / downloaded format
    Png,
}

impl PhotoExtension {
    /// Extensions in precedence order. When both exist for one logical
    /// name, the first one found wins.
    pub const PRECEDENCE: [PhotoExtension; 2] = [PhotoExtension::Jpg, PhotoExtension::Png];

    /// Parses a file extension (case-insensitive, `jpeg` accepted as jpg)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Parses the extension of a file name or path
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    /// Canonical extension string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    /// MIME type sent with uploads
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Position in [`Self::PRECEDENCE`]; lower wins
    pub fn rank(&self) -> usize {
        match self {
            Self::Jpg => 0,
            Self::Png => 1,
        }
    }
}

// ============================================================================
// Name helpers
// ============================================================================

/// Lowercase basename with any path prefix stripped
///
/// `"Players/JaneSmith.PNG"` becomes `"janesmith.png"`.
pub fn basename_key(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('/');
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .to_lowercase()
}

/// Key used to decide whether two files are the same photo
///
/// `alice.jpg` and `alice.png` share the key `alice`; a non-photo file
/// keeps its full lowercase basename.
pub fn match_key(name: &str) -> String {
    let base = basename_key(name);
    LogicalPhotoName::from_file_name(&base)
        .map(String::from)
        .unwrap_or(base)
}

// ============================================================================
// LocalPhotoRecord
// ============================================================================

/// A photo file held by the local photo store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPhotoRecord {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Basename of the file (e.g. `janesmith.jpg`)
    pub file_name: String,
    /// Saved locally but not yet confirmed uploaded
    pub pending: bool,
}

impl LocalPhotoRecord {
    /// Builds a record from a path; `None` if the path has no UTF-8 file name
    pub fn from_path(path: &Path, pending: bool) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            file_name,
            pending,
        })
    }

    /// Comparison key, see [`match_key`]
    pub fn match_key(&self) -> String {
        match_key(&self.file_name)
    }

    /// Logical name, if this is a photo file
    pub fn logical_name(&self) -> Option<LogicalPhotoName> {
        LogicalPhotoName::from_file_name(&self.file_name)
    }
}

// ============================================================================
// RemoteObjectRecord
// ============================================================================

/// An object present in the remote bucket at listing time
///
/// Reconstructed on every listing; never cached across sync runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRecord {
    /// Object name exactly as stored remotely
    pub name: String,
    /// Lowercase basename, used for comparison
    pub key: String,
}

impl RemoteObjectRecord {
    /// Creates a record, deriving the comparison key from the stored name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = basename_key(&name);
        Self { name, key }
    }

    /// Comparison key shared across extensions, see [`match_key`]
    pub fn match_key(&self) -> String {
        match_key(&self.key)
    }

    /// Logical name, if the object is a photo
    pub fn logical_name(&self) -> Option<LogicalPhotoName> {
        LogicalPhotoName::from_file_name(&self.key)
    }

    /// Physical extension, if the object is a photo
    pub fn extension(&self) -> Option<PhotoExtension> {
        PhotoExtension::from_file_name(&self.key)
    }
}
