//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::photo::{basename_key, PhotoExtension};

// ============================================================================
// LogicalPhotoName
// ============================================================================

/// Normalized identifier joining local photo files and remote objects
///
/// Derived from a player's name: lowercase, with every whitespace and
/// separator character removed (`"Jane Smith"` becomes `janesmith`).
/// The same logical name may exist physically as `janesmith.jpg` or
/// `janesmith.png`; see [`PhotoExtension`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPhotoName(String);

impl LogicalPhotoName {
    /// Create a new LogicalPhotoName, normalizing the input
    ///
    /// # Errors
    /// Returns error if nothing alphanumeric remains after normalization
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = raw.as_ref();
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        if normalized.is_empty() {
            return Err(DomainError::InvalidPhotoName(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    /// Derives the logical name from a roster display name
    ///
    /// `"Last, First"` is reordered to `lastfirst`. Any other form is
    /// concatenated in the order given.
    pub fn from_roster_name(display: &str) -> Result<Self, DomainError> {
        match display.split_once(',') {
            Some((last, first)) => Self::new(format!("{last}{first}")),
            None => Self::new(display),
        }
    }

    /// Recovers the logical name from a photo file name like `janesmith.png`
    ///
    /// Returns `None` if the extension is not an accepted photo extension.
    /// Any path prefix (`players/janesmith.png`, `players\janesmith.png`)
    /// is ignored, the same way [`basename_key`] strips it.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let base = basename_key(file_name);
        let (stem, ext) = base.rsplit_once('.')?;
        PhotoExtension::from_extension(ext)?;
        Self::new(stem).ok()
    }

    /// File name under the given extension, e.g. `janesmith.jpg`
    #[must_use]
    pub fn file_name(&self, ext: PhotoExtension) -> String {
        format!("{}.{}", self.0, ext.as_str())
    }

    /// Both accepted file names, in precedence order (jpg first)
    #[must_use]
    pub fn candidate_file_names(&self) -> Vec<String> {
        PhotoExtension::PRECEDENCE
            .iter()
            .map(|ext| self.file_name(*ext))
            .collect()
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LogicalPhotoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalPhotoName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalPhotoName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LogicalPhotoName> for String {
    fn from(name: LogicalPhotoName) -> Self {
        name.0
    }
}
