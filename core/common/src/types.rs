//! Common types used throughout sealbox.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroize;

/// Unique identifier for a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its hyphenated string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidInput(format!("Invalid file id: {}", e)))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle returned by a blob store for a stored object.
///
/// Handles are single path segments: they never contain separators
/// and never refer to the current or parent directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobHandle(String);

impl BlobHandle {
    /// Create a handle from a string.
    ///
    /// # Errors
    /// - Returns error if the handle is empty, contains a path separator,
    ///   or is `.`/`..`
    pub fn new(handle: impl Into<String>) -> crate::Result<Self> {
        let handle = handle.into();
        if handle.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Blob handle cannot be empty".to_string(),
            ));
        }
        if handle.contains('/') || handle.contains('\\') || handle == "." || handle == ".." {
            return Err(crate::Error::InvalidInput(format!(
                "Blob handle is not a single path segment: {}",
                handle
            )));
        }
        Ok(Self(handle))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BlobHandle {
    type Error = crate::Error;

    fn try_from(handle: String) -> crate::Result<Self> {
        Self::new(handle)
    }
}

impl From<BlobHandle> for String {
    fn from(handle: BlobHandle) -> Self {
        handle.0
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
