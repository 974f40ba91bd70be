//! Blob store trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use sealbox_common::{BlobHandle, Result};

/// Storage backend for sealed payloads.
///
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Get the store name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Store a blob and return its handle.
    ///
    /// `hint` is the original file name; stores may keep its extension
    /// but must not otherwise derive the handle from it.
    ///
    /// # Postconditions
    /// - Returns a fresh handle that `load` resolves to `data`
    ///
    /// # Errors
    /// - I/O errors
    async fn store(&self, data: Vec<u8>, hint: Option<&str>) -> Result<BlobHandle>;

    /// Load a blob by handle.
    ///
    /// # Errors
    /// - `NotFound` if no blob exists for the handle
    /// - I/O errors
    async fn load(&self, handle: &BlobHandle) -> Result<Vec<u8>>;

    /// Check if a blob exists.
    async fn exists(&self, handle: &BlobHandle) -> Result<bool>;

    /// Delete a blob.
    ///
    /// # Errors
    /// - `NotFound` if no blob exists for the handle
    async fn delete(&self, handle: &BlobHandle) -> Result<()>;
}

/// Which blob store to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Volatile in-process store.
    Memory,
    /// One file per blob under `root`.
    Local { root: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

/// Open the store described by `config`.
///
/// # Errors
/// - I/O errors creating the local root directory
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn BlobStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(crate::memory::MemoryBlobStore::new())),
        StoreConfig::Local { root } => Ok(Arc::new(crate::local::LocalBlobStore::new(root)?)),
    }
}

/// Build a fresh handle, keeping a sanitized extension from `hint`.
pub(crate) fn fresh_handle(hint: Option<&str>) -> Result<BlobHandle> {
    let id = uuid::Uuid::new_v4();
    let extension = hint
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => BlobHandle::new(format!("{}.{}", id, ext.to_ascii_lowercase())),
        None => BlobHandle::new(id.to_string()),
    }
}
