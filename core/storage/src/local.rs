//! Local filesystem blob store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::provider::{fresh_handle, BlobStore};
use sealbox_common::{BlobHandle, Error, Result};

/// Local filesystem blob store.
///
/// Stores each blob as one file directly under the root directory.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new local store with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    /// - Root exists but is not a directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        if !root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Store root is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a handle to a filesystem path.
    ///
    /// Handles are single path segments, so the result is always a direct
    /// child of the root.
    fn to_fs_path(&self, handle: &BlobHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn store(&self, data: Vec<u8>, hint: Option<&str>) -> Result<BlobHandle> {
        let handle = fresh_handle(hint)?;
        let fs_path = self.to_fs_path(&handle);

        if let Err(e) = fs::write(&fs_path, &data).await {
            discard_partial(&fs_path).await;
            return Err(e.into());
        }

        debug!(handle = %handle, size = data.len(), "Blob stored");
        Ok(handle)
    }

    async fn load(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        let fs_path = self.to_fs_path(handle);

        if !is_blob(&fs_path).await? {
            return Err(Error::NotFound(format!("Blob not found: {}", handle)));
        }

        Ok(fs::read(&fs_path).await?)
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool> {
        is_blob(&self.to_fs_path(handle)).await
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<()> {
        let fs_path = self.to_fs_path(handle);

        if !is_blob(&fs_path).await? {
            return Err(Error::NotFound(format!("Blob not found: {}", handle)));
        }

        fs::remove_file(&fs_path).await?;
        debug!(handle = %handle, "Blob deleted");
        Ok(())
    }
}

/// Whether `path` is a regular file. Directories are never blobs.
async fn is_blob(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove whatever a failed write left behind.
async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial blob"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial blob"),
    }
}
