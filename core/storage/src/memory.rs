//! In-memory blob store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::provider::{fresh_handle, BlobStore};
use sealbox_common::{BlobHandle, Error, Result};

/// In-memory blob store.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<BlobHandle, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Storage("Memory store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, data: Vec<u8>, hint: Option<&str>) -> Result<BlobHandle> {
        let handle = fresh_handle(hint)?;
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(handle.clone(), data);
        Ok(handle)
    }

    async fn load(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Blob not found: {}", handle)))
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool> {
        Ok(self.blobs.read().map_err(poisoned)?.contains_key(handle))
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<()> {
        match self.blobs.write().map_err(poisoned)?.remove(handle) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Blob not found: {}", handle))),
        }
    }
}
