//! File vault service.
//!
//! Ties the envelope to a blob store: seals on upload, opens on download,
//! and hands envelopes to clients that decrypt on their own side.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::config::VaultConfig;
use crate::events::{EventSink, TracingEventSink, VaultEvent};
use crate::record::FileRecord;
use sealbox_common::{Error, FileId, Result};
use sealbox_crypto::{
    EncryptedEnvelope, EnvelopeMetadata, HybridEnvelope, PrivateKey, PublicKey, RandomSource,
};
use sealbox_storage::{open_store, BlobStore};

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The blob existed and was removed.
    Deleted,
    /// The blob was already gone; nothing to do.
    AlreadyGone,
}

/// Sealed file storage for a hosting service.
///
/// Records are returned to the caller and never kept here; the vault only
/// owns the blob store and the envelope.
pub struct FileVault {
    store: Arc<dyn BlobStore>,
    events: Arc<dyn EventSink>,
    envelope: HybridEnvelope,
    config: VaultConfig,
}

impl FileVault {
    /// Create a vault over `store`, logging events through `tracing`.
    pub fn new(store: Arc<dyn BlobStore>, config: VaultConfig) -> Self {
        let envelope = HybridEnvelope::default().with_options(config.open_options());
        Self {
            store,
            events: Arc::new(TracingEventSink),
            envelope,
            config,
        }
    }

    /// Create a vault and the store its configuration names.
    ///
    /// # Errors
    /// - `InvalidInput` for an unusable configuration
    /// - I/O errors opening a local store
    pub fn from_config(config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.store)?;
        Ok(Self::new(store, config))
    }

    /// Send events to `events` instead of the log.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Draw key material from `source`.
    pub fn with_random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.envelope = HybridEnvelope::new(source).with_options(self.config.open_options());
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Store a file, sealing it for `recipient` when one is given.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty file name
    /// - `TooLarge` when `content` exceeds `max_file_size`
    /// - `Timeout` when sealing exceeds the operation timeout
    /// - `Envelope` when sealing fails
    /// - Storage errors from the blob store
    pub async fn upload(
        &self,
        owner: &str,
        filename: &str,
        content: Vec<u8>,
        recipient: Option<&PublicKey>,
    ) -> Result<FileRecord> {
        let size = content.len() as u64;
        self.check_upload(owner, filename, size)?;

        let result = match recipient {
            Some(recipient) => {
                let envelope = self.envelope.clone();
                let recipient = recipient.clone();
                match self
                    .run_blocking(move || envelope.seal_file(&content, &recipient))
                    .await
                {
                    Ok(sealed) => {
                        let metadata = sealed.metadata();
                        self.put(owner, filename, size, sealed.encrypted_payload, Some(metadata))
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
            None => self.put(owner, filename, size, content, None).await,
        };

        self.finish_upload(owner, filename, result)
    }

    /// Store an envelope sealed on the client side.
    ///
    /// The plaintext size is unknown, so the record carries the payload
    /// size instead.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty file name
    /// - `TooLarge` when the payload exceeds `max_file_size`
    /// - Storage errors from the blob store
    pub async fn upload_sealed(
        &self,
        owner: &str,
        filename: &str,
        envelope: EncryptedEnvelope,
    ) -> Result<FileRecord> {
        let size = envelope.encrypted_payload.len() as u64;
        self.check_upload(owner, filename, size)?;

        let metadata = envelope.metadata();
        let result = self
            .put(owner, filename, size, envelope.encrypted_payload, Some(metadata))
            .await;

        self.finish_upload(owner, filename, result)
    }

    /// Return a file's plaintext.
    ///
    /// Sealed files need `recipient`; plain files ignore it.
    ///
    /// # Errors
    /// - `InvalidInput` when a sealed file is requested without a key
    /// - `Envelope` when the key does not match or the data was altered
    /// - `Timeout` when opening exceeds the operation timeout
    /// - `NotFound` when the blob is gone
    pub async fn download(
        &self,
        record: &FileRecord,
        recipient: Option<&PrivateKey>,
    ) -> Result<Vec<u8>> {
        let result = self.download_inner(record, recipient).await;

        match &result {
            Ok(plaintext) => self.events.notify(VaultEvent::Downloaded {
                owner: record.owner.clone(),
                file_id: record.id,
                size: plaintext.len() as u64,
            }),
            Err(e) => self.failed(&record.owner, Some(record.id), "download", e),
        }
        result
    }

    async fn download_inner(
        &self,
        record: &FileRecord,
        recipient: Option<&PrivateKey>,
    ) -> Result<Vec<u8>> {
        let Some(metadata) = &record.envelope else {
            return self.store.load(&record.blob).await;
        };
        let recipient = recipient
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "File {} is encrypted; a private key is required",
                    record.id
                ))
            })?
            .clone();

        let sealed = metadata.with_payload(self.store.load(&record.blob).await?)?;
        let envelope = self.envelope.clone();
        self.run_blocking(move || envelope.open_file(&sealed, &recipient))
            .await
    }

    /// Return the stored envelope so the client can open it itself.
    ///
    /// # Errors
    /// - `InvalidInput` for a file stored without encryption
    /// - `NotFound` when the blob is gone
    pub async fn fetch_envelope(&self, record: &FileRecord) -> Result<EncryptedEnvelope> {
        let result = match self.metadata(record) {
            Ok(metadata) => match self.store.load(&record.blob).await {
                Ok(payload) => metadata.with_payload(payload),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.events.notify(VaultEvent::EnvelopeFetched {
                owner: record.owner.clone(),
                file_id: record.id,
            }),
            Err(e) => self.failed(&record.owner, Some(record.id), "fetch_envelope", e),
        }
        result
    }

    /// The wrapped key and IV of a sealed file.
    ///
    /// # Errors
    /// - `InvalidInput` for a file stored without encryption
    pub fn metadata(&self, record: &FileRecord) -> Result<EnvelopeMetadata> {
        record.envelope.clone().ok_or_else(|| {
            Error::InvalidInput(format!("File {} is not encrypted", record.id))
        })
    }

    /// Remove a file's blob. A blob that is already gone is not an error.
    pub async fn delete(&self, record: &FileRecord) -> Result<DeleteOutcome> {
        let outcome = match self.store.delete(&record.blob).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(Error::NotFound(_)) => DeleteOutcome::AlreadyGone,
            Err(e) => {
                self.failed(&record.owner, Some(record.id), "delete", &e);
                return Err(e);
            }
        };

        self.events.notify(VaultEvent::Deleted {
            owner: record.owner.clone(),
            file_id: record.id,
            already_gone: outcome == DeleteOutcome::AlreadyGone,
        });
        Ok(outcome)
    }

    fn check_upload(&self, owner: &str, filename: &str, size: u64) -> Result<()> {
        let rejection = if filename.trim().is_empty() {
            Some(Error::InvalidInput("File name must not be empty".to_string()))
        } else if size > self.config.max_file_size {
            Some(Error::TooLarge {
                size,
                limit: self.config.max_file_size,
            })
        } else {
            None
        };

        match rejection {
            Some(e) => {
                self.events.notify(VaultEvent::UploadRejected {
                    owner: owner.to_string(),
                    filename: filename.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
            None => Ok(()),
        }
    }

    async fn put(
        &self,
        owner: &str,
        filename: &str,
        size: u64,
        data: Vec<u8>,
        envelope: Option<EnvelopeMetadata>,
    ) -> Result<FileRecord> {
        let stored = data.len();
        let blob = self.store.store(data, Some(filename)).await?;
        debug!(store = self.store.name(), blob = %blob, stored, "Upload written");

        Ok(FileRecord {
            id: FileId::generate(),
            owner: owner.to_string(),
            filename: filename.to_string(),
            size,
            blob,
            envelope,
            uploaded_at: Utc::now(),
        })
    }

    fn finish_upload(
        &self,
        owner: &str,
        filename: &str,
        result: Result<FileRecord>,
    ) -> Result<FileRecord> {
        match &result {
            Ok(record) => self.events.notify(VaultEvent::Uploaded {
                owner: record.owner.clone(),
                file_id: record.id,
                filename: record.filename.clone(),
                size: record.size,
                encrypted: record.is_encrypted(),
            }),
            Err(e) => self.events.notify(VaultEvent::Failed {
                owner: owner.to_string(),
                file_id: None,
                action: format!("upload {}", filename),
                reason: e.to_string(),
            }),
        }
        result
    }

    fn failed(&self, owner: &str, file_id: Option<FileId>, action: &str, error: &Error) {
        self.events.notify(VaultEvent::Failed {
            owner: owner.to_string(),
            file_id,
            action: action.to_string(),
            reason: error.to_string(),
        });
    }

    /// Run CPU-bound crypto off the async workers, under the configured
    /// deadline.
    ///
    /// A timed-out task keeps running on its blocking thread; its result
    /// is dropped.
    async fn run_blocking<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = self.config.operation_timeout();
        let handle = tokio::task::spawn_blocking(task);

        match tokio::time::timeout(deadline, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(Error::Internal(format!(
                "Crypto worker failed: {}",
                join_error
            ))),
            Err(_) => Err(Error::Timeout(format!(
                "Crypto operation exceeded {} ms",
                self.config.operation_timeout_ms
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEventSink;
    use sealbox_crypto::{payload, KeyPair, OsRandom};
    use sealbox_storage::{MemoryBlobStore, StoreConfig};
    use std::sync::OnceLock;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key_pair() -> &'static KeyPair {
        static KEYS: OnceLock<KeyPair> = OnceLock::new();
        KEYS.get_or_init(|| KeyPair::generate(&OsRandom).unwrap())
    }

    fn other_key_pair() -> &'static KeyPair {
        static KEYS: OnceLock<KeyPair> = OnceLock::new();
        KEYS.get_or_init(|| KeyPair::generate(&OsRandom).unwrap())
    }

    fn vault_with(config: VaultConfig) -> (FileVault, MemoryBlobStore, Arc<RecordingEventSink>) {
        let store = MemoryBlobStore::new();
        let events = Arc::new(RecordingEventSink::new());
        let vault = FileVault::new(Arc::new(store.clone()), config).with_events(events.clone());
        (vault, store, events)
    }

    fn vault() -> (FileVault, MemoryBlobStore, Arc<RecordingEventSink>) {
        vault_with(VaultConfig::default())
    }

    /// Random source that stalls long enough to trip a short deadline.
    struct SlowRandom;

    impl RandomSource for SlowRandom {
        fn fill_bytes(&self, dest: &mut [u8]) {
            std::thread::sleep(Duration::from_millis(300));
            OsRandom.fill_bytes(dest);
        }
    }

    #[tokio::test]
    async fn test_plain_upload_download() {
        let (vault, _, events) = vault();
        let content = b"plain notes".to_vec();

        let record = vault
            .upload("alice", "notes.txt", content.clone(), None)
            .await
            .unwrap();
        assert!(!record.is_encrypted());
        assert_eq!(record.size, content.len() as u64);
        assert_eq!(record.mime_type(), "text/plain");

        let downloaded = vault.download(&record, None).await.unwrap();
        assert_eq!(downloaded, content);

        let events = events.events();
        assert!(matches!(
            events[0],
            VaultEvent::Uploaded {
                encrypted: false,
                ..
            }
        ));
        assert!(matches!(events[1], VaultEvent::Downloaded { size: 11, .. }));
    }

    #[tokio::test]
    async fn test_sealed_upload_stores_ciphertext() {
        let (vault, store, _) = vault();
        let keys = key_pair();
        let content = b"quarterly figures".to_vec();

        let record = vault
            .upload("alice", "figures.csv", content.clone(), Some(keys.public()))
            .await
            .unwrap();
        assert!(record.is_encrypted());
        assert_eq!(record.size, content.len() as u64);

        let stored = store.load(&record.blob).await.unwrap();
        assert_ne!(stored, content);
        assert_eq!(stored.len(), payload::ciphertext_len(content.len()));

        let downloaded = vault.download(&record, Some(keys.private())).await.unwrap();
        assert_eq!(downloaded, content);
    }

    #[tokio::test]
    async fn test_sealed_download_needs_key() {
        let (vault, _, events) = vault();
        let keys = key_pair();

        let record = vault
            .upload("alice", "secret.txt", b"secret".to_vec(), Some(keys.public()))
            .await
            .unwrap();

        let result = vault.download(&record, None).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(matches!(
            events.events().last(),
            Some(VaultEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_with_wrong_key() {
        let (vault, _, _) = vault();

        let record = vault
            .upload("alice", "secret.txt", b"secret".to_vec(), Some(key_pair().public()))
            .await
            .unwrap();

        let err = vault
            .download(&record, Some(other_key_pair().private()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Envelope(_)));
        assert!(err.is_integrity_failure());
    }

    #[tokio::test]
    async fn test_fetch_envelope_for_client_side_open() {
        let (vault, _, events) = vault();
        let keys = key_pair();
        let content = b"open me on the client".to_vec();

        let record = vault
            .upload("bob", "letter.txt", content.clone(), Some(keys.public()))
            .await
            .unwrap();

        let envelope = vault.fetch_envelope(&record).await.unwrap();
        assert_eq!(envelope.metadata(), vault.metadata(&record).unwrap());

        let opened = sealbox_crypto::open_file(&envelope, keys.private()).unwrap();
        assert_eq!(opened, content);
        assert!(matches!(
            events.events().last(),
            Some(VaultEvent::EnvelopeFetched { .. })
        ));
    }

    #[tokio::test]
    async fn test_plain_file_has_no_envelope() {
        let (vault, _, _) = vault();

        let record = vault
            .upload("bob", "readme.md", b"# hi".to_vec(), None)
            .await
            .unwrap();

        assert!(matches!(vault.metadata(&record), Err(Error::InvalidInput(_))));
        assert!(matches!(
            vault.fetch_envelope(&record).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let (vault, store, events) = vault_with(VaultConfig {
            max_file_size: 8,
            ..VaultConfig::default()
        });

        let result = vault
            .upload("carol", "big.bin", vec![0u8; 9], None)
            .await;
        assert!(matches!(result, Err(Error::TooLarge { size: 9, limit: 8 })));
        assert!(store.is_empty());
        assert!(matches!(
            events.events()[0],
            VaultEvent::UploadRejected { .. }
        ));

        // Exactly at the limit is accepted.
        vault
            .upload("carol", "ok.bin", vec![0u8; 8], None)
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_filename() {
        let (vault, store, _) = vault();

        let result = vault.upload("carol", "  ", b"data".to_vec(), None).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upload_sealed_envelope() {
        let (vault, _, _) = vault();
        let keys = key_pair();
        let content = b"sealed before upload".to_vec();

        let envelope = sealbox_crypto::seal_file(&content, keys.public()).unwrap();
        let payload_len = envelope.encrypted_payload.len() as u64;

        let record = vault
            .upload_sealed("dave", "upload.bin", envelope)
            .await
            .unwrap();
        assert!(record.is_encrypted());
        assert_eq!(record.size, payload_len);

        let downloaded = vault.download(&record, Some(keys.private())).await.unwrap();
        assert_eq!(downloaded, content);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (vault, store, events) = vault();

        let record = vault
            .upload("erin", "old.log", b"log".to_vec(), None)
            .await
            .unwrap();

        assert_eq!(vault.delete(&record).await.unwrap(), DeleteOutcome::Deleted);
        assert!(store.is_empty());
        assert_eq!(
            vault.delete(&record).await.unwrap(),
            DeleteOutcome::AlreadyGone
        );
        assert!(matches!(
            events.events().last(),
            Some(VaultEvent::Deleted {
                already_gone: true,
                ..
            })
        ));

        assert!(matches!(
            vault.download(&record, None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_seal_timeout() {
        let (vault, store, events) = vault_with(VaultConfig {
            operation_timeout_ms: 50,
            ..VaultConfig::default()
        });
        let vault = vault.with_random_source(Arc::new(SlowRandom));

        let result = vault
            .upload("frank", "slow.txt", b"slow".to_vec(), Some(key_pair().public()))
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(store.is_empty());
        assert!(matches!(
            events.events().last(),
            Some(VaultEvent::Failed { file_id: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_strict_iv_rejects_mismatched_record() {
        let keys = key_pair();
        let (lenient, store, _) = vault();
        let strict = FileVault::new(
            Arc::new(store.clone()),
            VaultConfig {
                strict_iv: true,
                ..VaultConfig::default()
            },
        );

        let content = b"iv check".to_vec();
        let mut record = lenient
            .upload("gina", "iv.txt", content.clone(), Some(keys.public()))
            .await
            .unwrap();
        let other = lenient
            .upload("gina", "other.txt", b"other".to_vec(), Some(keys.public()))
            .await
            .unwrap();

        // Swap in another file's IV while keeping this file's wrapped key.
        if let (Some(mine), Some(theirs)) = (record.envelope.as_mut(), other.envelope.as_ref()) {
            mine.iv = theirs.iv.clone();
        }

        assert_eq!(
            lenient.download(&record, Some(keys.private())).await.unwrap(),
            content
        );
        let err = strict
            .download(&record, Some(keys.private()))
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), Error::Decryption));
    }

    #[tokio::test]
    async fn test_from_config_local_store() {
        let temp = TempDir::new().unwrap();
        let config = VaultConfig {
            store: StoreConfig::Local {
                root: temp.path().join("blobs"),
            },
            ..VaultConfig::default()
        };

        let vault = FileVault::from_config(config).unwrap();
        assert_eq!(vault.store().name(), "local");

        let record = vault
            .upload("hank", "disk.txt", b"on disk".to_vec(), None)
            .await
            .unwrap();
        assert!(temp.path().join("blobs").join(record.blob.as_str()).is_file());
    }
}
