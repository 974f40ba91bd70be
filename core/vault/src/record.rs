//! File records returned to the hosting service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use sealbox_common::{BlobHandle, FileId};
use sealbox_crypto::EnvelopeMetadata;

/// Everything needed to find and open a stored file later.
///
/// The record holds the wrapped key and IV but never an unwrapped key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub owner: String,
    /// Original file name as uploaded.
    pub filename: String,
    /// Plaintext size in bytes when known, otherwise the stored size.
    pub size: u64,
    /// Where the stored bytes live.
    pub blob: BlobHandle,
    /// Wrapped key and IV; present exactly when the blob is sealed.
    pub envelope: Option<EnvelopeMetadata>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether the stored blob is sealed ciphertext.
    pub fn is_encrypted(&self) -> bool {
        self.envelope.is_some()
    }

    /// Content type to serve the file with.
    pub fn mime_type(&self) -> &'static str {
        mime_type_for(&self.filename)
    }
}

/// Guess a content type from a file name's extension.
pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("notes.TXT"), "text/plain");
        assert_eq!(mime_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_type_for("archive"), "application/octet-stream");
        assert_eq!(mime_type_for("weird.xyz"), "application/octet-stream");
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = FileRecord {
            id: FileId::generate(),
            owner: "alice".to_string(),
            filename: "report.pdf".to_string(),
            size: 42,
            blob: BlobHandle::new("abc.pdf").unwrap(),
            envelope: Some(EnvelopeMetadata {
                encrypted_aes_key: "BAU=".to_string(),
                iv: "AAAAAAAAAAAAAAAAAAAAAA==".to_string(),
            }),
            uploaded_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let restored: FileRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, record);
        assert!(restored.is_encrypted());
        assert_eq!(restored.mime_type(), "application/pdf");
    }
}
