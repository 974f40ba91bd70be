//! Outcome notifications.
//!
//! The vault reports what happened through an [`EventSink`]; the hosting
//! service decides where it goes. Events never carry key material or
//! file content.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

use sealbox_common::FileId;

/// Something the vault did, or refused to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    Uploaded {
        owner: String,
        file_id: FileId,
        filename: String,
        size: u64,
        encrypted: bool,
    },
    UploadRejected {
        owner: String,
        filename: String,
        reason: String,
    },
    Downloaded {
        owner: String,
        file_id: FileId,
        size: u64,
    },
    EnvelopeFetched {
        owner: String,
        file_id: FileId,
    },
    Deleted {
        owner: String,
        file_id: FileId,
        already_gone: bool,
    },
    Failed {
        owner: String,
        file_id: Option<FileId>,
        action: String,
        reason: String,
    },
}

/// Receiver of vault events.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: VaultEvent);
}

/// Writes events to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn notify(&self, event: VaultEvent) {
        match event {
            VaultEvent::Uploaded {
                owner,
                file_id,
                filename,
                size,
                encrypted,
            } => info!(%owner, %file_id, %filename, size, encrypted, "File uploaded"),
            VaultEvent::UploadRejected {
                owner,
                filename,
                reason,
            } => warn!(%owner, %filename, %reason, "Upload rejected"),
            VaultEvent::Downloaded {
                owner,
                file_id,
                size,
            } => info!(%owner, %file_id, size, "File downloaded"),
            VaultEvent::EnvelopeFetched { owner, file_id } => {
                info!(%owner, %file_id, "Envelope prepared for client-side decryption")
            }
            VaultEvent::Deleted {
                owner,
                file_id,
                already_gone,
            } => info!(%owner, %file_id, already_gone, "File deleted"),
            VaultEvent::Failed {
                owner,
                file_id,
                action,
                reason,
            } => warn!(%owner, file_id = ?file_id, %action, %reason, "Vault operation failed"),
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<VaultEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingEventSink {
    fn notify(&self, event: VaultEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
