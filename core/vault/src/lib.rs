//! File vault service for sealbox.
//!
//! This module provides:
//! - Upload of plain, server-sealed, or client-sealed files
//! - Download with server-side opening, or envelope hand-off for
//!   client-side opening
//! - Size limits and per-operation timeouts
//! - Event notification for every outcome
//!
//! # Architecture
//! The vault sits between the hosting service and a blob store. It calls
//! into the crypto core with bytes and keys and never persists key
//! material; file records are returned to the caller to keep.

pub mod config;
pub mod events;
pub mod record;
pub mod service;

pub use config::VaultConfig;
pub use events::{EventSink, RecordingEventSink, TracingEventSink, VaultEvent};
pub use record::{mime_type_for, FileRecord};
pub use service::{DeleteOutcome, FileVault};
