//! Blob storage for sealed files.
//!
//! The crypto core never touches storage. This crate is the collaborator
//! the hosting layer uses to keep ciphertext: `store` bytes, get a handle
//! back, `load` them later by handle.
//!
//! # Design Principles
//! - Stores see only opaque bytes; they never hold key material
//! - Async operations: all I/O goes through tokio
//! - Unified error semantics: missing handles are `NotFound` everywhere

pub mod local;
pub mod memory;
pub mod provider;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use provider::{open_store, BlobStore, StoreConfig};
