//! Common utilities and types shared across sealbox crates.
//!
//! This crate holds the error taxonomy every layer reports through, plus
//! the handful of value types that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BlobHandle, FileId, SensitiveBytes};
