//! Common error types for sealbox.

use thiserror::Error;

/// Top-level error type for sealbox operations.
///
/// The first five variants form the cryptographic taxonomy. `Decryption`
/// and `Padding` deliberately carry no detail so that every failed unwrap
/// or unpad looks the same to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Key material could not be decoded or has the wrong shape.
    #[error("Key format error: {0}")]
    KeyFormat(String),

    /// An encryption step failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Asymmetric unwrap failed (wrong key or corrupted ciphertext).
    #[error("Decryption failed")]
    Decryption,

    /// Symmetric padding was invalid after decryption.
    #[error("Invalid padding")]
    Padding,

    /// Failure at the envelope boundary, wrapping the underlying cause.
    #[error("Envelope error: {0}")]
    Envelope(Box<Error>),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload exceeds the configured size limit.
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Operation did not complete within its deadline.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A worker task failed unexpectedly.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an error at the envelope boundary.
    ///
    /// Already-wrapped errors are returned unchanged so the cause chain
    /// never nests envelopes inside envelopes.
    pub fn envelope(cause: Error) -> Self {
        match cause {
            Error::Envelope(_) => cause,
            other => Error::Envelope(Box::new(other)),
        }
    }

    /// The innermost error, with any `Envelope` wrappers removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Envelope(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether the failure indicates wrong key material or tampered data.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self.root_cause(), Error::Decryption | Error::Padding)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
