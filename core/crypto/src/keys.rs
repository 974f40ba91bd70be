//! Per-file symmetric key material with secure memory handling.
//!
//! A fresh key and IV are drawn for every sealed file and zeroized when
//! dropped. The only copy that outlives an operation is the one wrapped
//! inside the envelope.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::random::RandomSource;
use sealbox_common::{Error, Result, SensitiveBytes};

/// Length of the payload key in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// Length of the CBC initialization vector in bytes.
pub const IV_LENGTH: usize = 16;

/// Length of the `key || iv` bundle that gets wrapped.
pub const BUNDLE_LENGTH: usize = KEY_LENGTH + IV_LENGTH;

/// Symmetric key and IV for a single payload.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKeyMaterial {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
}

impl SymmetricKeyMaterial {
    /// Draw a fresh key and IV from `source`.
    ///
    /// # Postconditions
    /// - Key is KEY_LENGTH random bytes, IV is IV_LENGTH random bytes
    /// - Nothing is remembered between calls; uniqueness comes from the
    ///   source, not from tracking issued values
    pub fn generate(source: &dyn RandomSource) -> Self {
        let mut material = Self {
            key: [0u8; KEY_LENGTH],
            iv: [0u8; IV_LENGTH],
        };
        source.fill_bytes(&mut material.key);
        source.fill_bytes(&mut material.iv);
        material
    }

    /// Create key material from raw parts.
    pub fn from_parts(key: [u8; KEY_LENGTH], iv: [u8; IV_LENGTH]) -> Self {
        Self { key, iv }
    }

    /// Split an unwrapped `key || iv` bundle.
    ///
    /// # Errors
    /// - `KeyFormat` if the bundle is not exactly BUNDLE_LENGTH bytes, which
    ///   would leave the key short or long
    pub fn from_bundle(bundle: &[u8]) -> Result<Self> {
        if bundle.len() != BUNDLE_LENGTH {
            return Err(Error::KeyFormat(format!(
                "Invalid key bundle length: expected {}, got {}",
                BUNDLE_LENGTH,
                bundle.len()
            )));
        }

        let mut material = Self {
            key: [0u8; KEY_LENGTH],
            iv: [0u8; IV_LENGTH],
        };
        material.key.copy_from_slice(&bundle[..KEY_LENGTH]);
        material.iv.copy_from_slice(&bundle[KEY_LENGTH..]);
        Ok(material)
    }

    /// Concatenate into the `key || iv` bundle.
    pub fn to_bundle(&self) -> SensitiveBytes {
        let mut bundle = Vec::with_capacity(BUNDLE_LENGTH);
        bundle.extend_from_slice(&self.key);
        bundle.extend_from_slice(&self.iv);
        SensitiveBytes::new(bundle)
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned reference should be used immediately and not stored.
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Get the IV bytes.
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }
}

impl fmt::Debug for SymmetricKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKeyMaterial([REDACTED])")
    }
}
