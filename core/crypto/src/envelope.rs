//! Hybrid envelope: seal a file for a recipient, open it with their key.
//!
//! Sealing draws fresh key material, encrypts the payload with it, and
//! wraps `key || iv` under the recipient's public key. The IV is also
//! kept in the clear so a client can fetch it without unwrapping.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::asymmetric::{PrivateKey, PublicKey};
use crate::keys::{SymmetricKeyMaterial, IV_LENGTH};
use crate::payload;
use crate::random::{OsRandom, RandomSource};
use crate::wrap::{unwrap_key, wrap_key};
use sealbox_common::{Error, Result};

/// A sealed file: ciphertext, wrapped key bundle, and the clear IV.
///
/// Serialized field names follow the service's JSON contract; bytes are
/// base64 text.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// AES-256-CBC ciphertext of the file.
    #[serde(rename = "encrypted_content", with = "b64")]
    pub encrypted_payload: Vec<u8>,
    /// RSA-OAEP ciphertext of `key || iv`.
    #[serde(rename = "encrypted_aes_key", with = "b64")]
    pub encrypted_key_bundle: Vec<u8>,
    /// Copy of the IV stored outside the wrapped bundle.
    #[serde(with = "b64_iv")]
    pub iv: [u8; IV_LENGTH],
}

impl EncryptedEnvelope {
    /// The metadata view: everything but the payload, as text.
    pub fn metadata(&self) -> EnvelopeMetadata {
        EnvelopeMetadata {
            encrypted_aes_key: STANDARD.encode(&self.encrypted_key_bundle),
            iv: STANDARD.encode(self.iv),
        }
    }

    /// Serialize to the JSON transport form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON transport form.
    ///
    /// # Errors
    /// - `Serialization` for malformed JSON, bad base64, or an IV that is
    ///   not IV_LENGTH bytes
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl std::fmt::Debug for EncryptedEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedEnvelope")
            .field("payload_len", &self.encrypted_payload.len())
            .field("key_bundle_len", &self.encrypted_key_bundle.len())
            .finish_non_exhaustive()
    }
}

/// Wrapped key and IV, base64-encoded, for client-side decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub encrypted_aes_key: String,
    pub iv: String,
}

impl EnvelopeMetadata {
    /// Reassemble a full envelope around `encrypted_payload`.
    ///
    /// # Errors
    /// - `Serialization` if either field is not valid base64
    /// - `InvalidInput` if the IV is not IV_LENGTH bytes
    pub fn with_payload(&self, encrypted_payload: Vec<u8>) -> Result<EncryptedEnvelope> {
        let encrypted_key_bundle = STANDARD
            .decode(&self.encrypted_aes_key)
            .map_err(|e| Error::Serialization(format!("Invalid encrypted key: {}", e)))?;
        let iv = STANDARD
            .decode(&self.iv)
            .map_err(|e| Error::Serialization(format!("Invalid IV: {}", e)))?;
        let iv = <[u8; IV_LENGTH]>::try_from(iv.as_slice()).map_err(|_| {
            Error::InvalidInput(format!(
                "Invalid IV length: expected {}, got {}",
                IV_LENGTH,
                iv.len()
            ))
        })?;

        Ok(EncryptedEnvelope {
            encrypted_payload,
            encrypted_key_bundle,
            iv,
        })
    }
}

/// Options for opening envelopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Reject envelopes whose clear IV differs from the wrapped one.
    ///
    /// Off by default: the wrapped IV is authoritative and a mismatch is
    /// only logged, so data from lenient encoders still opens.
    pub strict_iv: bool,
}

/// Seal/open orchestrator bound to a random source.
#[derive(Clone)]
pub struct HybridEnvelope {
    source: Arc<dyn RandomSource>,
    options: OpenOptions,
}

impl HybridEnvelope {
    /// Create an orchestrator drawing entropy from `source`.
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self {
            source,
            options: OpenOptions::default(),
        }
    }

    /// Set the options used by `open_file`.
    pub fn with_options(mut self, options: OpenOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the current open options.
    pub fn options(&self) -> OpenOptions {
        self.options
    }

    /// Seal `plaintext` for `recipient`.
    ///
    /// # Postconditions
    /// - Fresh key and IV are used; sealing the same input twice yields
    ///   different envelopes
    /// - The symmetric key is zeroized before returning
    ///
    /// # Errors
    /// - `Envelope(Encryption)` if wrapping fails
    pub fn seal_file(&self, plaintext: &[u8], recipient: &PublicKey) -> Result<EncryptedEnvelope> {
        let material = SymmetricKeyMaterial::generate(self.source.as_ref());
        let encrypted_payload = payload::encrypt(plaintext, material.key(), material.iv());

        let bundle = material.to_bundle();
        let encrypted_key_bundle =
            wrap_key(bundle.as_bytes(), recipient, self.source.as_ref()).map_err(Error::envelope)?;

        debug!(
            plaintext_len = plaintext.len(),
            ciphertext_len = encrypted_payload.len(),
            "Sealed payload"
        );

        Ok(EncryptedEnvelope {
            encrypted_payload,
            encrypted_key_bundle,
            iv: *material.iv(),
        })
    }

    /// Open `envelope` with `recipient`.
    ///
    /// The IV unwrapped from the key bundle is the one used for
    /// decryption, not the clear copy.
    ///
    /// # Errors
    /// All failures are wrapped in `Envelope`:
    /// - `Decryption` for a wrong key or corrupted key bundle, or an IV
    ///   mismatch when `strict_iv` is set
    /// - `KeyFormat` if the unwrapped bundle is not `key(32) || iv(16)`
    /// - `Padding` for a corrupted or tampered payload
    ///
    /// `Display` names the cause, so `Envelope(Decryption)` and
    /// `Envelope(Padding)` render differently. Do not forward that text to
    /// untrusted clients; report `is_integrity_failure()` as one generic
    /// failure instead.
    pub fn open_file(&self, envelope: &EncryptedEnvelope, recipient: &PrivateKey) -> Result<Vec<u8>> {
        self.open_inner(envelope, recipient).map_err(Error::envelope)
    }

    fn open_inner(&self, envelope: &EncryptedEnvelope, recipient: &PrivateKey) -> Result<Vec<u8>> {
        let bundle = unwrap_key(&envelope.encrypted_key_bundle, recipient, self.source.as_ref())?;
        let material = SymmetricKeyMaterial::from_bundle(bundle.as_bytes())?;

        if !bool::from(material.iv()[..].ct_eq(&envelope.iv[..])) {
            if self.options.strict_iv {
                return Err(Error::Decryption);
            }
            warn!("Stored IV differs from wrapped IV; using wrapped IV");
        }

        let plaintext = payload::decrypt(&envelope.encrypted_payload, material.key(), material.iv())?;

        debug!(plaintext_len = plaintext.len(), "Opened payload");
        Ok(plaintext)
    }
}

impl Default for HybridEnvelope {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

/// Seal with the operating-system random source.
pub fn seal_file(plaintext: &[u8], recipient: &PublicKey) -> Result<EncryptedEnvelope> {
    HybridEnvelope::default().seal_file(plaintext, recipient)
}

/// Open with default options.
pub fn open_file(envelope: &EncryptedEnvelope, recipient: &PrivateKey) -> Result<Vec<u8>> {
    HybridEnvelope::default().open_file(envelope, recipient)
}

mod b64 {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod b64_iv {
    use super::IV_LENGTH;

    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(iv: &[u8; IV_LENGTH], serializer: S) -> Result<S::Ok, S::Error> {
        super::b64::serialize(iv, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; IV_LENGTH], D::Error> {
        let bytes = super::b64::deserialize(deserializer)?;
        <[u8; IV_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid IV length: expected {}, got {}",
                IV_LENGTH,
                bytes.len()
            ))
        })
    }
}
