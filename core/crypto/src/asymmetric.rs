//! RSA key pairs and their exchange encodings.
//!
//! Private keys are encoded as PKCS8 PEM, public keys as
//! SubjectPublicKeyInfo PEM. For embedding in JSON or other text
//! protocols the PEM text is additionally base64-encoded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::random::{RandomSource, SourceRng};
use sealbox_common::{Error, Result};

/// Modulus size for generated keys.
pub const KEY_BITS: usize = 2048;

/// Public exponent for generated keys.
pub const PUBLIC_EXPONENT: u32 = 65537;

/// SHA-256 output length, which sets the OAEP overhead.
const OAEP_HASH_LEN: usize = 32;

/// Public half of a recipient key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Encode as SubjectPublicKeyInfo PEM.
    pub fn to_pem(&self) -> Result<String> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::KeyFormat(format!("Public key encoding failed: {}", e)))
    }

    /// Parse SubjectPublicKeyInfo PEM.
    pub fn from_pem(pem: &str) -> Result<Self> {
        RsaPublicKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|e| Error::KeyFormat(format!("Invalid public key: {}", e)))
    }

    /// Export as base64 of the PEM text.
    pub fn export_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_pem()?))
    }

    /// Import from base64 of the PEM text.
    ///
    /// # Errors
    /// - `KeyFormat` if the input is not base64, not UTF-8, or not a valid
    ///   public key PEM
    pub fn import_base64(encoded: &str) -> Result<Self> {
        let pem = decode_pem_text(encoded)?;
        Self::from_pem(&pem)
    }

    /// Modulus size in bytes; also the length of every wrapped bundle.
    pub fn modulus_len(&self) -> usize {
        self.0.size()
    }

    /// Largest plaintext RSA-OAEP/SHA-256 can wrap under this key.
    pub fn max_wrap_len(&self) -> usize {
        self.modulus_len().saturating_sub(2 * OAEP_HASH_LEN + 2)
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(rsa-{})", self.modulus_len() * 8)
    }
}

/// Private half of a recipient key pair. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Encode as unencrypted PKCS8 PEM.
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::KeyFormat(format!("Private key encoding failed: {}", e)))
    }

    /// Parse unencrypted PKCS8 PEM and check the key is consistent.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::KeyFormat(format!("Invalid private key: {}", e)))?;
        key.validate()
            .map_err(|e| Error::KeyFormat(format!("Inconsistent private key: {}", e)))?;
        Ok(Self(key))
    }

    /// Export as base64 of the PEM text.
    pub fn export_base64(&self) -> Result<Zeroizing<String>> {
        let pem = self.to_pem()?;
        Ok(Zeroizing::new(STANDARD.encode(pem.as_bytes())))
    }

    /// Import from base64 of the PEM text.
    ///
    /// # Errors
    /// - `KeyFormat` if the input is not base64, not UTF-8, or not a valid
    ///   PKCS8 private key PEM
    pub fn import_base64(encoded: &str) -> Result<Self> {
        let pem = decode_pem_text(encoded)?;
        Self::from_pem(&pem)
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    /// Modulus size in bytes.
    pub fn modulus_len(&self) -> usize {
        self.0.size()
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// A recipient identity: one public key, one private key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a fresh KEY_BITS key pair with exponent PUBLIC_EXPONENT.
    ///
    /// # Errors
    /// - `Encryption` if prime generation fails
    pub fn generate(source: &dyn RandomSource) -> Result<Self> {
        let mut rng = SourceRng(source);
        let exponent = BigUint::from(PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut rng, KEY_BITS, &exponent)
            .map_err(|e| Error::Encryption(format!("Key generation failed: {}", e)))?;

        debug!(bits = KEY_BITS, "Generated key pair");
        Ok(Self::from_private(PrivateKey(private)))
    }

    /// Rebuild a pair from its private half.
    pub fn from_private(private: PrivateKey) -> Self {
        Self {
            public: private.public_key(),
            private,
        }
    }

    /// Get the public key.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Get the private key.
    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    /// Split into public and private halves.
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

fn decode_pem_text(encoded: &str) -> Result<Zeroizing<String>> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::KeyFormat(format!("Invalid base64: {}", e)))?,
    );
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| Error::KeyFormat("Key PEM is not valid UTF-8".to_string()))?;
    Ok(Zeroizing::new(text.to_string()))
}

/// Key pairs shared by tests in this crate; 2048-bit keygen is slow.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::KeyPair;
    use crate::random::OsRandom;
    use std::sync::OnceLock;

    pub(crate) fn key_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate(&OsRandom).unwrap())
    }

    pub(crate) fn other_key_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate(&OsRandom).unwrap())
    }
}
