//! RSA-OAEP wrapping of the symmetric key bundle.
//!
//! OAEP uses SHA-256 for both the label hash and MGF1, with an empty
//! label. The wrapped output is always exactly the modulus length.

use rsa::Oaep;
use sha2::Sha256;

use crate::asymmetric::{PrivateKey, PublicKey};
use crate::random::{RandomSource, SourceRng};
use sealbox_common::{Error, Result, SensitiveBytes};

/// Encrypt `bundle` under `recipient`.
///
/// # Preconditions
/// - `bundle` must fit the OAEP payload limit of the key
///   (`PublicKey::max_wrap_len`)
///
/// # Postconditions
/// - Output length equals the recipient's modulus length
/// - Output is randomized; wrapping the same bundle twice differs
///
/// # Errors
/// - `Encryption` if the bundle is too long for the key or the RSA
///   operation fails
pub fn wrap_key(bundle: &[u8], recipient: &PublicKey, source: &dyn RandomSource) -> Result<Vec<u8>> {
    let limit = recipient.max_wrap_len();
    if bundle.len() > limit {
        return Err(Error::Encryption(format!(
            "Key bundle too long for OAEP: {} bytes, limit {}",
            bundle.len(),
            limit
        )));
    }

    let mut rng = SourceRng(source);
    recipient
        .as_rsa()
        .encrypt(&mut rng, Oaep::new::<Sha256>(), bundle)
        .map_err(|e| Error::Encryption(format!("Key wrapping failed: {}", e)))
}

/// Decrypt a wrapped bundle with `recipient`.
///
/// Uses blinded RSA decryption, so `source` is consumed for the blinding
/// factor.
///
/// # Errors
/// - `Decryption` for every failure: wrong length, wrong key, or bad OAEP
///   encoding all look the same
pub fn unwrap_key(
    wrapped: &[u8],
    recipient: &PrivateKey,
    source: &dyn RandomSource,
) -> Result<SensitiveBytes> {
    if wrapped.len() != recipient.modulus_len() {
        return Err(Error::Decryption);
    }

    let mut rng = SourceRng(source);
    recipient
        .as_rsa()
        .decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), wrapped)
        .map(SensitiveBytes::new)
        .map_err(|_| Error::Decryption)
}
