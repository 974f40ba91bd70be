//! Hybrid envelope encryption for sealbox.
//!
//! This crate provides:
//! - RSA-2048 key pairs with PKCS8 / SubjectPublicKeyInfo PEM export
//! - Fresh AES-256 keys and IVs per sealed file
//! - RSA-OAEP (SHA-256) wrapping of the key and IV bundle
//! - AES-256-CBC payload encryption with PKCS7 padding
//! - The seal/open orchestration tying the pieces together
//!
//! # Security Guarantees
//! - Symmetric key material is zeroized on drop
//! - No plaintext or key material is ever logged
//! - Unwrap and unpad failures have a uniform external shape
//! - Padding is validated in constant time
//!
//! # Limitations
//! CBC carries no integrity tag: a tampered payload is only detected when
//! the damage reaches the padding block.

pub mod asymmetric;
pub mod envelope;
pub mod keys;
pub mod payload;
pub mod random;
pub mod wrap;

pub use asymmetric::{KeyPair, PrivateKey, PublicKey};
pub use envelope::{
    open_file, seal_file, EncryptedEnvelope, EnvelopeMetadata, HybridEnvelope, OpenOptions,
};
pub use keys::SymmetricKeyMaterial;
pub use random::{OsRandom, RandomSource};
