//! AES-256-CBC payload encryption with PKCS7 padding.
//!
//! Padding is always added, so the ciphertext of an `n`-byte plaintext is
//! `(n / 16 + 1) * 16` bytes. There is no integrity tag: tampering is only
//! detected when it breaks the padding of the final block.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use subtle::{Choice, ConstantTimeEq, ConstantTimeGreater, ConstantTimeLess};
use zeroize::Zeroize;

use crate::keys::{IV_LENGTH, KEY_LENGTH};
use sealbox_common::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Ciphertext length for a plaintext of `plaintext_len` bytes.
pub fn ciphertext_len(plaintext_len: usize) -> usize {
    (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Pad and encrypt `plaintext`.
///
/// # Postconditions
/// - Output length is `ciphertext_len(plaintext.len())`, a positive
///   multiple of BLOCK_SIZE
/// - A plaintext already on a block boundary gains a full block of `0x10`
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LENGTH], iv: &[u8; IV_LENGTH]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` and strip its padding.
///
/// # Errors
/// - `Padding` if the ciphertext is empty or not a whole number of blocks
/// - `Padding` if the decrypted padding is malformed (wrong key,
///   corruption, tampering)
pub fn decrypt(ciphertext: &[u8], key: &[u8; KEY_LENGTH], iv: &[u8; IV_LENGTH]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::Padding);
    }

    let mut buffer = ciphertext.to_vec();
    decrypt_blocks(&mut buffer, key, iv)?;

    match padding_len(&buffer) {
        Some(pad) => {
            buffer.truncate(buffer.len() - pad);
            Ok(buffer)
        }
        None => {
            buffer.zeroize();
            Err(Error::Padding)
        }
    }
}

/// Validate PKCS7 padding on a whole-block buffer and return its length.
///
/// The cipher's own `Pkcs7` unpadding branches on the padding bytes, so
/// decryption runs with `NoPadding` and the check happens here instead.
/// Every check runs over the full final block regardless of the claimed
/// length, so timing does not depend on where the padding goes wrong.
fn padding_len(buffer: &[u8]) -> Option<usize> {
    let last_block = &buffer[buffer.len() - BLOCK_SIZE..];
    let pad = last_block[BLOCK_SIZE - 1];

    let mut valid: Choice = !pad.ct_eq(&0) & !pad.ct_gt(&(BLOCK_SIZE as u8));
    for (offset, byte) in last_block.iter().rev().enumerate() {
        let covered = (offset as u8).ct_lt(&pad);
        valid &= !covered | byte.ct_eq(&pad);
    }

    if bool::from(valid) {
        Some(pad as usize)
    } else {
        None
    }
}

/// Decrypt whole blocks in place, leaving any padding for `padding_len`.
fn decrypt_blocks(buffer: &mut [u8], key: &[u8; KEY_LENGTH], iv: &[u8; IV_LENGTH]) -> Result<()> {
    Aes256CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_mut::<NoPadding>(buffer)
        .map_err(|_| Error::Padding)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: [u8; KEY_LENGTH] = [42u8; KEY_LENGTH];
    const IV: [u8; IV_LENGTH] = [24u8; IV_LENGTH];

    /// Encrypt a raw final block without adding padding.
    fn encrypt_raw(block: [u8; BLOCK_SIZE]) -> Vec<u8> {
        Aes256CbcEnc::new(&KEY.into(), &IV.into()).encrypt_padded_vec_mut::<NoPadding>(&block)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"Hello, World!";

        let ciphertext = encrypt(plaintext, &KEY, &IV);
        let decrypted = decrypt(&ciphertext, &KEY, &IV).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_hello_is_one_block() {
        let ciphertext = encrypt(b"hello", &KEY, &IV);
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(decrypt(&ciphertext, &KEY, &IV).unwrap(), b"hello");
    }

    #[test]
    fn test_full_block_gets_extra_padding_block() {
        let plaintext = [0xABu8; 16];
        let ciphertext = encrypt(&plaintext, &KEY, &IV);
        assert_eq!(ciphertext.len(), 32);

        // The extra block is all 0x10.
        let mut raw = ciphertext.clone();
        decrypt_blocks(&mut raw, &KEY, &IV).unwrap();
        assert_eq!(&raw[16..], &[16u8; 16]);
    }

    #[test]
    fn test_constant_time_unpad_agrees_with_pkcs7() {
        for len in [0usize, 1, 15, 16, 17, 31, 100] {
            let plaintext = vec![0x3Cu8; len];
            let ciphertext = encrypt(&plaintext, &KEY, &IV);

            let via_cipher = Aes256CbcDec::new(&KEY.into(), &IV.into())
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .unwrap();
            assert_eq!(via_cipher, plaintext);
            assert_eq!(decrypt(&ciphertext, &KEY, &IV).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_empty_plaintext() {
        let ciphertext = encrypt(b"", &KEY, &IV);
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(decrypt(&ciphertext, &KEY, &IV).unwrap(), b"");
    }

    #[test]
    fn test_matches_standard_cbc_pkcs7() {
        // NIST SP 800-38A F.2.5 first block, followed by a full PKCS7 block.
        let key: [u8; KEY_LENGTH] = [
            0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d,
            0x77, 0x81, 0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, 0x2d, 0x98, 0x10, 0xa3,
            0x09, 0x14, 0xdf, 0xf4,
        ];
        let iv: [u8; IV_LENGTH] = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ];
        let plaintext = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        let expected_first_block = [
            0xf5, 0x8c, 0x4c, 0x04, 0xd6, 0xe5, 0xf1, 0xba, 0x77, 0x9e, 0xab, 0xfb, 0x5f, 0x7b,
            0xfb, 0xd6,
        ];

        let ciphertext = encrypt(&plaintext, &key, &iv);
        assert_eq!(&ciphertext[..16], &expected_first_block);
    }

    #[test]
    fn test_wrong_key_fails_or_garbles() {
        let plaintext = b"Secret data that spans blocks";
        let ciphertext = encrypt(plaintext, &KEY, &IV);

        match decrypt(&ciphertext, &[1u8; KEY_LENGTH], &IV) {
            Ok(garbled) => assert_ne!(garbled, plaintext),
            Err(e) => assert!(matches!(e, Error::Padding)),
        }
    }

    #[test]
    fn test_misaligned_ciphertext_rejected() {
        assert!(matches!(decrypt(&[0u8; 15], &KEY, &IV), Err(Error::Padding)));
        assert!(matches!(decrypt(&[0u8; 17], &KEY, &IV), Err(Error::Padding)));
        assert!(matches!(decrypt(&[], &KEY, &IV), Err(Error::Padding)));
    }

    #[test]
    fn test_zero_padding_byte_rejected() {
        let mut block = [0x41u8; BLOCK_SIZE];
        block[15] = 0;
        assert!(matches!(decrypt(&encrypt_raw(block), &KEY, &IV), Err(Error::Padding)));
    }

    #[test]
    fn test_oversized_padding_byte_rejected() {
        let mut block = [17u8; BLOCK_SIZE];
        block[15] = 17;
        assert!(matches!(decrypt(&encrypt_raw(block), &KEY, &IV), Err(Error::Padding)));

        let block = [0xFFu8; BLOCK_SIZE];
        assert!(matches!(decrypt(&encrypt_raw(block), &KEY, &IV), Err(Error::Padding)));
    }

    #[test]
    fn test_inconsistent_padding_bytes_rejected() {
        let mut block = [0x41u8; BLOCK_SIZE];
        block[13] = 3;
        block[14] = 2;
        block[15] = 3;
        assert!(matches!(decrypt(&encrypt_raw(block), &KEY, &IV), Err(Error::Padding)));
    }

    #[test]
    fn test_full_padding_block_accepted() {
        let block = [16u8; BLOCK_SIZE];
        assert_eq!(decrypt(&encrypt_raw(block), &KEY, &IV).unwrap(), b"");
    }

    #[test]
    fn test_padding_len_boundaries() {
        let mut block = [0u8; BLOCK_SIZE];
        block[15] = 1;
        assert_eq!(padding_len(&block), Some(1));

        block = [16u8; BLOCK_SIZE];
        assert_eq!(padding_len(&block), Some(16));

        block[0] = 15;
        assert_eq!(padding_len(&block), None);
    }

    #[test]
    fn test_bit_flip_in_previous_block_breaks_padding() {
        // 20 bytes: final block holds 4 data bytes and twelve 0x0c.
        let plaintext = [0x55u8; 20];
        let mut ciphertext = encrypt(&plaintext, &KEY, &IV);
        assert_eq!(ciphertext.len(), 32);

        // Flipping the previous block's last byte flips the padding byte.
        ciphertext[15] ^= 0xFF;
        assert!(matches!(decrypt(&ciphertext, &KEY, &IV), Err(Error::Padding)));
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(plaintext in proptest::collection::vec(any::<u8>(), 0..600)) {
            let ciphertext = encrypt(&plaintext, &KEY, &IV);
            prop_assert_eq!(decrypt(&ciphertext, &KEY, &IV).unwrap(), plaintext);
        }

        #[test]
        fn ciphertext_length_invariant(len in 0usize..2048) {
            let ciphertext = encrypt(&vec![0u8; len], &KEY, &IV);
            prop_assert_eq!(ciphertext.len(), ciphertext_len(len));
            prop_assert_eq!(ciphertext.len() % BLOCK_SIZE, 0);
            prop_assert!(ciphertext.len() > len);
            prop_assert!(ciphertext.len() - len <= BLOCK_SIZE);
        }

        #[test]
        fn single_byte_corruption_never_returns_original(
            plaintext in proptest::collection::vec(any::<u8>(), 1..100),
            index in any::<proptest::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut ciphertext = encrypt(&plaintext, &KEY, &IV);
            let i = index.index(ciphertext.len());
            ciphertext[i] ^= flip;

            match decrypt(&ciphertext, &KEY, &IV) {
                Ok(garbled) => prop_assert_ne!(garbled, plaintext),
                Err(e) => prop_assert!(matches!(e, Error::Padding)),
            }
        }
    }
}
