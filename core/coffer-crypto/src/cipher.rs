//! AES-256-GCM seal/open over small buffers.
//!
//! This is the only module that touches the cipher directly. Everything the
//! vault encrypts (the wrapped master key, the item catalog, every payload
//! chunk) goes through `seal`/`open` here.
//!
//! Ciphertext layout ("combined" form):
//!
//! ```text
//! [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
//! ```
//!
//! No associated data is used. A future on-disk version may bind AD (for
//! example an item id); the config `version` field reserves that change.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;

/// Size of the GCM nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Fixed overhead of a combined blob over its plaintext.
pub const SEAL_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

fn cipher_for(key: &SecretKey) -> Aes256Gcm {
    // A 32-byte key can never be the wrong length for AES-256.
    Aes256Gcm::new_from_slice(key.as_bytes()).expect("key is always 32 bytes")
}

/// Encrypt a plaintext with a fresh random nonce.
///
/// Returns the combined form. Two calls with identical inputs produce
/// different output because the nonce is drawn from the OS RNG per call.
pub fn seal(key: &SecretKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    seal_with_nonce(key, &nonce, plaintext)
}

/// Encrypt a plaintext with a caller-supplied nonce.
///
/// The caller is responsible for nonce uniqueness under this key. The chunk
/// codec uses this with deterministic per-chunk nonces so that a decoder can
/// verify each chunk sits at the position it was written for.
pub fn seal_with_nonce(
    key: &SecretKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let ciphertext = cipher_for(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt a combined blob produced by `seal`/`seal_with_nonce`.
///
/// Fails with `Malformed` when the input cannot even contain a nonce and a
/// tag, and `AuthFailure` when the tag does not verify. No partial
/// plaintext is ever returned.
pub fn open(key: &SecretKey, combined: &[u8]) -> CryptoResult<Vec<u8>> {
    if combined.len() < SEAL_OVERHEAD {
        return Err(CryptoError::Malformed(combined.len()));
    }

    let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
    cipher_for(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = SecretKey::generate();
        let combined = seal(&key, b"hello vault").unwrap();
        assert_eq!(combined.len(), b"hello vault".len() + SEAL_OVERHEAD);
        assert_eq!(open(&key, &combined).unwrap(), b"hello vault");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = SecretKey::generate();
        let combined = seal(&key, b"").unwrap();
        assert_eq!(combined.len(), SEAL_OVERHEAD);
        assert_eq!(open(&key, &combined).unwrap(), b"");
    }

    #[test]
    fn each_seal_produces_different_output() {
        let key = SecretKey::generate();
        let a = seal(&key, b"same input").unwrap();
        let b = seal(&key, b"same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_nonce_is_embedded() {
        let key = SecretKey::generate();
        let nonce = [7u8; NONCE_SIZE];
        let combined = seal_with_nonce(&key, &nonce, b"chunk").unwrap();
        assert_eq!(&combined[..NONCE_SIZE], &nonce);
        assert_eq!(open(&key, &combined).unwrap(), b"chunk");
    }

    #[test]
    fn short_blob_is_malformed() {
        let key = SecretKey::generate();
        let err = open(&key, &[0u8; SEAL_OVERHEAD - 1]).unwrap_err();
        assert!(matches!(err, CryptoError::Malformed(27)));
    }
}
