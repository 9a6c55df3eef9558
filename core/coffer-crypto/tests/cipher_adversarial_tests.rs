//! Adversarial tests for AES-256-GCM seal/open.
//!
//! Tests wrong-key decryption, per-byte tampering, nonce corruption,
//! truncation, and boundary conditions. These are the guarantees the vault
//! relies on for the wrapped master key, the catalog blob, and every
//! payload chunk.

use coffer_crypto::{open, seal, seal_with_nonce, CryptoError, SecretKey, SEAL_OVERHEAD};

// ── Wrong Key ──

#[test]
fn decrypt_with_wrong_key_fails() {
    let key_a = SecretKey::generate();
    let key_b = SecretKey::generate();

    let combined = seal(&key_a, b"sensitive payload bytes").unwrap();
    let err = open(&key_b, &combined).unwrap_err();
    assert!(matches!(err, CryptoError::AuthFailure));
}

// ── Tampering ──

#[test]
fn every_byte_position_tampering_detected() {
    let key = SecretKey::generate();
    let combined = seal(&key, b"integrity-protected data").unwrap();

    for i in 0..combined.len() {
        let mut tampered = combined.clone();
        tampered[i] ^= 0xFF;
        assert!(
            open(&key, &tampered).is_err(),
            "tampering at byte {i} should be detected"
        );
    }
}

#[test]
fn single_bit_flip_detected() {
    let key = SecretKey::generate();
    let mut combined = seal(&key, b"one bit matters").unwrap();
    let last = combined.len() - 1;
    combined[last] ^= 0x01;

    assert!(matches!(open(&key, &combined), Err(CryptoError::AuthFailure)));
}

#[test]
fn appended_bytes_detected() {
    let key = SecretKey::generate();
    let mut combined = seal(&key, b"original data").unwrap();
    combined.push(0xFF);

    assert!(open(&key, &combined).is_err());
}

#[test]
fn swapped_nonce_detected() {
    // Moving a valid ciphertext under a different nonce must fail.
    let key = SecretKey::generate();
    let a = seal_with_nonce(&key, &[1u8; 12], b"first").unwrap();
    let b = seal_with_nonce(&key, &[2u8; 12], b"second").unwrap();

    let mut spliced = Vec::new();
    spliced.extend_from_slice(&a[..12]);
    spliced.extend_from_slice(&b[12..]);
    assert!(open(&key, &spliced).is_err());
}

// ── Truncation ──

#[test]
fn truncated_ciphertext_fails() {
    let key = SecretKey::generate();
    let mut combined = seal(&key, b"data that will be truncated").unwrap();
    combined.truncate(combined.len() - 3);

    assert!(open(&key, &combined).is_err());
}

#[test]
fn below_minimum_length_is_malformed() {
    let key = SecretKey::generate();
    for len in 0..SEAL_OVERHEAD {
        let err = open(&key, &vec![0u8; len]).unwrap_err();
        assert!(
            matches!(err, CryptoError::Malformed(_)),
            "length {len} should be malformed"
        );
    }
}

#[test]
fn minimum_length_garbage_is_auth_failure() {
    // Exactly nonce + tag with no ciphertext parses but cannot verify.
    let key = SecretKey::generate();
    let err = open(&key, &[0u8; SEAL_OVERHEAD]).unwrap_err();
    assert!(matches!(err, CryptoError::AuthFailure));
}

// ── Properties ──

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn seal_open_always_roundtrips(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = SecretKey::generate();
            let combined = seal(&key, &plaintext).unwrap();
            prop_assert_eq!(open(&key, &combined).unwrap(), plaintext);
        }

        #[test]
        fn combined_length_is_plaintext_plus_overhead(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = SecretKey::generate();
            let combined = seal(&key, &plaintext).unwrap();
            prop_assert_eq!(combined.len(), plaintext.len() + SEAL_OVERHEAD);
        }
    }
}
