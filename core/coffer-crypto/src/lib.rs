//! Cryptographic primitives for the coffer vault.
//!
//! Provides password-based key derivation and authenticated encryption:
//! - PBKDF2-HMAC-SHA256 for deriving a key-encryption key from a password
//! - AES-256-GCM for authenticated encryption of keys, catalogs, and chunks
//! - Opaque key types that are zeroized on drop
//!
//! # Architecture
//!
//! The vault uses a two-tier key system:
//!
//! 1. **Key-encryption key (KEK)**: Derived from the user's password with
//!    PBKDF2. Never stored; it exists only for the moment a master key is
//!    wrapped or unwrapped.
//!
//! 2. **Master key**: A random 256-bit key generated once per vault. It is
//!    stored wrapped (AES-GCM sealed) under the KEK and encrypts everything
//!    else: the item catalog and every payload chunk.
//!
//! This split allows changing the password without re-encrypting any
//! payload: only the wrapped master key is re-sealed under a new KEK.
//!
//! All ciphertext produced by this crate is in *combined* form:
//! `nonce(12) ‖ ciphertext ‖ tag(16)` as a single byte string.

mod cipher;
mod error;
mod key;

pub use cipher::{open, seal, seal_with_nonce, NONCE_SIZE, SEAL_OVERHEAD, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, derive_key_bytes, KdfParams, Salt, SecretKey, KEY_SIZE, SALT_SIZE,
};
