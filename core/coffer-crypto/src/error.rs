//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors surfaced by key derivation and AEAD operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("KDF iteration count must be positive")]
    InvalidIterations,

    #[error("derived key length must be positive")]
    InvalidKeyLength,

    #[error("combined blob too short: {0} bytes (minimum 28)")]
    Malformed(usize),

    #[error("authentication failed (wrong key or tampered data)")]
    AuthFailure,

    #[error("encryption failed: {0}")]
    Encryption(String),
}
