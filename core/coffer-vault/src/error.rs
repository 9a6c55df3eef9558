//! Vault error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in vault operations.
///
/// The unlock path deliberately collapses key-derivation, key-unwrap, and
/// catalog-decryption failures into `WrongPasswordOrCorrupt` so a caller
/// cannot tell which stage rejected the attempt.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault not initialized")]
    NotInitialized,

    #[error("vault already initialized")]
    AlreadyInitialized,

    #[error("vault is locked")]
    Locked,

    #[error("invalid vault config: {0}")]
    InvalidConfig(String),

    #[error("unsupported KDF algorithm: {0}")]
    UnsupportedKdf(String),

    #[error("wrong password or corrupt vault")]
    WrongPasswordOrCorrupt,

    #[error("too many failed unlock attempts; retry in {remaining_secs}s")]
    LockedOut { remaining_secs: u64 },

    #[error("not a vault container (bad magic)")]
    InvalidMagic,

    #[error("malformed container: {0}")]
    Malformed(String),

    #[error("unexpected end of container")]
    UnexpectedEof,

    #[error("trailing bytes after final chunk")]
    TrailingGarbage,

    #[error("chunk {index} nonce does not match its position")]
    NonceMismatch { index: u32 },

    #[error("plaintext size mismatch: header says {expected}, decoded {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("chunk authentication failed")]
    AuthFailure,

    #[error("chunk size must be between 1 and 2^31 - 1 bytes")]
    InvalidChunkSize,

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("payload written but catalog update failed; orphaned blob at {}", .0.display())]
    OrphanedPayload(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] coffer_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
