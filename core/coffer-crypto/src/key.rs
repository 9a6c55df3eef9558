//! Key material and password-based derivation.
//!
//! Holds the opaque key types (zeroized on drop) and the PBKDF2-HMAC-SHA256
//! derivation that turns a password into a key-encryption key. The KDF
//! algorithm label stored on disk is validated by the vault service, not
//! here; this module only knows how to run the one scheme it implements.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Size of a master or derived key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of a KDF salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Default PBKDF2 iteration count for new vaults.
const DEFAULT_ITERATIONS: u32 = 200_000;

// ---------------------------------------------------------------------------
// Salt
// ---------------------------------------------------------------------------

/// A 16-byte KDF salt. Generated fresh per vault and per password change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generate a random salt from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// KDF parameters
// ---------------------------------------------------------------------------

/// Tunable parameters for password derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 iteration count. Must be positive.
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Secret key
// ---------------------------------------------------------------------------

/// A 256-bit symmetric key: either the vault master key or a KEK derived
/// from a password. Zeroized on drop; raw bytes are exposed only through
/// `as_bytes` for use at the AEAD boundary.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Generate a random key from the OS RNG. Used once per vault to create
    /// the master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never reaches debug output.
        f.write_str("SecretKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive a 256-bit key-encryption key from a password.
///
/// PBKDF2-HMAC-SHA256 per RFC 8018. The same (password, salt, iterations)
/// always yields the same key; a fresh salt on every password change makes
/// old derivations worthless.
pub fn derive_key(password: &[u8], salt: &Salt, params: &KdfParams) -> CryptoResult<SecretKey> {
    let okm = derive_key_bytes(password, salt.as_bytes(), params.iterations, KEY_SIZE)?;
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&okm);
    Ok(SecretKey(bytes))
}

/// General-form PBKDF2-HMAC-SHA256: arbitrary salt and output length.
///
/// The output buffer is zeroized when dropped. Rejects a zero iteration
/// count (`InvalidIterations`) and a zero output length (`InvalidKeyLength`)
/// before touching the password.
pub fn derive_key_bytes(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_len: usize,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }
    if key_len == 0 {
        return Err(CryptoError::InvalidKeyLength);
    }

    let mut okm = Zeroizing::new(vec![0u8; key_len]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut okm);
    Ok(okm)
}
