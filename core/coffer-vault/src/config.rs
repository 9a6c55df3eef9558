//! On-disk vault configuration.
//!
//! `vault-config.json` is the single authenticator for the vault: it names
//! the KDF, carries the salt and iteration count, and holds the master key
//! sealed under the password-derived KEK. If the wrapped key opens, the
//! password is right; there is no secondary verifier.
//!
//! The file itself is plaintext JSON. Its integrity comes from the AEAD tag
//! on the wrapped key: tampering with any field that feeds key derivation
//! makes the unwrap fail.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use coffer_crypto::{Salt, SALT_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Config schema version this build reads and writes.
pub const CONFIG_VERSION: u32 = 1;

/// The only KDF label accepted at version 1. Future schemes land as new
/// labels under a bumped config version.
pub const KDF_ALGORITHM: &str = "PBKDF2-HMAC-SHA256";

/// Persisted vault configuration (schema version 1).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    pub version: u32,
    pub kdf: KdfSection,
    /// AES-GCM combined form of the master key under the KEK:
    /// nonce(12) ‖ ciphertext(32) ‖ tag(16), base64.
    pub wrapped_vault_key_b64: String,
    /// Informational; preserved verbatim across password changes.
    pub created_at: DateTime<Utc>,
}

/// KDF parameters as stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfSection {
    pub algorithm: String,
    pub salt_b64: String,
    pub iterations: u32,
}

impl VaultConfig {
    /// Assemble a fresh config around a newly wrapped master key.
    pub fn new(salt: &Salt, iterations: u32, wrapped_key: &[u8]) -> Self {
        Self {
            version: CONFIG_VERSION,
            kdf: KdfSection {
                algorithm: KDF_ALGORITHM.to_string(),
                salt_b64: STANDARD.encode(salt.as_bytes()),
                iterations,
            },
            wrapped_vault_key_b64: STANDARD.encode(wrapped_key),
            created_at: Utc::now(),
        }
    }

    /// Re-wrap for a password change: fresh salt and wrapped key, same
    /// schema version and creation timestamp.
    pub fn rewrapped(&self, salt: &Salt, iterations: u32, wrapped_key: &[u8]) -> Self {
        Self {
            version: self.version,
            kdf: KdfSection {
                algorithm: KDF_ALGORITHM.to_string(),
                salt_b64: STANDARD.encode(salt.as_bytes()),
                iterations,
            },
            wrapped_vault_key_b64: STANDARD.encode(wrapped_key),
            created_at: self.created_at,
        }
    }

    /// Decode the stored salt. 16 bytes, base64.
    pub fn salt(&self) -> VaultResult<Salt> {
        let bytes = STANDARD
            .decode(&self.kdf.salt_b64)
            .map_err(|e| VaultError::InvalidConfig(format!("malformed salt: {e}")))?;
        let arr: [u8; SALT_SIZE] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidConfig("salt is not 16 bytes".into()))?;
        Ok(Salt::from_bytes(arr))
    }

    /// Decode the wrapped master key blob.
    pub fn wrapped_key(&self) -> VaultResult<Vec<u8>> {
        STANDARD
            .decode(&self.wrapped_vault_key_b64)
            .map_err(|e| VaultError::InvalidConfig(format!("malformed wrapped key: {e}")))
    }

    /// Positive iteration count, validated before any derivation runs.
    pub fn iterations(&self) -> VaultResult<u32> {
        if self.kdf.iterations == 0 {
            return Err(VaultError::InvalidConfig("iteration count is zero".into()));
        }
        Ok(self.kdf.iterations)
    }

    /// Gate-check the schema version.
    pub fn require_known_version(&self) -> VaultResult<()> {
        if self.version != CONFIG_VERSION {
            return Err(VaultError::InvalidConfig(format!(
                "unknown config version {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Gate-check the KDF label. Runs before any key is derived so that an
    /// unsupported scheme never reaches the KDF.
    pub fn require_supported_kdf(&self) -> VaultResult<()> {
        if self.kdf.algorithm != KDF_ALGORITHM {
            return Err(VaultError::UnsupportedKdf(self.kdf.algorithm.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_match_on_disk_schema() {
        let cfg = VaultConfig::new(&Salt::from_bytes([1u8; 16]), 200_000, &[0u8; 60]);
        let json: serde_json::Value = serde_json::to_value(&cfg).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["kdf"]["algorithm"], KDF_ALGORITHM);
        assert!(json["kdf"]["saltB64"].is_string());
        assert_eq!(json["kdf"]["iterations"], 200_000);
        assert!(json["wrappedVaultKeyB64"].is_string());
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn salt_roundtrips_through_base64() {
        let salt = Salt::from_bytes(*b"sixteen bytes ok");
        let cfg = VaultConfig::new(&salt, 1, &[]);
        assert_eq!(cfg.salt().unwrap().as_bytes(), salt.as_bytes());
    }

    #[test]
    fn bad_base64_is_invalid_config() {
        let mut cfg = VaultConfig::new(&Salt::from_bytes([0u8; 16]), 1, &[]);
        cfg.kdf.salt_b64 = "!!not base64!!".into();
        assert!(matches!(cfg.salt(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn wrong_salt_length_is_invalid_config() {
        let mut cfg = VaultConfig::new(&Salt::from_bytes([0u8; 16]), 1, &[]);
        cfg.kdf.salt_b64 = STANDARD.encode([0u8; 8]);
        assert!(matches!(cfg.salt(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn foreign_algorithm_is_gated() {
        let mut cfg = VaultConfig::new(&Salt::from_bytes([0u8; 16]), 1, &[]);
        cfg.kdf.algorithm = "scrypt".into();
        match cfg.require_supported_kdf() {
            Err(VaultError::UnsupportedKdf(label)) => assert_eq!(label, "scrypt"),
            other => panic!("expected UnsupportedKdf, got {other:?}"),
        }
    }
}
