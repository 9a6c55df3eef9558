//! Catalog store: the two persisted artifacts under the vault directory.
//!
//! `vault-config.json` is plaintext JSON; `items.json.pvlt` is the item
//! array serialized to JSON and sealed as a single AES-GCM combined blob
//! under the master key. Both are replaced atomically (temp file in the
//! same directory, then rename). The store keeps no open handles; every
//! operation reopens its files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use coffer_crypto::SecretKey;
use tempfile::NamedTempFile;

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::item::VaultItem;

/// Basename of the plaintext config file.
pub const CONFIG_FILE: &str = "vault-config.json";

/// Basename of the sealed catalog blob.
pub const CATALOG_FILE: &str = "items.json.pvlt";

/// Subdirectory holding payload containers.
pub const FILES_DIR: &str = "files";

/// File-backed store for the vault config and item catalog.
pub struct CatalogStore {
    root: PathBuf,
}

impl CatalogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    /// Resolve a payload basename under `files/`, creating the directory
    /// on first use.
    pub fn payload_path(&self, encrypted_file_name: &str) -> VaultResult<PathBuf> {
        let dir = self.root.join(FILES_DIR);
        fs::create_dir_all(&dir)?;
        Ok(dir.join(encrypted_file_name))
    }

    /// Load the vault config, or `None` when the vault is uninitialized.
    pub fn load_config(&self) -> VaultResult<Option<VaultConfig>> {
        let bytes = match fs::read(self.config_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let config: VaultConfig = serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::InvalidConfig(e.to_string()))?;
        config.require_known_version()?;
        Ok(Some(config))
    }

    /// Atomically replace the vault config.
    pub fn save_config(&self, config: &VaultConfig) -> VaultResult<()> {
        let json = serde_json::to_vec_pretty(config)?;
        self.write_atomic(&self.config_path(), &json)
    }

    /// Load and decrypt the item catalog. A missing catalog is an empty
    /// vault; a failed AEAD open means the key is wrong or the blob was
    /// tampered with; the two cases are indistinguishable.
    pub fn load_items(&self, master: &SecretKey) -> VaultResult<Vec<VaultItem>> {
        let sealed = match fs::read(self.catalog_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let json = coffer_crypto::open(master, &sealed)
            .map_err(|_| VaultError::WrongPasswordOrCorrupt)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Serialize, seal, and atomically replace the item catalog.
    pub fn save_items(&self, items: &[VaultItem], master: &SecretKey) -> VaultResult<()> {
        let json = serde_json::to_vec(items)?;
        let sealed = coffer_crypto::seal(master, &json)?;
        self.write_atomic(&self.catalog_path(), &sealed)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> VaultResult<()> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent")
        })?;
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path).map_err(|e| VaultError::Io(e.error))?;
        Ok(())
    }
}
