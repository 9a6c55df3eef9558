//! Password-protected file vault.
//!
//! A vault is a directory holding a plaintext config, an encrypted item
//! catalog, and one `PVLT1` container per stored file. A random 256-bit
//! master key encrypts everything; the master key itself is stored wrapped
//! under a key derived from the user's password, so a password change only
//! re-wraps the key and never touches payloads.
//!
//! The service is a three-state machine (uninitialized, locked, unlocked)
//! with one operation in flight at a time. The master key lives in memory
//! only while unlocked and is zeroized on lock.

mod cache;
mod config;
mod container;
mod error;
mod item;
mod store;

pub use cache::{CacheError, CacheResult, CredentialCache, MemoryCredentialCache};
pub use config::{KdfSection, VaultConfig, CONFIG_VERSION, KDF_ALGORITHM};
pub use container::{
    decrypt_file, decrypt_stream, encrypt_file, encrypt_stream, DEFAULT_CHUNK_SIZE, HEADER_LEN,
    MAGIC, NONCE_PREFIX_LEN,
};
pub use error::{VaultError, VaultResult};
pub use item::VaultItem;
pub use store::{CatalogStore, CATALOG_FILE, CONFIG_FILE, FILES_DIR};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use coffer_crypto::{derive_key, seal, KdfParams, Salt, SecretKey, KEY_SIZE};
use tracing::{debug, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

// ============================================================================
// Options and state
// ============================================================================

/// Construction-time tuning for a vault instance.
#[derive(Clone, Debug)]
pub struct VaultOptions {
    /// KDF parameters used when wrapping a key (create and password change).
    /// Unlock always uses the parameters recorded in the config.
    pub kdf: KdfParams,
    /// Plaintext chunk size for new payload containers.
    pub chunk_size: u32,
    /// Consecutive unlock failures that arm the lockout.
    pub lockout_threshold: u32,
    /// How long the lockout holds once armed.
    pub lockout_window: Duration,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            lockout_threshold: 5,
            lockout_window: Duration::from_secs(60),
        }
    }
}

/// Lifecycle state of a vault instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    /// No config on disk yet.
    Uninitialized,
    /// Config exists, master key not in memory.
    Locked,
    /// Master key held in memory.
    Unlocked,
}

struct VaultInner {
    master: Option<SecretKey>,
    items: Vec<VaultItem>,
    failed_unlocks: u32,
    lockout_until: Option<Instant>,
}

// ============================================================================
// Vault: lifecycle state machine over one vault directory
// ============================================================================

/// A single vault rooted at a caller-chosen directory.
///
/// All operations serialize on an internal mutex; at most one is in flight
/// per instance. Running two processes against one vault directory is not
/// supported.
pub struct Vault {
    root: PathBuf,
    store: CatalogStore,
    options: VaultOptions,
    cache: Option<Arc<dyn CredentialCache>>,
    inner: Mutex<VaultInner>,
}

impl Vault {
    /// Open a vault instance over `root`, creating the directory if needed.
    /// No keys are derived and no vault files are touched.
    pub fn open(root: impl Into<PathBuf>, options: VaultOptions) -> VaultResult<Self> {
        Self::open_with_cache_opt(root, options, None)
    }

    /// Like [`Vault::open`], with a credential cache the vault may use to
    /// persist the master key across processes. Cache failures are never
    /// fatal to vault operations.
    pub fn open_with_cache(
        root: impl Into<PathBuf>,
        options: VaultOptions,
        cache: Arc<dyn CredentialCache>,
    ) -> VaultResult<Self> {
        Self::open_with_cache_opt(root, options, Some(cache))
    }

    fn open_with_cache_opt(
        root: impl Into<PathBuf>,
        options: VaultOptions,
        cache: Option<Arc<dyn CredentialCache>>,
    ) -> VaultResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let store = CatalogStore::new(&root);
        Ok(Self {
            root,
            store,
            options,
            cache,
            inner: Mutex::new(VaultInner {
                master: None,
                items: Vec::new(),
                failed_unlocks: 0,
                lockout_until: None,
            }),
        })
    }

    /// Whether a config exists on disk.
    pub fn is_initialized(&self) -> bool {
        self.store.config_path().exists()
    }

    /// Whether the master key is currently held in memory.
    pub fn is_unlocked(&self) -> bool {
        self.lock_inner().master.is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VaultState {
        if self.lock_inner().master.is_some() {
            VaultState::Unlocked
        } else if self.is_initialized() {
            VaultState::Locked
        } else {
            VaultState::Uninitialized
        }
    }

    /// Snapshot of the current catalog. Empty when locked.
    pub fn items(&self) -> Vec<VaultItem> {
        self.lock_inner().items.clone()
    }

    // ------------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------------

    /// Create a fresh vault: generate salt and master key, wrap the master
    /// key under the password-derived KEK, persist config and an empty
    /// catalog. Ends unlocked.
    pub fn create_vault(&self, password: &[u8]) -> VaultResult<Vec<VaultItem>> {
        let mut inner = self.lock_inner();

        if self.is_initialized() {
            return Err(VaultError::AlreadyInitialized);
        }

        let salt = Salt::random();
        let master = SecretKey::generate();
        let wrapped = {
            let kek = derive_key(password, &salt, &self.options.kdf)?;
            seal(&kek, master.as_bytes())?
            // KEK zeroized on drop here
        };

        let config = VaultConfig::new(&salt, self.options.kdf.iterations, &wrapped);
        self.store.save_config(&config)?;
        self.store.save_items(&[], &master)?;

        self.publish_to_cache(&master);

        inner.master = Some(master);
        inner.items = Vec::new();
        inner.failed_unlocks = 0;
        inner.lockout_until = None;
        Ok(Vec::new())
    }

    /// Unlock with a password. Derivation, key unwrap, and catalog
    /// decryption failures all surface as `WrongPasswordOrCorrupt`; five
    /// consecutive failures arm a process-local lockout.
    pub fn unlock(&self, password: &[u8]) -> VaultResult<Vec<VaultItem>> {
        let mut inner = self.lock_inner();

        if let Some(until) = inner.lockout_until {
            let now = Instant::now();
            if now < until {
                return Err(VaultError::LockedOut {
                    remaining_secs: (until - now).as_secs().max(1),
                });
            }
            // Window elapsed: attempts start fresh.
            inner.lockout_until = None;
            inner.failed_unlocks = 0;
        }

        let config = self.store.load_config()?.ok_or(VaultError::NotInitialized)?;
        config.require_supported_kdf()?;

        match self.try_unlock(&config, password) {
            Ok((master, items)) => {
                inner.failed_unlocks = 0;
                inner.lockout_until = None;
                inner.items = items.clone();
                inner.master = Some(master);
                Ok(items)
            }
            Err(VaultError::Io(e)) => Err(VaultError::Io(e)),
            Err(VaultError::InvalidConfig(msg)) => Err(VaultError::InvalidConfig(msg)),
            Err(_) => {
                self.note_unlock_failure(&mut inner);
                Err(VaultError::WrongPasswordOrCorrupt)
            }
        }
    }

    /// Unlock using a key from the credential cache, if one is present and
    /// actually opens the catalog. Returns `Ok(None)`, staying locked,
    /// when there is no usable cached key.
    pub fn unlock_from_cache(&self) -> VaultResult<Option<Vec<VaultItem>>> {
        let mut inner = self.lock_inner();

        if !self.is_initialized() {
            return Err(VaultError::NotInitialized);
        }

        let Some(cache) = self.cache.as_deref() else {
            return Ok(None);
        };

        let secret = match cache.get(&self.cache_account()) {
            Ok(Some(secret)) => Zeroizing::new(secret),
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("credential cache read failed: {e}");
                return Ok(None);
            }
        };

        if secret.len() != KEY_SIZE {
            debug!("cached key has wrong length; ignoring");
            return Ok(None);
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&secret);
        let master = SecretKey::from_bytes(bytes);

        match self.store.load_items(&master) {
            Ok(items) => {
                inner.failed_unlocks = 0;
                inner.lockout_until = None;
                inner.items = items.clone();
                inner.master = Some(master);
                Ok(Some(items))
            }
            Err(VaultError::Io(e)) => Err(VaultError::Io(e)),
            Err(_) => {
                debug!("cached key does not open the catalog; ignoring");
                Ok(None)
            }
        }
    }

    /// Change the password: verify the current one, re-wrap the same master
    /// key under a fresh salt, and persist a config that keeps `version`
    /// and `createdAt`. Payload containers are untouched. Ends locked.
    pub fn change_password(&self, current: &[u8], new: &[u8]) -> VaultResult<()> {
        let mut inner = self.lock_inner();

        let config = self.store.load_config()?.ok_or(VaultError::NotInitialized)?;
        config.require_supported_kdf()?;

        let master = match self.try_unlock(&config, current) {
            Ok((master, _items)) => master,
            Err(VaultError::Io(e)) => return Err(VaultError::Io(e)),
            Err(VaultError::InvalidConfig(msg)) => return Err(VaultError::InvalidConfig(msg)),
            Err(_) => return Err(VaultError::WrongPasswordOrCorrupt),
        };

        let salt = Salt::random();
        let wrapped = {
            let kek = derive_key(new, &salt, &self.options.kdf)?;
            seal(&kek, master.as_bytes())?
        };

        let new_config = config.rewrapped(&salt, self.options.kdf.iterations, &wrapped);
        self.store.save_config(&new_config)?;

        // Caller re-unlocks with the new password.
        inner.master = None;
        inner.items.clear();
        Ok(())
    }

    /// Drop the master key from memory and purge the credential cache.
    pub fn lock(&self) {
        let mut inner = self.lock_inner();
        inner.master = None; // zeroized on drop
        inner.items.clear();
        drop(inner);

        if let Some(cache) = self.cache.as_deref() {
            if let Err(e) = cache.delete(&self.cache_account()) {
                warn!("credential cache purge failed: {e}");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Payload operations (require Unlocked)
    // ------------------------------------------------------------------------

    /// Encrypt the file at `source` into the vault and append a catalog
    /// entry. The catalog rewrite is persisted before this returns; if it
    /// fails, the freshly written payload is removed again so no orphan
    /// blob survives.
    pub fn add_file(&self, source: &Path) -> VaultResult<VaultItem> {
        let mut inner = self.lock_inner();
        let master = self.require_unlocked(&inner)?;

        let original_file_name = source
            .file_name()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name")
            })?
            .to_string_lossy()
            .into_owned();
        let original_file_extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        let encrypted_file_name = format!("{}.pvlt", Uuid::new_v4());
        let dest = self.store.payload_path(&encrypted_file_name)?;

        let byte_count =
            container::encrypt_file(&master, source, &dest, self.options.chunk_size)?;

        let item = VaultItem {
            id: Uuid::new_v4().to_string(),
            original_file_name,
            original_file_extension,
            original_byte_count: byte_count,
            added_at: Utc::now(),
            encrypted_file_name,
        };

        inner.items.push(item.clone());
        if let Err(save_err) = self.store.save_items(&inner.items, &master) {
            inner.items.pop();
            if let Err(remove_err) = fs::remove_file(&dest) {
                warn!(
                    "catalog save failed and payload cleanup failed too: {remove_err}"
                );
                return Err(VaultError::OrphanedPayload(dest));
            }
            return Err(save_err);
        }

        Ok(item)
    }

    /// Decrypt the payload of `item_id` to `dest`. The plaintext lands via
    /// temp-and-rename, so a tampered container leaves no output behind.
    pub fn export_item(&self, item_id: &str, dest: &Path) -> VaultResult<u64> {
        let inner = self.lock_inner();
        let master = self.require_unlocked(&inner)?;

        let item = inner
            .items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| VaultError::NotFound(item_id.to_string()))?;

        let source = self.store.payload_path(&item.encrypted_file_name)?;
        container::decrypt_file(&master, &source, dest)
    }

    /// Remove an item: delete its payload (best effort), then persist the
    /// shrunken catalog before returning.
    pub fn delete_item(&self, item_id: &str) -> VaultResult<()> {
        let mut inner = self.lock_inner();
        let master = self.require_unlocked(&inner)?;

        let index = inner
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| VaultError::NotFound(item_id.to_string()))?;
        let item = inner.items.remove(index);

        let payload = self.store.payload_path(&item.encrypted_file_name)?;
        if let Err(e) = fs::remove_file(&payload) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("payload removal failed for {}: {e}", item.encrypted_file_name);
            }
        }

        if let Err(save_err) = self.store.save_items(&inner.items, &master) {
            inner.items.insert(index, item);
            return Err(save_err);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, VaultInner> {
        // A poisoned mutex means a prior operation panicked mid-flight; the
        // in-memory state is still structurally sound, so keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The full unlock path: derive the KEK from the config's recorded
    /// parameters, unwrap the master key, decrypt the catalog. Stage
    /// failures are collapsed by the callers.
    fn try_unlock(
        &self,
        config: &VaultConfig,
        password: &[u8],
    ) -> VaultResult<(SecretKey, Vec<VaultItem>)> {
        let salt = config.salt()?;
        let iterations = config.iterations()?;
        let wrapped = config.wrapped_key()?;

        let kek = derive_key(password, &salt, &KdfParams { iterations })?;
        let master_bytes = Zeroizing::new(coffer_crypto::open(&kek, &wrapped)?);
        drop(kek);

        if master_bytes.len() != KEY_SIZE {
            return Err(VaultError::WrongPasswordOrCorrupt);
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&master_bytes);
        let master = SecretKey::from_bytes(bytes);

        let items = self.store.load_items(&master)?;
        Ok((master, items))
    }

    fn note_unlock_failure(&self, inner: &mut VaultInner) {
        inner.failed_unlocks += 1;
        if inner.failed_unlocks >= self.options.lockout_threshold {
            inner.lockout_until = Some(Instant::now() + self.options.lockout_window);
            warn!(
                attempts = inner.failed_unlocks,
                "consecutive unlock failures; vault locked out"
            );
        }
    }

    fn require_unlocked(&self, inner: &VaultInner) -> VaultResult<SecretKey> {
        // Cloned for the duration of the operation; zeroized on drop.
        match inner.master.clone() {
            Some(master) => Ok(master),
            None if self.is_initialized() => Err(VaultError::Locked),
            None => Err(VaultError::NotInitialized),
        }
    }

    fn publish_to_cache(&self, master: &SecretKey) {
        if let Some(cache) = self.cache.as_deref() {
            if let Err(e) = cache.put(&self.cache_account(), master.as_bytes()) {
                warn!("credential cache publish failed: {e}");
            }
        }
    }

    fn cache_account(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }
}
