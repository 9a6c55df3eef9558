//! Optional credential cache capability.
//!
//! A host may hand the vault a cache (an OS keychain, typically) so the
//! master key survives process restarts without re-entering the password.
//! The vault treats every cache failure as non-fatal: `put` and `delete`
//! are best-effort, and a cached key that cannot open the catalog is the
//! same as no cached key.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors reported by a credential cache backend.
#[derive(Debug, Error)]
#[error("credential cache error: {0}")]
pub struct CacheError(pub String);

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// A place to stash the raw master key, keyed by account identifier.
///
/// Implementations wrap whatever secret storage the platform offers. The
/// vault never interprets a `get` miss or any error as fatal.
pub trait CredentialCache: Send + Sync {
    fn put(&self, account: &str, secret: &[u8]) -> CacheResult<()>;

    /// `Ok(None)` when there is no entry for `account`.
    fn get(&self, account: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Deleting an absent entry is a success.
    fn delete(&self, account: &str) -> CacheResult<()>;
}

/// In-memory cache for tests and cache-less hosts.
#[derive(Default)]
pub struct MemoryCredentialCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCredentialCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialCache for MemoryCredentialCache {
    fn put(&self, account: &str, secret: &[u8]) -> CacheResult<()> {
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        entries.insert(account.to_string(), secret.to_vec());
        Ok(())
    }

    fn get(&self, account: &str) -> CacheResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        Ok(entries.get(account).cloned())
    }

    fn delete(&self, account: &str) -> CacheResult<()> {
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        entries.remove(account);
        Ok(())
    }
}
