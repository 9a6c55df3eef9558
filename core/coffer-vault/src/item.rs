//! Catalog entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored file in the vault catalog.
///
/// `original_file_name` is untrusted input preserved verbatim for export
/// prompts; `encrypted_file_name` is always generated by the vault
/// (`<uuid>.pvlt`) and is unique within the catalog, as is `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultItem {
    pub id: String,
    pub original_file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_extension: Option<String>,
    /// Informational; the ciphertext is the source of truth for content.
    pub original_byte_count: u64,
    pub added_at: DateTime<Utc>,
    /// Basename of the payload container under `files/`.
    pub encrypted_file_name: String,
}
