// Path: crates/kms/src/local/record.rs

//! The on-disk record format of the local provider.

use covenant_types::app::KeyMetadata;
use covenant_types::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One key as persisted: metadata plus every version's sealed material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Descriptive metadata; mirrors what `get_key` returns.
    pub metadata: KeyMetadata,
    /// Free-form tags recorded at creation.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Versions, oldest first. The last entry is the signing version.
    pub versions: Vec<KeyVersion>,
}

impl KeyRecord {
    /// The version that produces new signatures (and seals new ciphertext).
    pub fn current_version(&self) -> Option<&KeyVersion> {
        self.versions.last()
    }
}

/// One generation of key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyVersion {
    /// Monotonic version number, starting at 1.
    pub version: u32,
    /// Standard-base64 public key; `None` for symmetric keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_b64: Option<String>,
    /// Standard-base64 sealed private material.
    pub sealed_private_b64: String,
    /// When this version was generated.
    pub created_at: Timestamp,
}
