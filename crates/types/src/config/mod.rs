// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for core Covenant Kernel components.
//!
//! Every knob has a serde default so that a minimal TOML document (or an
//! empty one) yields a working in-memory configuration.

use crate::app::KmsProviderKind;
use serde::{Deserialize, Serialize};

/// Selects the persistence backend for status lists and audit segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Volatile, in-process storage.
    Memory,
    /// One file per record under a configured directory.
    File,
    /// An embedded redb database.
    Database,
}

/// Configuration for the KMS provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmsConfig {
    /// Which provider implementation to construct.
    #[serde(default = "default_kms_provider")]
    pub provider: KmsProviderKind,
    /// AWS or GCP region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// GCP project identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// GCP key-ring name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ring: Option<String>,
    /// Directory for the local provider's key store.
    #[serde(default = "default_local_store_path")]
    pub local_store_path: String,
    /// Upper bound on a single KMS call, in milliseconds.
    #[serde(default = "default_kms_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            provider: default_kms_provider(),
            region: None,
            project_id: None,
            key_ring: None,
            local_store_path: default_local_store_path(),
            timeout_ms: default_kms_timeout_ms(),
        }
    }
}

fn default_kms_provider() -> KmsProviderKind {
    KmsProviderKind::Local
}
fn default_local_store_path() -> String {
    "./covenant-keys".to_string()
}
fn default_kms_timeout_ms() -> u64 {
    5000
}

/// Configuration for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Master switch. When off, `log` fails with `AUDIT_DISABLED`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When off, entries are protected by the hash chain only.
    #[serde(default = "default_true")]
    pub sign_entries: bool,
    /// The signing key id; required when `sign_entries` is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_id: Option<String>,
    /// Persistence backend for audit segments.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackendKind,
    /// Directory or database path for persistent backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Retention window in days; entries older than this are archived.
    /// `None` retains everything in the live segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
    /// Upper bound on a single storage operation, in milliseconds.
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sign_entries: true,
            signing_key_id: None,
            storage_backend: default_storage_backend(),
            storage_path: None,
            retention_days: None,
            timeout_ms: default_storage_timeout_ms(),
        }
    }
}

/// Configuration for the status-list engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusListConfig {
    /// Length of newly created lists.
    #[serde(default = "default_status_list_length")]
    pub default_length: usize,
    /// The issuer DID stamped on emitted credentials.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// URL prefix under which list credentials are published.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// The key used to sign emitted credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_id: Option<String>,
    /// Persistence backend for list records.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackendKind,
    /// Directory or database path for persistent backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Upper bound on a single storage operation, in milliseconds.
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StatusListConfig {
    fn default() -> Self {
        Self {
            default_length: default_status_list_length(),
            issuer: default_issuer(),
            base_url: default_base_url(),
            signing_key_id: None,
            storage_backend: default_storage_backend(),
            storage_path: None,
            timeout_ms: default_storage_timeout_ms(),
        }
    }
}

/// Configuration for the trust oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Minimum bond trust score required for write-class actions.
    #[serde(default = "default_trust_score_threshold_write")]
    pub trust_score_threshold_write: u8,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            trust_score_threshold_write: default_trust_score_threshold_write(),
        }
    }
}

/// Limits applied by the kernel façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of in-flight mutating operations before callers
    /// receive `CORE_OVERLOADED`.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_inflight: default_max_inflight(),
        }
    }
}

/// The aggregate kernel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CovenantConfig {
    /// KMS provider selection and settings.
    #[serde(default)]
    pub kms: KmsConfig,
    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Status-list engine settings.
    #[serde(default)]
    pub statuslist: StatusListConfig,
    /// Trust oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Façade limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_true() -> bool {
    true
}
fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::Memory
}
fn default_storage_timeout_ms() -> u64 {
    2000
}
fn default_status_list_length() -> usize {
    crate::DEFAULT_STATUS_LIST_LENGTH
}
fn default_issuer() -> String {
    "did:web:covenant.local".to_string()
}
fn default_base_url() -> String {
    "https://covenant.local/status".to_string()
}
fn default_trust_score_threshold_write() -> u8 {
    40
}
fn default_max_inflight() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: CovenantConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.kms.provider, KmsProviderKind::Local);
        assert!(cfg.audit.enabled);
        assert!(cfg.audit.sign_entries);
        assert_eq!(cfg.statuslist.default_length, 131_072);
        assert_eq!(cfg.oracle.trust_score_threshold_write, 40);
        assert_eq!(cfg.audit.timeout_ms, 2000);
        assert_eq!(cfg.kms.timeout_ms, 5000);
    }

    #[test]
    fn partial_toml_overrides_selected_fields() {
        let doc = r#"
            [audit]
            sign_entries = false
            storage_backend = "file"
            storage_path = "/var/lib/covenant/audit"
            retention_days = 90

            [statuslist]
            default_length = 8192
            issuer = "did:web:issuer.example.com"

            [oracle]
            trust_score_threshold_write = 55
        "#;
        let cfg: CovenantConfig = toml::from_str(doc).unwrap();
        assert!(!cfg.audit.sign_entries);
        assert_eq!(cfg.audit.storage_backend, StorageBackendKind::File);
        assert_eq!(cfg.audit.retention_days, Some(90));
        assert_eq!(cfg.statuslist.default_length, 8192);
        assert_eq!(cfg.oracle.trust_score_threshold_write, 55);
        // Untouched sections keep their defaults.
        assert!(cfg.audit.enabled);
        assert_eq!(cfg.limits.max_inflight, 256);
    }
}
