// Path: crates/core/src/config.rs

//! Configuration loading: TOML documents plus environment overrides.
//!
//! Deployment-specific values (paths, regions, key ids) commonly arrive
//! through the environment rather than the config file; the override set
//! here is the small enumeration of such knobs, prefixed `COVENANT_`.

use covenant_types::config::CovenantConfig;
use covenant_types::error::CoreError;
use std::path::Path;

/// Parses a TOML document into a configuration. Missing sections and
/// fields take their defaults.
pub fn from_toml_str(doc: &str) -> Result<CovenantConfig, CoreError> {
    toml::from_str(doc).map_err(|e| CoreError::InvalidInput(format!("config parse: {e}")))
}

/// Reads and parses a TOML configuration file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<CovenantConfig, CoreError> {
    let doc = std::fs::read_to_string(path.as_ref())
        .map_err(|e| CoreError::InvalidInput(format!("config read: {e}")))?;
    from_toml_str(&doc)
}

/// Applies `COVENANT_*` environment overrides on top of a parsed
/// configuration, returning the adjusted value.
pub fn apply_env_overrides(mut config: CovenantConfig) -> CovenantConfig {
    let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    if let Some(path) = from_env("COVENANT_KMS_LOCAL_STORE_PATH") {
        config.kms.local_store_path = path;
    }
    if let Some(region) = from_env("COVENANT_KMS_REGION") {
        config.kms.region = Some(region);
    }
    if let Some(project) = from_env("COVENANT_KMS_PROJECT_ID") {
        config.kms.project_id = Some(project);
    }
    if let Some(key_ring) = from_env("COVENANT_KMS_KEY_RING") {
        config.kms.key_ring = Some(key_ring);
    }
    if let Some(key_id) = from_env("COVENANT_AUDIT_SIGNING_KEY_ID") {
        config.audit.signing_key_id = Some(key_id);
    }
    if let Some(path) = from_env("COVENANT_AUDIT_STORAGE_PATH") {
        config.audit.storage_path = Some(path);
    }
    if let Some(key_id) = from_env("COVENANT_STATUSLIST_SIGNING_KEY_ID") {
        config.statuslist.signing_key_id = Some(key_id);
    }
    if let Some(path) = from_env("COVENANT_STATUSLIST_STORAGE_PATH") {
        config.statuslist.storage_path = Some(path);
    }
    if let Some(issuer) = from_env("COVENANT_STATUSLIST_ISSUER") {
        config.statuslist.issuer = issuer;
    }
    if let Some(base_url) = from_env("COVENANT_STATUSLIST_BASE_URL") {
        config.statuslist.base_url = base_url;
    }
    config
}

/// Loads a configuration file and applies environment overrides.
pub fn load(path: impl AsRef<Path>) -> Result<CovenantConfig, CoreError> {
    Ok(apply_env_overrides(from_toml_file(path)?))
}
