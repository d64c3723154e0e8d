// Path: crates/kms/src/local/mod.rs

//! The file-backed local KMS provider.
//!
//! Keys live as one JSON record per key under a configured directory.
//! Private material is sealed at rest with AES-256-GCM under a
//! key-encryption key held in `master.key` beside the records; it is
//! unsealed only inside a sign/decrypt call and zeroized immediately after.
//!
//! Rotation is modeled as key versions: the newest version signs, every
//! version verifies. Records are rewritten atomically after each mutation
//! so a crash never leaves a torn record.

mod record;

use async_trait::async_trait;
use covenant_api::kms::{KmsProvider, MIN_DELETION_WINDOW_DAYS};
use covenant_crypto::{seal, sign as suites};
use covenant_types::app::{
    CreateKeyRequest, KeyAlgorithm, KeyMetadata, KeyState, KeyUsage, KmsProviderKind, MessageType,
    PublicKeyMaterial,
};
use covenant_types::codec::{b64_decode, b64_encode};
use covenant_types::error::KmsError;
use covenant_types::time::Timestamp;
use record::{KeyRecord, KeyVersion};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;
use zeroize::Zeroizing;

const MASTER_KEY_FILE: &str = "master.key";

/// A [`KmsProvider`] storing keys under a local directory.
pub struct LocalKmsProvider {
    dir: PathBuf,
    kek: Zeroizing<[u8; seal::KEK_LEN]>,
    records: Mutex<HashMap<String, KeyRecord>>,
}

impl LocalKmsProvider {
    /// Opens (creating if needed) a key store rooted at `dir`.
    ///
    /// A fresh store generates its key-encryption key on first open.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, KmsError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| KmsError::Io(format!("create key store: {e}")))?;

        let kek = Self::load_or_create_kek(&dir)?;
        let records = Self::load_records(&dir)?;
        Ok(Self {
            dir,
            kek,
            records: Mutex::new(records),
        })
    }

    fn load_or_create_kek(dir: &Path) -> Result<Zeroizing<[u8; seal::KEK_LEN]>, KmsError> {
        let path = dir.join(MASTER_KEY_FILE);
        if path.exists() {
            let bytes = fs::read(&path).map_err(|e| KmsError::Io(format!("read master key: {e}")))?;
            let kek: [u8; seal::KEK_LEN] = bytes.as_slice().try_into().map_err(|_| {
                KmsError::MalformedKeyMaterial(format!(
                    "master key must be {} bytes, got {}",
                    seal::KEK_LEN,
                    bytes.len()
                ))
            })?;
            return Ok(Zeroizing::new(kek));
        }
        let kek = seal::generate_kek();
        fs::write(&path, kek.as_slice()).map_err(|e| KmsError::Io(format!("write master key: {e}")))?;
        Ok(kek)
    }

    fn load_records(dir: &Path) -> Result<HashMap<String, KeyRecord>, KmsError> {
        let mut records = HashMap::new();
        let entries =
            fs::read_dir(dir).map_err(|e| KmsError::Io(format!("read key store: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| KmsError::Io(format!("read key store entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes =
                fs::read(&path).map_err(|e| KmsError::Io(format!("read key record: {e}")))?;
            let record: KeyRecord = serde_json::from_slice(&bytes).map_err(|e| {
                KmsError::MalformedKeyMaterial(format!("key record {}: {e}", path.display()))
            })?;
            records.insert(record.metadata.key_id.clone(), record);
        }
        Ok(records)
    }

    fn persist(&self, record: &KeyRecord) -> Result<(), KmsError> {
        let path = self.dir.join(format!("{}.json", record.metadata.key_id));
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| KmsError::Io(format!("encode key record: {e}")))?;
        fs::write(&tmp, &bytes).map_err(|e| KmsError::Io(format!("write key record: {e}")))?;
        fs::rename(&tmp, &path).map_err(|e| KmsError::Io(format!("rename key record: {e}")))?;
        Ok(())
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, KeyRecord>>, KmsError> {
        self.records
            .lock()
            .map_err(|_| KmsError::Provider("key store lock poisoned".into()))
    }

    /// Resolves an id or alias to the owning key id.
    fn resolve_id(records: &HashMap<String, KeyRecord>, key_id: &str) -> Option<String> {
        if records.contains_key(key_id) {
            return Some(key_id.to_string());
        }
        records
            .values()
            .find(|r| r.metadata.alias.as_deref() == Some(key_id))
            .map(|r| r.metadata.key_id.clone())
    }

    /// Advances `pending_deletion` keys whose window has lapsed. The
    /// transition is terminal and drops the sealed material.
    fn advance_if_expired(record: &mut KeyRecord) {
        if record.metadata.state != KeyState::PendingDeletion {
            return;
        }
        let lapsed = record
            .metadata
            .deletion_scheduled_for
            .map(|t| t.is_before(&Timestamp::now()))
            .unwrap_or(false);
        if lapsed {
            record.metadata.state = KeyState::Destroyed;
            record.metadata.deletion_scheduled_for = None;
            record.versions.clear();
        }
    }

    fn with_record<T>(
        &self,
        key_id: &str,
        f: impl FnOnce(&mut KeyRecord) -> Result<T, KmsError>,
    ) -> Result<T, KmsError> {
        let mut records = self.locked()?;
        let id = Self::resolve_id(&records, key_id)
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        Self::advance_if_expired(record);
        let out = f(record)?;
        self.persist(record)?;
        Ok(out)
    }

    fn read_record<T>(
        &self,
        key_id: &str,
        f: impl FnOnce(&KeyRecord) -> Result<T, KmsError>,
    ) -> Result<T, KmsError> {
        let mut records = self.locked()?;
        let id = Self::resolve_id(&records, key_id)
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        Self::advance_if_expired(record);
        f(record)
    }

    fn new_version(
        &self,
        algorithm: KeyAlgorithm,
        usage: KeyUsage,
        version: u32,
    ) -> Result<KeyVersion, KmsError> {
        match usage {
            KeyUsage::SignVerify => {
                let pair = suites::generate_keypair(algorithm)?;
                Ok(KeyVersion {
                    version,
                    public_key_b64: Some(b64_encode(&pair.public)),
                    sealed_private_b64: b64_encode(&seal::seal(&self.kek, &pair.private)?),
                    created_at: Timestamp::now(),
                })
            }
            KeyUsage::EncryptDecrypt | KeyUsage::WrapUnwrap => {
                if algorithm != KeyAlgorithm::Aes256 {
                    return Err(KmsError::UnsupportedAlgorithm(format!(
                        "{algorithm} cannot be used for {usage}"
                    )));
                }
                let secret = seal::generate_kek();
                Ok(KeyVersion {
                    version,
                    public_key_b64: None,
                    sealed_private_b64: b64_encode(&seal::seal(&self.kek, secret.as_slice())?),
                    created_at: Timestamp::now(),
                })
            }
        }
    }

    fn unseal_version(&self, version: &KeyVersion) -> Result<Zeroizing<Vec<u8>>, KmsError> {
        let sealed = b64_decode(&version.sealed_private_b64)
            .map_err(|e| KmsError::MalformedKeyMaterial(e.to_string()))?;
        seal::open(&self.kek, &sealed)
    }

    fn require_enabled(record: &KeyRecord) -> Result<(), KmsError> {
        match record.metadata.state {
            KeyState::Enabled => Ok(()),
            state => Err(KmsError::KeyDisabled {
                key_id: record.metadata.key_id.clone(),
                state: state.to_string(),
            }),
        }
    }

    fn require_usage(record: &KeyRecord, usage: KeyUsage, operation: &str) -> Result<(), KmsError> {
        if record.metadata.usage != usage {
            return Err(KmsError::AlgorithmMismatch {
                key_id: record.metadata.key_id.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KmsProvider for LocalKmsProvider {
    fn kind(&self) -> KmsProviderKind {
        KmsProviderKind::Local
    }

    async fn create_key(&self, request: CreateKeyRequest) -> Result<KeyMetadata, KmsError> {
        if request.usage == KeyUsage::SignVerify && !request.algorithm.is_asymmetric_signing() {
            return Err(KmsError::UnsupportedAlgorithm(format!(
                "{} cannot be used for sign_verify",
                request.algorithm
            )));
        }

        let mut records = self.locked()?;
        if let Some(alias) = &request.alias {
            if records
                .values()
                .any(|r| r.metadata.alias.as_deref() == Some(alias.as_str()))
            {
                return Err(KmsError::AliasInUse(alias.clone()));
            }
        }

        let key_id = format!("local-{}", Uuid::new_v4());
        let version = self.new_version(request.algorithm, request.usage, 1)?;
        let record = KeyRecord {
            metadata: KeyMetadata {
                key_id: key_id.clone(),
                alias: request.alias.clone(),
                algorithm: request.algorithm,
                usage: request.usage,
                state: KeyState::Enabled,
                created_at: Timestamp::now(),
                provider: KmsProviderKind::Local,
                provider_resource_ref: Some(format!("file://{}/{key_id}.json", self.dir.display())),
                deletion_scheduled_for: None,
            },
            tags: request.tags.clone(),
            versions: vec![version],
        };
        self.persist(&record)?;
        let metadata = record.metadata.clone();
        records.insert(key_id.clone(), record);
        tracing::info!(key_id = %key_id, algorithm = %request.algorithm, "created local key");
        Ok(metadata)
    }

    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.read_record(key_id, |r| Ok(r.metadata.clone()))
    }

    async fn list_keys(&self) -> Result<Vec<KeyMetadata>, KmsError> {
        let mut records = self.locked()?;
        let mut keys: Vec<KeyMetadata> = records
            .values_mut()
            .map(|r| {
                Self::advance_if_expired(r);
                r.metadata.clone()
            })
            .collect();
        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        Ok(keys)
    }

    async fn enable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.with_record(key_id, |record| {
            match record.metadata.state {
                KeyState::Enabled | KeyState::Disabled | KeyState::PendingDeletion => {
                    record.metadata.state = KeyState::Enabled;
                    record.metadata.deletion_scheduled_for = None;
                    Ok(record.metadata.clone())
                }
                KeyState::Destroyed => Err(KmsError::InvalidKeyState {
                    key_id: record.metadata.key_id.clone(),
                    from: record.metadata.state.to_string(),
                    operation: "enable_key".to_string(),
                }),
            }
        })
    }

    async fn disable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.with_record(key_id, |record| match record.metadata.state {
            KeyState::Enabled | KeyState::Disabled => {
                record.metadata.state = KeyState::Disabled;
                Ok(record.metadata.clone())
            }
            _ => Err(KmsError::InvalidKeyState {
                key_id: record.metadata.key_id.clone(),
                from: record.metadata.state.to_string(),
                operation: "disable_key".to_string(),
            }),
        })
    }

    async fn schedule_key_deletion(
        &self,
        key_id: &str,
        pending_window_days: u32,
    ) -> Result<KeyMetadata, KmsError> {
        if pending_window_days < MIN_DELETION_WINDOW_DAYS {
            return Err(KmsError::InvalidDeletionWindow(pending_window_days));
        }
        self.with_record(key_id, |record| match record.metadata.state {
            KeyState::Enabled | KeyState::Disabled | KeyState::PendingDeletion => {
                let window_ms = i64::from(pending_window_days) * 24 * 60 * 60 * 1000;
                let deadline =
                    Timestamp::from_unix_millis(Timestamp::now().unix_millis() + window_ms);
                record.metadata.state = KeyState::PendingDeletion;
                record.metadata.deletion_scheduled_for = deadline;
                Ok(record.metadata.clone())
            }
            KeyState::Destroyed => Err(KmsError::InvalidKeyState {
                key_id: record.metadata.key_id.clone(),
                from: record.metadata.state.to_string(),
                operation: "schedule_key_deletion".to_string(),
            }),
        })
    }

    async fn cancel_key_deletion(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.with_record(key_id, |record| match record.metadata.state {
            KeyState::PendingDeletion => {
                record.metadata.state = KeyState::Disabled;
                record.metadata.deletion_scheduled_for = None;
                Ok(record.metadata.clone())
            }
            _ => Err(KmsError::InvalidKeyState {
                key_id: record.metadata.key_id.clone(),
                from: record.metadata.state.to_string(),
                operation: "cancel_key_deletion".to_string(),
            }),
        })
    }

    async fn rotate_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        let (algorithm, usage, next) = self.read_record(key_id, |record| {
            Self::require_enabled(record)?;
            let next = record.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
            Ok((record.metadata.algorithm, record.metadata.usage, next))
        })?;
        let version = self.new_version(algorithm, usage, next)?;
        self.with_record(key_id, move |record| {
            Self::require_enabled(record)?;
            record.versions.push(version);
            tracing::info!(key_id = %record.metadata.key_id, version = next, "rotated local key");
            Ok(record.metadata.clone())
        })
    }

    async fn sign(
        &self,
        key_id: &str,
        message: &[u8],
        message_type: MessageType,
    ) -> Result<Vec<u8>, KmsError> {
        let (algorithm, private) = self.read_record(key_id, |record| {
            Self::require_enabled(record)?;
            Self::require_usage(record, KeyUsage::SignVerify, "sign")?;
            let version = record
                .current_version()
                .ok_or_else(|| KmsError::KeyNotFound(record.metadata.key_id.clone()))?;
            Ok((record.metadata.algorithm, self.unseal_version(version)?))
        })?;
        suites::sign(algorithm, &private, message, message_type)
    }

    async fn verify(
        &self,
        key_id: &str,
        message: &[u8],
        signature: &[u8],
        message_type: MessageType,
    ) -> Result<bool, KmsError> {
        let (algorithm, publics) = self.read_record(key_id, |record| {
            Self::require_usage(record, KeyUsage::SignVerify, "verify")?;
            if record.metadata.state == KeyState::Destroyed {
                return Err(KmsError::KeyDisabled {
                    key_id: record.metadata.key_id.clone(),
                    state: record.metadata.state.to_string(),
                });
            }
            let mut publics = Vec::new();
            for version in record.versions.iter().rev() {
                if let Some(b64) = &version.public_key_b64 {
                    publics.push(
                        b64_decode(b64).map_err(|e| KmsError::MalformedKeyMaterial(e.to_string()))?,
                    );
                }
            }
            Ok((record.metadata.algorithm, publics))
        })?;

        // Every version is tried so rotated-out keys keep verifying. The
        // result is accumulated without early exit on verification failure.
        let mut valid = false;
        for public in &publics {
            valid |= suites::verify(algorithm, public, message, signature, message_type)?;
        }
        Ok(valid)
    }

    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        self.read_record(key_id, |record| {
            Self::require_enabled(record)?;
            Self::require_usage(record, KeyUsage::EncryptDecrypt, "encrypt")?;
            let version = record
                .current_version()
                .ok_or_else(|| KmsError::KeyNotFound(record.metadata.key_id.clone()))?;
            let secret = self.unseal_version(version)?;
            let key: [u8; seal::KEK_LEN] = secret.as_slice().try_into().map_err(|_| {
                KmsError::MalformedKeyMaterial("stored AES key has wrong length".into())
            })?;
            seal::seal(&key, plaintext)
        })
    }

    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        self.read_record(key_id, |record| {
            Self::require_enabled(record)?;
            Self::require_usage(record, KeyUsage::EncryptDecrypt, "decrypt")?;
            // Older versions are tried as well: ciphertext sealed before a
            // rotation must stay readable.
            let mut last_err =
                KmsError::MalformedKeyMaterial("key has no usable versions".into());
            for version in record.versions.iter().rev() {
                let secret = self.unseal_version(version)?;
                let key: [u8; seal::KEK_LEN] = match secret.as_slice().try_into() {
                    Ok(key) => key,
                    Err(_) => continue,
                };
                match seal::open(&key, ciphertext) {
                    Ok(plaintext) => return Ok(plaintext.to_vec()),
                    Err(e) => last_err = e,
                }
            }
            Err(last_err)
        })
    }

    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyMaterial, KmsError> {
        self.read_record(key_id, |record| {
            if record.metadata.state == KeyState::Destroyed {
                return Err(KmsError::KeyDisabled {
                    key_id: record.metadata.key_id.clone(),
                    state: record.metadata.state.to_string(),
                });
            }
            let version = record
                .current_version()
                .ok_or_else(|| KmsError::KeyNotFound(record.metadata.key_id.clone()))?;
            let b64 = version.public_key_b64.as_ref().ok_or_else(|| {
                KmsError::AlgorithmMismatch {
                    key_id: record.metadata.key_id.clone(),
                    operation: "get_public_key".to_string(),
                }
            })?;
            Ok(PublicKeyMaterial {
                key_id: record.metadata.key_id.clone(),
                algorithm: record.metadata.algorithm,
                public_key: b64_decode(b64)
                    .map_err(|e| KmsError::MalformedKeyMaterial(e.to_string()))?,
            })
        })
    }
}

#[cfg(test)]
mod tests;
