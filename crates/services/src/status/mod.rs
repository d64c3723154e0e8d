// Path: crates/services/src/status/mod.rs

//! The status-list engine: list lifecycle, index allocation, bit mutation,
//! and signed credential emission.
//!
//! ## Locking discipline
//!
//! Each list is guarded by its own `RwLock`: `allocate_index` and
//! `set_status` take the write lock and persist **while still holding it**,
//! so readers never observe a mutation that has not been made durable.
//! `check_status` and `generate_credential` take the read lock and run
//! concurrently with each other. Distinct lists are fully independent.
//!
//! A persistence failure rolls the in-memory state back before the lock is
//! released; no acknowledgment is ever returned for a mutation that did not
//! reach storage.

mod bitstring;
mod credential;

pub use bitstring::Bitstring;
pub use credential::verify_credential;

use covenant_api::kms::KmsProvider;
use covenant_api::storage::StatusListBackend;
use covenant_types::app::{
    CredentialState, RevocationMetadata, StatusAnnotation, StatusCheck, StatusEntry,
    StatusListCredential, StatusListRecord, StatusPurpose, SuspensionMetadata, STATUS_ENTRY_TYPE,
};
use covenant_types::config::StatusListConfig;
use covenant_types::did::Did;
use covenant_types::error::{KmsError, StatusError};
use covenant_types::time::Timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parameters for [`StatusListEngine::initialize_list`]. Unset fields fall
/// back to the engine's configuration.
#[derive(Debug, Clone, Default)]
pub struct InitListOptions {
    /// What the list tracks. Defaults to revocation.
    pub purpose: Option<StatusPurpose>,
    /// Number of bits. Defaults to the configured default length.
    pub length: Option<usize>,
    /// Issuer DID. Defaults to the configured issuer.
    pub issuer: Option<Did>,
    /// Credential URL prefix. Defaults to the configured base URL.
    pub base_url: Option<String>,
}

struct ListState {
    record: StatusListRecord,
    bits: Bitstring,
}

/// The status-list engine.
///
/// Owns the set of lists, their persistence, and credential emission. One
/// instance serves every list under a common issuer configuration.
pub struct StatusListEngine {
    backend: Arc<dyn StatusListBackend>,
    kms: Arc<dyn KmsProvider>,
    config: StatusListConfig,
    lists: RwLock<HashMap<String, Arc<RwLock<ListState>>>>,
}

impl StatusListEngine {
    /// Creates an engine over the given backend and KMS provider.
    pub fn new(
        backend: Arc<dyn StatusListBackend>,
        kms: Arc<dyn KmsProvider>,
        config: StatusListConfig,
    ) -> Self {
        Self {
            backend,
            kms,
            config,
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Initializes a list: loads it from storage when it exists, creates it
    /// all-zero otherwise. Idempotent; the purpose of an existing list is
    /// immutable and a conflicting request is rejected.
    pub async fn initialize_list(
        &self,
        id: &str,
        options: InitListOptions,
    ) -> Result<StatusListRecord, StatusError> {
        if let Some(slot) = self.lists.read().await.get(id).cloned() {
            let state = slot.read().await;
            Self::check_purpose(&state.record, options.purpose)?;
            return Ok(state.record.clone());
        }

        let mut lists = self.lists.write().await;
        // Re-check under the write lock; another initializer may have won.
        if let Some(slot) = lists.get(id).cloned() {
            drop(lists);
            let state = slot.read().await;
            Self::check_purpose(&state.record, options.purpose)?;
            return Ok(state.record.clone());
        }

        let state = match self.backend.load(id).await? {
            Some(record) => {
                Self::check_purpose(&record, options.purpose)?;
                let bits = Bitstring::decode(&record.encoded_list, Some(record.length))?;
                ListState { record, bits }
            }
            None => {
                let length = options.length.unwrap_or(self.config.default_length);
                let bits = Bitstring::new(length)?;
                let issuer = match options.issuer {
                    Some(issuer) => issuer,
                    None => Did::parse(&self.config.issuer)
                        .map_err(|e| StatusError::Kms(KmsError::Provider(e.to_string())))?,
                };
                let record = StatusListRecord {
                    id: id.to_string(),
                    length,
                    purpose: options.purpose.unwrap_or(StatusPurpose::Revocation),
                    issuer,
                    base_url: options
                        .base_url
                        .unwrap_or_else(|| self.config.base_url.clone()),
                    allocation_cursor: 0,
                    encoded_list: bits.encode()?,
                    revocation_metadata: Default::default(),
                    suspension_metadata: Default::default(),
                };
                self.backend.save(&record).await?;
                tracing::info!(list = %id, length, purpose = %record.purpose, "initialized status list");
                ListState { record, bits }
            }
        };

        let record = state.record.clone();
        lists.insert(id.to_string(), Arc::new(RwLock::new(state)));
        Ok(record)
    }

    fn check_purpose(
        record: &StatusListRecord,
        requested: Option<StatusPurpose>,
    ) -> Result<(), StatusError> {
        match requested {
            Some(purpose) if purpose != record.purpose => Err(StatusError::PurposeImmutable {
                id: record.id.clone(),
                stored: record.purpose.to_string(),
                requested: purpose.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn slot(&self, id: &str) -> Result<Arc<RwLock<ListState>>, StatusError> {
        if let Some(slot) = self.lists.read().await.get(id).cloned() {
            return Ok(slot);
        }
        // Fall back to storage so an engine restart does not require
        // explicit re-initialization of every known list.
        if self.backend.load(id).await?.is_some() {
            self.initialize_list(id, InitListOptions::default()).await?;
            if let Some(slot) = self.lists.read().await.get(id).cloned() {
                return Ok(slot);
            }
        }
        Err(StatusError::ListNotFound(id.to_string()))
    }

    /// Atomically hands out the next free index.
    ///
    /// The returned entry points at this list's credential URL; allocation
    /// does not touch the bit itself.
    pub async fn allocate_index(&self, id: &str) -> Result<StatusEntry, StatusError> {
        let slot = self.slot(id).await?;
        let mut state = slot.write().await;

        if state.record.allocation_cursor >= state.record.length {
            return Err(StatusError::ListExhausted(id.to_string()));
        }
        let index = state.record.allocation_cursor;
        state.record.allocation_cursor = index + 1;

        if let Err(e) = self.backend.save(&state.record).await {
            state.record.allocation_cursor = index;
            return Err(e.into());
        }

        Ok(StatusEntry {
            entry_type: STATUS_ENTRY_TYPE.to_string(),
            status_purpose: state.record.purpose,
            status_list_credential: state.record.credential_url(),
            status_list_index: index,
        })
    }

    /// Atomically sets or clears the bit at `index`, maintaining the
    /// purpose-appropriate metadata map.
    ///
    /// Un-revoking an index that was never revoked is a no-op that still
    /// returns success.
    pub async fn set_status(
        &self,
        id: &str,
        index: usize,
        revoked: bool,
        actor: &str,
        reason: Option<String>,
    ) -> Result<StatusCheck, StatusError> {
        let slot = self.slot(id).await?;
        let mut state = slot.write().await;

        if index >= state.record.length {
            return Err(StatusError::OutOfRange {
                index,
                length: state.record.length,
            });
        }

        let was_set = state.bits.get(index)?;
        let prior_revocation = state.record.revocation_metadata.get(&index).cloned();
        let prior_suspension = state.record.suspension_metadata.get(&index).cloned();
        let prior_encoded = state.record.encoded_list.clone();

        state.bits.set(index, revoked)?;
        match (state.record.purpose, revoked, was_set) {
            (StatusPurpose::Revocation, true, false) => {
                state.record.revocation_metadata.insert(
                    index,
                    RevocationMetadata {
                        revoked_at: Timestamp::now(),
                        revoked_by: actor.to_string(),
                        reason: reason.clone(),
                    },
                );
            }
            (StatusPurpose::Revocation, false, true) => {
                state.record.revocation_metadata.remove(&index);
            }
            (StatusPurpose::Suspension, true, false) => {
                state.record.suspension_metadata.insert(
                    index,
                    SuspensionMetadata {
                        suspended_at: Timestamp::now(),
                        suspended_by: actor.to_string(),
                        reason: reason.clone(),
                    },
                );
            }
            (StatusPurpose::Suspension, false, true) => {
                state.record.suspension_metadata.remove(&index);
            }
            // Setting a set bit or clearing a clear bit changes nothing.
            _ => {}
        }
        state.record.encoded_list = match state.bits.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                state.bits.set(index, was_set)?;
                return Err(e);
            }
        };

        if let Err(e) = self.backend.save(&state.record).await {
            // Roll every piece of in-memory state back before the lock is
            // released; the mutation never happened.
            state.bits.set(index, was_set)?;
            state.record.encoded_list = prior_encoded;
            match prior_revocation {
                Some(metadata) => {
                    state.record.revocation_metadata.insert(index, metadata);
                }
                None => {
                    state.record.revocation_metadata.remove(&index);
                }
            }
            match prior_suspension {
                Some(metadata) => {
                    state.record.suspension_metadata.insert(index, metadata);
                }
                None => {
                    state.record.suspension_metadata.remove(&index);
                }
            }
            return Err(e.into());
        }

        tracing::debug!(list = %id, index, revoked, actor, "status bit updated");
        Ok(Self::check_of(&state.record, &state.bits, index)?)
    }

    /// Reads the state of one index. O(1); takes the read lock only.
    pub async fn check_status(&self, id: &str, index: usize) -> Result<StatusCheck, StatusError> {
        let slot = self.slot(id).await?;
        let state = slot.read().await;
        if index >= state.record.length {
            return Err(StatusError::OutOfRange {
                index,
                length: state.record.length,
            });
        }
        Self::check_of(&state.record, &state.bits, index)
    }

    fn check_of(
        record: &StatusListRecord,
        bits: &Bitstring,
        index: usize,
    ) -> Result<StatusCheck, StatusError> {
        if !bits.get(index)? {
            return Ok(StatusCheck {
                status: CredentialState::Active,
                metadata: None,
            });
        }
        Ok(match record.purpose {
            StatusPurpose::Revocation => StatusCheck {
                status: CredentialState::Revoked,
                metadata: record
                    .revocation_metadata
                    .get(&index)
                    .cloned()
                    .map(StatusAnnotation::Revocation),
            },
            StatusPurpose::Suspension => StatusCheck {
                status: CredentialState::Suspended,
                metadata: record
                    .suspension_metadata
                    .get(&index)
                    .cloned()
                    .map(StatusAnnotation::Suspension),
            },
        })
    }

    /// Builds and signs this list's StatusList 2021 credential.
    pub async fn generate_credential(&self, id: &str) -> Result<StatusListCredential, StatusError> {
        let key_id = self.config.signing_key_id.clone().ok_or_else(|| {
            StatusError::Kms(KmsError::KeyNotFound(
                "no status-list signing key configured".to_string(),
            ))
        })?;
        let slot = self.slot(id).await?;
        let state = slot.read().await;
        credential::issue(&*self.kms, &key_id, &state.record).await
    }

    /// Re-persists a list's current state.
    pub async fn persist_list(&self, id: &str) -> Result<(), StatusError> {
        let slot = self.slot(id).await?;
        let state = slot.read().await;
        self.backend.save(&state.record).await?;
        Ok(())
    }

    /// Discards the cached state of a list and reloads it from storage.
    pub async fn load_list(&self, id: &str) -> Result<StatusListRecord, StatusError> {
        let record = self
            .backend
            .load(id)
            .await?
            .ok_or_else(|| StatusError::ListNotFound(id.to_string()))?;
        let bits = Bitstring::decode(&record.encoded_list, Some(record.length))?;
        let mut lists = self.lists.write().await;
        lists.insert(
            id.to_string(),
            Arc::new(RwLock::new(ListState {
                record: record.clone(),
                bits,
            })),
        );
        Ok(record)
    }

    /// The ids of every list known to the backend.
    pub async fn list_ids(&self) -> Result<Vec<String>, StatusError> {
        Ok(self.backend.list_ids().await?)
    }

    /// The KMS provider backing credential emission.
    pub fn kms(&self) -> &Arc<dyn KmsProvider> {
        &self.kms
    }
}
