// Path: crates/storage/src/memory.rs

//! Volatile in-process backends.

use async_trait::async_trait;
use covenant_api::storage::{AuditStore, StatusListBackend};
use covenant_types::app::{SignedAuditEntry, StatusListRecord};
use covenant_types::error::StoreError;
use covenant_types::GENESIS_HASH;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory status-list backend.
#[derive(Default)]
pub struct MemoryStatusBackend {
    records: Mutex<HashMap<String, StatusListRecord>>,
}

impl MemoryStatusBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusListBackend for MemoryStatusBackend {
    async fn load(&self, id: &str) -> Result<Option<StatusListRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("status map poisoned".into()))?;
        Ok(records.get(id).cloned())
    }

    async fn save(&self, record: &StatusListRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("status map poisoned".into()))?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("status map poisoned".into()))?;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

struct MemoryAuditInner {
    live: Vec<SignedAuditEntry>,
    archive: Vec<SignedAuditEntry>,
    anchor: String,
}

/// An in-memory audit store.
pub struct MemoryAuditStore {
    inner: Mutex<MemoryAuditInner>,
}

impl MemoryAuditStore {
    /// Creates an empty store anchored at the zero genesis hash.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryAuditInner {
                live: Vec::new(),
                archive: Vec::new(),
                anchor: GENESIS_HASH.to_string(),
            }),
        }
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MemoryAuditInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("audit store poisoned".into()))
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: &SignedAuditEntry) -> Result<(), StoreError> {
        self.locked()?.live.push(entry.clone());
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        Ok(self.locked()?.live.clone())
    }

    async fn replace(&self, entries: &[SignedAuditEntry]) -> Result<(), StoreError> {
        let mut inner = self.locked()?;
        inner.anchor = entries
            .first()
            .map(|e| e.previous_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        inner.live = entries.to_vec();
        inner.archive.clear();
        Ok(())
    }

    async fn archive_prefix(&self, count: usize, anchor: &str) -> Result<(), StoreError> {
        let mut inner = self.locked()?;
        let count = count.min(inner.live.len());
        let moved: Vec<SignedAuditEntry> = inner.live.drain(..count).collect();
        inner.archive.extend(moved);
        inner.anchor = anchor.to_string();
        Ok(())
    }

    async fn archived(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        Ok(self.locked()?.archive.clone())
    }

    async fn anchor(&self) -> Result<String, StoreError> {
        Ok(self.locked()?.anchor.clone())
    }
}
