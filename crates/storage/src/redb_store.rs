// Path: crates/storage/src/redb_store.rs

//! Embedded-database backends built on `redb`.
//!
//! One table row per status list; one row per audit entry, keyed by a dense
//! append index so insertion order is the key order. Records are stored as
//! JSON bytes: the volumes here are small and the encode cost is dwarfed by
//! the signing that precedes every write.

use async_trait::async_trait;
use covenant_api::storage::{AuditStore, StatusListBackend};
use covenant_types::app::{SignedAuditEntry, StatusListRecord};
use covenant_types::error::StoreError;
use covenant_types::keys::AUDIT_ANCHOR_KEY;
use covenant_types::GENESIS_HASH;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const STATUS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("status_lists");
const AUDIT_LIVE_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_live");
const AUDIT_ARCHIVE_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_archive");
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("meta");

fn backend_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn open_database(path: &Path) -> Result<Arc<Database>, StoreError> {
    Database::create(path).map(Arc::new).map_err(backend_err)
}

/// A status-list backend storing one row per list.
pub struct RedbStatusBackend {
    db: Arc<Database>,
}

impl RedbStatusBackend {
    /// Opens (creating if needed) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            db: open_database(path.as_ref())?,
        })
    }

    /// Wraps an already opened database.
    pub fn with_database(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatusListBackend for RedbStatusBackend {
    async fn load(&self, id: &str) -> Result<Option<StatusListRecord>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = match tx.open_table(STATUS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(backend_err(e)),
        };
        let Some(guard) = table.get(id).map_err(backend_err)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(guard.value())
            .map_err(|e| StoreError::Decode(format!("status record {id}: {e}")))?;
        Ok(Some(record))
    }

    async fn save(&self, record: &StatusListRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| StoreError::Encode(format!("status record {}: {e}", record.id)))?;
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = tx.open_table(STATUS_TABLE).map_err(backend_err)?;
            table
                .insert(record.id.as_str(), bytes.as_slice())
                .map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = match tx.open_table(STATUS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(backend_err(e)),
        };
        let mut ids = Vec::new();
        for item in table.iter().map_err(backend_err)? {
            let (key, _) = item.map_err(backend_err)?;
            ids.push(key.value().to_string());
        }
        ids.sort();
        Ok(ids)
    }
}

/// An audit store keeping live and archive segments in two tables.
pub struct RedbAuditStore {
    db: Arc<Database>,
}

impl RedbAuditStore {
    /// Opens (creating if needed) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            db: open_database(path.as_ref())?,
        })
    }

    /// Wraps an already opened database.
    pub fn with_database(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn read_table(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
    ) -> Result<Vec<SignedAuditEntry>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = match tx.open_table(def) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(backend_err(e)),
        };
        let mut entries = Vec::new();
        for item in table.iter().map_err(backend_err)? {
            let (_, value) = item.map_err(backend_err)?;
            let entry = serde_json::from_slice(value.value())
                .map_err(|e| StoreError::Decode(format!("audit row: {e}")))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[async_trait]
impl AuditStore for RedbAuditStore {
    async fn append(&self, entry: &SignedAuditEntry) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| StoreError::Encode(format!("audit entry {}: {e}", entry.id)))?;
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = tx.open_table(AUDIT_LIVE_TABLE).map_err(backend_err)?;
            let next = match table.iter().map_err(backend_err)?.next_back() {
                Some(item) => item.map_err(backend_err)?.0.value() + 1,
                None => 0,
            };
            table
                .insert(next, bytes.as_slice())
                .map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)
    }

    async fn snapshot(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        self.read_table(AUDIT_LIVE_TABLE)
    }

    async fn replace(&self, entries: &[SignedAuditEntry]) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        tx.delete_table(AUDIT_LIVE_TABLE).map_err(backend_err)?;
        tx.delete_table(AUDIT_ARCHIVE_TABLE).map_err(backend_err)?;
        {
            let mut table = tx.open_table(AUDIT_LIVE_TABLE).map_err(backend_err)?;
            for (idx, entry) in entries.iter().enumerate() {
                let bytes = serde_json::to_vec(entry)
                    .map_err(|e| StoreError::Encode(format!("audit entry {}: {e}", entry.id)))?;
                table
                    .insert(idx as u64, bytes.as_slice())
                    .map_err(backend_err)?;
            }
        }
        {
            let anchor = entries
                .first()
                .map(|e| e.previous_hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string());
            let mut meta = tx.open_table(META_TABLE).map_err(backend_err)?;
            meta.insert(AUDIT_ANCHOR_KEY, anchor.as_str())
                .map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)
    }

    async fn archive_prefix(&self, count: usize, anchor: &str) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut live = tx.open_table(AUDIT_LIVE_TABLE).map_err(backend_err)?;
            let mut moved: Vec<(u64, Vec<u8>)> = Vec::new();
            for item in live.iter().map_err(backend_err)? {
                if moved.len() >= count {
                    break;
                }
                let (key, value) = item.map_err(backend_err)?;
                moved.push((key.value(), value.value().to_vec()));
            }
            let mut archive = tx.open_table(AUDIT_ARCHIVE_TABLE).map_err(backend_err)?;
            let mut next_archive = match archive.iter().map_err(backend_err)?.next_back() {
                Some(item) => item.map_err(backend_err)?.0.value() + 1,
                None => 0,
            };
            for (key, bytes) in &moved {
                archive
                    .insert(next_archive, bytes.as_slice())
                    .map_err(backend_err)?;
                next_archive += 1;
                live.remove(key).map_err(backend_err)?;
            }
            let mut meta = tx.open_table(META_TABLE).map_err(backend_err)?;
            meta.insert(AUDIT_ANCHOR_KEY, anchor).map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)
    }

    async fn archived(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        self.read_table(AUDIT_ARCHIVE_TABLE)
    }

    async fn anchor(&self) -> Result<String, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = match tx.open_table(META_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => {
                return Ok(GENESIS_HASH.to_string())
            }
            Err(e) => return Err(backend_err(e)),
        };
        let result = match table.get(AUDIT_ANCHOR_KEY).map_err(backend_err)? {
            Some(guard) => Ok(guard.value().to_string()),
            None => Ok(GENESIS_HASH.to_string()),
        };
        result
    }
}
