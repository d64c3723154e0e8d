// Path: crates/api/src/storage.rs

//! Persistence contracts for status lists and audit segments.
//!
//! These traits abstract the storage engine (in-memory, file, redb) behind
//! async, thread-safe interfaces. Callers hold whatever locks their
//! consistency model requires; backends only promise that a completed call
//! is durable to the extent the engine allows.

use async_trait::async_trait;
use covenant_types::app::{SignedAuditEntry, StatusListRecord};
use covenant_types::error::StoreError;

/// Persistence for status-list records, keyed by list id.
#[async_trait]
pub trait StatusListBackend: Send + Sync {
    /// Loads a record, or `None` when the list has never been persisted.
    async fn load(&self, id: &str) -> Result<Option<StatusListRecord>, StoreError>;

    /// Persists a record, replacing any previous version atomically.
    async fn save(&self, record: &StatusListRecord) -> Result<(), StoreError>;

    /// Lists the ids of every persisted record.
    async fn list_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Persistence for the audit log's two segments.
///
/// The live segment is append-only; the archive segment only ever grows by
/// entries moved out of the live segment by retention. Insertion order is
/// preserved within each segment.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends one entry to the live segment.
    async fn append(&self, entry: &SignedAuditEntry) -> Result<(), StoreError>;

    /// Reads the entire live segment in insertion order.
    async fn snapshot(&self) -> Result<Vec<SignedAuditEntry>, StoreError>;

    /// Replaces the live segment wholesale (used by import).
    async fn replace(&self, entries: &[SignedAuditEntry]) -> Result<(), StoreError>;

    /// Moves the first `count` live entries to the archive segment and
    /// records `anchor` as the live segment's new genesis hash.
    async fn archive_prefix(&self, count: usize, anchor: &str) -> Result<(), StoreError>;

    /// Reads the entire archive segment in insertion order.
    async fn archived(&self) -> Result<Vec<SignedAuditEntry>, StoreError>;

    /// The live segment's genesis anchor: the signature of the last
    /// archived entry, or the zero genesis hash when nothing has been
    /// archived.
    async fn anchor(&self) -> Result<String, StoreError>;
}
