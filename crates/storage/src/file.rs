// Path: crates/storage/src/file.rs

//! One-file-per-record and JSONL-segment backends.
//!
//! Status lists persist as one pretty-stable JSON document per list under a
//! configured directory. Audit segments persist as append-only JSONL, one
//! signed entry per line; the live segment's anchor hash sits in a sidecar
//! file so a restart can resume the chain without replaying it.
//!
//! Writes that replace a whole file go through a temp-file-then-rename so a
//! crash never leaves a half-written record behind.

use async_trait::async_trait;
use covenant_api::storage::{AuditStore, StatusListBackend};
use covenant_types::app::{SignedAuditEntry, StatusListRecord};
use covenant_types::codec::sha256_hex;
use covenant_types::error::StoreError;
use covenant_types::keys::{AUDIT_ARCHIVE_SEGMENT, AUDIT_LIVE_SEGMENT};
use covenant_types::GENESIS_HASH;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const ANCHOR_FILE: &str = "audit-anchor";

fn io_err(context: &str, e: std::io::Error) -> StoreError {
    StoreError::Backend(format!("{context}: {e}"))
}

/// Derives a filesystem-safe, collision-free file stem for a record id.
fn file_stem(id: &str) -> String {
    let safe: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(40)
        .collect();
    let digest = sha256_hex(id.as_bytes());
    let tag = digest.get(..8).unwrap_or("00000000");
    if safe.is_empty() {
        tag.to_string()
    } else {
        format!("{safe}-{tag}")
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp).map_err(|e| io_err("create temp file", e))?;
    file.write_all(bytes).map_err(|e| io_err("write temp file", e))?;
    file.sync_all().map_err(|e| io_err("sync temp file", e))?;
    fs::rename(&tmp, path).map_err(|e| io_err("rename temp file", e))
}

/// A status-list backend keeping one JSON file per list.
pub struct FileStatusBackend {
    dir: PathBuf,
}

impl FileStatusBackend {
    /// Opens (creating if needed) a backend rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err("create status dir", e))?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id)))
    }
}

#[async_trait]
impl StatusListBackend for FileStatusBackend {
    async fn load(&self, id: &str) -> Result<Option<StatusListRecord>, StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| io_err("read status record", e))?;
        let record: StatusListRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Decode(format!("status record {id}: {e}")))?;
        Ok(Some(record))
    }

    async fn save(&self, record: &StatusListRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Encode(format!("status record {}: {e}", record.id)))?;
        write_atomically(&self.record_path(&record.id), &bytes)
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| io_err("read status dir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err("read status dir entry", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| io_err("read status record", e))?;
            if let Ok(record) = serde_json::from_slice::<StatusListRecord>(&bytes) {
                ids.push(record.id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// An audit store persisting JSONL segments under a directory.
pub struct FileAuditStore {
    dir: PathBuf,
    // Serializes file rewrites (replace/archive) against appends.
    io: Mutex<()>,
}

impl FileAuditStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err("create audit dir", e))?;
        Ok(Self {
            dir,
            io: Mutex::new(()),
        })
    }

    fn live_path(&self) -> PathBuf {
        self.dir.join(AUDIT_LIVE_SEGMENT)
    }

    fn archive_path(&self) -> PathBuf {
        self.dir.join(AUDIT_ARCHIVE_SEGMENT)
    }

    fn anchor_path(&self) -> PathBuf {
        self.dir.join(ANCHOR_FILE)
    }

    fn read_segment(path: &Path) -> Result<Vec<SignedAuditEntry>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(|e| io_err("open audit segment", e))?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| io_err("read audit segment", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SignedAuditEntry = serde_json::from_str(&line)
                .map_err(|e| StoreError::Decode(format!("audit line {}: {e}", idx + 1)))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn write_segment(path: &Path, entries: &[SignedAuditEntry]) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| StoreError::Encode(format!("audit entry {}: {e}", entry.id)))?;
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        write_atomically(path, &bytes)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.io
            .lock()
            .map_err(|_| StoreError::Unavailable("audit io lock poisoned".into()))
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn append(&self, entry: &SignedAuditEntry) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let line = serde_json::to_string(entry)
            .map_err(|e| StoreError::Encode(format!("audit entry {}: {e}", entry.id)))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path())
            .map_err(|e| io_err("open live segment", e))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .map_err(|e| io_err("append live segment", e))
    }

    async fn snapshot(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        let _guard = self.guard()?;
        Self::read_segment(&self.live_path())
    }

    async fn replace(&self, entries: &[SignedAuditEntry]) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        Self::write_segment(&self.live_path(), entries)?;
        Self::write_segment(&self.archive_path(), &[])?;
        let anchor = entries
            .first()
            .map(|e| e.previous_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        write_atomically(&self.anchor_path(), anchor.as_bytes())
    }

    async fn archive_prefix(&self, count: usize, anchor: &str) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut live = Self::read_segment(&self.live_path())?;
        let count = count.min(live.len());
        let mut archive = Self::read_segment(&self.archive_path())?;
        archive.extend(live.drain(..count));
        Self::write_segment(&self.archive_path(), &archive)?;
        Self::write_segment(&self.live_path(), &live)?;
        write_atomically(&self.anchor_path(), anchor.as_bytes())
    }

    async fn archived(&self) -> Result<Vec<SignedAuditEntry>, StoreError> {
        let _guard = self.guard()?;
        Self::read_segment(&self.archive_path())
    }

    async fn anchor(&self) -> Result<String, StoreError> {
        let _guard = self.guard()?;
        let path = self.anchor_path();
        if !path.exists() {
            return Ok(GENESIS_HASH.to_string());
        }
        let text = fs::read_to_string(&path).map_err(|e| io_err("read anchor", e))?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_types::app::{AuditActor, AuditEventBody, AuditSeverity, EventResult};
    use covenant_types::time::Timestamp;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn entry(prev: &str, sig: &str) -> SignedAuditEntry {
        SignedAuditEntry {
            id: Uuid::new_v4(),
            timestamp: Timestamp::now(),
            body: AuditEventBody {
                event_type: "test.event".into(),
                severity: AuditSeverity::Info,
                actor: AuditActor::system("tester"),
                target: None,
                action: "test.run".into(),
                result: EventResult::Success,
                details: None,
                metadata: None,
            },
            previous_hash: prev.to_string(),
            signature: sig.to_string(),
            signed_by: "hash-only".into(),
            signed_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn append_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileAuditStore::open(dir.path()).unwrap();
        store.append(&entry(GENESIS_HASH, "sig-1")).await.unwrap();
        store.append(&entry("sig-1", "sig-2")).await.unwrap();
        drop(store);

        let reopened = FileAuditStore::open(dir.path()).unwrap();
        let entries = reopened.snapshot().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].previous_hash, "sig-1");
    }

    #[tokio::test]
    async fn archive_moves_prefix_and_updates_anchor() {
        let dir = TempDir::new().unwrap();
        let store = FileAuditStore::open(dir.path()).unwrap();
        store.append(&entry(GENESIS_HASH, "sig-1")).await.unwrap();
        store.append(&entry("sig-1", "sig-2")).await.unwrap();
        store.append(&entry("sig-2", "sig-3")).await.unwrap();

        store.archive_prefix(2, "sig-2").await.unwrap();
        assert_eq!(store.archived().await.unwrap().len(), 2);
        let live = store.snapshot().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(store.anchor().await.unwrap(), "sig-2");
    }

    #[tokio::test]
    async fn status_records_round_trip_with_awkward_ids() {
        use covenant_types::app::StatusPurpose;
        use covenant_types::did::Did;

        let dir = TempDir::new().unwrap();
        let backend = FileStatusBackend::open(dir.path()).unwrap();
        let record = StatusListRecord {
            id: "agents/production list#1".into(),
            length: 1024,
            purpose: StatusPurpose::Revocation,
            issuer: Did::parse("did:web:issuer.example.com").unwrap(),
            base_url: "https://issuer.example.com/status".into(),
            allocation_cursor: 3,
            encoded_list: "H4sIAAAAAAAA".into(),
            revocation_metadata: Default::default(),
            suspension_metadata: Default::default(),
        };
        backend.save(&record).await.unwrap();
        let loaded = backend.load(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.allocation_cursor, 3);
        assert_eq!(backend.list_ids().await.unwrap(), vec![record.id.clone()]);
        assert_eq!(backend.load("missing").await.unwrap(), None);
    }
}
