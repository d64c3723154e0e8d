// Path: crates/services/src/audit/mod.rs

//! The signed audit log: a hash-chained, append-only record of every
//! trust-relevant event.
//!
//! ## Chain discipline
//!
//! A single append lock serializes writers, so entries form a total order:
//! `entries[0].previous_hash` equals the segment anchor (the zero genesis
//! hash, or the signature of the last archived entry), and every later
//! entry carries its predecessor's signature. An append that fails at the
//! signing or persistence step leaves the chain untouched.
//!
//! Readers (`query`, `verify_integrity`, `export`) work on snapshots and
//! never block behind a writer for longer than the lock handoff.

mod verify;

pub use verify::verify_entries;

use covenant_api::kms::KmsProvider;
use covenant_api::storage::AuditStore;
use covenant_types::app::{
    AuditEventBody, AuditFilter, AuditPage, IntegrityReport, SignedAuditEntry, HASH_ONLY_SIGNER,
};
use covenant_types::codec::{b64_encode, sha256_hex};
use covenant_types::config::AuditConfig;
use covenant_types::error::{AuditError, KmsError};
use covenant_types::time::Timestamp;
use covenant_types::app::MessageType;
use covenant_types::GENESIS_HASH;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The default page size for queries.
pub const DEFAULT_QUERY_LIMIT: usize = 100;
/// The largest page size a query may request.
pub const MAX_QUERY_LIMIT: usize = 1000;

struct ChainHead {
    last_hash: String,
}

/// The audit log engine.
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    kms: Arc<dyn KmsProvider>,
    config: AuditConfig,
    head: Mutex<ChainHead>,
}

impl AuditLog {
    /// Opens the log over a store, recovering the chain head from the
    /// persisted live segment.
    pub async fn open(
        store: Arc<dyn AuditStore>,
        kms: Arc<dyn KmsProvider>,
        config: AuditConfig,
    ) -> Result<Self, AuditError> {
        let last_hash = match store.snapshot().await?.last() {
            Some(entry) => entry.signature.clone(),
            None => store.anchor().await?,
        };
        Ok(Self {
            store,
            kms,
            config,
            head: Mutex::new(ChainHead { last_hash }),
        })
    }

    /// Whether logging is switched on.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// The KMS provider used for signing and verification.
    pub fn kms(&self) -> &Arc<dyn KmsProvider> {
        &self.kms
    }

    /// Assembles, chains, signs, and appends one entry.
    pub async fn log(&self, body: AuditEventBody) -> Result<SignedAuditEntry, AuditError> {
        if !self.config.enabled {
            return Err(AuditError::Disabled);
        }

        let mut head = self.head.lock().await;
        let mut entry = SignedAuditEntry {
            id: Uuid::new_v4(),
            timestamp: Timestamp::now(),
            body,
            previous_hash: head.last_hash.clone(),
            signature: String::new(),
            signed_by: String::new(),
            signed_at: Timestamp::now(),
        };

        let preimage = entry.signing_preimage()?;
        if self.config.sign_entries {
            let key_id = self.config.signing_key_id.as_deref().ok_or_else(|| {
                AuditError::Kms(KmsError::KeyNotFound(
                    "no audit signing key configured".to_string(),
                ))
            })?;
            let signature = self.kms.sign(key_id, &preimage, MessageType::Raw).await?;
            entry.signature = b64_encode(&signature);
            entry.signed_by = key_id.to_string();
        } else {
            entry.signature = sha256_hex(&preimage);
            entry.signed_by = HASH_ONLY_SIGNER.to_string();
        }
        entry.signed_at = Timestamp::now();

        self.store.append(&entry).await?;
        head.last_hash = entry.signature.clone();
        tracing::debug!(entry = %entry.id, event = %entry.body.event_type, "audit entry appended");
        Ok(entry)
    }

    /// Filters and paginates the chain (archive and live segments, in
    /// insertion order).
    pub async fn query(&self, filter: &AuditFilter) -> Result<AuditPage, AuditError> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(MAX_QUERY_LIMIT);

        let mut entries = self.store.archived().await?;
        entries.extend(self.store.snapshot().await?);

        let matches: Vec<&SignedAuditEntry> =
            entries.iter().filter(|e| filter.matches(e)).collect();
        let total = matches.len();
        let page: Vec<SignedAuditEntry> = matches
            .into_iter()
            .skip(filter.offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = filter.offset + page.len() < total;
        Ok(AuditPage {
            entries: page,
            total,
            has_more,
        })
    }

    /// Replays the full chain (archive, then live) and verifies every
    /// signature.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport, AuditError> {
        let archived = self.store.archived().await?;
        let live = self.store.snapshot().await?;
        let anchor = if archived.is_empty() {
            self.store.anchor().await?
        } else {
            GENESIS_HASH.to_string()
        };
        let mut entries = archived;
        entries.extend(live);
        verify::verify_entries(&entries, &anchor, Some(&*self.kms)).await
    }

    /// Copies the chain out, one segment at a time.
    pub async fn export(&self) -> Result<Vec<SignedAuditEntry>, AuditError> {
        let mut entries = self.store.archived().await?;
        entries.extend(self.store.snapshot().await?);
        Ok(entries)
    }

    /// Renders the chain as newline-delimited JSON. Each segment opens with
    /// a header line carrying its `genesisHash`.
    pub async fn export_ndjson(&self) -> Result<String, AuditError> {
        let archived = self.store.archived().await?;
        let live = self.store.snapshot().await?;
        let anchor = self.store.anchor().await?;

        let mut out = String::new();
        let mut render = |genesis: &str, segment: &[SignedAuditEntry]| -> Result<(), AuditError> {
            out.push_str(&format!("{{\"genesisHash\":\"{genesis}\"}}\n"));
            for entry in segment {
                let line = serde_json::to_string(entry)
                    .map_err(|e| AuditError::ImportRejected(e.to_string()))?;
                out.push_str(&line);
                out.push('\n');
            }
            Ok(())
        };
        if !archived.is_empty() {
            render(GENESIS_HASH, &archived)?;
        }
        render(&anchor, &live)?;
        Ok(out)
    }

    /// Replaces the chain with `entries` after verifying them in
    /// isolation; a candidate chain that fails verification is rejected
    /// and current state is untouched.
    pub async fn import(&self, entries: Vec<SignedAuditEntry>) -> Result<IntegrityReport, AuditError> {
        let anchor = entries
            .first()
            .map(|e| e.previous_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let report = verify::verify_entries(&entries, &anchor, Some(&*self.kms)).await?;
        if !report.valid {
            return Err(AuditError::ImportRejected(format!(
                "candidate chain failed verification ({} of {} entries)",
                report.failed_entries, report.total_entries
            )));
        }

        let mut head = self.head.lock().await;
        self.store.replace(&entries).await?;
        head.last_hash = entries
            .last()
            .map(|e| e.signature.clone())
            .unwrap_or(anchor);
        tracing::info!(entries = entries.len(), "audit chain imported");
        Ok(report)
    }

    /// Moves entries older than the configured retention window into the
    /// archive segment, re-anchoring the live segment so verifiability is
    /// preserved across segments. A no-op without a configured window.
    pub async fn apply_retention(&self, now: Timestamp) -> Result<usize, AuditError> {
        let Some(days) = self.config.retention_days else {
            return Ok(0);
        };
        let cutoff_millis = now.unix_millis() - i64::from(days) * 24 * 60 * 60 * 1000;

        let head = self.head.lock().await;
        let live = self.store.snapshot().await?;
        let count = live
            .iter()
            .take_while(|e| e.timestamp.unix_millis() < cutoff_millis)
            .count();
        if count == 0 {
            return Ok(0);
        }
        let anchor = live
            .get(count - 1)
            .map(|e| e.signature.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        self.store.archive_prefix(count, &anchor).await?;
        drop(head);
        tracing::info!(archived = count, "audit retention applied");
        Ok(count)
    }
}

/// Parses the NDJSON export format back into entries.
///
/// Segment header lines (`{"genesisHash": ...}`) are recognized and
/// skipped; anything else that fails to parse as a signed entry is a
/// malformed document.
pub fn parse_ndjson(text: &str) -> Result<Vec<SignedAuditEntry>, AuditError> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            let is_header = value
                .as_object()
                .map(|o| o.contains_key("genesisHash") && !o.contains_key("signature"))
                .unwrap_or(false);
            if is_header {
                continue;
            }
        }
        let entry: SignedAuditEntry = serde_json::from_str(line).map_err(|e| {
            AuditError::ImportRejected(format!("line {}: {e}", idx + 1))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests;
