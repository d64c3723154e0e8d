// Path: crates/types/src/app/audit.rs

//! Audit entries, query filters, and integrity reports.
//!
//! Every trust-relevant event is recorded as a [`SignedAuditEntry`]. Entries
//! are chain-linked: each carries its predecessor's signature as
//! `previous_hash`, so mutating or removing any historical entry is
//! detectable by replaying the chain.

use crate::error::CodecError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The `signed_by` marker used when no signing key is configured and
/// entries are protected by the hash chain alone.
pub const HASH_ONLY_SIGNER: &str = "hash-only";

/// The severity of an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine activity.
    Info,
    /// Unusual but tolerated activity.
    Warning,
    /// A failure or policy denial.
    Error,
    /// An event requiring operator attention.
    Critical,
}

/// The outcome of the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    /// The action completed.
    Success,
    /// The action failed.
    Failure,
    /// The action completed partially.
    Partial,
}

/// The principal that performed the audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditActor {
    /// Actor identifier.
    pub id: String,
    /// Actor kind (`user`, `agent`, `service`, `system`, ...).
    #[serde(rename = "type")]
    pub actor_type: String,
    /// The actor's DID, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    /// Source address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Client identification string.
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AuditActor {
    /// Convenience constructor for system-originated events.
    pub fn system(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actor_type: "system".to_string(),
            did: None,
            ip: None,
            user_agent: None,
        }
    }
}

/// The object the audited action operated on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTarget {
    /// Target kind (`status_list`, `key`, `bond`, ...).
    #[serde(rename = "type")]
    pub target_type: String,
    /// Target identifier.
    pub id: String,
    /// Additional attributes; fingerprints and identifiers only, never
    /// payload content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<BTreeMap<String, serde_json::Value>>,
}

/// The caller-supplied body of an audit entry, before chaining and signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEventBody {
    /// Event classification (`trust.evaluation`, `status.revoked`, ...).
    #[serde(rename = "eventType")]
    pub event_type: String,
    /// Severity of the event.
    pub severity: AuditSeverity,
    /// Who acted.
    pub actor: AuditActor,
    /// What was acted upon, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,
    /// The action string (`verb.resource` or a subsystem operation name).
    pub action: String,
    /// How the action concluded.
    pub result: EventResult,
    /// Structured detail; identifiers and verdict summaries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Transport metadata (request ids, correlation ids).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A chained, signed audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedAuditEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// When the entry was created.
    pub timestamp: Timestamp,
    /// The event body.
    #[serde(flatten)]
    pub body: AuditEventBody,
    /// The predecessor's signature (or the genesis hash).
    #[serde(rename = "previousHash")]
    pub previous_hash: String,
    /// Signature over the canonical pre-image, standard base64 (or a hex
    /// SHA-256 in hash-only mode).
    pub signature: String,
    /// The signing key id, or [`HASH_ONLY_SIGNER`].
    #[serde(rename = "signedBy")]
    pub signed_by: String,
    /// When the entry was signed.
    #[serde(rename = "signedAt")]
    pub signed_at: Timestamp,
}

/// The canonical signing pre-image of an entry: every persisted field
/// except `signature`, `signed_by`, and `signed_at`, with `previous_hash`
/// included exactly once.
#[derive(Serialize)]
struct SigningView<'a> {
    id: &'a Uuid,
    timestamp: &'a Timestamp,
    #[serde(rename = "eventType")]
    event_type: &'a str,
    severity: AuditSeverity,
    actor: &'a AuditActor,
    target: &'a Option<AuditTarget>,
    action: &'a str,
    result: EventResult,
    details: &'a Option<serde_json::Value>,
    metadata: &'a Option<serde_json::Value>,
    #[serde(rename = "previousHash")]
    previous_hash: &'a str,
}

impl SignedAuditEntry {
    /// The canonical bytes this entry's signature covers.
    pub fn signing_preimage(&self) -> Result<Vec<u8>, CodecError> {
        crate::codec::to_jcs_bytes(&SigningView {
            id: &self.id,
            timestamp: &self.timestamp,
            event_type: &self.body.event_type,
            severity: self.body.severity,
            actor: &self.body.actor,
            target: &self.body.target,
            action: &self.body.action,
            result: self.body.result,
            details: &self.body.details,
            metadata: &self.body.metadata,
            previous_hash: &self.previous_hash,
        })
    }
}

/// Filter criteria for audit queries. Empty vectors match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Earliest timestamp, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    /// Latest timestamp, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
    /// Event types to include.
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Actor ids to include.
    #[serde(default)]
    pub actor_ids: Vec<String>,
    /// Target ids to include.
    #[serde(default)]
    pub target_ids: Vec<String>,
    /// Severities to include.
    #[serde(default)]
    pub severities: Vec<AuditSeverity>,
    /// Results to include.
    #[serde(default)]
    pub results: Vec<EventResult>,
    /// Number of matching entries to skip.
    #[serde(default)]
    pub offset: usize,
    /// Page size; `None` means the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Whether the entry satisfies every populated criterion.
    pub fn matches(&self, entry: &SignedAuditEntry) -> bool {
        if let Some(from) = &self.from {
            if entry.timestamp.is_before(from) {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if to.is_before(&entry.timestamp) {
                return false;
            }
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&entry.body.event_type) {
            return false;
        }
        if !self.actor_ids.is_empty() && !self.actor_ids.contains(&entry.body.actor.id) {
            return false;
        }
        if !self.target_ids.is_empty() {
            let hit = entry
                .body
                .target
                .as_ref()
                .map(|t| self.target_ids.contains(&t.id))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if !self.severities.is_empty() && !self.severities.contains(&entry.body.severity) {
            return false;
        }
        if !self.results.is_empty() && !self.results.contains(&entry.body.result) {
            return false;
        }
        true
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    /// The matching entries, in insertion order.
    pub entries: Vec<SignedAuditEntry>,
    /// The total number of matches before pagination.
    pub total: usize,
    /// Whether further pages exist.
    pub has_more: bool,
}

/// A per-entry failure discovered during integrity verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityFault {
    /// The offending entry.
    pub entry_id: Uuid,
    /// What failed.
    pub reason: String,
}

/// The result of replaying the audit chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Whether every entry verified and the chain is unbroken.
    pub valid: bool,
    /// Number of entries examined.
    pub total_entries: usize,
    /// Number of entries whose signature (or hash) verified.
    pub verified_entries: usize,
    /// Number of entries that failed verification.
    pub failed_entries: usize,
    /// Whether any entry's `previous_hash` failed to match its predecessor.
    pub broken_chain: bool,
    /// Per-entry failures.
    pub errors: Vec<IntegrityFault>,
}

impl IntegrityReport {
    /// A report over an empty, trivially valid chain.
    pub fn empty() -> Self {
        Self {
            valid: true,
            total_entries: 0,
            verified_entries: 0,
            failed_entries: 0,
            broken_chain: false,
            errors: Vec::new(),
        }
    }
}
