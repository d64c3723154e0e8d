// Path: crates/types/src/app/status.rs

//! Status-list records, entries, and credential documents.
//!
//! These are the wire and persistence shapes for the StatusList 2021
//! revocation engine. The bitstring itself (and its compressed transport
//! encoding) lives in the services crate; records here carry it in encoded
//! form only.

use crate::did::Did;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The W3C `@context` entries of a status-list credential.
pub const STATUS_LIST_CONTEXTS: [&str; 2] = [
    "https://www.w3.org/2018/credentials/v1",
    "https://w3id.org/vc/status-list/2021/v1",
];

/// The `type` value of an embedded status entry.
pub const STATUS_ENTRY_TYPE: &str = "StatusList2021Entry";

/// What a status list tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPurpose {
    /// Permanent withdrawal of a credential.
    Revocation,
    /// Temporary withdrawal of a credential.
    Suspension,
}

impl fmt::Display for StatusPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revocation => f.write_str("revocation"),
            Self::Suspension => f.write_str("suspension"),
        }
    }
}

/// The state of a single credential as recorded in a status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialState {
    /// The bit is clear.
    Active,
    /// The bit is set in a revocation list.
    Revoked,
    /// The bit is set in a suspension list.
    Suspended,
}

/// Metadata recorded when a bit in a revocation list transitions 0 → 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationMetadata {
    /// When the index was revoked.
    #[serde(rename = "revokedAt")]
    pub revoked_at: Timestamp,
    /// Who performed the revocation.
    #[serde(rename = "revokedBy")]
    pub revoked_by: String,
    /// Optional operator-supplied reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Metadata recorded when a bit in a suspension list transitions 0 → 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionMetadata {
    /// When the index was suspended.
    #[serde(rename = "suspendedAt")]
    pub suspended_at: Timestamp,
    /// Who performed the suspension.
    #[serde(rename = "suspendedBy")]
    pub suspended_by: String,
    /// Optional operator-supplied reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The metadata attached to a set bit, shaped by the list's purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusAnnotation {
    /// Revocation-list metadata.
    Revocation(RevocationMetadata),
    /// Suspension-list metadata.
    Suspension(SuspensionMetadata),
}

/// The answer to a status check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCheck {
    /// The credential's state at the checked index.
    pub status: CredentialState,
    /// Metadata recorded at the most recent 0 → 1 transition, if the bit
    /// is currently set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StatusAnnotation>,
}

/// The pointer embedded in an issued credential, stored verbatim by the
/// issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Always `StatusList2021Entry`.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// The purpose of the referenced list.
    #[serde(rename = "statusPurpose")]
    pub status_purpose: StatusPurpose,
    /// The URL of the status-list credential.
    #[serde(rename = "statusListCredential")]
    pub status_list_credential: String,
    /// The index assigned to the issued credential.
    #[serde(rename = "statusListIndex")]
    pub status_list_index: usize,
}

/// The persisted form of one status list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusListRecord {
    /// List identifier.
    pub id: String,
    /// Number of bits in the list.
    pub length: usize,
    /// What the list tracks. Immutable after creation.
    pub purpose: StatusPurpose,
    /// The DID of the issuer that signs this list's credential.
    pub issuer: Did,
    /// URL prefix under which the list's credential is published.
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    /// The next unallocated index.
    #[serde(rename = "allocationCursor")]
    pub allocation_cursor: usize,
    /// The bitstring in its compressed transport encoding.
    #[serde(rename = "encodedList")]
    pub encoded_list: String,
    /// Revocation metadata keyed by index. Populated for revocation lists.
    #[serde(rename = "revocationMetadata", default)]
    pub revocation_metadata: BTreeMap<usize, RevocationMetadata>,
    /// Suspension metadata keyed by index. Populated for suspension lists.
    #[serde(rename = "suspensionMetadata", default)]
    pub suspension_metadata: BTreeMap<usize, SuspensionMetadata>,
}

impl StatusListRecord {
    /// The URL of this list's credential: `<base_url>/<id>`.
    pub fn credential_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.id)
    }
}

/// The `credentialSubject` of a status-list credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusListSubject {
    /// The subject identifier: `<credential url>#list`.
    pub id: String,
    /// Always `StatusList2021`.
    #[serde(rename = "type")]
    pub subject_type: String,
    /// The purpose of the list.
    #[serde(rename = "statusPurpose")]
    pub status_purpose: StatusPurpose,
    /// The compressed transport encoding of the bitstring.
    #[serde(rename = "encodedList")]
    pub encoded_list: String,
}

/// A linked-data proof over a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialProof {
    /// The signature suite, derived from the signing key's algorithm.
    #[serde(rename = "type")]
    pub proof_type: String,
    /// When the proof was produced.
    pub created: Timestamp,
    /// The DID URL of the verification method.
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,
    /// Always `assertionMethod` for issued credentials.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,
    /// The signature, standard base64.
    #[serde(rename = "proofValue")]
    pub proof_value: String,
}

/// A W3C StatusList 2021 verifiable credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusListCredential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The credential URL.
    pub id: String,
    /// `["VerifiableCredential", "StatusList2021Credential"]`.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// The issuer DID.
    pub issuer: Did,
    /// When the credential was issued.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: Timestamp,
    /// The list payload.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: StatusListSubject,
    /// The proof; absent only on the signing pre-image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<CredentialProof>,
}

impl StatusListCredential {
    /// Returns a copy with the proof removed, i.e. the signing pre-image.
    pub fn without_proof(&self) -> Self {
        Self {
            proof: None,
            ..self.clone()
        }
    }
}
