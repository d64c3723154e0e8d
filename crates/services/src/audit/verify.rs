// Path: crates/services/src/audit/verify.rs

//! Chain replay and per-entry signature verification.

use covenant_api::kms::KmsProvider;
use covenant_types::app::{
    IntegrityFault, IntegrityReport, MessageType, SignedAuditEntry, HASH_ONLY_SIGNER,
};
use covenant_types::codec::{b64_decode, sha256_hex};
use covenant_types::error::AuditError;

/// Replays `entries` against `anchor`, verifying the hash chain and every
/// entry's signature.
///
/// Hash-only entries are checked by recomputing the digest; signed entries
/// are checked through `kms` (when absent, signed entries are reported as
/// unverifiable rather than silently accepted).
pub async fn verify_entries(
    entries: &[SignedAuditEntry],
    anchor: &str,
    kms: Option<&dyn KmsProvider>,
) -> Result<IntegrityReport, AuditError> {
    let mut report = IntegrityReport {
        valid: true,
        total_entries: entries.len(),
        verified_entries: 0,
        failed_entries: 0,
        broken_chain: false,
        errors: Vec::new(),
    };

    let mut expected_prev = anchor.to_string();
    for entry in entries {
        let mut entry_ok = true;

        if entry.previous_hash != expected_prev {
            report.broken_chain = true;
            entry_ok = false;
            report.errors.push(IntegrityFault {
                entry_id: entry.id,
                reason: format!(
                    "chain broken: previous_hash {} does not match predecessor signature {}",
                    entry.previous_hash, expected_prev
                ),
            });
        }

        match entry_signature_valid(entry, kms).await {
            Ok(true) => {}
            Ok(false) => {
                entry_ok = false;
                report.errors.push(IntegrityFault {
                    entry_id: entry.id,
                    reason: "signature verification failed".to_string(),
                });
            }
            Err(e) => {
                entry_ok = false;
                report.errors.push(IntegrityFault {
                    entry_id: entry.id,
                    reason: format!("signature unverifiable: {e}"),
                });
            }
        }

        if entry_ok {
            report.verified_entries += 1;
        } else {
            report.failed_entries += 1;
            report.valid = false;
        }
        expected_prev = entry.signature.clone();
    }

    Ok(report)
}

async fn entry_signature_valid(
    entry: &SignedAuditEntry,
    kms: Option<&dyn KmsProvider>,
) -> Result<bool, AuditError> {
    let preimage = entry.signing_preimage()?;
    if entry.signed_by == HASH_ONLY_SIGNER {
        return Ok(entry.signature == sha256_hex(&preimage));
    }
    let Some(kms) = kms else {
        return Err(AuditError::ImportRejected(
            "no KMS available to verify signed entries".to_string(),
        ));
    };
    let signature = b64_decode(&entry.signature)
        .map_err(|e| AuditError::SignatureInvalid(format!("{}: {e}", entry.id)))?;
    Ok(kms
        .verify(&entry.signed_by, &preimage, &signature, MessageType::Raw)
        .await?)
}
