// Path: crates/services/src/status/credential.rs

//! StatusList 2021 credential emission and verification.
//!
//! The proof covers the RFC 8785 canonical form of the credential with the
//! `proof` member absent; the suite name is derived from the signing key's
//! algorithm. Verification is local: it needs only the issuer's public key
//! material, so status reads keep working through a KMS outage.

use covenant_api::kms::KmsProvider;
use covenant_crypto::sign as suites;
use covenant_types::app::{
    CredentialProof, MessageType, PublicKeyMaterial, StatusListCredential, StatusListRecord,
    StatusListSubject, STATUS_LIST_CONTEXTS,
};
use covenant_types::codec::{b64_decode, b64_encode, to_jcs_bytes};
use covenant_types::error::{KmsError, StatusError};
use covenant_types::time::Timestamp;

/// Builds the unsigned credential document for a list.
pub(crate) fn build_unsigned(record: &StatusListRecord) -> StatusListCredential {
    let url = record.credential_url();
    StatusListCredential {
        context: STATUS_LIST_CONTEXTS.iter().map(|s| s.to_string()).collect(),
        id: url.clone(),
        credential_type: vec![
            "VerifiableCredential".to_string(),
            "StatusList2021Credential".to_string(),
        ],
        issuer: record.issuer.clone(),
        issuance_date: Timestamp::now(),
        credential_subject: StatusListSubject {
            id: format!("{url}#list"),
            subject_type: "StatusList2021".to_string(),
            status_purpose: record.purpose,
            encoded_list: record.encoded_list.clone(),
        },
        proof: None,
    }
}

/// Signs a list's credential through the KMS.
pub(crate) async fn issue(
    kms: &dyn KmsProvider,
    key_id: &str,
    record: &StatusListRecord,
) -> Result<StatusListCredential, StatusError> {
    let key = kms.get_key(key_id).await?;
    let suite = key.algorithm.proof_suite();
    if !key.algorithm.is_asymmetric_signing() {
        return Err(StatusError::Kms(KmsError::AlgorithmMismatch {
            key_id: key_id.to_string(),
            operation: "issue credential".to_string(),
        }));
    }

    let mut credential = build_unsigned(record);
    let preimage = to_jcs_bytes(&credential)?;
    let signature = kms.sign(key_id, &preimage, MessageType::Raw).await?;

    credential.proof = Some(CredentialProof {
        proof_type: suite.to_string(),
        created: Timestamp::now(),
        verification_method: record.issuer.verification_method(&key.key_id),
        proof_purpose: "assertionMethod".to_string(),
        proof_value: b64_encode(&signature),
    });
    Ok(credential)
}

/// Verifies a credential's proof against the issuer's public key material.
///
/// Returns `Ok(false)` for a well-formed proof that does not match;
/// structural problems (missing proof, foreign suite) are typed errors.
pub fn verify_credential(
    credential: &StatusListCredential,
    issuer_key: &PublicKeyMaterial,
) -> Result<bool, StatusError> {
    let proof = credential.proof.as_ref().ok_or_else(|| {
        StatusError::Kms(KmsError::MalformedSignature(
            "credential carries no proof".to_string(),
        ))
    })?;
    let expected_suite = issuer_key.algorithm.proof_suite();
    if proof.proof_type != expected_suite {
        return Err(StatusError::Kms(KmsError::MalformedSignature(format!(
            "proof type {} does not match issuer key suite {expected_suite}",
            proof.proof_type
        ))));
    }
    let signature = b64_decode(&proof.proof_value)
        .map_err(|e| StatusError::Kms(KmsError::MalformedSignature(e.to_string())))?;
    let preimage = to_jcs_bytes(&credential.without_proof())?;
    let valid = suites::verify(
        issuer_key.algorithm,
        &issuer_key.public_key,
        &preimage,
        &signature,
        MessageType::Raw,
    )?;
    Ok(valid)
}
