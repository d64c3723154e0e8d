// Path: crates/core/tests/kernel_e2e.rs

//! Façade-level exercises of the status-list and audit subsystems,
//! including on-disk tamper detection and the operational envelope.

use covenant_core::prelude::KmsProvider;
use covenant_core::TrustKernel;
use covenant_kms::LocalKmsProvider;
use covenant_services::status::{verify_credential, Bitstring};
use covenant_storage::FileAuditStore;
use covenant_types::app::{
    AuditActor, AuditEventBody, AuditSeverity, CreateKeyRequest, CredentialState, EventResult,
    KeyAlgorithm, StatusAnnotation,
};
use covenant_types::config::CovenantConfig;
use covenant_types::error::CoreError;
use covenant_types::keys::AUDIT_LIVE_SEGMENT;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn body(event_type: &str) -> AuditEventBody {
    AuditEventBody {
        event_type: event_type.to_string(),
        severity: AuditSeverity::Info,
        actor: AuditActor::system("kernel-test"),
        target: None,
        action: "test.run".to_string(),
        result: EventResult::Success,
        details: None,
        metadata: None,
    }
}

async fn kernel(dir: &TempDir) -> TrustKernel {
    let kms = Arc::new(LocalKmsProvider::open(dir.path().join("keys")).unwrap());
    let signing = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();

    let mut config = CovenantConfig::default();
    config.audit.signing_key_id = Some(signing.key_id.clone());
    config.statuslist.signing_key_id = Some(signing.key_id);
    config.statuslist.issuer = "did:web:issuer.example.com".to_string();
    config.statuslist.base_url = "https://issuer.example.com/status".to_string();
    TrustKernel::builder(config).kms(kms).build().await.unwrap()
}

#[tokio::test]
async fn status_revoke_round_trip() {
    let dir = TempDir::new().unwrap();
    let kernel = kernel(&dir).await;

    kernel
        .initialize_status_list(
            "L",
            covenant_services::status::InitListOptions {
                length: Some(8192),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    for expected in [0usize, 1, 2] {
        let entry = kernel.issue_status("L", None).await.unwrap();
        assert_eq!(entry.status_list_index, expected);
        assert_eq!(
            entry.status_list_credential,
            "https://issuer.example.com/status/L"
        );
    }

    kernel
        .set_status("L", 1, true, "ops@issuer", Some("fraud".to_string()), None)
        .await
        .unwrap();

    assert_eq!(
        kernel.check_status("L", 0).await.unwrap().status,
        CredentialState::Active
    );
    let revoked = kernel.check_status("L", 1).await.unwrap();
    assert_eq!(revoked.status, CredentialState::Revoked);
    match revoked.metadata {
        Some(StatusAnnotation::Revocation(meta)) => {
            assert_eq!(meta.reason.as_deref(), Some("fraud"))
        }
        other => panic!("unexpected metadata: {other:?}"),
    }
    assert_eq!(
        kernel.check_status("L", 2).await.unwrap().status,
        CredentialState::Active
    );

    let credential = kernel.emit_status_credential("L", None).await.unwrap();
    let bits =
        Bitstring::decode(&credential.credential_subject.encoded_list, Some(8192)).unwrap();
    assert!(bits.get(1).unwrap());
    assert_eq!(bits.count_set(), 1);

    // The credential verifies against the issuer's public key.
    let key_id = credential
        .proof
        .as_ref()
        .unwrap()
        .verification_method
        .rsplit('#')
        .next()
        .unwrap()
        .to_string();
    let material = kernel.kms().get_public_key(&key_id).await.unwrap();
    assert!(verify_credential(&credential, &material).unwrap());
}

#[tokio::test]
async fn on_disk_signature_tamper_is_detected() {
    let dir = TempDir::new().unwrap();
    let audit_dir = dir.path().join("audit");

    let kms = Arc::new(LocalKmsProvider::open(dir.path().join("keys")).unwrap());
    let signing = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    let mut config = CovenantConfig::default();
    config.audit.signing_key_id = Some(signing.key_id);

    let tampered_id = {
        let kernel = TrustKernel::builder(config.clone())
            .kms(kms.clone())
            .audit_store(Arc::new(FileAuditStore::open(&audit_dir).unwrap()))
            .build()
            .await
            .unwrap();
        for i in 0..5 {
            kernel.log(body(&format!("event.{i}")), None).await.unwrap();
        }
        assert!(kernel.verify_integrity().await.unwrap().valid);
        kernel.export_audit().await.unwrap()[2].id
    };

    // Flip one byte of entry 3's signature on disk.
    let segment = audit_dir.join(AUDIT_LIVE_SEGMENT);
    let text = std::fs::read_to_string(&segment).unwrap();
    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    let needle = "\"signature\":\"";
    let pos = lines[2].find(needle).unwrap() + needle.len();
    let mut chars: Vec<char> = lines[2].chars().collect();
    chars[pos] = if chars[pos] == 'A' { 'B' } else { 'A' };
    lines[2] = chars.into_iter().collect();
    std::fs::write(&segment, lines.join("\n") + "\n").unwrap();

    // Reload and verify: the tampered entry is reported by id, and its
    // successor no longer chains.
    let kernel = TrustKernel::builder(config)
        .kms(kms)
        .audit_store(Arc::new(FileAuditStore::open(&audit_dir).unwrap()))
        .build()
        .await
        .unwrap();
    let report = kernel.verify_integrity().await.unwrap();
    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|f| f.entry_id == tampered_id && f.reason.contains("signature")));
    assert!(report.broken_chain);
}

#[tokio::test]
async fn pre_cancelled_operations_mutate_nothing() {
    let dir = TempDir::new().unwrap();
    let kernel = kernel(&dir).await;

    let token = CancellationToken::new();
    token.cancel();
    let err = kernel
        .log(body("never.lands"), Some(token))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Cancelled(_)));
    assert_eq!(kernel.export_audit().await.unwrap().len(), 0);
}

#[tokio::test]
async fn admission_gate_reports_overload() {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path().join("keys")).unwrap());
    let signing = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    let mut config = CovenantConfig::default();
    config.audit.signing_key_id = Some(signing.key_id);
    config.limits.max_inflight = 0;
    let kernel = TrustKernel::builder(config).kms(kms).build().await.unwrap();

    let err = kernel.log(body("overloaded"), None).await.unwrap_err();
    assert!(matches!(err, CoreError::Overloaded));
}

#[tokio::test]
async fn export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let kernel = kernel(&dir).await;
    for i in 0..3 {
        kernel.log(body(&format!("event.{i}")), None).await.unwrap();
    }

    let exported = kernel.export_audit().await.unwrap();
    let ndjson = kernel.export_audit_ndjson().await.unwrap();
    assert_eq!(ndjson.lines().count(), 4); // segment header + 3 entries

    let report = kernel.import_audit(exported, None).await.unwrap();
    assert!(report.valid);
    assert_eq!(kernel.export_audit().await.unwrap().len(), 3);

    // Appends continue on the imported chain.
    kernel.log(body("after.import"), None).await.unwrap();
    assert!(kernel.verify_integrity().await.unwrap().valid);
}

#[tokio::test]
async fn audit_query_pages_through_the_chain() {
    let dir = TempDir::new().unwrap();
    let kernel = kernel(&dir).await;
    for i in 0..7 {
        kernel.log(body(&format!("event.{i}")), None).await.unwrap();
    }

    let page = kernel
        .query(&covenant_types::app::AuditFilter {
            limit: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.entries.len(), 3);
    assert!(page.has_more);
}
