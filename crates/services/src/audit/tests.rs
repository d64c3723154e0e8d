// Path: crates/services/src/audit/tests.rs

use super::*;
use covenant_kms::LocalKmsProvider;
use covenant_storage::{FileAuditStore, MemoryAuditStore};
use covenant_types::app::{AuditActor, AuditSeverity, CreateKeyRequest, EventResult, KeyAlgorithm};
use tempfile::TempDir;

fn body(event_type: &str, actor: &str, result: EventResult) -> AuditEventBody {
    AuditEventBody {
        event_type: event_type.to_string(),
        severity: AuditSeverity::Info,
        actor: AuditActor::system(actor),
        target: None,
        action: "test.run".to_string(),
        result,
        details: Some(serde_json::json!({"note": "fixture"})),
        metadata: None,
    }
}

async fn signed_log() -> (TempDir, AuditLog) {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let key = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    let config = AuditConfig {
        signing_key_id: Some(key.key_id),
        ..Default::default()
    };
    let log = AuditLog::open(Arc::new(MemoryAuditStore::new()), kms, config)
        .await
        .unwrap();
    (dir, log)
}

async fn hash_only_log() -> (TempDir, AuditLog) {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let config = AuditConfig {
        sign_entries: false,
        ..Default::default()
    };
    let log = AuditLog::open(Arc::new(MemoryAuditStore::new()), kms, config)
        .await
        .unwrap();
    (dir, log)
}

#[tokio::test]
async fn chain_starts_at_genesis_and_links_forward() {
    let (_dir, log) = signed_log().await;
    let first = log.log(body("a", "tester", EventResult::Success)).await.unwrap();
    let second = log.log(body("b", "tester", EventResult::Success)).await.unwrap();
    let third = log.log(body("c", "tester", EventResult::Failure)).await.unwrap();

    assert_eq!(first.previous_hash, GENESIS_HASH);
    assert_eq!(second.previous_hash, first.signature);
    assert_eq!(third.previous_hash, second.signature);
    assert_ne!(first.signed_by, HASH_ONLY_SIGNER);
}

#[tokio::test]
async fn append_preserves_chain_integrity() {
    let (_dir, log) = signed_log().await;
    for i in 0..5 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }
    let report = log.verify_integrity().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.total_entries, 5);
    assert_eq!(report.verified_entries, 5);
    assert_eq!(report.failed_entries, 0);
    assert!(!report.broken_chain);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn mutating_details_breaks_verification() {
    let (_dir, log) = signed_log().await;
    for i in 0..3 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }

    let mut entries = log.export().await.unwrap();
    entries[1].body.details = Some(serde_json::json!({"note": "tampered"}));
    let tampered_id = entries[1].id;
    let report = verify_entries(&entries, GENESIS_HASH, Some(&**log.kms()))
        .await
        .unwrap();

    assert!(!report.valid);
    assert_eq!(report.failed_entries, 1);
    assert!(report
        .errors
        .iter()
        .any(|f| f.entry_id == tampered_id && f.reason.contains("signature")));
}

#[tokio::test]
async fn hash_only_mode_detects_tamper_without_keys() {
    let (_dir, log) = hash_only_log().await;
    for i in 0..4 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }
    let report = log.verify_integrity().await.unwrap();
    assert!(report.valid);

    let mut entries = log.export().await.unwrap();
    assert!(entries.iter().all(|e| e.signed_by == HASH_ONLY_SIGNER));
    entries[2].body.action = "forged.action".to_string();
    let report = verify_entries(&entries, GENESIS_HASH, None).await.unwrap();
    assert!(!report.valid);
    // The tampered entry fails its hash; its successor still chains to the
    // recorded (unchanged) signature, so exactly one entry is reported.
    assert_eq!(report.failed_entries, 1);
}

#[tokio::test]
async fn disabled_log_refuses_entries() {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let config = AuditConfig {
        enabled: false,
        ..Default::default()
    };
    let log = AuditLog::open(Arc::new(MemoryAuditStore::new()), kms, config)
        .await
        .unwrap();
    assert!(matches!(
        log.log(body("e", "t", EventResult::Success)).await,
        Err(AuditError::Disabled)
    ));
}

#[tokio::test]
async fn failed_signing_leaves_chain_unchanged() {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let config = AuditConfig {
        signing_key_id: Some("local-missing".to_string()),
        ..Default::default()
    };
    let log = AuditLog::open(Arc::new(MemoryAuditStore::new()), kms, config)
        .await
        .unwrap();

    assert!(log.log(body("e", "t", EventResult::Success)).await.is_err());
    assert_eq!(log.export().await.unwrap().len(), 0);
    assert!(log.verify_integrity().await.unwrap().valid);
}

#[tokio::test]
async fn query_filters_and_paginates() {
    let (_dir, log) = signed_log().await;
    for i in 0..10 {
        let result = if i % 2 == 0 {
            EventResult::Success
        } else {
            EventResult::Failure
        };
        log.log(body("trust.evaluation", &format!("actor-{}", i % 3), result))
            .await
            .unwrap();
    }
    log.log(body("status.changed", "actor-0", EventResult::Success))
        .await
        .unwrap();

    let all = log.query(&AuditFilter::default()).await.unwrap();
    assert_eq!(all.total, 11);
    assert!(!all.has_more);

    let failures = log
        .query(&AuditFilter {
            results: vec![EventResult::Failure],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failures.total, 5);

    let by_type = log
        .query(&AuditFilter {
            event_types: vec!["status.changed".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_type.total, 1);

    let paged = log
        .query(&AuditFilter {
            limit: Some(4),
            offset: 8,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(paged.total, 11);
    assert_eq!(paged.entries.len(), 3);
    assert!(!paged.has_more);

    let first_page = log
        .query(&AuditFilter {
            limit: Some(4),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first_page.entries.len(), 4);
    assert!(first_page.has_more);
}

#[tokio::test]
async fn import_replaces_state_and_rejects_broken_chains() {
    let (_dir, log) = signed_log().await;
    for i in 0..3 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }
    let exported = log.export().await.unwrap();

    let (_dir2, other) = signed_log().await;
    // The other log's KMS does not hold the exporter's key, so import must
    // reject the chain as unverifiable.
    assert!(other.import(exported.clone()).await.is_err());

    // Importing into a log sharing the original KMS succeeds.
    let store = Arc::new(MemoryAuditStore::new());
    let fresh = AuditLog::open(store, log.kms().clone(), AuditConfig::default())
        .await
        .unwrap();
    let report = fresh.import(exported.clone()).await.unwrap();
    assert!(report.valid);
    assert_eq!(fresh.export().await.unwrap().len(), 3);

    // And a tampered chain is rejected wholesale.
    let mut broken = exported;
    broken[0].body.action = "forged".to_string();
    assert!(matches!(
        fresh.import(broken).await,
        Err(AuditError::ImportRejected(_))
    ));
    assert_eq!(fresh.export().await.unwrap().len(), 3);
}

#[tokio::test]
async fn retention_archives_old_entries_and_chain_stays_verifiable() {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let config = AuditConfig {
        sign_entries: false,
        retention_days: Some(30),
        ..Default::default()
    };
    let log = AuditLog::open(Arc::new(MemoryAuditStore::new()), kms, config)
        .await
        .unwrap();

    for i in 0..4 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }

    // Nothing is old enough yet.
    assert_eq!(log.apply_retention(Timestamp::now()).await.unwrap(), 0);

    // From the vantage point of a distant future, everything is stale.
    let future =
        Timestamp::from_unix_millis(Timestamp::now().unix_millis() + 40 * 24 * 3600 * 1000)
            .unwrap();
    assert_eq!(log.apply_retention(future).await.unwrap(), 4);

    let report = log.verify_integrity().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.total_entries, 4);

    // New entries anchor onto the archived chain.
    log.log(body("post-archive", "tester", EventResult::Success))
        .await
        .unwrap();
    let report = log.verify_integrity().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.total_entries, 5);
}

#[tokio::test]
async fn ndjson_export_carries_segment_headers() {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path()).unwrap());
    let store = Arc::new(FileAuditStore::open(dir.path().join("audit")).unwrap());
    let config = AuditConfig {
        sign_entries: false,
        retention_days: Some(1),
        storage_backend: covenant_types::config::StorageBackendKind::File,
        ..Default::default()
    };
    let log = AuditLog::open(store, kms, config).await.unwrap();
    log.log(body("one", "t", EventResult::Success)).await.unwrap();
    log.log(body("two", "t", EventResult::Success)).await.unwrap();

    let text = log.export_ndjson().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("genesisHash"));
    assert!(lines[0].contains(GENESIS_HASH));

    // Archive the first entry; the export now shows two segments and the
    // live header anchors to the archived signature.
    let future =
        Timestamp::from_unix_millis(Timestamp::now().unix_millis() + 2 * 24 * 3600 * 1000)
            .unwrap();
    assert_eq!(log.apply_retention(future).await.unwrap(), 2);
    log.log(body("three", "t", EventResult::Success)).await.unwrap();

    let text = log.export_ndjson().await.unwrap();
    let headers: Vec<&str> = text
        .lines()
        .filter(|l| l.contains("genesisHash"))
        .collect();
    assert_eq!(headers.len(), 2);
}

#[tokio::test]
async fn ndjson_round_trips_through_parse_and_import() {
    let (_dir, log) = hash_only_log().await;
    for i in 0..3 {
        log.log(body(&format!("event.{i}"), "tester", EventResult::Success))
            .await
            .unwrap();
    }

    let text = log.export_ndjson().await.unwrap();
    let parsed = parse_ndjson(&text).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed, log.export().await.unwrap());

    let report = log.import(parsed).await.unwrap();
    assert!(report.valid);

    // A malformed line is rejected with its position.
    let err = parse_ndjson("{\"genesisHash\":\"00\"}\nnot json\n").unwrap_err();
    assert!(matches!(err, AuditError::ImportRejected(_)));
}
