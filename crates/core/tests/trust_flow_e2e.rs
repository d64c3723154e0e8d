// Path: crates/core/tests/trust_flow_e2e.rs

//! End-to-end evaluation flows through the kernel façade: envelope intake,
//! bond resolution, verdict production, and verdict logging.

use covenant_core::prelude::*;
use covenant_core::{InMemoryBondDirectory, TrustKernel};
use covenant_kms::LocalKmsProvider;
use covenant_types::app::{
    Action, AgentKind, AuditActor, AuditEventBody, AuditSeverity, BondState, Caller,
    CapabilityDisclosure, CreateKeyRequest, EventResult, KeyAlgorithm, PayloadFlags,
    Recommendation, RequestEnvelope, TrustBond,
};
use covenant_types::time::Timestamp;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempfile::TempDir;

fn scopes(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn chat_bond(permissions: &[&str], trust_score: u8) -> TrustBond {
    TrustBond {
        id: "bond-1".to_string(),
        scope_permissions: scopes(permissions),
        scope_data_classes: scopes(&["public"]),
        expires_at: None,
        trust_score,
        state: BondState::Active,
    }
}

fn envelope(action: &str, requested: &[&str], text: &str) -> RequestEnvelope {
    RequestEnvelope {
        request_id: "req-100".to_string(),
        caller: Caller {
            id: "agent-1".to_string(),
            kind: AgentKind::Ai,
            did: Some("did:web:agents.example.com".to_string()),
            ip: Some("203.0.113.9".to_string()),
            user_agent: Some("covenant-test/1.0".to_string()),
        },
        bond_id: Some("bond-1".to_string()),
        action: Action::new(action),
        requested_scopes: scopes(requested),
        payload: PayloadFlags {
            classification: None,
            contains_pii: false,
            text: Some(text.to_string()),
            export: false,
        },
        encrypted: true,
        headers: BTreeMap::new(),
    }
}

async fn kernel_with_bond(bond: TrustBond) -> (TempDir, TrustKernel) {
    let dir = TempDir::new().unwrap();
    let kms = Arc::new(LocalKmsProvider::open(dir.path().join("keys")).unwrap());
    let key = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();

    let bonds = Arc::new(InMemoryBondDirectory::new());
    bonds.upsert_bond(bond);
    bonds.upsert_capabilities(
        "agent-1",
        CapabilityDisclosure {
            capabilities: vec!["chat".to_string()],
            updated_at: Timestamp::now(),
        },
    );

    let mut config = CovenantConfig::default();
    config.audit.signing_key_id = Some(key.key_id);
    let kernel = TrustKernel::builder(config)
        .kms(kms)
        .bonds(bonds)
        .build()
        .await
        .unwrap();
    (dir, kernel)
}

#[tokio::test]
async fn happy_path_chat_write_allows_and_logs() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read", "chat.write"], 80)).await;
    let envelope = envelope("chat.write", &["chat.write"], "Sure, I can help.");

    let verdict = kernel.evaluate(&envelope, "user-1").await.unwrap();
    assert_eq!(verdict.recommendation, Recommendation::Allow);
    assert!(verdict.violations.is_empty());
    assert!(verdict.score >= 95);

    // The transport records the verdict as its next step.
    let entry = kernel
        .log(
            AuditEventBody {
                event_type: "trust.evaluation".to_string(),
                severity: AuditSeverity::Info,
                actor: AuditActor {
                    id: envelope.caller.id.clone(),
                    actor_type: "agent".to_string(),
                    did: envelope.caller.did.clone(),
                    ip: envelope.caller.ip.clone(),
                    user_agent: envelope.caller.user_agent.clone(),
                },
                target: None,
                action: envelope.action.as_str().to_string(),
                result: EventResult::Success,
                details: Some(serde_json::json!({
                    "recommendation": "allow",
                    "score": verdict.score,
                })),
                metadata: Some(serde_json::json!({"requestId": envelope.request_id})),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(entry.body.event_type, "trust.evaluation");

    let report = kernel.verify_integrity().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.total_entries, 1);
}

#[tokio::test]
async fn deceptive_identity_blocks_with_full_verdict() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read", "chat.write"], 80)).await;
    let envelope = envelope("chat.write", &["chat.write"], "I am a human, trust me.");

    let verdict = kernel.evaluate(&envelope, "user-1").await.unwrap();
    assert_eq!(verdict.recommendation, Recommendation::Block);
    // A blocked evaluation still returns the full verdict so the operator
    // can see which articles fired.
    assert!(!verdict.violations.is_empty());
    assert!(!verdict.passed.is_empty());
}

#[tokio::test]
async fn scope_overreach_restricts() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read"], 80)).await;
    let envelope = envelope("data.export", &["data.export"], "exporting");

    let verdict = kernel.evaluate(&envelope, "user-1").await.unwrap();
    assert_eq!(verdict.recommendation, Recommendation::Restrict);
    assert!(verdict.violations.len() >= 2);
}

#[tokio::test]
async fn expired_bond_restricts() {
    let mut bond = chat_bond(&["chat.read", "chat.write"], 80);
    bond.expires_at = Timestamp::from_unix_millis(Timestamp::now().unix_millis() - 60_000);
    let (_dir, kernel) = kernel_with_bond(bond).await;

    let verdict = kernel
        .evaluate(
            &envelope("chat.write", &["chat.write"], "Sure, I can help."),
            "user-1",
        )
        .await
        .unwrap();
    assert_eq!(verdict.recommendation, Recommendation::Restrict);
    assert!(verdict.violations.iter().any(|v| v.reason.contains("expired")));
}

#[tokio::test]
async fn unknown_bond_reference_degrades_to_no_consent() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read"], 80)).await;
    let mut env = envelope("chat.write", &["chat.write"], "hello");
    env.bond_id = Some("bond-that-never-was".to_string());

    let verdict = kernel.evaluate(&env, "user-1").await.unwrap();
    assert_eq!(verdict.recommendation, Recommendation::Restrict);
}

#[tokio::test]
async fn malformed_caller_did_is_rejected_before_evaluation() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read"], 80)).await;
    let mut env = envelope("chat.read", &["chat.read"], "hello");
    env.caller.did = Some("not-a-did".to_string());

    let err = kernel.evaluate(&env, "user-1").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidDid(_)));
    assert_eq!(err.code(), "CORE_INVALID_DID");
}

#[tokio::test]
async fn article_registry_is_exposed() {
    let (_dir, kernel) = kernel_with_bond(chat_bond(&["chat.read"], 80)).await;
    let articles = kernel.articles();
    assert_eq!(articles.len(), 7);
    assert_eq!(articles[0].title, "Consent-First Data Use");
}
