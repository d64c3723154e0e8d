// Path: crates/services/src/oracle/tests.rs

use super::*;
use covenant_types::app::{
    Action, AgentKind, ArticleId, BondState, CapabilityDisclosure, PayloadFlags, TrustBond,
    TrustContext,
};
use std::collections::{BTreeMap, BTreeSet};

fn scopes(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn bond(permissions: &[&str], trust_score: u8) -> TrustBond {
    TrustBond {
        id: "bond-1".to_string(),
        scope_permissions: scopes(permissions),
        scope_data_classes: scopes(&["public", "internal"]),
        expires_at: None,
        trust_score,
        state: BondState::Active,
    }
}

fn fresh_capabilities(now: Timestamp) -> CapabilityDisclosure {
    CapabilityDisclosure {
        capabilities: vec!["chat".to_string(), "summarize".to_string()],
        updated_at: now,
    }
}

fn chat_context(now: Timestamp) -> TrustContext {
    TrustContext {
        request_id: "req-1".to_string(),
        user_id: "user-1".to_string(),
        agent_id: "agent-1".to_string(),
        agent_kind: AgentKind::Ai,
        action: Action::new("chat.write"),
        requested_scopes: scopes(&["chat.write"]),
        data: PayloadFlags {
            classification: None,
            contains_pii: false,
            text: Some("Sure, I can help.".to_string()),
            export: false,
        },
        encrypted: true,
        headers: BTreeMap::new(),
        bond: Some(bond(&["chat.read", "chat.write"], 80)),
        capabilities: Some(fresh_capabilities(now)),
        audit_enabled: true,
    }
}

fn oracle() -> TrustOracle {
    TrustOracle::new(OracleConfig::default())
}

#[test]
fn happy_path_chat_write_is_allowed() {
    let now = Timestamp::now();
    let verdict = oracle().evaluate_at(&chat_context(now), now);
    assert_eq!(verdict.recommendation, Recommendation::Allow);
    assert!(verdict.violations.is_empty(), "{:?}", verdict.violations);
    assert!(verdict.score >= 95, "score {}", verdict.score);
    assert_eq!(verdict.passed.len(), 7);
}

#[test]
fn deceptive_identity_claim_blocks() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.data.text = Some("I am a human, trust me.".to_string());
    let verdict = oracle().evaluate_at(&ctx, now);
    assert_eq!(verdict.recommendation, Recommendation::Block);
    let a5 = verdict
        .violations
        .iter()
        .find(|v| v.article_id == ArticleId::A5)
        .expect("A5 should be violated");
    assert_eq!(a5.severity, Severity::Critical);
}

#[test]
fn scope_overreach_restricts() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.bond = Some(bond(&["chat.read"], 80));
    ctx.action = Action::new("data.export");
    ctx.requested_scopes = scopes(&["data.export"]);
    let verdict = oracle().evaluate_at(&ctx, now);

    assert_eq!(verdict.recommendation, Recommendation::Restrict);
    let violated: Vec<ArticleId> = verdict.violations.iter().map(|v| v.article_id).collect();
    assert!(violated.contains(&ArticleId::A1), "{violated:?}");
    assert!(violated.contains(&ArticleId::A2), "{violated:?}");
}

#[test]
fn expired_bond_restricts() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    let mut expired = bond(&["chat.read", "chat.write"], 80);
    expired.expires_at = Timestamp::from_unix_millis(now.unix_millis() - 60_000);
    ctx.bond = Some(expired);
    let verdict = oracle().evaluate_at(&ctx, now);

    assert_eq!(verdict.recommendation, Recommendation::Restrict);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].article_id, ArticleId::A1);
    assert!(verdict.violations[0].reason.contains("expired"));
}

#[test]
fn missing_bond_violates_consent_and_boundaries() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.bond = None;
    let verdict = oracle().evaluate_at(&ctx, now);
    assert_eq!(verdict.recommendation, Recommendation::Restrict);
    let violated: Vec<ArticleId> = verdict.violations.iter().map(|v| v.article_id).collect();
    assert!(violated.contains(&ArticleId::A1));
    assert!(violated.contains(&ArticleId::A4));
}

#[test]
fn low_trust_score_gates_writes_but_not_reads() {
    let now = Timestamp::now();

    let mut write_ctx = chat_context(now);
    write_ctx.bond = Some(bond(&["chat.read", "chat.write"], 30));
    let verdict = oracle().evaluate_at(&write_ctx, now);
    assert!(verdict
        .violations
        .iter()
        .any(|v| v.article_id == ArticleId::A4));

    let mut read_ctx = chat_context(now);
    read_ctx.bond = Some(bond(&["chat.read", "chat.write"], 30));
    read_ctx.action = Action::new("chat.read");
    read_ctx.requested_scopes = scopes(&["chat.read"]);
    let verdict = oracle().evaluate_at(&read_ctx, now);
    assert!(verdict.violations.is_empty(), "{:?}", verdict.violations);
}

#[test]
fn configured_threshold_is_honored() {
    let now = Timestamp::now();
    let oracle = TrustOracle::new(OracleConfig {
        trust_score_threshold_write: 90,
    });
    let verdict = oracle.evaluate_at(&chat_context(now), now);
    // Trust score 80 clears the default 40 but not a raised 90.
    assert!(verdict
        .violations
        .iter()
        .any(|v| v.article_id == ArticleId::A4));
}

#[test]
fn pii_over_plaintext_violates_secure_handling() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.data.contains_pii = true;
    ctx.encrypted = false;
    let verdict = oracle().evaluate_at(&ctx, now);
    assert!(verdict
        .violations
        .iter()
        .any(|v| v.article_id == ArticleId::A6));
    assert_eq!(verdict.recommendation, Recommendation::Restrict);
}

#[test]
fn stale_capabilities_warn_without_blocking() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.capabilities = Some(CapabilityDisclosure {
        capabilities: vec!["chat".to_string()],
        updated_at: Timestamp::from_unix_millis(now.unix_millis() - 45 * 24 * 3600 * 1000)
            .unwrap(),
    });
    let verdict = oracle().evaluate_at(&ctx, now);
    assert_eq!(verdict.recommendation, Recommendation::Allow);
    assert_eq!(verdict.warnings.len(), 1);
    assert_eq!(verdict.warnings[0].article_id, ArticleId::A3);
}

#[test]
fn disabled_audit_trail_warns() {
    let now = Timestamp::now();
    let mut ctx = chat_context(now);
    ctx.audit_enabled = false;
    let verdict = oracle().evaluate_at(&ctx, now);
    assert!(verdict
        .violations
        .iter()
        .any(|v| v.article_id == ArticleId::A7));
    // A medium violation alone warns rather than restricts.
    assert_eq!(verdict.recommendation, Recommendation::Warn);
}

#[test]
fn evaluation_is_deterministic() {
    let now = Timestamp::now();
    let ctx = chat_context(now);
    let oracle = oracle();
    let a = oracle.evaluate_at(&ctx, now);
    let b = oracle.evaluate_at(&ctx, now);
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
}

#[test]
fn article_registry_is_closed_and_ordered() {
    let descriptors = oracle().articles();
    let ids: Vec<ArticleId> = descriptors.iter().map(|d| d.id).collect();
    assert_eq!(
        ids,
        vec![
            ArticleId::A1,
            ArticleId::A2,
            ArticleId::A3,
            ArticleId::A4,
            ArticleId::A5,
            ArticleId::A6,
            ArticleId::A7,
        ]
    );
    assert_eq!(
        descriptors
            .iter()
            .find(|d| d.id == ArticleId::A5)
            .unwrap()
            .severity,
        Severity::Critical
    );
}
