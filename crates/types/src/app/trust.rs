// Path: crates/types/src/app/trust.rs

//! Trust articles, bonds, contexts, and verdicts.
//!
//! A [`TrustContext`] is assembled per request by the surrounding transport
//! and handed to the oracle; the oracle answers with a [`TrustVerdict`].
//! Both are pure values: evaluating the same context twice yields
//! byte-identical verdicts.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The kind of agent making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// An AI agent.
    Ai,
    /// A human operator.
    Human,
    /// A headless service.
    Service,
}

/// The severity attached to a trust article or a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never gates a request on its own.
    Low,
    /// A finding worth surfacing to operators.
    Medium,
    /// A finding that restricts the request when violated.
    High,
    /// A finding that blocks the request outright when violated.
    Critical,
}

/// The outcome classification of a single article check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The article is satisfied.
    Pass,
    /// The article is satisfied with reservations.
    Warning,
    /// The article is violated.
    Violation,
    /// The check itself failed; treated as a violation.
    Error,
}

/// The oracle's overall recommendation for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    /// Proceed.
    Allow,
    /// Proceed, but surface the findings.
    Warn,
    /// Deny with a reduced-capability fallback available.
    Restrict,
    /// Deny outright.
    Block,
}

/// The identifier of a trust article. The set is closed and versioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArticleId {
    /// Consent-First Data Use.
    A1,
    /// No Unrequested Data Extraction.
    A2,
    /// Transparent Capability Disclosure.
    A3,
    /// Respect Boundaries.
    A4,
    /// No Deceptive Practices.
    A5,
    /// Secure Data Handling.
    A6,
    /// Audit Trail Maintenance.
    A7,
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
            Self::A7 => "A7",
        };
        f.write_str(s)
    }
}

/// The static description of a trust article, loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDescriptor {
    /// The article identifier.
    pub id: ArticleId,
    /// Human-readable title.
    pub title: String,
    /// Severity of a violation of this article.
    pub severity: Severity,
    /// Grouping category (consent, disclosure, security, ...).
    pub category: String,
    /// The name of the check routine bound to this article.
    pub check_name: String,
}

/// The lifecycle state of a trust bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondState {
    /// The bond is live.
    Active,
    /// The bond is temporarily suspended.
    Suspended,
    /// The bond has been revoked.
    Revoked,
}

/// A consent envelope binding a caller to an agent.
///
/// Bonds are owned by an external collaborator and are read-only inside the
/// kernel; a bond may be suspended or revoked out-of-band between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustBond {
    /// Unique bond identifier.
    pub id: String,
    /// The scopes the caller has consented to.
    #[serde(rename = "scopePermissions")]
    pub scope_permissions: BTreeSet<String>,
    /// The data classifications the caller has consented to expose.
    #[serde(rename = "scopeDataClasses")]
    pub scope_data_classes: BTreeSet<String>,
    /// When consent lapses, if ever.
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// The caller's confidence in the agent, 0..=100.
    #[serde(rename = "trustScore")]
    pub trust_score: u8,
    /// Lifecycle state.
    pub state: BondState,
}

impl TrustBond {
    /// Whether the bond has lapsed at the given instant.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.map(|e| e.is_before(&now) || e == now) == Some(true)
    }

    /// Whether every requested scope is covered by the bond.
    pub fn covers_scopes<'a, I: IntoIterator<Item = &'a String>>(&self, scopes: I) -> bool {
        scopes
            .into_iter()
            .all(|s| self.scope_permissions.contains(s))
    }
}

/// A `verb.resource` action reference, e.g. `chat.write` or `data.export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Wraps an action string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The full `verb.resource` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The verb segment (everything after the last `.`), or the whole
    /// string when no separator is present.
    pub fn verb(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, v)| v).unwrap_or(&self.0)
    }

    /// The resource segment (everything before the last `.`).
    pub fn resource(&self) -> &str {
        self.0.rsplit_once('.').map(|(r, _)| r).unwrap_or("")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flags describing the request payload. The kernel never stores the
/// payload itself; `text` is inspected in-memory during evaluation only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadFlags {
    /// Data classification label, if the payload carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Whether the payload contains personally identifiable information.
    #[serde(rename = "containsPII", default)]
    pub contains_pii: bool,
    /// Free-text content, inspected for deceptive-identity patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Whether the request intends to export data out of the platform.
    #[serde(default)]
    pub export: bool,
}

/// An agent's self-declared capability disclosure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDisclosure {
    /// The declared capability identifiers.
    pub capabilities: Vec<String>,
    /// When the declaration was last refreshed.
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
}

/// The caller identity extracted from a validated request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    /// Caller identifier.
    pub id: String,
    /// The kind of caller.
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// The caller's DID, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    /// Source address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Client identification string.
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// The structured record a transport supplies per evaluation.
///
/// The transport is responsible for session validation and for populating
/// `caller`; the kernel trusts these fields after [`RequestEnvelope::validate`]
/// has checked their shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation identifier for the request.
    #[serde(rename = "requestId")]
    pub request_id: String,
    /// The authenticated caller.
    pub caller: Caller,
    /// The trust bond this request runs under, if any.
    #[serde(rename = "bondId", default, skip_serializing_if = "Option::is_none")]
    pub bond_id: Option<String>,
    /// The action being attempted.
    pub action: Action,
    /// The scopes the caller asks to exercise.
    #[serde(rename = "requestedScopes", default)]
    pub requested_scopes: BTreeSet<String>,
    /// Payload flags.
    #[serde(default)]
    pub payload: PayloadFlags,
    /// Whether the request arrived over an encrypted channel.
    #[serde(default)]
    pub encrypted: bool,
    /// Transport headers relevant to policy (already filtered upstream).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RequestEnvelope {
    /// Checks the structural shape of the envelope: non-empty identifiers,
    /// a `verb.resource` action, and non-empty scope strings. Semantic
    /// checks (consent, boundaries) belong to the oracle, not here.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        use crate::error::CoreError;

        if self.request_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("requestId must not be empty".into()));
        }
        if self.caller.id.trim().is_empty() {
            return Err(CoreError::InvalidInput("caller.id must not be empty".into()));
        }
        let action = self.action.as_str();
        if action.trim().is_empty() || !action.contains('.') || action.starts_with('.')
            || action.ends_with('.')
        {
            return Err(CoreError::InvalidInput(format!(
                "action must have the form verb.resource, got {action:?}"
            )));
        }
        if let Some(bond_id) = &self.bond_id {
            if bond_id.trim().is_empty() {
                return Err(CoreError::InvalidInput("bondId must not be empty".into()));
            }
        }
        if self.requested_scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(CoreError::InvalidInput(
                "requestedScopes must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

/// The input to the trust oracle, assembled per request.
///
/// Transient; lives only for the duration of one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustContext {
    /// Correlation identifier.
    pub request_id: String,
    /// The user on whose behalf the request runs.
    pub user_id: String,
    /// The agent making the request.
    pub agent_id: String,
    /// The kind of agent.
    pub agent_kind: AgentKind,
    /// The action being attempted.
    pub action: Action,
    /// The scopes requested.
    pub requested_scopes: BTreeSet<String>,
    /// Payload flags.
    pub data: PayloadFlags,
    /// Whether the request arrived encrypted.
    pub encrypted: bool,
    /// Transport headers relevant to policy.
    pub headers: BTreeMap<String, String>,
    /// The resolved trust bond, if one was referenced and found.
    pub bond: Option<TrustBond>,
    /// The agent's capability disclosure, if one is on file.
    pub capabilities: Option<CapabilityDisclosure>,
    /// Whether audit logging is active for this request.
    pub audit_enabled: bool,
}

impl TrustContext {
    /// Assembles a context from a request envelope plus the collaborator
    /// state the kernel resolved for it. `user_id` comes from the
    /// transport's session validation, not from the envelope itself.
    pub fn from_envelope(
        envelope: &RequestEnvelope,
        user_id: impl Into<String>,
        bond: Option<TrustBond>,
        capabilities: Option<CapabilityDisclosure>,
        audit_enabled: bool,
    ) -> Self {
        Self {
            request_id: envelope.request_id.clone(),
            user_id: user_id.into(),
            agent_id: envelope.caller.id.clone(),
            agent_kind: envelope.caller.kind,
            action: envelope.action.clone(),
            requested_scopes: envelope.requested_scopes.clone(),
            data: envelope.payload.clone(),
            encrypted: envelope.encrypted,
            headers: envelope.headers.clone(),
            bond,
            capabilities,
            audit_enabled,
        }
    }
}

/// The outcome of a single article check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleResult {
    /// The article that was checked.
    #[serde(rename = "articleId")]
    pub article_id: ArticleId,
    /// The article's title.
    pub title: String,
    /// The article's violation severity.
    pub severity: Severity,
    /// How the check classified this request.
    pub status: CheckStatus,
    /// Human-readable explanation of the classification.
    pub reason: String,
    /// Optional structured detail, keyed deterministically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// The oracle's structured answer for one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustVerdict {
    /// Articles that passed.
    pub passed: Vec<ArticleResult>,
    /// Articles that passed with reservations.
    pub warnings: Vec<ArticleResult>,
    /// Articles that were violated (including check errors).
    pub violations: Vec<ArticleResult>,
    /// Aggregate score, 0..=100.
    pub score: u8,
    /// The gate decision.
    pub recommendation: Recommendation,
}

impl TrustVerdict {
    /// Whether any violated article carries the given severity.
    pub fn has_violation_of(&self, severity: Severity) -> bool {
        self.violations.iter().any(|v| v.severity == severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> RequestEnvelope {
        RequestEnvelope {
            request_id: "req-1".to_string(),
            caller: Caller {
                id: "agent-1".to_string(),
                kind: AgentKind::Ai,
                did: None,
                ip: None,
                user_agent: None,
            },
            bond_id: Some("bond-1".to_string()),
            action: Action::new("chat.write"),
            requested_scopes: ["chat.write".to_string()].into_iter().collect(),
            payload: PayloadFlags::default(),
            encrypted: true,
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn action_splits_on_the_last_dot() {
        let action = Action::new("data.export");
        assert_eq!(action.verb(), "export");
        assert_eq!(action.resource(), "data");

        let nested = Action::new("chat.thread.write");
        assert_eq!(nested.verb(), "write");
        assert_eq!(nested.resource(), "chat.thread");
    }

    #[test]
    fn well_formed_envelopes_validate() {
        envelope().validate().unwrap();
    }

    #[test]
    fn malformed_envelopes_are_rejected() {
        let mut e = envelope();
        e.request_id = "  ".to_string();
        assert!(e.validate().is_err());

        let mut e = envelope();
        e.action = Action::new("justaverb");
        assert!(e.validate().is_err());

        let mut e = envelope();
        e.action = Action::new(".leading");
        assert!(e.validate().is_err());

        let mut e = envelope();
        e.requested_scopes.insert(String::new());
        assert!(e.validate().is_err());

        let mut e = envelope();
        e.bond_id = Some(String::new());
        assert!(e.validate().is_err());
    }

    #[test]
    fn bond_expiry_is_inclusive_of_the_boundary() {
        let now = Timestamp::from_unix_millis(1_700_000_000_000).unwrap();
        let mut bond = TrustBond {
            id: "b".to_string(),
            scope_permissions: BTreeSet::new(),
            scope_data_classes: BTreeSet::new(),
            expires_at: Some(now),
            trust_score: 50,
            state: BondState::Active,
        };
        assert!(bond.is_expired(now));
        bond.expires_at = Timestamp::from_unix_millis(now.unix_millis() + 1);
        assert!(!bond.is_expired(now));
        bond.expires_at = None;
        assert!(!bond.is_expired(now));
    }

    #[test]
    fn bond_scope_coverage() {
        let bond = TrustBond {
            id: "b".to_string(),
            scope_permissions: ["chat.read".to_string(), "chat.write".to_string()]
                .into_iter()
                .collect(),
            scope_data_classes: BTreeSet::new(),
            expires_at: None,
            trust_score: 50,
            state: BondState::Active,
        };
        let ok: Vec<String> = vec!["chat.read".to_string()];
        let too_much: Vec<String> = vec!["chat.read".to_string(), "data.export".to_string()];
        assert!(bond.covers_scopes(ok.iter()));
        assert!(!bond.covers_scopes(too_much.iter()));
    }
}
