// Path: crates/services/src/oracle/articles.rs

//! The trust articles and their check routines.
//!
//! The article set is a first-class value: an ordered table of descriptor
//! plus check function. Checks never perform I/O; everything they need is
//! in the context and the environment. A check returns `Err` only when it
//! cannot complete at all, which the oracle escalates to a high-severity
//! violation.

use crate::oracle::patterns;
use covenant_types::app::{
    AgentKind, ArticleDescriptor, ArticleId, CheckStatus, Severity, TrustContext,
};
use covenant_types::config::OracleConfig;
use covenant_types::time::Timestamp;
use std::collections::BTreeMap;

/// How long a capability disclosure stays fresh before A3 warns.
const CAPABILITY_FRESHNESS_DAYS: i64 = 30;

/// Action verbs that mutate state and therefore gate on the write
/// trust-score threshold.
const WRITE_VERBS: [&str; 9] = [
    "write", "create", "update", "delete", "export", "extract", "send", "post", "publish",
];

/// Action verbs that move data out of the platform.
const EXTRACTION_VERBS: [&str; 2] = ["extract", "export"];

/// The scope that authorizes data extraction.
const EXPORT_SCOPE: &str = "data.export";

/// The evaluation environment: configuration plus the evaluation instant.
pub struct OracleEnv<'a> {
    /// Oracle configuration.
    pub config: &'a OracleConfig,
    /// The instant expiry and freshness are assessed against.
    pub now: Timestamp,
}

/// What a single check concluded.
pub struct CheckOutcome {
    /// Pass, warning, or violation.
    pub status: CheckStatus,
    /// Human-readable explanation.
    pub reason: String,
    /// Optional structured detail, deterministically ordered.
    pub details: Option<BTreeMap<String, String>>,
}

impl CheckOutcome {
    fn pass(reason: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            status: CheckStatus::Pass,
            reason: reason.into(),
            details: None,
        })
    }

    fn warning(reason: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            status: CheckStatus::Warning,
            reason: reason.into(),
            details: None,
        })
    }

    fn violation(reason: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            status: CheckStatus::Violation,
            reason: reason.into(),
            details: None,
        })
    }

    fn violation_with(
        reason: impl Into<String>,
        details: BTreeMap<String, String>,
    ) -> Result<Self, String> {
        Ok(Self {
            status: CheckStatus::Violation,
            reason: reason.into(),
            details: Some(details),
        })
    }
}

type CheckFn = fn(&TrustContext, &OracleEnv) -> Result<CheckOutcome, String>;

/// One article: its descriptor and its check.
pub(crate) struct Article {
    pub(crate) descriptor: ArticleDescriptor,
    pub(crate) check: CheckFn,
}

fn descriptor(
    id: ArticleId,
    title: &str,
    severity: Severity,
    category: &str,
    check_name: &str,
) -> ArticleDescriptor {
    ArticleDescriptor {
        id,
        title: title.to_string(),
        severity,
        category: category.to_string(),
        check_name: check_name.to_string(),
    }
}

/// The closed, ordered article table.
pub(crate) fn table() -> Vec<Article> {
    vec![
        Article {
            descriptor: descriptor(
                ArticleId::A1,
                "Consent-First Data Use",
                Severity::High,
                "consent",
                "check_consent_first",
            ),
            check: check_consent_first,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A2,
                "No Unrequested Data Extraction",
                Severity::High,
                "consent",
                "check_no_extraction",
            ),
            check: check_no_extraction,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A3,
                "Transparent Capability Disclosure",
                Severity::Medium,
                "disclosure",
                "check_capability_disclosure",
            ),
            check: check_capability_disclosure,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A4,
                "Respect Boundaries",
                Severity::High,
                "boundaries",
                "check_respect_boundaries",
            ),
            check: check_respect_boundaries,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A5,
                "No Deceptive Practices",
                Severity::Critical,
                "honesty",
                "check_no_deception",
            ),
            check: check_no_deception,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A6,
                "Secure Data Handling",
                Severity::High,
                "security",
                "check_secure_handling",
            ),
            check: check_secure_handling,
        },
        Article {
            descriptor: descriptor(
                ArticleId::A7,
                "Audit Trail Maintenance",
                Severity::Medium,
                "accountability",
                "check_audit_trail",
            ),
            check: check_audit_trail,
        },
    ]
}

fn check_consent_first(ctx: &TrustContext, env: &OracleEnv) -> Result<CheckOutcome, String> {
    let Some(bond) = &ctx.bond else {
        return CheckOutcome::violation("no trust bond covers this caller-agent pair");
    };
    if bond.state != covenant_types::app::BondState::Active {
        return CheckOutcome::violation(format!("trust bond {} is not active", bond.id));
    }
    if bond.is_expired(env.now) {
        return CheckOutcome::violation(format!("consent under bond {} has expired", bond.id));
    }
    let missing: Vec<&String> = ctx
        .requested_scopes
        .iter()
        .filter(|s| !bond.scope_permissions.contains(*s))
        .collect();
    if !missing.is_empty() {
        let mut details = BTreeMap::new();
        details.insert(
            "unconsented_scopes".to_string(),
            missing
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        return CheckOutcome::violation_with("requested scopes exceed consented scopes", details);
    }
    CheckOutcome::pass("all requested scopes are covered by an active bond")
}

fn check_no_extraction(ctx: &TrustContext, _env: &OracleEnv) -> Result<CheckOutcome, String> {
    let extracting =
        EXTRACTION_VERBS.contains(&ctx.action.verb()) || ctx.data.export;
    if !extracting {
        return CheckOutcome::pass("action does not extract data");
    }
    let Some(bond) = &ctx.bond else {
        return CheckOutcome::violation("data extraction attempted without a trust bond");
    };
    if !bond.scope_permissions.contains(EXPORT_SCOPE) {
        return CheckOutcome::violation(format!(
            "data extraction is not permitted: bond lacks the {EXPORT_SCOPE} scope"
        ));
    }
    if let Some(classification) = &ctx.data.classification {
        if !bond.scope_data_classes.contains(classification) {
            return CheckOutcome::violation(format!(
                "data class {classification} is outside the consented classes"
            ));
        }
    }
    CheckOutcome::pass("extraction is covered by explicit consent")
}

fn check_capability_disclosure(
    ctx: &TrustContext,
    env: &OracleEnv,
) -> Result<CheckOutcome, String> {
    let Some(disclosure) = &ctx.capabilities else {
        return CheckOutcome::violation(format!(
            "agent {} has not declared its capabilities",
            ctx.agent_id
        ));
    };
    if disclosure.capabilities.is_empty() {
        return CheckOutcome::violation(format!(
            "agent {} declared an empty capability set",
            ctx.agent_id
        ));
    }
    let age_days =
        (env.now.unix_millis() - disclosure.updated_at.unix_millis()) / (24 * 60 * 60 * 1000);
    if age_days > CAPABILITY_FRESHNESS_DAYS {
        return CheckOutcome::warning(format!(
            "capability disclosure is {age_days} days old (limit {CAPABILITY_FRESHNESS_DAYS})"
        ));
    }
    CheckOutcome::pass("capability disclosure is current")
}

fn check_respect_boundaries(ctx: &TrustContext, env: &OracleEnv) -> Result<CheckOutcome, String> {
    let Some(bond) = &ctx.bond else {
        return CheckOutcome::violation("no trust bond to assess boundaries against");
    };
    let threshold = if WRITE_VERBS.contains(&ctx.action.verb()) {
        env.config.trust_score_threshold_write
    } else {
        0
    };
    if bond.trust_score < threshold {
        let mut details = BTreeMap::new();
        details.insert("trust_score".to_string(), bond.trust_score.to_string());
        details.insert("required".to_string(), threshold.to_string());
        return CheckOutcome::violation_with(
            format!(
                "trust score {} is below the {} required for {}",
                bond.trust_score,
                threshold,
                ctx.action.verb()
            ),
            details,
        );
    }
    if !ctx.requested_scopes.is_empty()
        && ctx
            .requested_scopes
            .iter()
            .all(|s| !bond.scope_permissions.contains(s))
    {
        return CheckOutcome::violation(
            "requested scopes share nothing with the bond's allowed scopes",
        );
    }
    CheckOutcome::pass("request stays within the bond's boundaries")
}

fn check_no_deception(ctx: &TrustContext, _env: &OracleEnv) -> Result<CheckOutcome, String> {
    if ctx.agent_kind != AgentKind::Ai {
        return CheckOutcome::pass("caller is not an AI agent");
    }
    let Some(text) = &ctx.data.text else {
        return CheckOutcome::pass("no content to inspect");
    };
    if let Some(pattern) = patterns::first_deceptive_match(text) {
        let mut details = BTreeMap::new();
        details.insert("pattern".to_string(), pattern.to_string());
        return CheckOutcome::violation_with(
            "AI agent content contains a deceptive identity claim",
            details,
        );
    }
    CheckOutcome::pass("no deceptive identity pattern found")
}

fn check_secure_handling(ctx: &TrustContext, _env: &OracleEnv) -> Result<CheckOutcome, String> {
    if ctx.data.contains_pii && !ctx.encrypted {
        return CheckOutcome::violation(
            "payload contains PII but the request is not encrypted",
        );
    }
    CheckOutcome::pass("data handling meets the transport requirements")
}

fn check_audit_trail(ctx: &TrustContext, _env: &OracleEnv) -> Result<CheckOutcome, String> {
    if !ctx.audit_enabled {
        return CheckOutcome::violation("audit logging is disabled for this request");
    }
    CheckOutcome::pass("audit trail is active for this request")
}
