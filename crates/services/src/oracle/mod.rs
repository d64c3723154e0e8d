// Path: crates/services/src/oracle/mod.rs

//! The trust oracle: a pure, deterministic evaluator over trust contexts.
//!
//! The oracle runs a fixed, ordered set of trust articles against one
//! [`TrustContext`] and produces a [`TrustVerdict`]. It performs no I/O:
//! the bond, the capability disclosure, and the evaluation instant are all
//! part of the input, so evaluating the same context at the same instant
//! yields byte-identical verdicts. Logging the verdict and enforcing the
//! recommendation are the caller's responsibility.

mod articles;
mod patterns;

pub use articles::{CheckOutcome, OracleEnv};

use covenant_types::app::{
    ArticleDescriptor, ArticleResult, CheckStatus, Recommendation, Severity, TrustContext,
    TrustVerdict,
};
use covenant_types::config::OracleConfig;
use covenant_types::time::Timestamp;

/// The policy engine evaluating trust contexts against the articles.
pub struct TrustOracle {
    config: OracleConfig,
    articles: Vec<articles::Article>,
}

impl TrustOracle {
    /// Builds an oracle with the closed, versioned article set.
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            articles: articles::table(),
        }
    }

    /// The descriptors of every article, in evaluation order.
    pub fn articles(&self) -> Vec<ArticleDescriptor> {
        self.articles.iter().map(|a| a.descriptor.clone()).collect()
    }

    /// Evaluates a context at the current instant.
    pub fn evaluate(&self, ctx: &TrustContext) -> TrustVerdict {
        self.evaluate_at(ctx, Timestamp::now())
    }

    /// Evaluates a context at an explicit instant. Pure: no I/O, no
    /// mutation, deterministic for equal inputs.
    pub fn evaluate_at(&self, ctx: &TrustContext, now: Timestamp) -> TrustVerdict {
        let env = OracleEnv {
            config: &self.config,
            now,
        };

        let mut passed = Vec::new();
        let mut warnings = Vec::new();
        let mut violations = Vec::new();

        for article in &self.articles {
            let descriptor = &article.descriptor;
            let result = match (article.check)(ctx, &env) {
                Ok(outcome) => ArticleResult {
                    article_id: descriptor.id,
                    title: descriptor.title.clone(),
                    severity: descriptor.severity,
                    status: outcome.status,
                    reason: outcome.reason,
                    details: outcome.details,
                },
                // A check that cannot complete is treated as a high-severity
                // violation rather than silently passing.
                Err(reason) => ArticleResult {
                    article_id: descriptor.id,
                    title: descriptor.title.clone(),
                    severity: Severity::High,
                    status: CheckStatus::Error,
                    reason: format!("check failed: {reason}"),
                    details: None,
                },
            };

            match result.status {
                CheckStatus::Pass => passed.push(result),
                CheckStatus::Warning => warnings.push(result),
                CheckStatus::Violation | CheckStatus::Error => violations.push(result),
            }
        }

        let score = Self::score(&passed, &warnings, &violations, self.articles.len());
        let recommendation = Self::recommendation(&warnings, &violations);
        TrustVerdict {
            passed,
            warnings,
            violations,
            score,
            recommendation,
        }
    }

    fn score(
        passed: &[ArticleResult],
        warnings: &[ArticleResult],
        violations: &[ArticleResult],
        total: usize,
    ) -> u8 {
        if total == 0 {
            return 100;
        }
        let critical = violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count();
        let raw = 100.0 * passed.len() as f64 / total as f64
            - 5.0 * warnings.len() as f64
            - 15.0 * violations.len() as f64
            - 25.0 * critical as f64;
        raw.round().clamp(0.0, 100.0) as u8
    }

    fn recommendation(
        warnings: &[ArticleResult],
        violations: &[ArticleResult],
    ) -> Recommendation {
        if violations.iter().any(|v| v.severity == Severity::Critical) {
            return Recommendation::Block;
        }
        if violations.iter().any(|v| v.severity == Severity::High) {
            return Recommendation::Restrict;
        }
        if !violations.is_empty() || warnings.len() >= 3 {
            return Recommendation::Warn;
        }
        Recommendation::Allow
    }
}

#[cfg(test)]
mod tests;
