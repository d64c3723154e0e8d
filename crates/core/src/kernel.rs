// Path: crates/core/src/kernel.rs

//! The kernel façade.
//!
//! One `TrustKernel` instance owns the status-list engine, the audit log,
//! the oracle, and a reference to a KMS provider. Transports call the
//! methods here and nothing deeper.
//!
//! ## Operational envelope
//!
//! Mutating operations pass through a bounded admission gate: when the
//! configured number of in-flight mutations is reached, callers receive
//! `Overloaded` immediately instead of queueing. Every operation that can
//! suspend (KMS, storage) runs under a finite time bound and accepts a
//! cancellation token. Cancellation and timeouts never leave partial
//! state: the underlying operation is detached and runs to its own
//! completion or rollback; only the caller's wait is abandoned. Read
//! operations mutate nothing and are cancelled the ordinary way, by
//! dropping their future.

use covenant_api::identity::BondDirectory;
use covenant_api::kms::KmsProvider;
use covenant_services::audit::AuditLog;
use covenant_services::oracle::TrustOracle;
use covenant_services::status::{InitListOptions, StatusListEngine};
use covenant_types::app::{
    ArticleDescriptor, AuditEventBody, AuditFilter, AuditPage, IntegrityReport, RequestEnvelope,
    SignedAuditEntry, StatusCheck, StatusEntry, StatusListCredential, TrustContext, TrustVerdict,
};
use covenant_types::config::CovenantConfig;
use covenant_types::did::Did;
use covenant_types::error::CoreError;
use covenant_types::time::Timestamp;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// The composed trust and audit kernel.
pub struct TrustKernel {
    config: CovenantConfig,
    kms: Arc<dyn KmsProvider>,
    bonds: Arc<dyn BondDirectory>,
    oracle: TrustOracle,
    status: Arc<StatusListEngine>,
    audit: Arc<AuditLog>,
    admission: Arc<Semaphore>,
}

impl TrustKernel {
    /// Starts a config-driven builder.
    pub fn builder(config: CovenantConfig) -> crate::builder::KernelBuilder {
        crate::builder::KernelBuilder::new(config)
    }

    pub(crate) fn assemble(
        config: CovenantConfig,
        kms: Arc<dyn KmsProvider>,
        bonds: Arc<dyn BondDirectory>,
        oracle: TrustOracle,
        status: Arc<StatusListEngine>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let admission = Arc::new(Semaphore::new(config.limits.max_inflight));
        Self {
            config,
            kms,
            bonds,
            oracle,
            status,
            audit,
            admission,
        }
    }

    /// The KMS provider the kernel was wired with.
    pub fn kms(&self) -> &Arc<dyn KmsProvider> {
        &self.kms
    }

    /// The article registry, in evaluation order.
    pub fn articles(&self) -> Vec<ArticleDescriptor> {
        self.oracle.articles()
    }

    // ---- Oracle ---------------------------------------------------------

    /// Evaluates a request envelope: resolves the referenced bond and the
    /// agent's capability disclosure, assembles a trust context, and runs
    /// the oracle. Pure beyond the two directory reads; logging the
    /// verdict is the caller's next step (see [`TrustKernel::log`]).
    pub async fn evaluate(
        &self,
        envelope: &RequestEnvelope,
        user_id: &str,
    ) -> Result<TrustVerdict, CoreError> {
        envelope.validate()?;
        if let Some(did) = &envelope.caller.did {
            Did::parse(did)?;
        }

        let bond = match &envelope.bond_id {
            Some(bond_id) => {
                let bond = self.bonds.bond(bond_id).await?;
                if bond.is_none() {
                    tracing::warn!(bond_id = %bond_id, "referenced trust bond not found");
                }
                bond
            }
            None => None,
        };
        let capabilities = self.bonds.capabilities(&envelope.caller.id).await?;
        let ctx = TrustContext::from_envelope(
            envelope,
            user_id,
            bond,
            capabilities,
            self.audit.enabled(),
        );
        Ok(self.oracle.evaluate(&ctx))
    }

    /// Evaluates a pre-assembled context at an explicit instant.
    pub fn evaluate_context(&self, ctx: &TrustContext, now: Timestamp) -> TrustVerdict {
        self.oracle.evaluate_at(ctx, now)
    }

    // ---- Status lists ---------------------------------------------------

    /// Allocates the next index on a list, initializing the list with
    /// configured defaults on first use.
    pub async fn issue_status(
        &self,
        list_id: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StatusEntry, CoreError> {
        let permit = self.admit()?;
        let status = self.status.clone();
        let list_id = list_id.to_string();
        self.bounded(
            "status.issue",
            self.config.statuslist.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                status
                    .initialize_list(&list_id, InitListOptions::default())
                    .await?;
                Ok(status.allocate_index(&list_id).await?)
            },
        )
        .await
    }

    /// Initializes a list with explicit options.
    pub async fn initialize_status_list(
        &self,
        list_id: &str,
        options: InitListOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<(), CoreError> {
        let permit = self.admit()?;
        let status = self.status.clone();
        let list_id = list_id.to_string();
        self.bounded(
            "status.initialize",
            self.config.statuslist.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                status.initialize_list(&list_id, options).await?;
                Ok(())
            },
        )
        .await
    }

    /// Sets or clears a status bit.
    pub async fn set_status(
        &self,
        list_id: &str,
        index: usize,
        revoked: bool,
        actor: &str,
        reason: Option<String>,
        cancel: Option<CancellationToken>,
    ) -> Result<StatusCheck, CoreError> {
        let permit = self.admit()?;
        let status = self.status.clone();
        let list_id = list_id.to_string();
        let actor = actor.to_string();
        self.bounded(
            "status.set",
            self.config.statuslist.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                Ok(status
                    .set_status(&list_id, index, revoked, &actor, reason)
                    .await?)
            },
        )
        .await
    }

    /// Reads the status of one index.
    pub async fn check_status(
        &self,
        list_id: &str,
        index: usize,
    ) -> Result<StatusCheck, CoreError> {
        let status = self.status.clone();
        let list_id = list_id.to_string();
        self.bounded(
            "status.check",
            self.config.statuslist.timeout_ms,
            None,
            async move { Ok(status.check_status(&list_id, index).await?) },
        )
        .await
    }

    /// Emits the signed StatusList 2021 credential for a list.
    pub async fn emit_status_credential(
        &self,
        list_id: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<StatusListCredential, CoreError> {
        let permit = self.admit()?;
        let status = self.status.clone();
        let list_id = list_id.to_string();
        self.bounded(
            "status.credential",
            self.config.kms.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                Ok(status.generate_credential(&list_id).await?)
            },
        )
        .await
    }

    // ---- Audit ----------------------------------------------------------

    /// Appends one signed entry to the audit chain.
    pub async fn log(
        &self,
        body: AuditEventBody,
        cancel: Option<CancellationToken>,
    ) -> Result<SignedAuditEntry, CoreError> {
        let permit = self.admit()?;
        let audit = self.audit.clone();
        self.bounded("audit.log", self.config.kms.timeout_ms, cancel, async move {
            let _permit = permit;
            Ok(audit.log(body).await?)
        })
        .await
    }

    /// Filters and paginates the audit chain.
    pub async fn query(&self, filter: &AuditFilter) -> Result<AuditPage, CoreError> {
        let audit = self.audit.clone();
        let filter = filter.clone();
        self.bounded(
            "audit.query",
            self.config.audit.timeout_ms,
            None,
            async move { Ok(audit.query(&filter).await?) },
        )
        .await
    }

    /// Replays and verifies the full audit chain.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport, CoreError> {
        let audit = self.audit.clone();
        self.bounded(
            "audit.verify",
            self.config.kms.timeout_ms,
            None,
            async move { Ok(audit.verify_integrity().await?) },
        )
        .await
    }

    /// Copies the audit chain out in insertion order.
    pub async fn export_audit(&self) -> Result<Vec<SignedAuditEntry>, CoreError> {
        Ok(self.audit.export().await?)
    }

    /// Renders the audit chain as newline-delimited JSON with segment
    /// headers.
    pub async fn export_audit_ndjson(&self) -> Result<String, CoreError> {
        Ok(self.audit.export_ndjson().await?)
    }

    /// Replaces the audit chain after verifying the candidate entries.
    pub async fn import_audit(
        &self,
        entries: Vec<SignedAuditEntry>,
        cancel: Option<CancellationToken>,
    ) -> Result<IntegrityReport, CoreError> {
        let permit = self.admit()?;
        let audit = self.audit.clone();
        self.bounded(
            "audit.import",
            self.config.kms.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                Ok(audit.import(entries).await?)
            },
        )
        .await
    }

    /// Archives entries older than the configured retention window.
    pub async fn apply_audit_retention(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<usize, CoreError> {
        let permit = self.admit()?;
        let audit = self.audit.clone();
        self.bounded(
            "audit.retention",
            self.config.audit.timeout_ms,
            cancel,
            async move {
                let _permit = permit;
                Ok(audit.apply_retention(Timestamp::now()).await?)
            },
        )
        .await
    }

    // ---- Operational envelope ------------------------------------------

    fn admit(&self) -> Result<OwnedSemaphorePermit, CoreError> {
        self.admission
            .clone()
            .try_acquire_owned()
            .map_err(|_| CoreError::Overloaded)
    }

    /// Runs `fut` detached, bounded by `timeout_ms` and the cancellation
    /// token. On timeout or cancellation the detached task keeps running
    /// to a consistent end state; only the caller stops waiting.
    async fn bounded<T: Send + 'static>(
        &self,
        op: &'static str,
        timeout_ms: u64,
        cancel: Option<CancellationToken>,
        fut: impl Future<Output = Result<T, CoreError>> + Send + 'static,
    ) -> Result<T, CoreError> {
        if let Some(token) = &cancel {
            if token.is_cancelled() {
                return Err(CoreError::Cancelled(op.to_string()));
            }
        }

        let handle = tokio::spawn(fut);
        let sleep = tokio::time::sleep(Duration::from_millis(timeout_ms.max(1)));
        tokio::pin!(sleep);
        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(cancelled);

        tokio::select! {
            joined = handle => match joined {
                Ok(result) => result,
                Err(e) => Err(CoreError::Cancelled(format!("{op}: task aborted: {e}"))),
            },
            _ = &mut sleep => {
                tracing::warn!(op, timeout_ms, "operation timed out");
                Err(CoreError::Timeout(op.to_string()))
            }
            _ = &mut cancelled => Err(CoreError::Cancelled(op.to_string())),
        }
    }
}
