// Path: crates/core/src/builder.rs

//! Config-driven construction of the kernel.
//!
//! The builder turns a [`CovenantConfig`] into a wired [`TrustKernel`],
//! selecting the KMS provider and the persistence backends from
//! configuration. Every dependency can be overridden with an explicit
//! instance before `build()`, which is how tests inject in-memory stores
//! and pre-provisioned keys.

use crate::bonds::InMemoryBondDirectory;
use crate::kernel::TrustKernel;
use covenant_api::identity::BondDirectory;
use covenant_api::kms::KmsProvider;
use covenant_api::storage::{AuditStore, StatusListBackend};
use covenant_services::audit::AuditLog;
use covenant_services::oracle::TrustOracle;
use covenant_services::status::StatusListEngine;
use covenant_storage::{
    FileAuditStore, FileStatusBackend, MemoryAuditStore, MemoryStatusBackend, RedbAuditStore,
    RedbStatusBackend,
};
use covenant_types::config::{CovenantConfig, StorageBackendKind};
use covenant_types::error::CoreError;
use std::sync::Arc;

/// A staged constructor for [`TrustKernel`].
pub struct KernelBuilder {
    config: CovenantConfig,
    kms: Option<Arc<dyn KmsProvider>>,
    bonds: Option<Arc<dyn BondDirectory>>,
    status_backend: Option<Arc<dyn StatusListBackend>>,
    audit_store: Option<Arc<dyn AuditStore>>,
}

impl KernelBuilder {
    /// Starts a builder from configuration.
    pub fn new(config: CovenantConfig) -> Self {
        Self {
            config,
            kms: None,
            bonds: None,
            status_backend: None,
            audit_store: None,
        }
    }

    /// Overrides the KMS provider.
    pub fn kms(mut self, kms: Arc<dyn KmsProvider>) -> Self {
        self.kms = Some(kms);
        self
    }

    /// Overrides the bond directory.
    pub fn bonds(mut self, bonds: Arc<dyn BondDirectory>) -> Self {
        self.bonds = Some(bonds);
        self
    }

    /// Overrides the status-list persistence backend.
    pub fn status_backend(mut self, backend: Arc<dyn StatusListBackend>) -> Self {
        self.status_backend = Some(backend);
        self
    }

    /// Overrides the audit store.
    pub fn audit_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    /// Wires and returns the kernel.
    pub async fn build(self) -> Result<TrustKernel, CoreError> {
        let config = self.config;

        let kms = match self.kms {
            Some(kms) => kms,
            None => covenant_kms::provider_from_config(&config.kms).await?,
        };

        let status_backend: Arc<dyn StatusListBackend> = match self.status_backend {
            Some(backend) => backend,
            None => match config.statuslist.storage_backend {
                StorageBackendKind::Memory => Arc::new(MemoryStatusBackend::new()),
                StorageBackendKind::File => {
                    let path = required_path(
                        config.statuslist.storage_path.as_deref(),
                        "statuslist.storage_path",
                    )?;
                    Arc::new(FileStatusBackend::open(path)?)
                }
                StorageBackendKind::Database => {
                    let path = required_path(
                        config.statuslist.storage_path.as_deref(),
                        "statuslist.storage_path",
                    )?;
                    Arc::new(RedbStatusBackend::open(path)?)
                }
            },
        };

        let audit_store: Arc<dyn AuditStore> = match self.audit_store {
            Some(store) => store,
            None => match config.audit.storage_backend {
                StorageBackendKind::Memory => Arc::new(MemoryAuditStore::new()),
                StorageBackendKind::File => {
                    let path =
                        required_path(config.audit.storage_path.as_deref(), "audit.storage_path")?;
                    Arc::new(FileAuditStore::open(path)?)
                }
                StorageBackendKind::Database => {
                    let path =
                        required_path(config.audit.storage_path.as_deref(), "audit.storage_path")?;
                    Arc::new(RedbAuditStore::open(path)?)
                }
            },
        };

        let bonds = self
            .bonds
            .unwrap_or_else(|| Arc::new(InMemoryBondDirectory::new()));

        let oracle = TrustOracle::new(config.oracle.clone());
        let status = Arc::new(StatusListEngine::new(
            status_backend,
            kms.clone(),
            config.statuslist.clone(),
        ));
        let audit = Arc::new(AuditLog::open(audit_store, kms.clone(), config.audit.clone()).await?);

        Ok(TrustKernel::assemble(
            config, kms, bonds, oracle, status, audit,
        ))
    }
}

fn required_path(path: Option<&str>, field: &str) -> Result<String, CoreError> {
    path.map(|p| p.to_string())
        .ok_or_else(|| CoreError::InvalidInput(format!("{field} is required for this backend")))
}
