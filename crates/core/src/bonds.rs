// Path: crates/core/src/bonds.rs

//! An in-memory bond directory.
//!
//! Bond records are owned by an external collaborator in production; this
//! implementation backs tests and embedded deployments where that
//! collaborator shares the process.

use async_trait::async_trait;
use covenant_api::identity::BondDirectory;
use covenant_types::app::{CapabilityDisclosure, TrustBond};
use covenant_types::error::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

/// A thread-safe, in-process [`BondDirectory`].
#[derive(Default)]
pub struct InMemoryBondDirectory {
    bonds: RwLock<HashMap<String, TrustBond>>,
    capabilities: RwLock<HashMap<String, CapabilityDisclosure>>,
}

impl InMemoryBondDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a bond.
    pub fn upsert_bond(&self, bond: TrustBond) {
        if let Ok(mut bonds) = self.bonds.write() {
            bonds.insert(bond.id.clone(), bond);
        }
    }

    /// Removes a bond by id.
    pub fn remove_bond(&self, bond_id: &str) {
        if let Ok(mut bonds) = self.bonds.write() {
            bonds.remove(bond_id);
        }
    }

    /// Records an agent's capability disclosure.
    pub fn upsert_capabilities(&self, agent_id: &str, disclosure: CapabilityDisclosure) {
        if let Ok(mut capabilities) = self.capabilities.write() {
            capabilities.insert(agent_id.to_string(), disclosure);
        }
    }
}

#[async_trait]
impl BondDirectory for InMemoryBondDirectory {
    async fn bond(&self, bond_id: &str) -> Result<Option<TrustBond>, StoreError> {
        let bonds = self
            .bonds
            .read()
            .map_err(|_| StoreError::Unavailable("bond map poisoned".into()))?;
        Ok(bonds.get(bond_id).cloned())
    }

    async fn capabilities(
        &self,
        agent_id: &str,
    ) -> Result<Option<CapabilityDisclosure>, StoreError> {
        let capabilities = self
            .capabilities
            .read()
            .map_err(|_| StoreError::Unavailable("capability map poisoned".into()))?;
        Ok(capabilities.get(agent_id).cloned())
    }
}
