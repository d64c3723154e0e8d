// Path: crates/api/src/identity.rs

//! The read-only view onto externally owned trust bonds.
//!
//! Bond records are created, suspended, and revoked by an external
//! bond-management collaborator; the kernel only reads them, by id, within
//! the scope of one evaluation. Decoupling the lookup behind a trait keeps
//! the kernel free of any assumption about where bonds live.

use async_trait::async_trait;
use covenant_types::app::{CapabilityDisclosure, TrustBond};
use covenant_types::error::StoreError;

/// A resolver for trust bonds and agent capability disclosures.
#[async_trait]
pub trait BondDirectory: Send + Sync {
    /// Fetches a bond by id, or `None` when no such bond exists.
    async fn bond(&self, bond_id: &str) -> Result<Option<TrustBond>, StoreError>;

    /// Fetches an agent's capability disclosure, or `None` when the agent
    /// has never declared one.
    async fn capabilities(&self, agent_id: &str)
        -> Result<Option<CapabilityDisclosure>, StoreError>;
}
