// Path: crates/api/src/lib.rs

//! # Covenant Kernel API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # Covenant Kernel API
//!
//! Core traits and interfaces for the Covenant Kernel. This crate defines
//! the stable contract between the kernel façade and its pluggable
//! components: KMS providers, persistence backends, and the external
//! bond-management collaborator.

/// Re-exports all core error types from the central `covenant-types` crate.
pub mod error;
/// The read-only view onto externally owned trust bonds.
pub mod identity;
/// The provider-agnostic key-management contract.
pub mod kms;
/// Persistence contracts for status lists and audit segments.
pub mod storage;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::error::{
        AuditError, CodecError, CoreError, ErrorCode, KmsError, StatusError, StoreError,
    };
    pub use crate::identity::BondDirectory;
    pub use crate::kms::KmsProvider;
    pub use crate::storage::{AuditStore, StatusListBackend};
}
