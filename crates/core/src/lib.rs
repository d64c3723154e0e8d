// Path: crates/core/src/lib.rs
#![forbid(unsafe_code)]
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

//! # Covenant Kernel Core
//!
//! The composition crate: [`TrustKernel`] wires the trust oracle, the
//! status-list engine, the signed audit log, and a KMS provider into the
//! single surface a transport embeds. Construction is config-driven via
//! [`KernelBuilder`]; every dependency can be overridden with an explicit
//! instance for tests and custom deployments.
//!
//! The kernel adds the operational envelope the engines deliberately do not
//! carry themselves: per-operation time bounds, cooperative cancellation
//! with no partial mutation, and bounded admission (`Overloaded` instead of
//! an unbounded queue).

/// In-memory bond directory for tests and embedding.
pub mod bonds;
/// Config-driven construction of the kernel.
pub mod builder;
/// Configuration loading and environment overrides.
pub mod config;
/// The kernel façade.
pub mod kernel;

pub use bonds::InMemoryBondDirectory;
pub use builder::KernelBuilder;
pub use kernel::TrustKernel;

/// A curated set of the most commonly used kernel types.
pub mod prelude {
    pub use crate::{InMemoryBondDirectory, KernelBuilder, TrustKernel};
    pub use covenant_api::prelude::*;
    pub use covenant_types::prelude::*;
}
