// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Covenant Kernel Types
//!
//! This crate is the foundational library for the Covenant Kernel, containing
//! all core data structures, error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `covenant-types` has minimal dependencies and is itself
//! a dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `TrustContext`, `SignedAuditEntry`, `StatusList`,
//! and the various error enums.

/// The default number of status entries in a newly initialized status list.
pub const DEFAULT_STATUS_LIST_LENGTH: usize = 131_072;
/// The smallest status list length accepted at initialization.
pub const MIN_STATUS_LIST_LENGTH: usize = 1024;
/// The largest status list length accepted at initialization.
pub const MAX_STATUS_LIST_LENGTH: usize = 1 << 23;
/// The genesis value for an audit chain: sixty-four zero hex characters.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Core application-level data structures: trust contexts, verdicts, status
/// lists, audit entries, and key metadata.
pub mod app;
/// The canonical JSON (RFC 8785) codec used as the pre-image for every
/// signature and hash in the system.
pub mod codec;
/// Shared configuration structures for the kernel and its providers.
pub mod config;
/// Decentralized identifier parsing and validation.
pub mod did;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Constants for well-known storage keys and key prefixes.
pub mod keys;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
/// A fixed-precision UTC timestamp with a stable wire representation.
pub mod time;
