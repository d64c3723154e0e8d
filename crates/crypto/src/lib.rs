// Path: crates/crypto/src/lib.rs
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

//! # Covenant Kernel Crypto
//!
//! Concrete cryptographic implementations backing the KMS abstraction:
//! signing suites for each supported key algorithm, and the sealed-blob
//! format used to protect private material at rest in the file-backed
//! provider.
//!
//! Nothing in this crate performs I/O; it operates on byte slices handed
//! in by the providers.

/// Local error types for the `covenant-crypto` crate.
pub mod error;
/// Authenticated encryption of key material at rest.
pub mod seal;
/// Signature suites keyed by [`covenant_types::app::KeyAlgorithm`].
pub mod sign;
