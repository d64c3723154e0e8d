// Path: crates/crypto/src/error.rs
//! Local error types for the `covenant-crypto` crate.

// Re-export the canonical error type from the base types crate. The crypto
// layer reports failures in the same vocabulary the KMS surface uses.
pub use covenant_types::error::KmsError;
