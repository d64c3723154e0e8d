// Path: crates/api/src/error.rs
//! Local error re-exports for the `covenant-api` crate.

// Re-export the canonical error types from the base `types` crate so that
// implementers of these traits depend on one error vocabulary.
pub use covenant_types::error::{
    AuditError, CodecError, CoreError, ErrorCode, KmsError, StatusError, StoreError,
};
