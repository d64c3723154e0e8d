// Path: crates/storage/src/lib.rs
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

//! # Covenant Kernel Storage
//!
//! Concrete persistence backends for the two logical stores of the kernel:
//! status-list records (keyed by list id) and audit segments (append-only,
//! insertion-ordered). Three engines are provided per store:
//!
//! * **memory** — volatile, for tests and embedding;
//! * **file** — one JSON document per list, JSONL segments for audit;
//! * **redb** — an embedded, pure-Rust database, one row per record.
//!
//! Backends are deliberately dumb: locking and chain discipline live in the
//! service engines that own them.

/// One-file-per-record and JSONL-segment backends.
pub mod file;
/// Volatile in-process backends.
pub mod memory;
/// Embedded-database backends built on `redb`.
pub mod redb_store;

pub use file::{FileAuditStore, FileStatusBackend};
pub use memory::{MemoryAuditStore, MemoryStatusBackend};
pub use redb_store::{RedbAuditStore, RedbStatusBackend};
