// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Covenant Kernel Telemetry
//!
//! This crate provides the observability infrastructure for the Covenant
//! Kernel: structured logging initialization built on `tracing`. Services
//! instrument themselves with `tracing` macros; embedders call
//! [`init_tracing`] once at startup (or install their own subscriber).

/// The initialization routine for global structured logging.
pub mod init;

pub use init::init_tracing;
