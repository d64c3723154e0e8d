// Path: crates/types/src/error/mod.rs
//! Core error types for the Covenant Kernel.
//!
//! Errors are values, typed by subsystem, and are never swallowed. Each enum
//! implements [`ErrorCode`] so that transports and operators receive a
//! stable, machine-readable identifier alongside the human-readable message.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors produced by the canonical JSON codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value has no canonical JSON form (non-finite float, non-string
    /// map key, or a serializer failure).
    #[error("value has no canonical JSON form: {0}")]
    NonCanonical(String),
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::NonCanonical(_) => "CODEC_NON_CANONICAL",
        }
    }
}

/// Errors surfaced by a KMS provider or the key-management layer above it.
#[derive(Debug, Error)]
pub enum KmsError {
    /// No key with the given identifier or alias exists.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// The key exists but is not in the `enabled` state.
    #[error("key {key_id} is {state} and cannot be used")]
    KeyDisabled {
        /// The identifier of the key.
        key_id: String,
        /// The state the key was found in.
        state: String,
    },
    /// The key's usage or algorithm does not permit the requested operation.
    #[error("key {key_id} does not support {operation}")]
    AlgorithmMismatch {
        /// The identifier of the key.
        key_id: String,
        /// The operation that was attempted.
        operation: String,
    },
    /// The requested alias is already bound to another key.
    #[error("alias already in use: {0}")]
    AliasInUse(String),
    /// The requested state transition is not valid from the key's current state.
    #[error("key {key_id} cannot transition from {from} via {operation}")]
    InvalidKeyState {
        /// The identifier of the key.
        key_id: String,
        /// The state the key was found in.
        from: String,
        /// The operation that was attempted.
        operation: String,
    },
    /// The provider does not support the requested algorithm.
    #[error("algorithm {0} is not supported by this provider")]
    UnsupportedAlgorithm(String),
    /// The deletion window is outside the provider's accepted range.
    #[error("invalid deletion window: {0} days")]
    InvalidDeletionWindow(u32),
    /// A signature failed structural validation before verification.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// Key material or a sealed blob could not be decoded.
    #[error("malformed key material: {0}")]
    MalformedKeyMaterial(String),
    /// A non-transient provider fault, returned unchanged to the caller.
    #[error("provider fault: {0}")]
    Provider(String),
    /// A transient provider fault (network, throttling); the caller decides
    /// whether to retry.
    #[error("transient provider fault: {0}")]
    Transient(String),
    /// A local I/O failure in a file-backed provider.
    #[error("kms i/o failure: {0}")]
    Io(String),
    /// Canonicalization of a signing pre-image failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ErrorCode for KmsError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound(_) => "KMS_KEY_NOT_FOUND",
            Self::KeyDisabled { .. } => "KMS_KEY_DISABLED",
            Self::AlgorithmMismatch { .. } => "KMS_ALGORITHM_MISMATCH",
            Self::AliasInUse(_) => "KMS_ALIAS_IN_USE",
            Self::InvalidKeyState { .. } => "KMS_INVALID_KEY_STATE",
            Self::UnsupportedAlgorithm(_) => "KMS_UNSUPPORTED_ALGORITHM",
            Self::InvalidDeletionWindow(_) => "KMS_INVALID_DELETION_WINDOW",
            Self::MalformedSignature(_) => "KMS_MALFORMED_SIGNATURE",
            Self::MalformedKeyMaterial(_) => "KMS_MALFORMED_KEY_MATERIAL",
            Self::Provider(_) => "KMS_PROVIDER_FAULT",
            Self::Transient(_) => "KMS_TRANSIENT",
            Self::Io(_) => "KMS_IO",
            Self::Codec(e) => e.code(),
        }
    }
}

/// Errors produced by the persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend is unreachable or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A generic fault in the underlying engine (filesystem, redb).
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A record could not be serialized for storage.
    #[error("storage encode error: {0}")]
    Encode(String),
    /// A stored record could not be deserialized.
    #[error("storage decode error: {0}")]
    Decode(String),
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Backend(_) => "STORE_BACKEND_ERROR",
            Self::Encode(_) => "STORE_ENCODE_ERROR",
            Self::Decode(_) => "STORE_DECODE_ERROR",
            Self::NotFound(_) => "STORE_NOT_FOUND",
        }
    }
}

/// Errors produced by the status-list engine.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The requested list length is not a positive multiple of 8 within the
    /// accepted range.
    #[error("invalid status list length: {0}")]
    InvalidLength(usize),
    /// The index lies at or beyond the end of the list.
    #[error("index {index} out of range for list of length {length}")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the list.
        length: usize,
    },
    /// Every index in the list has been allocated.
    #[error("status list exhausted: {0}")]
    ListExhausted(String),
    /// The encoded bitstring could not be decoded.
    #[error("malformed bitstring encoding: {0}")]
    MalformedEncoding(String),
    /// No list with the given identifier is known.
    #[error("status list not found: {0}")]
    ListNotFound(String),
    /// A persisted record disagrees with the initialization parameters in a
    /// way that cannot be reconciled (purpose is immutable after creation).
    #[error("list {id}: purpose is immutable (stored {stored}, requested {requested})")]
    PurposeImmutable {
        /// The list identifier.
        id: String,
        /// The purpose recorded at creation.
        stored: String,
        /// The conflicting purpose supplied now.
        requested: String,
    },
    /// A KMS failure during credential emission.
    #[error(transparent)]
    Kms(#[from] KmsError),
    /// A persistence failure; the mutation was not applied.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Canonicalization of the credential pre-image failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ErrorCode for StatusError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength(_) => "STATUS_INVALID_LENGTH",
            Self::OutOfRange { .. } => "STATUS_OUT_OF_RANGE",
            Self::ListExhausted(_) => "STATUS_LIST_EXHAUSTED",
            Self::MalformedEncoding(_) => "STATUS_MALFORMED_ENCODING",
            Self::ListNotFound(_) => "STATUS_LIST_NOT_FOUND",
            Self::PurposeImmutable { .. } => "STATUS_PURPOSE_IMMUTABLE",
            Self::Kms(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Codec(e) => e.code(),
        }
    }
}

/// Errors produced by the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Logging is switched off; no entry was produced.
    #[error("audit logging is disabled")]
    Disabled,
    /// Signing failed; the chain is unchanged.
    #[error(transparent)]
    Kms(#[from] KmsError),
    /// Persistence failed; the chain is unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An import was rejected because the candidate chain failed verification.
    #[error("import rejected: {0}")]
    ImportRejected(String),
    /// An entry's signature did not verify during an integrity check.
    #[error("signature verification failed for entry {0}")]
    SignatureInvalid(String),
    /// An entry's `previous_hash` did not match its predecessor's signature.
    #[error("chain broken at entry {0}")]
    ChainBroken(String),
    /// Canonicalization of the signing pre-image failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ErrorCode for AuditError {
    fn code(&self) -> &'static str {
        match self {
            Self::Disabled => "AUDIT_DISABLED",
            Self::Kms(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::ImportRejected(_) => "AUDIT_IMPORT_REJECTED",
            Self::SignatureInvalid(_) => "AUDIT_SIGNATURE_INVALID",
            Self::ChainBroken(_) => "AUDIT_CHAIN_BROKEN",
            Self::Codec(e) => e.code(),
        }
    }
}

/// The top-level error type returned by the kernel façade.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A structurally invalid input from the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A malformed decentralized identifier.
    #[error("invalid DID: {0}")]
    InvalidDid(String),
    /// A credential document failed structural validation.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
    /// The referenced trust bond does not exist.
    #[error("trust bond not found: {0}")]
    BondNotFound(String),
    /// A KMS failure.
    #[error(transparent)]
    Kms(#[from] KmsError),
    /// A status-list failure.
    #[error(transparent)]
    Status(#[from] StatusError),
    /// An audit-log failure.
    #[error(transparent)]
    Audit(#[from] AuditError),
    /// A persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A canonicalization failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The operation exceeded its configured time bound.
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// The operation was cancelled before completion; no partial mutation
    /// was left behind.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
    /// The kernel is at its concurrency limit; the caller must slow down.
    #[error("kernel overloaded; retry later")]
    Overloaded,
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "CORE_INVALID_INPUT",
            Self::InvalidDid(_) => "CORE_INVALID_DID",
            Self::MalformedCredential(_) => "CORE_MALFORMED_CREDENTIAL",
            Self::BondNotFound(_) => "CORE_BOND_NOT_FOUND",
            Self::Kms(e) => e.code(),
            Self::Status(e) => e.code(),
            Self::Audit(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Codec(e) => e.code(),
            Self::Timeout(_) => "CORE_TIMEOUT",
            Self::Cancelled(_) => "CORE_CANCELLED",
            Self::Overloaded => "CORE_OVERLOADED",
        }
    }
}
