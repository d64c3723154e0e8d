// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic JSON codec for all signed material.
//!
//! This module provides thin wrappers around `serde_jcs` (RFC 8785, JSON
//! Canonicalization Scheme). By centralizing the codec logic here in the base
//! `types` crate, we ensure that every component producing a signature or a
//! hash pre-image uses the exact same byte representation of the same data:
//! object keys sorted by UTF-16 code units, shortest-form number rendering,
//! and no insignificant whitespace. A signature produced over the output of
//! this module is reproducible across processes and library versions.

use crate::error::CodecError;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Encodes a value into its RFC 8785 canonical JSON byte representation.
///
/// This function must be used for all data that is signed, hashed, or
/// compared byte-for-byte. It fails fast on values that have no canonical
/// JSON form (non-finite floats, maps with non-string keys).
pub fn to_jcs_bytes<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    serde_jcs::to_vec(v).map_err(|e| CodecError::NonCanonical(e.to_string()))
}

/// Encodes a value into its RFC 8785 canonical JSON string representation.
pub fn to_jcs_string<T: Serialize>(v: &T) -> Result<String, CodecError> {
    serde_jcs::to_string(v).map_err(|e| CodecError::NonCanonical(e.to_string()))
}

/// Computes the lowercase hex SHA-256 digest of a value's canonical form.
pub fn sha256_jcs<T: Serialize>(v: &T) -> Result<String, CodecError> {
    Ok(sha256_hex(&to_jcs_bytes(v)?))
}

/// Computes the lowercase hex SHA-256 digest of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Computes the raw SHA-256 digest of raw bytes.
pub fn sha256_raw(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Encodes bytes as standard base64 (with padding), the encoding used for
/// signatures and public key material on the wire.
pub fn b64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes standard base64.
pub fn b64_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| CodecError::NonCanonical(format!("invalid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_normalized() {
        let a = json!({"b": 1, "a": 2, "nested": {"z": true, "y": false}});
        let b = json!({"nested": {"y": false, "z": true}, "a": 2, "b": 1});
        assert_eq!(to_jcs_bytes(&a).unwrap(), to_jcs_bytes(&b).unwrap());
    }

    #[test]
    fn canonical_form_is_stable_under_reparse() {
        let v = json!({
            "id": "urn:uuid:0f254c55-6b5e-4c5e-9b3a-111111111111",
            "n": 42,
            "arr": [3, 1, 2],
            "s": "caf\u{00e9} \"quoted\""
        });
        let first = to_jcs_bytes(&v).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
        let second = to_jcs_bytes(&reparsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn arrays_preserve_order() {
        let v = json!([3, 1, 2]);
        assert_eq!(to_jcs_string(&v).unwrap(), "[3,1,2]");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let res = to_jcs_bytes(&f64::NAN);
        assert!(res.is_err());
    }

    #[test]
    fn digest_matches_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
