// Path: crates/crypto/src/sign/mod.rs
//! Signature suites keyed by key algorithm.
//!
//! Each submodule wraps one backend crate behind a uniform byte-oriented
//! surface; this module dispatches on [`KeyAlgorithm`] so the providers
//! never name a backend crate directly.
//!
//! Byte conventions:
//! * Ed25519 — private: 32-byte seed; public: 32 raw bytes; signature: 64 bytes.
//! * EC P-256 — private: 32 scalar bytes; public: SEC1 uncompressed point;
//!   signature: 64-byte fixed encoding (r ‖ s).
//! * RSA — private: PKCS#8 DER; public: SubjectPublicKeyInfo DER;
//!   signature: PKCS#1 v1.5 over SHA-256.

pub mod ecdsa;
pub mod eddsa;
pub mod rsa;

use crate::error::KmsError;
use covenant_types::app::{KeyAlgorithm, MessageType};
use covenant_types::codec::sha256_raw;
use zeroize::Zeroizing;

/// A freshly generated key pair, private half zeroized on drop.
pub struct GeneratedKeyPair {
    /// Encoded public key (see module conventions).
    pub public: Vec<u8>,
    /// Encoded private key (see module conventions).
    pub private: Zeroizing<Vec<u8>>,
}

/// Generates a key pair for the given signing algorithm.
pub fn generate_keypair(algorithm: KeyAlgorithm) -> Result<GeneratedKeyPair, KmsError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => eddsa::generate(),
        KeyAlgorithm::EcP256 => ecdsa::generate(),
        KeyAlgorithm::Rsa2048 => rsa::generate(2048),
        KeyAlgorithm::Rsa4096 => rsa::generate(4096),
        KeyAlgorithm::EcP384 | KeyAlgorithm::Aes256 => Err(KmsError::UnsupportedAlgorithm(
            format!("{algorithm} is not locally generatable as a signing key"),
        )),
    }
}

/// Signs a message (or a caller-supplied SHA-256 digest) with a private key
/// of the given algorithm.
pub fn sign(
    algorithm: KeyAlgorithm,
    private: &[u8],
    message: &[u8],
    message_type: MessageType,
) -> Result<Vec<u8>, KmsError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => match message_type {
            MessageType::Raw => eddsa::sign(private, message),
            // Pure EdDSA has no pre-hashed mode; refusing beats silently
            // signing a digest as if it were the message.
            MessageType::Digest => Err(KmsError::UnsupportedAlgorithm(
                "ED25519 does not sign pre-hashed digests".to_string(),
            )),
        },
        KeyAlgorithm::EcP256 => ecdsa::sign(private, &digest_of(message, message_type)?),
        KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa4096 => {
            rsa::sign(private, &digest_of(message, message_type)?)
        }
        KeyAlgorithm::EcP384 | KeyAlgorithm::Aes256 => Err(KmsError::UnsupportedAlgorithm(
            format!("{algorithm} cannot sign locally"),
        )),
    }
}

/// Verifies a signature against a public key of the given algorithm.
///
/// Returns `Ok(false)` on a well-formed but non-matching signature;
/// structurally invalid inputs fail with a typed error.
pub fn verify(
    algorithm: KeyAlgorithm,
    public: &[u8],
    message: &[u8],
    signature: &[u8],
    message_type: MessageType,
) -> Result<bool, KmsError> {
    match algorithm {
        KeyAlgorithm::Ed25519 => match message_type {
            MessageType::Raw => eddsa::verify(public, message, signature),
            MessageType::Digest => Err(KmsError::UnsupportedAlgorithm(
                "ED25519 does not verify pre-hashed digests".to_string(),
            )),
        },
        KeyAlgorithm::EcP256 => ecdsa::verify(public, &digest_of(message, message_type)?, signature),
        KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa4096 => {
            rsa::verify(public, &digest_of(message, message_type)?, signature)
        }
        KeyAlgorithm::EcP384 | KeyAlgorithm::Aes256 => Err(KmsError::UnsupportedAlgorithm(
            format!("{algorithm} cannot verify locally"),
        )),
    }
}

fn digest_of(message: &[u8], message_type: MessageType) -> Result<[u8; 32], KmsError> {
    match message_type {
        MessageType::Raw => Ok(sha256_raw(message)),
        MessageType::Digest => message.try_into().map_err(|_| {
            KmsError::MalformedKeyMaterial(format!(
                "pre-hashed digest must be 32 bytes, got {}",
                message.len()
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_suite_round_trips() {
        for algorithm in [
            KeyAlgorithm::Ed25519,
            KeyAlgorithm::EcP256,
            KeyAlgorithm::Rsa2048,
        ] {
            let pair = generate_keypair(algorithm).unwrap();
            let msg = b"the quick brown fox";
            let sig = sign(algorithm, &pair.private, msg, MessageType::Raw).unwrap();
            assert!(
                verify(algorithm, &pair.public, msg, &sig, MessageType::Raw).unwrap(),
                "{algorithm} signature should verify"
            );
            assert!(
                !verify(algorithm, &pair.public, b"tampered", &sig, MessageType::Raw).unwrap(),
                "{algorithm} signature should not verify a different message"
            );
        }
    }

    #[test]
    fn digest_mode_matches_raw_mode_for_ecdsa_and_rsa() {
        for algorithm in [KeyAlgorithm::EcP256, KeyAlgorithm::Rsa2048] {
            let pair = generate_keypair(algorithm).unwrap();
            let msg = b"digest equivalence";
            let digest = covenant_types::codec::sha256_raw(msg);
            let sig = sign(algorithm, &pair.private, &digest, MessageType::Digest).unwrap();
            assert!(verify(algorithm, &pair.public, msg, &sig, MessageType::Raw).unwrap());
        }
    }

    #[test]
    fn ed25519_refuses_digest_mode() {
        let pair = generate_keypair(KeyAlgorithm::Ed25519).unwrap();
        let digest = [0u8; 32];
        let err = sign(
            KeyAlgorithm::Ed25519,
            &pair.private,
            &digest,
            MessageType::Digest,
        )
        .unwrap_err();
        assert!(matches!(err, KmsError::UnsupportedAlgorithm(_)));
    }
}
