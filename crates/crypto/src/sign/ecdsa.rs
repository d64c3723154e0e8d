// Path: crates/crypto/src/sign/ecdsa.rs
//! ECDSA over NIST P-256 via the `p256` crate.
//!
//! Signing operates on a SHA-256 digest supplied by the dispatcher, so raw
//! and pre-hashed call paths produce interchangeable signatures.

use crate::error::KmsError;
use crate::sign::GeneratedKeyPair;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Generates a P-256 key pair. Private half is the 32-byte scalar; public
/// half is the SEC1 uncompressed point.
pub fn generate() -> Result<GeneratedKeyPair, KmsError> {
    let signing_key = SigningKey::random(&mut OsRng);
    let public = signing_key
        .verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();
    Ok(GeneratedKeyPair {
        public,
        private: Zeroizing::new(signing_key.to_bytes().to_vec()),
    })
}

/// Signs a 32-byte SHA-256 digest, returning the 64-byte fixed encoding.
pub fn sign(private: &[u8], digest: &[u8; 32]) -> Result<Vec<u8>, KmsError> {
    let signing_key = SigningKey::from_slice(private)
        .map_err(|e| KmsError::MalformedKeyMaterial(format!("p256: {e}")))?;
    let signature: Signature = signing_key
        .sign_prehash(digest)
        .map_err(|e| KmsError::Provider(format!("p256 signing failed: {e}")))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verifies a 64-byte fixed-encoding signature over a 32-byte digest.
pub fn verify(public: &[u8], digest: &[u8; 32], signature: &[u8]) -> Result<bool, KmsError> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public)
        .map_err(|e| KmsError::MalformedKeyMaterial(format!("p256: {e}")))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| KmsError::MalformedSignature(format!("p256: {e}")))?;
    Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_types::codec::sha256_raw;

    #[test]
    fn round_trips_over_a_digest() {
        let pair = generate().unwrap();
        let digest = sha256_raw(b"hello p256");
        let sig = sign(&pair.private, &digest).unwrap();
        assert!(verify(&pair.public, &digest, &sig).unwrap());
        let other = sha256_raw(b"other");
        assert!(!verify(&pair.public, &other, &sig).unwrap());
    }

    #[test]
    fn public_key_is_uncompressed_sec1() {
        let pair = generate().unwrap();
        assert_eq!(pair.public.len(), 65);
        assert_eq!(pair.public.first(), Some(&0x04));
    }
}
