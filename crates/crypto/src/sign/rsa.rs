// Path: crates/crypto/src/sign/rsa.rs
//! RSA PKCS#1 v1.5 signing over SHA-256 via the `rsa` crate.
//!
//! Key material travels as DER: PKCS#8 for private keys and
//! SubjectPublicKeyInfo for public keys, matching what cloud KMS APIs
//! return from their public-key endpoints.

use crate::error::KmsError;
use crate::sign::GeneratedKeyPair;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Generates an RSA key pair of the given modulus size (2048 or 4096).
pub fn generate(bits: usize) -> Result<GeneratedKeyPair, KmsError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| KmsError::Provider(format!("rsa keygen failed: {e}")))?;
    let public = RsaPublicKey::from(&private_key)
        .to_public_key_der()
        .map_err(|e| KmsError::Provider(format!("rsa public encode failed: {e}")))?
        .into_vec();
    let private = private_key
        .to_pkcs8_der()
        .map_err(|e| KmsError::Provider(format!("rsa private encode failed: {e}")))?
        .as_bytes()
        .to_vec();
    Ok(GeneratedKeyPair {
        public,
        private: Zeroizing::new(private),
    })
}

/// Signs a 32-byte SHA-256 digest with a PKCS#8 DER private key.
pub fn sign(private: &[u8], digest: &[u8; 32]) -> Result<Vec<u8>, KmsError> {
    let private_key = RsaPrivateKey::from_pkcs8_der(private)
        .map_err(|e| KmsError::MalformedKeyMaterial(format!("rsa: {e}")))?;
    private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
        .map_err(|e| KmsError::Provider(format!("rsa signing failed: {e}")))
}

/// Verifies a PKCS#1 v1.5 signature over a 32-byte digest.
pub fn verify(public: &[u8], digest: &[u8; 32], signature: &[u8]) -> Result<bool, KmsError> {
    let public_key = RsaPublicKey::from_public_key_der(public)
        .map_err(|e| KmsError::MalformedKeyMaterial(format!("rsa: {e}")))?;
    Ok(public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_types::codec::sha256_raw;

    #[test]
    fn round_trips_with_a_2048_bit_key() {
        let pair = generate(2048).unwrap();
        let digest = sha256_raw(b"rsa message");
        let sig = sign(&pair.private, &digest).unwrap();
        assert_eq!(sig.len(), 256);
        assert!(verify(&pair.public, &digest, &sig).unwrap());
        assert!(!verify(&pair.public, &sha256_raw(b"no"), &sig).unwrap());
    }
}
