// Path: crates/crypto/src/sign/eddsa.rs
//! Ed25519 signing via `ed25519-dalek`.

use crate::error::KmsError;
use crate::sign::GeneratedKeyPair;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Generates an Ed25519 key pair. The private half is the 32-byte seed.
pub fn generate() -> Result<GeneratedKeyPair, KmsError> {
    let signing_key = SigningKey::generate(&mut OsRng);
    Ok(GeneratedKeyPair {
        public: signing_key.verifying_key().to_bytes().to_vec(),
        private: Zeroizing::new(signing_key.to_bytes().to_vec()),
    })
}

/// Signs a message with a 32-byte seed.
pub fn sign(private: &[u8], message: &[u8]) -> Result<Vec<u8>, KmsError> {
    let signing_key = signing_key_from(private)?;
    Ok(signing_key.sign(message).to_bytes().to_vec())
}

/// Verifies a 64-byte signature against a 32-byte public key.
pub fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, KmsError> {
    let verifying_key = verifying_key_from(public)?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| KmsError::MalformedSignature(format!("ed25519: {e}")))?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}

fn signing_key_from(private: &[u8]) -> Result<SigningKey, KmsError> {
    let seed: [u8; 32] = private.try_into().map_err(|_| {
        KmsError::MalformedKeyMaterial(format!(
            "ed25519 seed must be 32 bytes, got {}",
            private.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

fn verifying_key_from(public: &[u8]) -> Result<VerifyingKey, KmsError> {
    let bytes: [u8; 32] = public.try_into().map_err(|_| {
        KmsError::MalformedKeyMaterial(format!(
            "ed25519 public key must be 32 bytes, got {}",
            public.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| KmsError::MalformedKeyMaterial(format!("ed25519: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_reconstructs_the_same_keypair() {
        let pair = generate().unwrap();
        let sig_a = sign(&pair.private, b"stable").unwrap();
        let sig_b = sign(&pair.private, b"stable").unwrap();
        // Ed25519 is deterministic for a given key and message.
        assert_eq!(sig_a, sig_b);
        assert!(verify(&pair.public, b"stable", &sig_a).unwrap());
    }

    #[test]
    fn rejects_short_key_material() {
        assert!(matches!(
            sign(&[1, 2, 3], b"m"),
            Err(KmsError::MalformedKeyMaterial(_))
        ));
        assert!(matches!(
            verify(&[1, 2, 3], b"m", &[0u8; 64]),
            Err(KmsError::MalformedKeyMaterial(_))
        ));
    }
}
