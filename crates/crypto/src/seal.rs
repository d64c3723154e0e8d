// Path: crates/crypto/src/seal.rs
//! Authenticated encryption of key material at rest.
//!
//! Format V1:
//! [ Magic: "COVSEAL1" (8) ]
//! [ Version: u16 (2) ]
//! [ Nonce: 12B ]
//! [ Ciphertext + Tag: N + 16 ]
//!
//! The header is packed by hand so the on-disk format is stable and
//! endian-independent. Magic and version are checked before decryption;
//! the nonce is bound by AEAD usage, so a corrupted header fails the tag.

use crate::error::KmsError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

const HEADER_MAGIC: &[u8; 8] = b"COVSEAL1";
const HEADER_VERSION: u16 = 1;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 8 + 2 + NONCE_LEN;
/// The length of the key-encryption key, in bytes.
pub const KEK_LEN: usize = 32;

/// Encrypts `plaintext` under a 32-byte key-encryption key, producing a
/// self-describing V1 blob.
pub fn seal(kek: &[u8; KEK_LEN], plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| KmsError::Provider("sealing failed".to_string()))?;

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    output.extend_from_slice(HEADER_MAGIC);
    output.extend_from_slice(&HEADER_VERSION.to_be_bytes());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypts a V1 blob produced by [`seal`].
pub fn open(kek: &[u8; KEK_LEN], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, KmsError> {
    if blob.len() < HEADER_LEN {
        return Err(KmsError::MalformedKeyMaterial(
            "sealed blob too short".to_string(),
        ));
    }
    let (header, ciphertext) = blob.split_at(HEADER_LEN);
    let (magic, rest) = header.split_at(8);
    if magic != HEADER_MAGIC {
        return Err(KmsError::MalformedKeyMaterial(
            "invalid sealed-blob signature".to_string(),
        ));
    }
    let (version_bytes, nonce_bytes) = rest.split_at(2);
    let version = u16::from_be_bytes(version_bytes.try_into().unwrap_or([0, 0]));
    if version != HEADER_VERSION {
        return Err(KmsError::MalformedKeyMaterial(format!(
            "unsupported sealed-blob version: {version}"
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            KmsError::MalformedKeyMaterial("unsealing failed (wrong key or corrupted blob)".into())
        })?;
    Ok(Zeroizing::new(plaintext))
}

/// Generates a fresh random key-encryption key.
pub fn generate_kek() -> Zeroizing<[u8; KEK_LEN]> {
    let mut kek = [0u8; KEK_LEN];
    OsRng.fill_bytes(&mut kek);
    Zeroizing::new(kek)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let kek = generate_kek();
        let secret = b"32-byte-ed25519-seed-goes-here!!";
        let blob = seal(&kek, secret).unwrap();
        assert_eq!(&blob[0..8], HEADER_MAGIC);
        assert_eq!(blob.len(), HEADER_LEN + secret.len() + 16);
        let opened = open(&kek, &blob).unwrap();
        assert_eq!(opened.as_slice(), secret);
    }

    #[test]
    fn wrong_kek_fails_the_tag() {
        let kek = generate_kek();
        let blob = seal(&kek, b"secret").unwrap();
        let other = generate_kek();
        assert!(open(&other, &blob).is_err());
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        let kek = generate_kek();
        let mut blob = seal(&kek, b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(open(&kek, &blob).is_err());
        assert!(open(&kek, &blob[..4]).is_err());
    }
}
