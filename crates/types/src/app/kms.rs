// Path: crates/types/src/app/kms.rs

//! Key metadata and request shapes shared by every KMS provider.
//!
//! Key material itself never appears in these types; providers own (or
//! proxy) it and expose only handles and public halves.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The algorithms a provider may be asked to generate.
///
/// The set is the floor of acceptable strength; there is deliberately no
/// way to request a weaker key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA with a 2048-bit modulus.
    #[serde(rename = "RSA_2048")]
    Rsa2048,
    /// RSA with a 4096-bit modulus.
    #[serde(rename = "RSA_4096")]
    Rsa4096,
    /// ECDSA over NIST P-256.
    #[serde(rename = "EC_P256")]
    EcP256,
    /// ECDSA over NIST P-384.
    #[serde(rename = "EC_P384")]
    EcP384,
    /// Ed25519. Preferred for new signing keys.
    #[serde(rename = "ED25519")]
    Ed25519,
    /// AES-256, for symmetric encryption keys.
    #[serde(rename = "AES_256")]
    Aes256,
}

impl KeyAlgorithm {
    /// Whether keys of this algorithm sign and verify.
    pub fn is_asymmetric_signing(&self) -> bool {
        matches!(
            self,
            Self::Rsa2048 | Self::Rsa4096 | Self::EcP256 | Self::EcP384 | Self::Ed25519
        )
    }

    /// The linked-data proof suite produced by keys of this algorithm.
    pub fn proof_suite(&self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519Signature2020",
            Self::EcP256 | Self::EcP384 => "EcdsaSecp256r1Signature2019",
            Self::Rsa2048 | Self::Rsa4096 => "RsaSignature2018",
            Self::Aes256 => "Unsupported",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rsa2048 => "RSA_2048",
            Self::Rsa4096 => "RSA_4096",
            Self::EcP256 => "EC_P256",
            Self::EcP384 => "EC_P384",
            Self::Ed25519 => "ED25519",
            Self::Aes256 => "AES_256",
        };
        f.write_str(s)
    }
}

/// What a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// Signing and verification.
    SignVerify,
    /// Encryption and decryption.
    EncryptDecrypt,
    /// Wrapping other keys.
    WrapUnwrap,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SignVerify => "sign_verify",
            Self::EncryptDecrypt => "encrypt_decrypt",
            Self::WrapUnwrap => "wrap_unwrap",
        };
        f.write_str(s)
    }
}

/// The lifecycle state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    /// Usable for its declared purpose.
    Enabled,
    /// Temporarily unusable; may be re-enabled.
    Disabled,
    /// Scheduled for destruction; may be recovered until the window lapses.
    PendingDeletion,
    /// Destroyed. Terminal.
    Destroyed,
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::PendingDeletion => "pending_deletion",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Which provider implementation backs a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KmsProviderKind {
    /// The file-backed local provider.
    Local,
    /// AWS KMS.
    Aws,
    /// GCP Cloud KMS.
    Gcp,
}

impl fmt::Display for KmsProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Local => "local",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        };
        f.write_str(s)
    }
}

/// Whether a message handed to `sign`/`verify` is raw or pre-hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// The provider hashes the message itself.
    Raw,
    /// The message is already a digest.
    Digest,
}

/// Descriptive metadata for a key. Never contains private material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// The provider-scoped key identifier.
    pub key_id: String,
    /// Optional human-friendly alias, unique within the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// The key's algorithm.
    pub algorithm: KeyAlgorithm,
    /// The key's permitted usage.
    pub usage: KeyUsage,
    /// Lifecycle state.
    pub state: KeyState,
    /// When the key was created.
    pub created_at: Timestamp,
    /// The provider backing the key.
    pub provider: KmsProviderKind,
    /// The provider-native resource reference (ARN, resource name, path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_resource_ref: Option<String>,
    /// When the deletion window lapses, for keys pending deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_scheduled_for: Option<Timestamp>,
}

/// Parameters for key creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyRequest {
    /// The algorithm to generate.
    pub algorithm: KeyAlgorithm,
    /// The permitted usage.
    pub usage: KeyUsage,
    /// Optional alias; must be unique within the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Free-form tags recorded with the key.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl CreateKeyRequest {
    /// A signing-key request with no alias or tags.
    pub fn signing(algorithm: KeyAlgorithm) -> Self {
        Self {
            algorithm,
            usage: KeyUsage::SignVerify,
            alias: None,
            tags: BTreeMap::new(),
        }
    }
}

/// The public half of an asymmetric key.
///
/// Encoding is per algorithm: Ed25519 keys are 32 raw bytes, P-256 keys are
/// SEC1 uncompressed points, RSA keys are SubjectPublicKeyInfo DER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyMaterial {
    /// The key this material belongs to.
    pub key_id: String,
    /// The key's algorithm.
    pub algorithm: KeyAlgorithm,
    /// The encoded public key.
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
}

mod base64_bytes {
    //! Standard-base64 serde representation for byte vectors.

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&crate::codec::b64_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        crate::codec::b64_decode(&s).map_err(serde::de::Error::custom)
    }
}
