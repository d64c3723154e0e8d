// Path: crates/api/src/kms.rs
//! The provider-agnostic key-management contract.
//!
//! A [`KmsProvider`] owns (or proxies) key material; material never crosses
//! this boundary. All providers expose the same capability set, so the
//! kernel can be pointed at a local file store, AWS KMS, or GCP Cloud KMS
//! without touching any call site. New providers are added by implementing
//! this trait, not by extending an existing one.

use async_trait::async_trait;
use covenant_types::app::{
    CreateKeyRequest, KeyMetadata, KmsProviderKind, MessageType, PublicKeyMaterial,
};
use covenant_types::error::KmsError;

/// The default deletion window, in days, when none is supplied.
pub const DEFAULT_DELETION_WINDOW_DAYS: u32 = 30;
/// The smallest deletion window a provider may accept.
pub const MIN_DELETION_WINDOW_DAYS: u32 = 1;

/// The capability set every key-management provider implements.
///
/// # Contract
///
/// * Errors are typed [`KmsError`] values; providers never panic.
/// * Transient faults (network, throttling) are surfaced as
///   [`KmsError::Transient`] and are **not** retried by the provider; the
///   caller owns retry policy.
/// * Implementations are thread-safe; providers that wrap a non-thread-safe
///   client must serialize internally.
#[async_trait]
pub trait KmsProvider: Send + Sync {
    /// Which provider family this is.
    fn kind(&self) -> KmsProviderKind;

    /// Creates a key in the `enabled` state.
    ///
    /// If an alias is supplied it must be unique within the provider;
    /// a clash fails with [`KmsError::AliasInUse`].
    async fn create_key(&self, request: CreateKeyRequest) -> Result<KeyMetadata, KmsError>;

    /// Fetches a key's metadata by id or alias.
    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError>;

    /// Lists every key the provider holds.
    async fn list_keys(&self) -> Result<Vec<KeyMetadata>, KmsError>;

    /// Re-enables a disabled key, or recovers a key inside its deletion
    /// window (clearing the pending deletion).
    async fn enable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError>;

    /// Disables an enabled key. Signing with a disabled key fails with
    /// [`KmsError::KeyDisabled`].
    async fn disable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError>;

    /// Transitions a key to `pending_deletion` with the given window.
    ///
    /// The window must be at least [`MIN_DELETION_WINDOW_DAYS`]; once it
    /// lapses the provider may advance the key to `destroyed`, which is
    /// terminal.
    async fn schedule_key_deletion(
        &self,
        key_id: &str,
        pending_window_days: u32,
    ) -> Result<KeyMetadata, KmsError>;

    /// Cancels a pending deletion, leaving the key `disabled`.
    async fn cancel_key_deletion(&self, key_id: &str) -> Result<KeyMetadata, KmsError>;

    /// Creates a new key version. Prior versions remain usable for
    /// `verify` but no longer produce signatures.
    async fn rotate_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError>;

    /// Signs a message with an enabled signing key.
    ///
    /// Signature bytes are provider-native but stable for a given key.
    async fn sign(
        &self,
        key_id: &str,
        message: &[u8],
        message_type: MessageType,
    ) -> Result<Vec<u8>, KmsError>;

    /// Verifies a signature.
    ///
    /// Providers without a native verify operation implement this locally
    /// from [`KmsProvider::get_public_key`]. Implementations must not leak
    /// timing information about the boolean result.
    async fn verify(
        &self,
        key_id: &str,
        message: &[u8],
        signature: &[u8],
        message_type: MessageType,
    ) -> Result<bool, KmsError>;

    /// Encrypts with an enabled encryption key.
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KmsError>;

    /// Decrypts with an enabled encryption key.
    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError>;

    /// Fetches the public half of an asymmetric key. Available in any key
    /// state short of `destroyed`, so read paths keep working through an
    /// outage or a disable.
    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyMaterial, KmsError>;
}
