// Path: crates/kms/src/gcp.rs

//! GCP Cloud KMS provider, mapped onto the service's REST surface.
//!
//! Cloud KMS has no verify operation, so `verify` is performed locally
//! against the PEM public key fetched from the service. Keys are addressed
//! by their short `cryptoKey` id within the configured project, location,
//! and key ring; the full resource name is carried in
//! `provider_resource_ref`.
//!
//! Authentication uses a bearer token: `GCP_ACCESS_TOKEN` when set
//! (workstations, CI), otherwise the instance metadata server.

use async_trait::async_trait;
use covenant_api::kms::KmsProvider;
use covenant_types::app::{
    CreateKeyRequest, KeyAlgorithm, KeyMetadata, KeyState, KeyUsage, KmsProviderKind, MessageType,
    PublicKeyMaterial,
};
use covenant_types::codec::{b64_decode, b64_encode, sha256_raw};
use covenant_types::config::KmsConfig;
use covenant_types::error::KmsError;
use covenant_types::time::Timestamp;
use serde_json::{json, Value};

const KMS_ENDPOINT: &str = "https://cloudkms.googleapis.com/v1";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// A [`KmsProvider`] backed by GCP Cloud KMS over REST.
pub struct GcpKmsProvider {
    http: reqwest::Client,
    key_ring: String,
}

impl GcpKmsProvider {
    /// Builds a provider from configuration; `project_id`, `region`, and
    /// `key_ring` are all required for GCP.
    pub fn from_config(config: &KmsConfig) -> Result<Self, KmsError> {
        let project = config
            .project_id
            .as_deref()
            .ok_or_else(|| KmsError::Provider("gcp provider requires kms.project_id".into()))?;
        let location = config.region.as_deref().unwrap_or("global");
        let key_ring = config
            .key_ring
            .as_deref()
            .ok_or_else(|| KmsError::Provider("gcp provider requires kms.key_ring".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            key_ring: format!(
                "projects/{project}/locations/{location}/keyRings/{key_ring}"
            ),
        })
    }

    fn key_name(&self, key_id: &str) -> String {
        format!("{}/cryptoKeys/{key_id}", self.key_ring)
    }

    fn primary_version(&self, key_id: &str) -> String {
        format!("{}/cryptoKeyVersions/1", self.key_name(key_id))
    }

    async fn token(&self) -> Result<String, KmsError> {
        if let Ok(token) = std::env::var("GCP_ACCESS_TOKEN") {
            return Ok(token);
        }
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| KmsError::Transient(format!("metadata server: {e}")))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| KmsError::Transient(format!("metadata token decode: {e}")))?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| KmsError::Provider("metadata server returned no access_token".into()))
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, KmsError> {
        let token = self.token().await?;
        let url = format!("{KMS_ENDPOINT}/{path}");
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| KmsError::Transient(format!("cloudkms request: {e}")))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| KmsError::Provider(format!("cloudkms decode: {e}")))?;
        if status.is_success() {
            return Ok(payload);
        }
        let message = payload
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown cloudkms error")
            .to_string();
        match status.as_u16() {
            404 => Err(KmsError::KeyNotFound(message)),
            429 | 500 | 502 | 503 | 504 => Err(KmsError::Transient(message)),
            _ => Err(KmsError::Provider(message)),
        }
    }

    fn gcp_algorithm(algorithm: KeyAlgorithm, usage: KeyUsage) -> Result<&'static str, KmsError> {
        match (usage, algorithm) {
            (KeyUsage::SignVerify, KeyAlgorithm::EcP256) => Ok("EC_SIGN_P256_SHA256"),
            (KeyUsage::SignVerify, KeyAlgorithm::EcP384) => Ok("EC_SIGN_P384_SHA384"),
            (KeyUsage::SignVerify, KeyAlgorithm::Rsa2048) => Ok("RSA_SIGN_PKCS1_2048_SHA256"),
            (KeyUsage::SignVerify, KeyAlgorithm::Rsa4096) => Ok("RSA_SIGN_PKCS1_4096_SHA256"),
            (KeyUsage::EncryptDecrypt, KeyAlgorithm::Aes256) => Ok("GOOGLE_SYMMETRIC_ENCRYPTION"),
            (_, KeyAlgorithm::Ed25519) => Err(KmsError::UnsupportedAlgorithm(
                "Cloud KMS does not offer Ed25519 keys".to_string(),
            )),
            (usage, algorithm) => Err(KmsError::UnsupportedAlgorithm(format!(
                "{algorithm} cannot be used for {usage} on Cloud KMS"
            ))),
        }
    }

    fn algorithm_of(gcp: &str) -> Result<(KeyAlgorithm, KeyUsage), KmsError> {
        match gcp {
            "EC_SIGN_P256_SHA256" => Ok((KeyAlgorithm::EcP256, KeyUsage::SignVerify)),
            "EC_SIGN_P384_SHA384" => Ok((KeyAlgorithm::EcP384, KeyUsage::SignVerify)),
            "RSA_SIGN_PKCS1_2048_SHA256" => Ok((KeyAlgorithm::Rsa2048, KeyUsage::SignVerify)),
            "RSA_SIGN_PKCS1_4096_SHA256" => Ok((KeyAlgorithm::Rsa4096, KeyUsage::SignVerify)),
            "GOOGLE_SYMMETRIC_ENCRYPTION" => Ok((KeyAlgorithm::Aes256, KeyUsage::EncryptDecrypt)),
            other => Err(KmsError::Provider(format!(
                "unsupported cloudkms algorithm: {other}"
            ))),
        }
    }

    fn metadata_from(&self, key: &Value) -> Result<KeyMetadata, KmsError> {
        let name = key
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("cryptoKey without name".into()))?;
        let key_id = name.rsplit('/').next().unwrap_or(name).to_string();
        let algorithm_str = key
            .pointer("/versionTemplate/algorithm")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("cryptoKey without versionTemplate".into()))?;
        let (algorithm, usage) = Self::algorithm_of(algorithm_str)?;
        let state = match key.pointer("/primary/state").and_then(Value::as_str) {
            Some("ENABLED") | None => KeyState::Enabled,
            Some("DISABLED") => KeyState::Disabled,
            Some("DESTROY_SCHEDULED") => KeyState::PendingDeletion,
            Some("DESTROYED") => KeyState::Destroyed,
            Some(_) => KeyState::Disabled,
        };
        let created_at = key
            .get("createTime")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Timestamp::now);
        let deletion_scheduled_for = key
            .pointer("/primary/destroyTime")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
        Ok(KeyMetadata {
            key_id,
            alias: None,
            algorithm,
            usage,
            state,
            created_at,
            provider: KmsProviderKind::Gcp,
            provider_resource_ref: Some(name.to_string()),
            deletion_scheduled_for,
        })
    }

    async fn set_version_state(&self, key_id: &str, state: &str) -> Result<KeyMetadata, KmsError> {
        self.call(
            reqwest::Method::PATCH,
            &self.primary_version(key_id),
            &[("updateMask", "state".to_string())],
            Some(json!({ "state": state })),
        )
        .await?;
        self.get_key(key_id).await
    }

    fn digest_b64(message: &[u8], message_type: MessageType) -> Result<String, KmsError> {
        let digest = match message_type {
            MessageType::Raw => sha256_raw(message).to_vec(),
            MessageType::Digest => message.to_vec(),
        };
        Ok(b64_encode(&digest))
    }
}

#[async_trait]
impl KmsProvider for GcpKmsProvider {
    fn kind(&self) -> KmsProviderKind {
        KmsProviderKind::Gcp
    }

    async fn create_key(&self, request: CreateKeyRequest) -> Result<KeyMetadata, KmsError> {
        let key_id = request
            .alias
            .clone()
            .unwrap_or_else(|| format!("covenant-{}", uuid::Uuid::new_v4()));
        let purpose = match request.usage {
            KeyUsage::SignVerify => "ASYMMETRIC_SIGN",
            KeyUsage::EncryptDecrypt => "ENCRYPT_DECRYPT",
            KeyUsage::WrapUnwrap => {
                return Err(KmsError::UnsupportedAlgorithm(
                    "wrap_unwrap is not mapped onto Cloud KMS".to_string(),
                ))
            }
        };
        let algorithm = Self::gcp_algorithm(request.algorithm, request.usage)?;
        let body = json!({
            "purpose": purpose,
            "versionTemplate": { "algorithm": algorithm },
            "labels": request.tags,
        });
        let created = self
            .call(
                reqwest::Method::POST,
                &format!("{}/cryptoKeys", self.key_ring),
                &[("cryptoKeyId", key_id.clone())],
                Some(body),
            )
            .await
            .map_err(|e| match e {
                KmsError::Provider(msg) if msg.contains("already exists") => {
                    KmsError::AliasInUse(key_id.clone())
                }
                other => other,
            })?;
        let mut metadata = self.metadata_from(&created)?;
        metadata.alias = request.alias;
        Ok(metadata)
    }

    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        let key = self
            .call(reqwest::Method::GET, &self.key_name(key_id), &[], None)
            .await?;
        self.metadata_from(&key)
    }

    async fn list_keys(&self) -> Result<Vec<KeyMetadata>, KmsError> {
        let page = self
            .call(
                reqwest::Method::GET,
                &format!("{}/cryptoKeys", self.key_ring),
                &[],
                None,
            )
            .await?;
        let mut keys = Vec::new();
        if let Some(items) = page.get("cryptoKeys").and_then(Value::as_array) {
            for item in items {
                match self.metadata_from(item) {
                    Ok(metadata) => keys.push(metadata),
                    // Keys created out-of-band with unmapped algorithms are
                    // skipped rather than failing the whole listing.
                    Err(KmsError::Provider(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(keys)
    }

    async fn enable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        let current = self.get_key(key_id).await?;
        if current.state == KeyState::PendingDeletion {
            self.call(
                reqwest::Method::POST,
                &format!("{}:restore", self.primary_version(key_id)),
                &[],
                Some(json!({})),
            )
            .await?;
        }
        self.set_version_state(key_id, "ENABLED").await
    }

    async fn disable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.set_version_state(key_id, "DISABLED").await
    }

    async fn schedule_key_deletion(
        &self,
        key_id: &str,
        pending_window_days: u32,
    ) -> Result<KeyMetadata, KmsError> {
        if pending_window_days < covenant_api::kms::MIN_DELETION_WINDOW_DAYS {
            return Err(KmsError::InvalidDeletionWindow(pending_window_days));
        }
        // Cloud KMS takes the destroy delay from the key's configuration;
        // the request itself schedules destruction of the version.
        self.call(
            reqwest::Method::POST,
            &format!("{}:destroy", self.primary_version(key_id)),
            &[],
            Some(json!({})),
        )
        .await?;
        self.get_key(key_id).await
    }

    async fn cancel_key_deletion(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.call(
            reqwest::Method::POST,
            &format!("{}:restore", self.primary_version(key_id)),
            &[],
            Some(json!({})),
        )
        .await?;
        self.get_key(key_id).await
    }

    async fn rotate_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.call(
            reqwest::Method::POST,
            &format!("{}/cryptoKeyVersions", self.key_name(key_id)),
            &[],
            Some(json!({})),
        )
        .await?;
        self.get_key(key_id).await
    }

    async fn sign(
        &self,
        key_id: &str,
        message: &[u8],
        message_type: MessageType,
    ) -> Result<Vec<u8>, KmsError> {
        let body = json!({ "digest": { "sha256": Self::digest_b64(message, message_type)? } });
        let response = self
            .call(
                reqwest::Method::POST,
                &format!("{}:asymmetricSign", self.primary_version(key_id)),
                &[],
                Some(body),
            )
            .await?;
        let signature = response
            .get("signature")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("asymmetricSign returned no signature".into()))?;
        b64_decode(signature).map_err(|e| KmsError::MalformedSignature(e.to_string()))
    }

    async fn verify(
        &self,
        key_id: &str,
        message: &[u8],
        signature: &[u8],
        message_type: MessageType,
    ) -> Result<bool, KmsError> {
        // No verify endpoint exists; verification happens locally against
        // the fetched public key.
        let material = self.get_public_key(key_id).await?;
        let pem = String::from_utf8(material.public_key)
            .map_err(|_| KmsError::MalformedKeyMaterial("public key PEM is not UTF-8".into()))?;
        let digest = match message_type {
            MessageType::Raw => sha256_raw(message),
            MessageType::Digest => message.try_into().map_err(|_| {
                KmsError::MalformedKeyMaterial("pre-hashed digest must be 32 bytes".into())
            })?,
        };
        match material.algorithm {
            KeyAlgorithm::EcP256 => {
                use p256::ecdsa::signature::hazmat::PrehashVerifier;
                use p256::pkcs8::DecodePublicKey;
                let key = p256::ecdsa::VerifyingKey::from_public_key_pem(&pem)
                    .map_err(|e| KmsError::MalformedKeyMaterial(format!("p256 pem: {e}")))?;
                // Cloud KMS emits ASN.1 DER signatures.
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| KmsError::MalformedSignature(format!("p256 der: {e}")))?;
                Ok(key.verify_prehash(&digest, &sig).is_ok())
            }
            KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa4096 => {
                use rsa::pkcs8::DecodePublicKey;
                let key = rsa::RsaPublicKey::from_public_key_pem(&pem)
                    .map_err(|e| KmsError::MalformedKeyMaterial(format!("rsa pem: {e}")))?;
                Ok(key
                    .verify(
                        rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
                        &digest,
                        signature,
                    )
                    .is_ok())
            }
            other => Err(KmsError::UnsupportedAlgorithm(format!(
                "cannot locally verify {other} signatures"
            ))),
        }
    }

    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let body = json!({ "plaintext": b64_encode(plaintext) });
        let response = self
            .call(
                reqwest::Method::POST,
                &format!("{}:encrypt", self.key_name(key_id)),
                &[],
                Some(body),
            )
            .await?;
        let ciphertext = response
            .get("ciphertext")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("encrypt returned no ciphertext".into()))?;
        b64_decode(ciphertext).map_err(|e| KmsError::Provider(e.to_string()))
    }

    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let body = json!({ "ciphertext": b64_encode(ciphertext) });
        let response = self
            .call(
                reqwest::Method::POST,
                &format!("{}:decrypt", self.key_name(key_id)),
                &[],
                Some(body),
            )
            .await?;
        let plaintext = response
            .get("plaintext")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("decrypt returned no plaintext".into()))?;
        b64_decode(plaintext).map_err(|e| KmsError::Provider(e.to_string()))
    }

    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyMaterial, KmsError> {
        let response = self
            .call(
                reqwest::Method::GET,
                &format!("{}/publicKey", self.primary_version(key_id)),
                &[],
                None,
            )
            .await?;
        let pem = response
            .get("pem")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("publicKey returned no pem".into()))?;
        let algorithm_str = response
            .get("algorithm")
            .and_then(Value::as_str)
            .ok_or_else(|| KmsError::Provider("publicKey returned no algorithm".into()))?;
        let (algorithm, _) = Self::algorithm_of(algorithm_str)?;
        Ok(PublicKeyMaterial {
            key_id: key_id.to_string(),
            algorithm,
            public_key: pem.as_bytes().to_vec(),
        })
    }
}
