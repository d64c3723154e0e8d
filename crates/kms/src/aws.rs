// Path: crates/kms/src/aws.rs

//! AWS KMS provider.
//!
//! A thin mapping of the capability set onto `aws-sdk-kms`. AWS owns the
//! key material; this module translates identifiers, algorithm names, and
//! error shapes. Nothing is retried here: transient SDK failures surface as
//! [`KmsError::Transient`] and the caller owns backoff.

use async_trait::async_trait;
use aws_sdk_kms::error::SdkError;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::{
    KeySpec, KeyState as AwsKeyState, KeyUsageType, MessageType as AwsMessageType,
    SigningAlgorithmSpec,
};
use covenant_api::kms::KmsProvider;
use covenant_types::app::{
    CreateKeyRequest, KeyAlgorithm, KeyMetadata, KeyState, KeyUsage, KmsProviderKind, MessageType,
    PublicKeyMaterial,
};
use covenant_types::error::KmsError;
use covenant_types::time::Timestamp;

/// A [`KmsProvider`] backed by AWS KMS.
pub struct AwsKmsProvider {
    client: aws_sdk_kms::Client,
}

impl AwsKmsProvider {
    /// Builds a provider from the ambient AWS environment (credentials
    /// chain, profile, IMDS), optionally pinning a region.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_kms::Client::new(&config),
        }
    }

    /// Wraps an existing client (tests, custom endpoints).
    pub fn with_client(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }

    fn key_spec(algorithm: KeyAlgorithm) -> Result<KeySpec, KmsError> {
        match algorithm {
            KeyAlgorithm::Rsa2048 => Ok(KeySpec::Rsa2048),
            KeyAlgorithm::Rsa4096 => Ok(KeySpec::Rsa4096),
            KeyAlgorithm::EcP256 => Ok(KeySpec::EccNistP256),
            KeyAlgorithm::EcP384 => Ok(KeySpec::EccNistP384),
            KeyAlgorithm::Aes256 => Ok(KeySpec::SymmetricDefault),
            KeyAlgorithm::Ed25519 => Err(KmsError::UnsupportedAlgorithm(
                "AWS KMS does not offer Ed25519 keys".to_string(),
            )),
        }
    }

    fn algorithm_of(spec: Option<&KeySpec>) -> Result<KeyAlgorithm, KmsError> {
        match spec {
            Some(KeySpec::Rsa2048) => Ok(KeyAlgorithm::Rsa2048),
            Some(KeySpec::Rsa4096) => Ok(KeyAlgorithm::Rsa4096),
            Some(KeySpec::EccNistP256) => Ok(KeyAlgorithm::EcP256),
            Some(KeySpec::EccNistP384) => Ok(KeyAlgorithm::EcP384),
            Some(KeySpec::SymmetricDefault) => Ok(KeyAlgorithm::Aes256),
            other => Err(KmsError::Provider(format!(
                "unsupported AWS key spec: {other:?}"
            ))),
        }
    }

    fn usage_type(usage: KeyUsage) -> Result<KeyUsageType, KmsError> {
        match usage {
            KeyUsage::SignVerify => Ok(KeyUsageType::SignVerify),
            KeyUsage::EncryptDecrypt => Ok(KeyUsageType::EncryptDecrypt),
            KeyUsage::WrapUnwrap => Err(KmsError::UnsupportedAlgorithm(
                "wrap_unwrap is not mapped onto AWS KMS".to_string(),
            )),
        }
    }

    fn signing_algorithm(algorithm: KeyAlgorithm) -> Result<SigningAlgorithmSpec, KmsError> {
        match algorithm {
            KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa4096 => {
                Ok(SigningAlgorithmSpec::RsassaPkcs1V15Sha256)
            }
            KeyAlgorithm::EcP256 => Ok(SigningAlgorithmSpec::EcdsaSha256),
            KeyAlgorithm::EcP384 => Ok(SigningAlgorithmSpec::EcdsaSha384),
            other => Err(KmsError::UnsupportedAlgorithm(format!(
                "{other} cannot sign through AWS KMS"
            ))),
        }
    }

    fn message_type(message_type: MessageType) -> AwsMessageType {
        match message_type {
            MessageType::Raw => AwsMessageType::Raw,
            MessageType::Digest => AwsMessageType::Digest,
        }
    }

    fn metadata_from(
        &self,
        meta: &aws_sdk_kms::types::KeyMetadata,
    ) -> Result<KeyMetadata, KmsError> {
        let state = match meta.key_state() {
            Some(AwsKeyState::Enabled) => KeyState::Enabled,
            Some(AwsKeyState::Disabled) => KeyState::Disabled,
            Some(AwsKeyState::PendingDeletion) => KeyState::PendingDeletion,
            Some(AwsKeyState::PendingReplicaDeletion) => KeyState::PendingDeletion,
            _ => KeyState::Disabled,
        };
        let created_at = meta
            .creation_date()
            .and_then(|d| Timestamp::from_unix_millis(d.secs() * 1000))
            .unwrap_or_else(Timestamp::now);
        let deletion_scheduled_for = meta
            .deletion_date()
            .and_then(|d| Timestamp::from_unix_millis(d.secs() * 1000));
        Ok(KeyMetadata {
            key_id: meta.key_id().to_string(),
            alias: None,
            algorithm: Self::algorithm_of(meta.key_spec())?,
            usage: match meta.key_usage() {
                Some(KeyUsageType::SignVerify) => KeyUsage::SignVerify,
                _ => KeyUsage::EncryptDecrypt,
            },
            state,
            created_at,
            provider: KmsProviderKind::Aws,
            provider_resource_ref: meta.arn().map(|s| s.to_string()),
            deletion_scheduled_for,
        })
    }

    async fn describe(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        let output = self
            .client
            .describe_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        let meta = output
            .key_metadata()
            .ok_or_else(|| KmsError::Provider("describe_key returned no metadata".into()))?;
        self.metadata_from(meta)
    }
}

fn sdk_err<E: std::fmt::Debug>(e: SdkError<E>) -> KmsError {
    match &e {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            KmsError::Transient(format!("{e:?}"))
        }
        _ => {
            let rendered = format!("{e:?}");
            if rendered.contains("NotFoundException") {
                KmsError::KeyNotFound(rendered)
            } else if rendered.contains("DisabledException") {
                KmsError::KeyDisabled {
                    key_id: String::new(),
                    state: "disabled".to_string(),
                }
            } else {
                KmsError::Provider(rendered)
            }
        }
    }
}

#[async_trait]
impl KmsProvider for AwsKmsProvider {
    fn kind(&self) -> KmsProviderKind {
        KmsProviderKind::Aws
    }

    async fn create_key(&self, request: CreateKeyRequest) -> Result<KeyMetadata, KmsError> {
        let output = self
            .client
            .create_key()
            .key_spec(Self::key_spec(request.algorithm)?)
            .key_usage(Self::usage_type(request.usage)?)
            .send()
            .await
            .map_err(sdk_err)?;
        let meta = output
            .key_metadata()
            .ok_or_else(|| KmsError::Provider("create_key returned no metadata".into()))?;
        let mut metadata = self.metadata_from(meta)?;

        if let Some(alias) = &request.alias {
            self.client
                .create_alias()
                .alias_name(format!("alias/{alias}"))
                .target_key_id(metadata.key_id.clone())
                .send()
                .await
                .map_err(|e| {
                    let mapped = sdk_err(e);
                    match mapped {
                        KmsError::Provider(msg) if msg.contains("AlreadyExists") => {
                            KmsError::AliasInUse(alias.clone())
                        }
                        other => other,
                    }
                })?;
            metadata.alias = Some(alias.clone());
        }
        Ok(metadata)
    }

    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.describe(key_id).await
    }

    async fn list_keys(&self) -> Result<Vec<KeyMetadata>, KmsError> {
        let output = self.client.list_keys().send().await.map_err(sdk_err)?;
        let mut keys = Vec::new();
        for entry in output.keys() {
            if let Some(id) = entry.key_id() {
                keys.push(self.describe(id).await?);
            }
        }
        Ok(keys)
    }

    async fn enable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        // A key inside its deletion window must be recovered first.
        let current = self.describe(key_id).await?;
        if current.state == KeyState::PendingDeletion {
            self.client
                .cancel_key_deletion()
                .key_id(key_id)
                .send()
                .await
                .map_err(sdk_err)?;
        }
        self.client
            .enable_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        self.describe(key_id).await
    }

    async fn disable_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.client
            .disable_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        self.describe(key_id).await
    }

    async fn schedule_key_deletion(
        &self,
        key_id: &str,
        pending_window_days: u32,
    ) -> Result<KeyMetadata, KmsError> {
        self.client
            .schedule_key_deletion()
            .key_id(key_id)
            .pending_window_in_days(pending_window_days as i32)
            .send()
            .await
            .map_err(sdk_err)?;
        self.describe(key_id).await
    }

    async fn cancel_key_deletion(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.client
            .cancel_key_deletion()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        self.describe(key_id).await
    }

    async fn rotate_key(&self, key_id: &str) -> Result<KeyMetadata, KmsError> {
        self.client
            .rotate_key_on_demand()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        self.describe(key_id).await
    }

    async fn sign(
        &self,
        key_id: &str,
        message: &[u8],
        message_type: MessageType,
    ) -> Result<Vec<u8>, KmsError> {
        let metadata = self.describe(key_id).await?;
        let output = self
            .client
            .sign()
            .key_id(key_id)
            .message(Blob::new(message))
            .message_type(Self::message_type(message_type))
            .signing_algorithm(Self::signing_algorithm(metadata.algorithm)?)
            .send()
            .await
            .map_err(sdk_err)?;
        output
            .signature()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KmsError::Provider("sign returned no signature".into()))
    }

    async fn verify(
        &self,
        key_id: &str,
        message: &[u8],
        signature: &[u8],
        message_type: MessageType,
    ) -> Result<bool, KmsError> {
        let metadata = self.describe(key_id).await?;
        let result = self
            .client
            .verify()
            .key_id(key_id)
            .message(Blob::new(message))
            .message_type(Self::message_type(message_type))
            .signature(Blob::new(signature))
            .signing_algorithm(Self::signing_algorithm(metadata.algorithm)?)
            .send()
            .await;
        match result {
            Ok(output) => Ok(output.signature_valid()),
            // The service reports an invalid signature as an error; fold it
            // into the boolean contract.
            Err(e) => {
                let mapped = sdk_err(e);
                match &mapped {
                    KmsError::Provider(msg) if msg.contains("KMSInvalidSignatureException") => {
                        Ok(false)
                    }
                    _ => Err(mapped),
                }
            }
        }
    }

    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let output = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .map_err(sdk_err)?;
        output
            .ciphertext_blob()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KmsError::Provider("encrypt returned no ciphertext".into()))
    }

    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let output = self
            .client
            .decrypt()
            .key_id(key_id)
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(sdk_err)?;
        output
            .plaintext()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KmsError::Provider("decrypt returned no plaintext".into()))
    }

    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyMaterial, KmsError> {
        let output = self
            .client
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(sdk_err)?;
        let algorithm = Self::algorithm_of(output.key_spec())?;
        let public_key = output
            .public_key()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KmsError::Provider("get_public_key returned no material".into()))?;
        // AWS returns SubjectPublicKeyInfo DER for every asymmetric spec.
        Ok(PublicKeyMaterial {
            key_id: key_id.to_string(),
            algorithm,
            public_key,
        })
    }
}
