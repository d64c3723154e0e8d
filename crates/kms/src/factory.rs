// Path: crates/kms/src/factory.rs

//! Provider construction from configuration.

use covenant_api::kms::KmsProvider;
use covenant_types::app::KmsProviderKind;
use covenant_types::config::KmsConfig;
use covenant_types::error::KmsError;
use std::sync::Arc;

/// Builds the provider selected by `config.provider`.
///
/// Cloud providers require their Cargo feature; asking for one in a build
/// compiled without it is a configuration error, not a silent fallback.
pub async fn provider_from_config(config: &KmsConfig) -> Result<Arc<dyn KmsProvider>, KmsError> {
    match config.provider {
        KmsProviderKind::Local => Ok(Arc::new(crate::local::LocalKmsProvider::open(
            &config.local_store_path,
        )?)),
        #[cfg(feature = "aws")]
        KmsProviderKind::Aws => Ok(Arc::new(
            crate::aws::AwsKmsProvider::from_env(config.region.clone()).await,
        )),
        #[cfg(not(feature = "aws"))]
        KmsProviderKind::Aws => Err(KmsError::Provider(
            "built without the `aws` feature; AWS KMS is unavailable".to_string(),
        )),
        #[cfg(feature = "gcp")]
        KmsProviderKind::Gcp => crate::gcp::GcpKmsProvider::from_config(config).map(|p| {
            let provider: Arc<dyn KmsProvider> = Arc::new(p);
            provider
        }),
        #[cfg(not(feature = "gcp"))]
        KmsProviderKind::Gcp => Err(KmsError::Provider(
            "built without the `gcp` feature; GCP Cloud KMS is unavailable".to_string(),
        )),
    }
}
