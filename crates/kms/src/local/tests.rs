// Path: crates/kms/src/local/tests.rs

use super::*;
use tempfile::TempDir;

async fn provider() -> (TempDir, LocalKmsProvider) {
    let dir = TempDir::new().unwrap();
    let provider = LocalKmsProvider::open(dir.path()).unwrap();
    (dir, provider)
}

#[tokio::test]
async fn create_sign_verify_round_trip() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    assert_eq!(meta.state, KeyState::Enabled);
    assert_eq!(meta.provider, KmsProviderKind::Local);

    let sig = kms
        .sign(&meta.key_id, b"payload", MessageType::Raw)
        .await
        .unwrap();
    assert!(kms
        .verify(&meta.key_id, b"payload", &sig, MessageType::Raw)
        .await
        .unwrap());
    assert!(!kms
        .verify(&meta.key_id, b"other", &sig, MessageType::Raw)
        .await
        .unwrap());
}

#[tokio::test]
async fn keys_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let key_id = {
        let kms = LocalKmsProvider::open(dir.path()).unwrap();
        let meta = kms
            .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
            .await
            .unwrap();
        kms.sign(&meta.key_id, b"before reopen", MessageType::Raw)
            .await
            .unwrap();
        meta.key_id
    };

    let kms = LocalKmsProvider::open(dir.path()).unwrap();
    let sig = kms
        .sign(&key_id, b"after reopen", MessageType::Raw)
        .await
        .unwrap();
    assert!(kms
        .verify(&key_id, b"after reopen", &sig, MessageType::Raw)
        .await
        .unwrap());
}

#[tokio::test]
async fn disabled_keys_refuse_to_sign() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    kms.disable_key(&meta.key_id).await.unwrap();

    let err = kms
        .sign(&meta.key_id, b"payload", MessageType::Raw)
        .await
        .unwrap_err();
    assert!(matches!(err, KmsError::KeyDisabled { .. }));

    kms.enable_key(&meta.key_id).await.unwrap();
    kms.sign(&meta.key_id, b"payload", MessageType::Raw)
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_keys_are_reported() {
    let (_dir, kms) = provider().await;
    let err = kms
        .sign("local-missing", b"payload", MessageType::Raw)
        .await
        .unwrap_err();
    assert!(matches!(err, KmsError::KeyNotFound(_)));
}

#[tokio::test]
async fn aliases_resolve_and_must_be_unique() {
    let (_dir, kms) = provider().await;
    let mut request = CreateKeyRequest::signing(KeyAlgorithm::Ed25519);
    request.alias = Some("audit-signer".into());
    let meta = kms.create_key(request.clone()).await.unwrap();

    let by_alias = kms.get_key("audit-signer").await.unwrap();
    assert_eq!(by_alias.key_id, meta.key_id);

    let err = kms.create_key(request).await.unwrap_err();
    assert!(matches!(err, KmsError::AliasInUse(_)));
}

#[tokio::test]
async fn rotation_keeps_old_signatures_verifiable() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    let old_sig = kms
        .sign(&meta.key_id, b"pre-rotation", MessageType::Raw)
        .await
        .unwrap();

    kms.rotate_key(&meta.key_id).await.unwrap();
    let new_sig = kms
        .sign(&meta.key_id, b"pre-rotation", MessageType::Raw)
        .await
        .unwrap();

    assert_ne!(old_sig, new_sig);
    for sig in [&old_sig, &new_sig] {
        assert!(kms
            .verify(&meta.key_id, b"pre-rotation", sig, MessageType::Raw)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn deletion_window_is_recoverable() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::EcP256))
        .await
        .unwrap();

    let err = kms.schedule_key_deletion(&meta.key_id, 0).await.unwrap_err();
    assert!(matches!(err, KmsError::InvalidDeletionWindow(0)));

    let pending = kms.schedule_key_deletion(&meta.key_id, 7).await.unwrap();
    assert_eq!(pending.state, KeyState::PendingDeletion);
    assert!(pending.deletion_scheduled_for.is_some());

    // Inside the window the key cannot sign, but can be recovered.
    assert!(matches!(
        kms.sign(&meta.key_id, b"m", MessageType::Raw).await,
        Err(KmsError::KeyDisabled { .. })
    ));
    let recovered = kms.enable_key(&meta.key_id).await.unwrap();
    assert_eq!(recovered.state, KeyState::Enabled);
    assert_eq!(recovered.deletion_scheduled_for, None);
}

#[tokio::test]
async fn cancel_deletion_leaves_key_disabled() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    kms.schedule_key_deletion(&meta.key_id, 7).await.unwrap();
    let cancelled = kms.cancel_key_deletion(&meta.key_id).await.unwrap();
    assert_eq!(cancelled.state, KeyState::Disabled);
}

#[tokio::test]
async fn aes_keys_encrypt_and_decrypt() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest {
            algorithm: KeyAlgorithm::Aes256,
            usage: KeyUsage::EncryptDecrypt,
            alias: None,
            tags: Default::default(),
        })
        .await
        .unwrap();

    let ciphertext = kms.encrypt(&meta.key_id, b"sealed payload").await.unwrap();
    assert_ne!(ciphertext.as_slice(), b"sealed payload".as_slice());
    let plaintext = kms.decrypt(&meta.key_id, &ciphertext).await.unwrap();
    assert_eq!(plaintext, b"sealed payload");

    // Signing with an encryption key is a usage mismatch.
    let err = kms
        .sign(&meta.key_id, b"m", MessageType::Raw)
        .await
        .unwrap_err();
    assert!(matches!(err, KmsError::AlgorithmMismatch { .. }));
}

#[tokio::test]
async fn public_key_remains_readable_while_disabled() {
    let (_dir, kms) = provider().await;
    let meta = kms
        .create_key(CreateKeyRequest::signing(KeyAlgorithm::Ed25519))
        .await
        .unwrap();
    kms.disable_key(&meta.key_id).await.unwrap();
    let material = kms.get_public_key(&meta.key_id).await.unwrap();
    assert_eq!(material.algorithm, KeyAlgorithm::Ed25519);
    assert_eq!(material.public_key.len(), 32);
}
