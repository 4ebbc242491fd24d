// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software token operations through passphrase and token flows

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use ed25519_dalek::{Signature, Verifier};
use log::info;
use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey};

use keyop::{
    cache::PassphraseCache,
    core::engine::{CryptoInput, HashAlgorithm, Secret},
    flow::{CachedPassphraseFlow, FlowDispatcher},
    metadata::MetadataStore,
    ops::{session_key, signature_digest, DecryptParams, SignParams, TokenDecryptor, TokenSigner},
    token::{SoftToken, PIN_RETRIES},
    OperationHandle, DEFAULT_PASSPHRASE_TTL_S,
};

use crate::flows::ScriptedPrompt;

/// Token seed shared by scenarios
pub const TOKEN_SEED: [u8; 32] = [0x5a; 32];

/// Sign messages with a passphrase protected, token resident key.
///
/// The clock advances on every read, signatures must cover the creation
/// time of the attempt that first requested them.
pub async fn sign() -> anyhow::Result<()> {
    let prompt = Arc::new(ScriptedPrompt::new(["key passphrase", "123456"]));
    let token = Arc::new(SoftToken::new(
        prompt.clone(),
        &TOKEN_SEED,
        "123456".into(),
        "12345678".into(),
    ));

    let flows = FlowDispatcher::default()
        .with_passphrase(Arc::new(CachedPassphraseFlow::new(
            prompt.clone(),
            Arc::new(PassphraseCache::new(std::time::Duration::from_secs(
                DEFAULT_PASSPHRASE_TTL_S,
            ))),
            Arc::new(MetadataStore::default()),
        )))
        .with_token(token.clone());

    let now = Arc::new(AtomicU64::new(1_600_000_000));
    let clock = now.clone();

    let signer = TokenSigner::new()
        .with_key_passphrase(0x11, "key passphrase".into())
        .with_clock(Arc::new(move || clock.fetch_add(1, Ordering::SeqCst)));

    let handle = OperationHandle::from(signer).with_flows(flows);

    let messages = vec![b"hello".to_vec(), b"world".to_vec()];
    let sigs = handle
        .run(
            SignParams {
                master_key_id: 0x10,
                subkey_id: 0x11,
                algorithm: HashAlgorithm::Sha256,
                messages: messages.clone(),
            },
            CryptoInput::new(),
        )
        .await?;

    // Clock read once, the token round reuses the pinned creation time
    assert_eq!(now.load(Ordering::SeqCst), 1_600_000_001);
    assert_eq!(prompt.asked().await.len(), 2);

    let key = token.verifying_key().await;
    for (m, s) in messages.iter().zip(sigs.iter()) {
        let d = signature_digest(HashAlgorithm::Sha256, m, 1_600_000_000)
            .ok_or_else(|| anyhow::anyhow!("unsupported digest"))?;

        let sig = Signature::from_slice(s.as_bytes())?;
        key.verify(d.as_bytes(), &sig)?;

        info!("verified signature for '{}'", String::from_utf8_lossy(m));
    }

    Ok(())
}

/// Recover session keys encrypted to the token decryption key
pub async fn decrypt() -> anyhow::Result<()> {
    let prompt = Arc::new(ScriptedPrompt::new(["123456"]));
    let token = Arc::new(SoftToken::new(
        prompt.clone(),
        &TOKEN_SEED,
        "123456".into(),
        "12345678".into(),
    ));

    let recipient = token.public_key().await;

    // Encrypt two session keys to the token
    let mut session_keys = vec![];
    let mut expected = vec![];
    for _ in 0..2 {
        let e = EphemeralSecret::random_from_rng(OsRng);
        let e_pub = PublicKey::from(&e);
        let shared = e.diffie_hellman(&recipient);

        session_keys.push(e_pub.to_bytes());
        expected.push(session_key(&Secret::new(shared.as_bytes().to_vec())));
    }

    let handle = OperationHandle::from(TokenDecryptor)
        .with_flows(FlowDispatcher::default().with_token(token.clone()));

    let keys = handle
        .run(
            DecryptParams {
                master_key_id: 0x10,
                subkey_id: 0x12,
                session_keys,
            },
            CryptoInput::new(),
        )
        .await?;

    assert_eq!(keys, expected);

    // Both blobs decrypted in a single token round
    assert_eq!(prompt.asked().await.len(), 1);

    Ok(())
}

/// A mistyped token PIN is re-prompted within the flow, without using up
/// device retries
pub async fn decrypt_wrong_pin() -> anyhow::Result<()> {
    let prompt = Arc::new(ScriptedPrompt::new(["654321", "123456"]));
    let token = Arc::new(SoftToken::new(
        prompt.clone(),
        &TOKEN_SEED,
        "123456".into(),
        "12345678".into(),
    ));

    let handle = OperationHandle::from(TokenDecryptor)
        .with_flows(FlowDispatcher::default().with_token(token.clone()))
        .with_device_retries(0);

    let keys = handle
        .run(
            DecryptParams {
                master_key_id: 0x10,
                subkey_id: 0x12,
                session_keys: vec![[9u8; 32]],
            },
            CryptoInput::new(),
        )
        .await?;

    assert_eq!(keys.len(), 1);
    assert_eq!(prompt.asked().await.len(), 2);
    assert_eq!(token.retries().await, PIN_RETRIES);

    Ok(())
}
