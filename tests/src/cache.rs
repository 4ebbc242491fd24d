// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Passphrase caching across operations

use std::{sync::Arc, time::Duration};

use keyop::{
    cache::PassphraseCache,
    core::engine::{CryptoInput, Passphrase, RequiredInput},
    flow::{CachedPassphraseFlow, FlowDispatcher},
    metadata::MetadataStore,
    OperationHandle,
};

use crate::{executor::ScriptedExecutor, flows::ScriptedPrompt};

fn setup(
    answers: &[&str],
) -> (
    Arc<ScriptedPrompt>,
    Arc<PassphraseCache>,
    OperationHandle<ScriptedExecutor<Option<Passphrase>>>,
) {
    let prompt = Arc::new(ScriptedPrompt::new(answers.iter().copied()));
    let cache = Arc::new(PassphraseCache::new(Duration::from_secs(60)));

    let flows = FlowDispatcher::default().with_passphrase(Arc::new(CachedPassphraseFlow::new(
        prompt.clone(),
        cache.clone(),
        Arc::new(MetadataStore::default()),
    )));

    let exec = ScriptedExecutor::new(vec![RequiredInput::passphrase(0x30, 0x31)], |i| {
        i.passphrase().cloned()
    })
    .with_passphrase("pw");

    let handle = OperationHandle::from(exec)
        .with_flows(flows)
        .with_cache(cache.clone());

    (prompt, cache, handle)
}

/// Passphrases entered with caching enabled are reused by later operations
pub async fn cached() -> anyhow::Result<()> {
    let (prompt, cache, handle) = setup(&["pw"]);

    for _ in 0..2 {
        let p = handle.run((), CryptoInput::new()).await?;
        assert_eq!(p, Some(Passphrase::from("pw")));
    }

    assert_eq!(prompt.asked().await.len(), 1);
    assert_eq!(cache.len().await, 1);

    Ok(())
}

/// Operations not permitting caching leave the cache empty
pub async fn not_cached() -> anyhow::Result<()> {
    let (prompt, cache, handle) = setup(&["pw", "pw"]);

    for _ in 0..2 {
        handle
            .run((), CryptoInput::new().with_cache_passphrase(false))
            .await?;
    }

    assert_eq!(prompt.asked().await.len(), 2);
    assert_eq!(cache.len().await, 0);

    Ok(())
}

/// Skipping the cache always prompts, newly entered passphrases replace
/// cached ones
pub async fn skip_cache() -> anyhow::Result<()> {
    let (prompt, cache, handle) = setup(&["pw", "pw"]);

    cache.insert(0x30, 0x31, "stale".into()).await;

    let handle = handle.with_skip_cache(true);
    let p = handle.run((), CryptoInput::new()).await?;

    assert_eq!(p, Some(Passphrase::from("pw")));
    assert_eq!(prompt.asked().await.len(), 1);
    assert_eq!(cache.get(0x30, 0x31).await, Some(Passphrase::from("pw")));

    Ok(())
}

/// A mistyped passphrase is re-prompted and never cached, the accepted
/// one is reused afterwards
pub async fn wrong_then_correct() -> anyhow::Result<()> {
    let (prompt, cache, handle) = setup(&["wrong", "pw"]);

    for _ in 0..2 {
        let p = handle.run((), CryptoInput::new()).await?;
        assert_eq!(p, Some(Passphrase::from("pw")));
    }

    assert_eq!(prompt.asked().await.len(), 2);
    assert_eq!(cache.get(0x30, 0x31).await, Some(Passphrase::from("pw")));

    Ok(())
}

/// A cached passphrase rejected by the executor is evicted and the user
/// prompted
pub async fn stale_cache_evicted() -> anyhow::Result<()> {
    let (prompt, cache, handle) = setup(&["pw"]);

    cache.insert(0x30, 0x31, "stale".into()).await;

    let p = handle.run((), CryptoInput::new()).await?;

    assert_eq!(p, Some(Passphrase::from("pw")));
    assert_eq!(prompt.asked().await.len(), 1);
    assert_eq!(cache.get(0x30, 0x31).await, Some(Passphrase::from("pw")));

    Ok(())
}
