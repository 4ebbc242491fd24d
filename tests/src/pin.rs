// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Token PIN collection

use std::sync::Arc;

use keyop::{
    core::engine::{CryptoInput, PinOperation, RequiredInput},
    flow::{FlowContext, FlowDispatcher, MetadataPinFlow, TokenPinFlow},
    metadata::{KeyMetadata, MetadataStore, SecretKind},
    ops::{AdminPinChanger, ChangePinParams},
    token::SoftToken,
    Error, OperationHandle,
};

use crate::{flows::ScriptedPrompt, token::TOKEN_SEED};

/// Change the token admin PIN, malformed PINs are re-prompted
pub async fn change_admin() -> anyhow::Result<()> {
    let prompt = Arc::new(ScriptedPrompt::new(["1234", "12345678"]));
    let token = Arc::new(SoftToken::new(
        prompt.clone(),
        &TOKEN_SEED,
        "123456".into(),
        "12345678".into(),
    ));

    let metadata = Arc::new(MetadataStore::new([
        KeyMetadata::new(0x10, SecretKind::Pin).with_user_id("alice@example.com")
    ]));
    let flows = FlowDispatcher::default()
        .with_pin(Arc::new(MetadataPinFlow::new(prompt.clone(), metadata)));

    let handle = OperationHandle::from(AdminPinChanger::new(token.clone())).with_flows(flows);

    handle
        .run(
            ChangePinParams {
                master_key_id: 0x10,
                new_pin: "87654321".into(),
            },
            CryptoInput::new(),
        )
        .await?;

    let asked = prompt.asked().await;
    assert_eq!(asked.len(), 2);
    assert!(asked.iter().all(|(k, _)| *k == SecretKind::Pin));
    assert!(asked[0].1.contains("alice@example.com"));

    // Old admin PIN now rejected by the token
    prompt.push("12345678").await;

    let r = handle
        .run(
            ChangePinParams {
                master_key_id: 0x10,
                new_pin: "11111111".into(),
            },
            CryptoInput::new(),
        )
        .await;

    assert!(matches!(r, Err(Error::Operation(_))), "{r:?}");

    Ok(())
}

/// Keys protected by a pattern are unlocked with a pattern, admin PINs
/// are always numeric
pub async fn pattern_mode() -> anyhow::Result<()> {
    let prompt = Arc::new(ScriptedPrompt::new(["1235", "12345678"]));
    let metadata = Arc::new(MetadataStore::new([KeyMetadata::new(
        0x20,
        SecretKind::Pattern,
    )]));

    let flow = MetadataPinFlow::new(prompt.clone(), metadata);
    let ctx = FlowContext::default();

    flow.collect_pin(&RequiredInput::token_pin(0x20, PinOperation::Unlock), &ctx)
        .await;
    flow.collect_pin(&RequiredInput::token_pin(0x20, PinOperation::ChangeAdmin), &ctx)
        .await;

    let kinds: Vec<_> = prompt.asked().await.into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec![SecretKind::Pattern, SecretKind::Pin]);

    Ok(())
}
