// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Token signing rounds

use std::sync::Arc;

use log::info;

use keyop::{
    core::engine::{CryptoInput, HashAlgorithm, InputHash, RequiredInput},
    OperationHandle,
};

use crate::{
    executor::{held_results, ScriptedExecutor},
    flows::{token_result, RecordingFlows},
};

/// Signature time used by scripted sign requests
pub const SIGNATURE_TIME: u64 = 1_700_000_000;

/// Build one single-hash sign request per round
pub fn sign_steps(n: u8) -> anyhow::Result<Vec<RequiredInput>> {
    let mut steps = vec![];

    for i in 0..n {
        steps.push(RequiredInput::nfc_sign(
            0x10,
            0x11,
            &[InputHash::from([i; 32])],
            &[HashAlgorithm::Sha256],
            SIGNATURE_TIME,
        )?);
    }

    Ok(steps)
}

/// Sign a single hash: one token round, then success
pub async fn sign_one_hash() -> anyhow::Result<()> {
    let h = InputHash::from([0xab; 32]);
    let required = RequiredInput::nfc_sign(
        0x10,
        0x11,
        &[h.clone()],
        &[HashAlgorithm::Sha256],
        SIGNATURE_TIME,
    )?;

    let exec = Arc::new(ScriptedExecutor::new(vec![required.clone()], |i| {
        (held_results(i), i.signature_time())
    }));
    let flows = Arc::new(RecordingFlows::new("unused"));

    let handle = OperationHandle::from(exec.clone()).with_flows(flows.dispatcher());

    let (results, signature_time) = handle.run((), CryptoInput::new()).await?;

    info!("signed: {:?}", results);

    assert_eq!(flows.requests().await, vec![required]);
    assert_eq!(results, vec![(h.clone(), token_result(&h))]);
    assert_eq!(signature_time, Some(SIGNATURE_TIME));
    assert_eq!(exec.calls(), 2);

    Ok(())
}

/// Run `n` token rounds, returning the requests issued.
///
/// The final input must hold the union of every round's results.
pub async fn rounds(n: u8) -> anyhow::Result<Vec<RequiredInput>> {
    let steps = sign_steps(n)?;

    let exec = Arc::new(ScriptedExecutor::new(steps.clone(), held_results));
    let flows = Arc::new(RecordingFlows::new("unused"));

    let handle = OperationHandle::from(exec.clone()).with_flows(flows.dispatcher());

    let results = handle.run((), CryptoInput::new()).await?;

    let expected: Vec<_> = (0..n)
        .map(|i| InputHash::from([i; 32]))
        .map(|h| {
            let r = token_result(&h);
            (h, r)
        })
        .collect();

    let requests = flows.requests().await;

    assert_eq!(results, expected);
    assert_eq!(requests, steps);
    assert_eq!(exec.calls(), n as usize + 1);

    Ok(requests)
}
