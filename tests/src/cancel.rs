// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cancellation during secret collection

use std::sync::Arc;

use keyop::{
    core::engine::{CryptoInput, Outcome},
    Error, OperationHandle,
};

use crate::{executor::ScriptedExecutor, flows::RecordingFlows, sign::sign_steps};

/// Cancel the `k`th of `n` token rounds, the executor must not be
/// re-invoked after cancellation
pub async fn test(n: u8, k: usize) -> anyhow::Result<()> {
    let exec = Arc::new(ScriptedExecutor::new(sign_steps(n)?, |_| ()));
    let flows = Arc::new(RecordingFlows::new("unused").with_cancel_at(k));

    let handle = OperationHandle::from(exec.clone()).with_flows(flows.dispatcher());

    let outcome = handle.execute((), CryptoInput::new()).await?;

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(flows.requests().await.len(), k + 1);
    assert_eq!(exec.calls(), k + 1);

    // Run helper reports cancellation as an error
    let flows = Arc::new(RecordingFlows::new("unused").with_cancel_at(0));
    let handle = handle.with_flows(flows.dispatcher());

    assert!(matches!(
        handle.run((), CryptoInput::new()).await,
        Err(Error::Cancelled)
    ));

    Ok(())
}
