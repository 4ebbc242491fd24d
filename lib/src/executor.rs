// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Operation executor contract

use std::sync::Arc;

use keyop_core::engine::{CryptoInput, OperationResult};

/// Performs one attempt of a crypto operation (sign, decrypt, PIN change)
/// against the input accumulated so far.
///
/// Executors are synchronous and are run on a blocking worker thread by
/// [`OperationHandle`][crate::OperationHandle]. Given the same parameters,
/// input and owned state an executor must produce the same result, and it
/// must return [`OperationResult::Pending`] (never block) when secret input
/// is missing.
pub trait Executor: Send + Sync + 'static {
    /// Operation parameters (data to sign / decrypt, key ids)
    type Params: Send + Sync + 'static;

    /// Success payload
    type Output: Send + 'static;

    /// Execute the operation
    fn execute(&self, params: &Self::Params, input: &CryptoInput) -> OperationResult<Self::Output>;
}

impl<E: Executor> Executor for Arc<E> {
    type Params = E::Params;
    type Output = E::Output;

    fn execute(&self, params: &Self::Params, input: &CryptoInput) -> OperationResult<Self::Output> {
        E::execute(self, params, input)
    }
}
