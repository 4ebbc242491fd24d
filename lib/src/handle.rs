// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for executing operations
//!
//! This drives a [Coordinator] for each logical operation, invoking
//! the [Executor] on a blocking worker and secret-collection flows
//! via the [FlowDispatcher].

use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};

use keyop_core::engine::{
    Coordinator, CryptoInput, Event, FlowOutcome, OperationResult, Outcome, Output, RequiredInput,
};

use crate::{
    cache::PassphraseCache,
    flow::{FlowContext, FlowDispatcher},
    Config, Error, Executor,
};

/// Default timeout for user interactions
pub const DEFAULT_USER_TIMEOUT_S: usize = 60;

/// Default re-offers of a flow after device failures
pub const DEFAULT_DEVICE_RETRIES: usize = 3;

/// Handle for running operations with an [Executor].
///
/// Each call to [OperationHandle::execute] is an independent logical
/// operation with its own accumulated input, handles may be cloned and
/// shared between tasks.
pub struct OperationHandle<E: Executor> {
    /// Operation executor
    executor: Arc<E>,
    /// Secret-collection flows
    flows: FlowDispatcher,
    /// Timeout for user interactions (per flow)
    user_timeout_s: usize,
    /// Flow re-offers after device failures
    device_retries: usize,
    /// Always prompt for passphrases
    skip_cache: bool,
    /// Cache for passphrases accepted by the executor
    cache: Option<Arc<PassphraseCache>>,
}

impl<E: Executor> Clone for OperationHandle<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            flows: self.flows.clone(),
            user_timeout_s: self.user_timeout_s,
            device_retries: self.device_retries,
            skip_cache: self.skip_cache,
            cache: self.cache.clone(),
        }
    }
}

/// Create an [OperationHandle] from a type implementing [Executor]
impl<E: Executor> From<E> for OperationHandle<E> {
    fn from(e: E) -> Self {
        Self {
            executor: Arc::new(e),
            flows: FlowDispatcher::default(),
            user_timeout_s: DEFAULT_USER_TIMEOUT_S,
            device_retries: DEFAULT_DEVICE_RETRIES,
            skip_cache: false,
            cache: None,
        }
    }
}

impl<E: Executor> OperationHandle<E> {
    /// Set secret-collection flows
    pub fn with_flows(mut self, flows: FlowDispatcher) -> Self {
        self.flows = flows;
        self
    }

    /// Apply timeouts, retries and cache options from a [Config]
    pub fn with_config(mut self, cfg: &Config) -> Self {
        self.user_timeout_s = cfg.user_timeout_s;
        self.device_retries = cfg.device_retries;
        self.skip_cache = cfg.skip_cache;
        self
    }

    pub fn with_user_timeout(mut self, timeout_s: usize) -> Self {
        self.user_timeout_s = timeout_s;
        self
    }

    pub fn with_device_retries(mut self, retries: usize) -> Self {
        self.device_retries = retries;
        self
    }

    pub fn with_skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    /// Cache key passphrases once an operation using them succeeds
    pub fn with_cache(mut self, cache: Arc<PassphraseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Helper to fetch user interaction timeout
    fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s as u64)
    }

    /// Run an operation to completion, returning the success payload
    pub async fn run(&self, params: E::Params, input: CryptoInput) -> Result<E::Output, Error> {
        match self.execute(params, input).await? {
            Outcome::Success(v) => Ok(v),
            Outcome::Error(e) => Err(Error::Operation(e)),
            Outcome::Cancelled => Err(Error::Cancelled),
            Outcome::Aborted(v) => Err(Error::ProtocolViolation(v)),
        }
    }

    /// Run an operation to its terminal [Outcome].
    ///
    /// Errors are returned for failures outside the operation itself
    /// (user timeouts, persistent device failures, worker failures).
    pub async fn execute(
        &self,
        params: E::Params,
        input: CryptoInput,
    ) -> Result<Outcome<E::Output>, Error> {
        let params = Arc::new(params);

        let ctx = FlowContext {
            proxy: input.proxy().cloned(),
            skip_cache: self.skip_cache,
            held_passphrase: None,
        };
        let cache_passphrase = input.cache_passphrase();

        let mut c = Coordinator::new();
        let mut out = c.update(Event::Start(input))?;

        // Last device failure, for reporting
        let mut failure = String::new();

        // Key of the last requested passphrase
        let mut key = None;

        loop {
            out = match out {
                Output::Execute => {
                    let r = self.invoke(params.clone(), c.input().clone()).await?;

                    // Input is discarded once the coordinator sees the result
                    if let (OperationResult::Success(_), Some((m, s)), true) =
                        (&r, key, cache_passphrase)
                    {
                        self.cache_accepted(m, s, c.input()).await;
                    }

                    c.update(Event::Executed(r))?
                }
                Output::Collect(r) => {
                    if let RequiredInput::Passphrase {
                        master_key_id,
                        subkey_id,
                    } = &r
                    {
                        key = Some((*master_key_id, *subkey_id));
                    }

                    let ctx = FlowContext {
                        held_passphrase: c.input().passphrase().cloned(),
                        ..ctx.clone()
                    };

                    let o = match self.collect(&r, &ctx).await {
                        Ok(o) => o,
                        Err(e) => {
                            c.update(Event::Reset)?;
                            return Err(e);
                        }
                    };

                    if let FlowOutcome::DeviceFailure(reason) = &o {
                        failure = reason.clone();
                    }

                    c.update(Event::FlowCompleted(o))?
                }
                Output::DeviceFailed { required, attempts } => {
                    if attempts > self.device_retries {
                        error!(
                            "{} flow failed after {} attempts: {}",
                            required.kind(),
                            attempts,
                            failure
                        );
                        c.update(Event::Reset)?;
                        return Err(Error::DeviceFailure(failure));
                    }

                    warn!(
                        "retrying {} flow ({}/{})",
                        required.kind(),
                        attempts,
                        self.device_retries
                    );

                    c.update(Event::RetryFlow)?
                }
                Output::Done(o) => {
                    info!("operation complete after {} rounds", c.rounds());
                    return Ok(o);
                }
                o @ (Output::State { .. } | Output::None) => {
                    error!("unexpected coordinator output: {:?}", o.state());
                    return Err(Error::Engine(keyop_core::Error::InvalidState));
                }
            };
        }
    }

    /// Store the passphrase an operation succeeded with
    async fn cache_accepted(&self, master_key_id: u64, subkey_id: u64, input: &CryptoInput) {
        if let (Some(cache), Some(p)) = (&self.cache, input.passphrase()) {
            debug!("operation accepted passphrase for {:016x}", subkey_id);
            cache.insert(master_key_id, subkey_id, p.clone()).await;
        }
    }

    /// Invoke the executor on a blocking worker
    async fn invoke(
        &self,
        params: Arc<E::Params>,
        input: CryptoInput,
    ) -> Result<keyop_core::OperationResult<E::Output>, Error> {
        let e = self.executor.clone();

        debug!("executing operation");

        let r = tokio::task::spawn_blocking(move || e.execute(&params, &input)).await?;

        Ok(r)
    }

    /// Run the flow for a required input, bounded by the user timeout
    async fn collect(&self, r: &RequiredInput, ctx: &FlowContext) -> Result<FlowOutcome, Error> {
        debug!("collecting {:?}", r);

        let o = tokio::time::timeout(self.user_timeout(), self.flows.dispatch(r, ctx)).await?;

        Ok(o)
    }
}
