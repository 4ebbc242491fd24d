// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Secret-collection flows
//!
//! A flow resolves exactly one [RequiredInput] into an [InputDelta]
//! (reported via [FlowOutcome]). Flows are selected by [FlowKind] via
//! the [FlowDispatcher].

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use keyop_core::engine::{FlowKind, FlowOutcome, Passphrase, Proxy, RequiredInput};

use crate::metadata::SecretKind;

mod passphrase;
pub use passphrase::CachedPassphraseFlow;

mod pin;
pub use pin::MetadataPinFlow;

/// Maximum prompts for a well formed secret before a flow gives up
pub const MAX_PROMPTS: usize = 3;

/// Per-operation flow options
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FlowContext {
    /// Network proxy in use for the operation
    pub proxy: Option<Proxy>,

    /// Always prompt, ignoring cached passphrases
    pub skip_cache: bool,

    /// Passphrase already held by the operation input, if any.
    ///
    /// A repeated request for a key while this is set means the executor
    /// rejected it.
    pub held_passphrase: Option<Passphrase>,
}

/// User prompt for secret entry
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask the user for a secret of the provided kind, `None` if declined
    async fn ask(&self, kind: SecretKind, description: &str) -> Option<Passphrase>;
}

#[async_trait]
impl<P: Prompt + ?Sized> Prompt for Arc<P> {
    async fn ask(&self, kind: SecretKind, description: &str) -> Option<Passphrase> {
        P::ask(self, kind, description).await
    }
}

/// Collects key or symmetric passphrases
#[async_trait]
pub trait PassphraseFlow: Send + Sync {
    async fn collect_passphrase(&self, required: &RequiredInput, ctx: &FlowContext)
        -> FlowOutcome;
}

/// Performs security token sign / decrypt of the requested hashes
#[async_trait]
pub trait SecurityTokenFlow: Send + Sync {
    async fn collect_token(&self, required: &RequiredInput, ctx: &FlowContext) -> FlowOutcome;
}

/// Collects security token PINs
#[async_trait]
pub trait TokenPinFlow: Send + Sync {
    async fn collect_pin(&self, required: &RequiredInput, ctx: &FlowContext) -> FlowOutcome;
}

/// Placeholder for flows unavailable in a context, declines every request
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

#[async_trait]
impl PassphraseFlow for Unavailable {
    async fn collect_passphrase(&self, required: &RequiredInput, _ctx: &FlowContext) -> FlowOutcome {
        warn!("no passphrase flow available for {:?}", required);
        FlowOutcome::Cancelled
    }
}

#[async_trait]
impl SecurityTokenFlow for Unavailable {
    async fn collect_token(&self, required: &RequiredInput, _ctx: &FlowContext) -> FlowOutcome {
        warn!("no security token available for {:?}", required);
        FlowOutcome::Cancelled
    }
}

#[async_trait]
impl TokenPinFlow for Unavailable {
    async fn collect_pin(&self, required: &RequiredInput, _ctx: &FlowContext) -> FlowOutcome {
        warn!("no PIN flow available for {:?}", required);
        FlowOutcome::Cancelled
    }
}

/// Selects the flow for each [RequiredInput] by [FlowKind]
#[derive(Clone)]
pub struct FlowDispatcher {
    passphrase: Arc<dyn PassphraseFlow>,
    token: Arc<dyn SecurityTokenFlow>,
    pin: Arc<dyn TokenPinFlow>,
}

impl Default for FlowDispatcher {
    fn default() -> Self {
        Self {
            passphrase: Arc::new(Unavailable),
            token: Arc::new(Unavailable),
            pin: Arc::new(Unavailable),
        }
    }
}

impl FlowDispatcher {
    pub fn new(
        passphrase: impl PassphraseFlow + 'static,
        token: impl SecurityTokenFlow + 'static,
        pin: impl TokenPinFlow + 'static,
    ) -> Self {
        Self {
            passphrase: Arc::new(passphrase),
            token: Arc::new(token),
            pin: Arc::new(pin),
        }
    }

    pub fn with_passphrase(mut self, f: Arc<dyn PassphraseFlow>) -> Self {
        self.passphrase = f;
        self
    }

    pub fn with_token(mut self, f: Arc<dyn SecurityTokenFlow>) -> Self {
        self.token = f;
        self
    }

    pub fn with_pin(mut self, f: Arc<dyn TokenPinFlow>) -> Self {
        self.pin = f;
        self
    }

    /// Run the flow responsible for the provided input
    pub async fn dispatch(&self, required: &RequiredInput, ctx: &FlowContext) -> FlowOutcome {
        let kind = required.kind();

        info!("starting {} flow", kind);

        match kind {
            FlowKind::Passphrase => self.passphrase.collect_passphrase(required, ctx).await,
            FlowKind::SecurityToken => self.token.collect_token(required, ctx).await,
            FlowKind::TokenPin => self.pin.collect_pin(required, ctx).await,
        }
    }
}

/// Prompt until a secret is well formed for `kind`, up to [MAX_PROMPTS]
pub(crate) async fn prompt_valid(
    prompt: &dyn Prompt,
    kind: SecretKind,
    description: &str,
    op: Option<keyop_core::engine::PinOperation>,
) -> Option<Passphrase> {
    for i in 0..MAX_PROMPTS {
        let p = prompt.ask(kind, description).await?;

        if kind.validate(&p, op) {
            return Some(p);
        }

        warn!("invalid {} entered ({}/{})", kind, i + 1, MAX_PROMPTS);
    }

    None
}
