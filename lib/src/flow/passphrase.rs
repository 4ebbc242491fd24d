// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};

use keyop_core::engine::{FlowOutcome, InputDelta, RequiredInput};

use super::{prompt_valid, FlowContext, PassphraseFlow, Prompt};
use crate::{
    cache::PassphraseCache,
    metadata::{MetadataStore, SecretKind},
};

/// Passphrase flow backed by the [PassphraseCache].
///
/// Cached key passphrases are returned without prompting unless
/// [FlowContext::skip_cache] is set. A cached value matching
/// [FlowContext::held_passphrase] was rejected by the executor, it is
/// evicted and the user prompted instead.
///
/// This flow only reads the cache, accepted passphrases are written by
/// [OperationHandle](crate::OperationHandle) once the operation succeeds.
pub struct CachedPassphraseFlow<P> {
    prompt: P,
    cache: Arc<PassphraseCache>,
    metadata: Arc<MetadataStore>,
}

impl<P: Prompt> CachedPassphraseFlow<P> {
    pub fn new(prompt: P, cache: Arc<PassphraseCache>, metadata: Arc<MetadataStore>) -> Self {
        Self {
            prompt,
            cache,
            metadata,
        }
    }
}

#[async_trait]
impl<P: Prompt> PassphraseFlow for CachedPassphraseFlow<P> {
    async fn collect_passphrase(&self, required: &RequiredInput, ctx: &FlowContext) -> FlowOutcome {
        let (master_key_id, subkey_id) = match required {
            RequiredInput::Passphrase {
                master_key_id,
                subkey_id,
            } => (*master_key_id, *subkey_id),
            RequiredInput::SymmetricPassphrase => {
                return match self
                    .prompt
                    .ask(SecretKind::Passphrase, "Enter passphrase for symmetric decryption")
                    .await
                {
                    Some(p) => FlowOutcome::Provided(InputDelta::passphrase(p)),
                    None => FlowOutcome::Cancelled,
                };
            }
            _ => {
                error!("passphrase flow cannot handle {:?}", required);
                return FlowOutcome::Cancelled;
            }
        };

        if !ctx.skip_cache {
            match self.cache.get(master_key_id, subkey_id).await {
                Some(p) if ctx.held_passphrase.as_ref() == Some(&p) => {
                    warn!("cached passphrase for {:016x} rejected, evicting", subkey_id);
                    self.cache.remove(master_key_id, subkey_id).await;
                }
                Some(p) => {
                    debug!("using cached passphrase for {:016x}", subkey_id);
                    return FlowOutcome::Provided(InputDelta::passphrase(p));
                }
                None => (),
            }
        }

        let (kind, name) = match self.metadata.get(master_key_id).await {
            Some(m) => (m.secret_kind, m.display_name()),
            None => (SecretKind::Passphrase, format!("{master_key_id:016x}")),
        };

        let description = format!("Enter {kind} for key {name}");

        match prompt_valid(&self.prompt, kind, &description, None).await {
            Some(p) => FlowOutcome::Provided(InputDelta::passphrase(p)),
            None => FlowOutcome::Cancelled,
        }
    }
}
