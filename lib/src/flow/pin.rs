// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use async_trait::async_trait;
use log::error;

use keyop_core::engine::{FlowOutcome, InputDelta, PinOperation, RequiredInput};

use super::{prompt_valid, FlowContext, Prompt, TokenPinFlow};
use crate::metadata::{MetadataStore, SecretKind};

/// Token PIN flow prompting in the mode recorded in [MetadataStore]
///
/// Keys recorded with a pattern secret are prompted for a pattern,
/// everything else for a numeric PIN.
pub struct MetadataPinFlow<P> {
    prompt: P,
    metadata: Arc<MetadataStore>,
}

impl<P: Prompt> MetadataPinFlow<P> {
    pub fn new(prompt: P, metadata: Arc<MetadataStore>) -> Self {
        Self { prompt, metadata }
    }
}

#[async_trait]
impl<P: Prompt> TokenPinFlow for MetadataPinFlow<P> {
    async fn collect_pin(&self, required: &RequiredInput, _ctx: &FlowContext) -> FlowOutcome {
        let (master_key_id, operation) = match required {
            RequiredInput::TokenPin {
                master_key_id,
                operation,
            } => (*master_key_id, *operation),
            _ => {
                error!("PIN flow cannot handle {:?}", required);
                return FlowOutcome::Cancelled;
            }
        };

        let meta = self.metadata.get(master_key_id).await;

        // Admin PINs are always numeric
        let kind = match (operation, meta.as_ref().map(|m| m.secret_kind)) {
            (PinOperation::Unlock, Some(SecretKind::Pattern)) => SecretKind::Pattern,
            _ => SecretKind::Pin,
        };

        let name = meta
            .map(|m| m.display_name())
            .unwrap_or_else(|| format!("{master_key_id:016x}"));

        let description = match operation {
            PinOperation::Unlock => format!("Enter security token {kind} for key {name}"),
            PinOperation::ChangeAdmin => format!("Enter admin PIN for key {name}"),
        };

        match prompt_valid(&self.prompt, kind, &description, Some(operation)).await {
            Some(p) => FlowOutcome::Provided(InputDelta::passphrase(p)),
            None => FlowOutcome::Cancelled,
        }
    }
}
