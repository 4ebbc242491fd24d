// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Key metadata store
//!
//! Records per-key information the flows need to prompt correctly,
//! such as whether a key is protected by a passphrase, PIN or pattern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, EnumVariantNames};
use tokio::sync::RwLock;

use keyop_core::engine::{Passphrase, PinOperation};

/// Minimum user PIN length (OpenPGP card PW1)
pub const MIN_USER_PIN: usize = 6;

/// Minimum admin PIN length (OpenPGP card PW3)
pub const MIN_ADMIN_PIN: usize = 8;

/// Minimum number of pattern cells
pub const MIN_PATTERN: usize = 4;

/// Kind of secret protecting a key
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    Display,
    EnumString,
    EnumVariantNames,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// Free-form passphrase
    #[default]
    Passphrase,
    /// Numeric PIN
    Pin,
    /// Unlock pattern, encoded as the sequence of cells `1`..=`9`
    Pattern,
}

impl SecretKind {
    /// Check an entered secret is well formed for this kind
    pub fn validate(&self, secret: &Passphrase, op: Option<PinOperation>) -> bool {
        let s = secret.as_bytes();

        match self {
            SecretKind::Passphrase => true,
            SecretKind::Pin => {
                let min = match op {
                    Some(PinOperation::ChangeAdmin) => MIN_ADMIN_PIN,
                    _ => MIN_USER_PIN,
                };
                s.len() >= min && s.iter().all(|c| c.is_ascii_digit())
            }
            SecretKind::Pattern => {
                // Cells may only be visited once
                let mut seen = [false; 10];
                s.len() >= MIN_PATTERN
                    && s.iter().all(|&c| match c {
                        b'1'..=b'9' => !std::mem::replace(&mut seen[(c - b'0') as usize], true),
                        _ => false,
                    })
            }
        }
    }
}

/// Metadata for a master key
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Master key identifier
    pub master_key_id: u64,

    /// Secret protecting the key
    #[serde(default)]
    pub secret_kind: SecretKind,

    /// Primary user id, for display
    #[serde(default)]
    pub user_id: Option<String>,
}

impl KeyMetadata {
    pub fn new(master_key_id: u64, secret_kind: SecretKind) -> Self {
        Self {
            master_key_id,
            secret_kind,
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Name for prompts
    pub fn display_name(&self) -> String {
        match &self.user_id {
            Some(u) => format!("{u} ({:016x})", self.master_key_id),
            None => format!("{:016x}", self.master_key_id),
        }
    }
}

/// Shared store of [KeyMetadata] by master key id
#[derive(Debug, Default)]
pub struct MetadataStore {
    keys: RwLock<HashMap<u64, KeyMetadata>>,
}

impl MetadataStore {
    pub fn new(keys: impl IntoIterator<Item = KeyMetadata>) -> Self {
        Self {
            keys: RwLock::new(keys.into_iter().map(|k| (k.master_key_id, k)).collect()),
        }
    }

    /// Fetch metadata for a master key
    pub async fn get(&self, master_key_id: u64) -> Option<KeyMetadata> {
        self.keys.read().await.get(&master_key_id).cloned()
    }

    /// Fetch the secret kind for a master key, defaulting to passphrase
    /// for unknown keys
    pub async fn secret_kind(&self, master_key_id: u64) -> SecretKind {
        self.get(master_key_id)
            .await
            .map(|m| m.secret_kind)
            .unwrap_or_default()
    }

    /// Add or replace metadata for a key
    pub async fn insert(&self, meta: KeyMetadata) -> Option<KeyMetadata> {
        self.keys.write().await.insert(meta.master_key_id, meta)
    }
}
