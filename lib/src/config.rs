// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Host configuration, loaded from JSON

use std::{path::Path, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use keyop_core::engine::Proxy;

use crate::{
    handle::{DEFAULT_DEVICE_RETRIES, DEFAULT_USER_TIMEOUT_S},
    metadata::KeyMetadata,
    Error,
};

/// Default passphrase cache lifetime
pub const DEFAULT_PASSPHRASE_TTL_S: u64 = 300;

/// Keyop host configuration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout for user interactions (per flow)
    pub user_timeout_s: usize,

    /// Flow re-offers after device failures
    pub device_retries: usize,

    /// Passphrase cache entry lifetime
    pub passphrase_ttl_s: u64,

    /// Always prompt for passphrases
    pub skip_cache: bool,

    /// Network proxy for operations
    pub proxy: Proxy,

    /// Known key metadata
    pub keys: Vec<KeyMetadata>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_timeout_s: DEFAULT_USER_TIMEOUT_S,
            device_retries: DEFAULT_DEVICE_RETRIES,
            passphrase_ttl_s: DEFAULT_PASSPHRASE_TTL_S,
            skip_cache: false,
            proxy: Proxy::Direct,
            keys: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        debug!("loading config from {}", path.display());

        let s = tokio::fs::read_to_string(path).await?;
        let c = serde_json::from_str(&s)?;

        Ok(c)
    }

    /// Write configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let s = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, s).await?;
        Ok(())
    }

    /// Passphrase cache entry lifetime
    pub fn passphrase_ttl(&self) -> Duration {
        Duration::from_secs(self.passphrase_ttl_s)
    }
}
