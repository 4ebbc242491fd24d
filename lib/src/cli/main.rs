// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for executing operations with secret-collection flows

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{debug, info, LevelFilter};

use keyop::{
    cache::PassphraseCache,
    core::engine::{CryptoInput, HashAlgorithm, Passphrase},
    flow::{CachedPassphraseFlow, FlowDispatcher, MetadataPinFlow},
    metadata::MetadataStore,
    ops::{AdminPinChanger, ChangePinParams, DecryptParams, SignParams, TokenDecryptor, TokenSigner},
    token::SoftToken,
    Config, OperationHandle,
};

mod helpers;
use helpers::*;

/// Keyop command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Configuration file (JSON)
    #[clap(long, env = "KEYOP_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout for user interactions, overrides configuration
    #[clap(long)]
    user_timeout_s: Option<usize>,

    /// Flow retries after device failures, overrides configuration
    #[clap(long)]
    device_retries: Option<usize>,

    /// Always prompt for passphrases
    #[clap(long)]
    skip_cache: bool,

    /// Do not cache entered passphrases
    #[clap(long)]
    no_cache_passphrase: bool,

    /// Software token seed (random if not provided)
    #[clap(long, env = "KEYOP_TOKEN_SEED")]
    token_seed: Option<HexData<32>>,

    /// Software token user PIN
    #[clap(long, default_value = "123456")]
    token_pin: String,

    /// Software token admin PIN
    #[clap(long, default_value = "12345678")]
    token_admin_pin: String,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch software token public keys
    TokenInfo,

    /// Sign messages with a token-resident key
    Sign {
        /// Master key identifier (hex)
        #[clap(long, default_value = "0")]
        master_key_id: KeyId,

        /// Subkey identifier (hex)
        #[clap(long, default_value = "0")]
        subkey_id: KeyId,

        /// Hash algorithm
        #[clap(long, default_value = "sha256", value_parser = parse_algorithm)]
        algorithm: HashAlgorithm,

        /// Require this key passphrase before signing
        #[clap(long)]
        key_passphrase: Option<String>,

        /// Messages to sign
        #[clap(required = true)]
        messages: Vec<String>,
    },

    /// Recover session keys with a token-resident key
    Decrypt {
        /// Master key identifier (hex)
        #[clap(long, default_value = "0")]
        master_key_id: KeyId,

        /// Subkey identifier (hex)
        #[clap(long, default_value = "0")]
        subkey_id: KeyId,

        /// Hex-encoded ephemeral public keys
        #[clap(required = true)]
        session_keys: Vec<HexData<32>>,
    },

    /// Change the software token admin PIN
    ChangePin {
        /// Master key identifier (hex)
        #[clap(long, default_value = "0")]
        master_key_id: KeyId,

        /// New admin PIN
        #[clap(long)]
        new_pin: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Load configuration and apply overrides
    let mut cfg = match &args.config {
        Some(p) => Config::load(p).await?,
        None => Config::default(),
    };
    if let Some(t) = args.user_timeout_s {
        cfg.user_timeout_s = t;
    }
    if let Some(r) = args.device_retries {
        cfg.device_retries = r;
    }
    cfg.skip_cache |= args.skip_cache;

    debug!("Using config: {:?}", cfg);

    // Setup flows
    let prompt = Arc::new(TermPrompt);
    let cache = Arc::new(PassphraseCache::new(cfg.passphrase_ttl()));
    let metadata = Arc::new(MetadataStore::new(cfg.keys.clone()));

    let pin = Passphrase::from(args.token_pin.as_str());
    let admin_pin = Passphrase::from(args.token_admin_pin.as_str());
    let token = Arc::new(match &args.token_seed {
        Some(s) => SoftToken::new(prompt.clone(), s.as_ref(), pin, admin_pin),
        None => SoftToken::generate(prompt.clone(), pin, admin_pin),
    });

    let flows = FlowDispatcher::default()
        .with_passphrase(Arc::new(CachedPassphraseFlow::new(
            prompt.clone(),
            cache.clone(),
            metadata.clone(),
        )))
        .with_token(token.clone())
        .with_pin(Arc::new(MetadataPinFlow::new(prompt, metadata)));

    let input = CryptoInput::new()
        .with_proxy(cfg.proxy.clone())
        .with_cache_passphrase(!args.no_cache_passphrase);

    debug!("Executing command: {:?}", args.cmd);

    match args.cmd {
        Actions::TokenInfo => {
            info!(
                "signing key: {}",
                hex::encode(token.verifying_key().await.as_bytes())
            );
            info!(
                "decryption key: {}",
                hex::encode(token.public_key().await.as_bytes())
            );
        }
        Actions::Sign {
            master_key_id,
            subkey_id,
            algorithm,
            key_passphrase,
            messages,
        } => {
            let mut signer = TokenSigner::new();
            if let Some(p) = key_passphrase {
                signer = signer.with_key_passphrase(subkey_id.0, Passphrase::from(p.as_str()));
            }

            let h = OperationHandle::from(signer)
                .with_config(&cfg)
                .with_flows(flows)
                .with_cache(cache);

            let params = SignParams {
                master_key_id: master_key_id.0,
                subkey_id: subkey_id.0,
                algorithm,
                messages: messages.iter().map(|m| m.as_bytes().to_vec()).collect(),
            };

            let sigs = h.run(params, input).await?;

            for (m, s) in messages.iter().zip(sigs.iter()) {
                info!("'{}': {}", m, hex::encode(s.as_bytes()));
            }
        }
        Actions::Decrypt {
            master_key_id,
            subkey_id,
            session_keys,
        } => {
            let h = OperationHandle::from(TokenDecryptor)
                .with_config(&cfg)
                .with_flows(flows)
                .with_cache(cache);

            let params = DecryptParams {
                master_key_id: master_key_id.0,
                subkey_id: subkey_id.0,
                session_keys: session_keys.iter().map(|k| k.0).collect(),
            };

            let keys = h.run(params, input).await?;

            for (e, k) in session_keys.iter().zip(keys.iter()) {
                info!("{}: {}", e, hex::encode(k.as_bytes()));
            }
        }
        Actions::ChangePin {
            master_key_id,
            new_pin,
        } => {
            let h = OperationHandle::from(AdminPinChanger::new(token.clone()))
                .with_config(&cfg)
                .with_flows(flows)
                .with_cache(cache);

            let params = ChangePinParams {
                master_key_id: master_key_id.0,
                new_pin: Passphrase::from(new_pin.as_str()),
            };

            h.run(params, input).await?;

            info!("admin PIN changed");
        }
    }

    Ok(())
}
