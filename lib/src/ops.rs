// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Executors for token backed operations
//!
//! These model the operation side of an OpenPGP key manager closely
//! enough to drive the coordinator: hashes are computed over the data
//! and signature creation time, secret key material lives on the
//! security token.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, warn};
use sha2::{Digest, Sha256, Sha512};

use keyop_core::engine::{
    CryptoInput, HashAlgorithm, InputHash, OperationError, OperationResult, Passphrase,
    PinOperation, RequiredInput, Secret, MAX_HASHES,
};

use crate::{flow::Prompt, token::SoftToken, Executor};

/// Hash algorithm not supported by the executor
pub const ERR_UNSUPPORTED_ALGORITHM: u16 = 0x0101;

/// Request could not be encoded for the token
pub const ERR_INVALID_REQUEST: u16 = 0x0102;

/// Clock source for signature creation times
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Current unix time in seconds
pub fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Compute the digest for a message signed at `signature_time`
pub fn signature_digest(
    algorithm: HashAlgorithm,
    message: &[u8],
    signature_time: u64,
) -> Option<InputHash> {
    let t = signature_time.to_be_bytes();

    let h = match algorithm {
        HashAlgorithm::Sha256 => Sha256::new()
            .chain_update(message)
            .chain_update(t)
            .finalize()
            .to_vec(),
        HashAlgorithm::Sha512 => Sha512::new()
            .chain_update(message)
            .chain_update(t)
            .finalize()
            .to_vec(),
        _ => return None,
    };

    Some(InputHash::new(h))
}

/// Sign parameters
#[derive(Clone, PartialEq, Debug)]
pub struct SignParams {
    pub master_key_id: u64,
    pub subkey_id: u64,
    pub algorithm: HashAlgorithm,
    pub messages: Vec<Vec<u8>>,
}

/// Signs messages with a token-resident subkey, optionally unlocked by a
/// key passphrase first.
///
/// Returns one signature per message, in message order.
pub struct TokenSigner {
    passphrases: HashMap<u64, Passphrase>,
    clock: Clock,
}

impl Default for TokenSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSigner {
    pub fn new() -> Self {
        Self {
            passphrases: HashMap::new(),
            clock: Arc::new(system_clock),
        }
    }

    /// Require a passphrase before the subkey may be used
    pub fn with_key_passphrase(mut self, subkey_id: u64, passphrase: Passphrase) -> Self {
        self.passphrases.insert(subkey_id, passphrase);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl Executor for TokenSigner {
    type Params = SignParams;
    type Output = Vec<Secret>;

    fn execute(&self, p: &SignParams, input: &CryptoInput) -> OperationResult<Vec<Secret>> {
        // Unlock key
        if let Some(expected) = self.passphrases.get(&p.subkey_id) {
            if input.passphrase() != Some(expected) {
                if input.passphrase().is_some() {
                    warn!("wrong passphrase for {:016x}", p.subkey_id);
                }
                return OperationResult::Pending(RequiredInput::passphrase(
                    p.master_key_id,
                    p.subkey_id,
                ));
            }
        }

        let signature_time = input.signature_time().unwrap_or_else(|| (self.clock)());

        let mut digests = Vec::with_capacity(p.messages.len());
        for m in &p.messages {
            match signature_digest(p.algorithm, m, signature_time) {
                Some(d) => digests.push(d),
                None => {
                    return OperationResult::Error(
                        OperationError::new(ERR_UNSUPPORTED_ALGORITHM)
                            .with_log(format!("unsupported hash algorithm: {}", p.algorithm)),
                    )
                }
            }
        }

        // Request missing signatures from the token
        let mut missing: Vec<_> = digests.iter().filter(|d| !input.contains(d)).cloned().collect();
        missing.dedup();
        if !missing.is_empty() {
            missing.truncate(MAX_HASHES);
            let algorithms = vec![p.algorithm; missing.len()];

            debug!("requesting {} token signatures", missing.len());

            return match RequiredInput::nfc_sign(
                p.master_key_id,
                p.subkey_id,
                &missing,
                &algorithms,
                signature_time,
            ) {
                Ok(r) => OperationResult::Pending(r),
                Err(e) => OperationResult::Error(
                    OperationError::new(ERR_INVALID_REQUEST).with_log(format!("{e:?}")),
                ),
            };
        }

        let mut sigs = Vec::with_capacity(digests.len());
        for d in &digests {
            match input.get(d) {
                Some(s) => sigs.push(s.clone()),
                None => return OperationResult::Error(OperationError::new(ERR_INVALID_REQUEST)),
            }
        }

        OperationResult::Success(sigs)
    }
}

/// Decrypt parameters, one ephemeral x25519 point per session key
#[derive(Clone, PartialEq, Debug)]
pub struct DecryptParams {
    pub master_key_id: u64,
    pub subkey_id: u64,
    pub session_keys: Vec<[u8; 32]>,
}

/// Recovers session keys via a token-resident decryption subkey
#[derive(Clone, Debug, Default)]
pub struct TokenDecryptor;

/// Derive a session key from the token agreement result
pub fn session_key(shared: &Secret) -> Secret {
    Secret::new(
        Sha256::new()
            .chain_update(b"keyop-session-key")
            .chain_update(shared.as_bytes())
            .finalize()
            .to_vec(),
    )
}

impl Executor for TokenDecryptor {
    type Params = DecryptParams;
    type Output = Vec<Secret>;

    fn execute(&self, p: &DecryptParams, input: &CryptoInput) -> OperationResult<Vec<Secret>> {
        let blobs: Vec<_> = p.session_keys.iter().map(|k| InputHash::from(*k)).collect();

        let missing = blobs.iter().filter(|b| !input.contains(b)).take(MAX_HASHES).cloned();
        let missing: Vec<_> = missing.collect();

        if !missing.is_empty() {
            return match RequiredInput::nfc_decrypt(p.master_key_id, p.subkey_id, missing) {
                Ok(r) => OperationResult::Pending(r),
                Err(e) => OperationResult::Error(
                    OperationError::new(ERR_INVALID_REQUEST).with_log(format!("{e:?}")),
                ),
            };
        }

        let keys = blobs
            .iter()
            .filter_map(|b| input.get(b))
            .map(session_key)
            .collect();

        OperationResult::Success(keys)
    }
}

/// Change admin PIN parameters
#[derive(Clone, PartialEq, Debug)]
pub struct ChangePinParams {
    pub master_key_id: u64,
    pub new_pin: Passphrase,
}

/// Changes the token admin PIN, requesting the current admin PIN
pub struct AdminPinChanger<P> {
    token: Arc<SoftToken<P>>,
}

impl<P: Prompt> AdminPinChanger<P> {
    pub fn new(token: Arc<SoftToken<P>>) -> Self {
        Self { token }
    }
}

impl<P: Prompt + 'static> Executor for AdminPinChanger<P> {
    type Params = ChangePinParams;
    type Output = ();

    fn execute(&self, p: &ChangePinParams, input: &CryptoInput) -> OperationResult<()> {
        let current = match input.passphrase() {
            Some(v) => v,
            None => {
                return OperationResult::Pending(RequiredInput::token_pin(
                    p.master_key_id,
                    PinOperation::ChangeAdmin,
                ))
            }
        };

        match self.token.change_admin_pin(current, p.new_pin.clone()) {
            Ok(_) => OperationResult::Success(()),
            Err(e) => OperationResult::Error(OperationError::new(e.code()).with_log(e.to_string())),
        }
    }
}
