// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software security token
//!
//! Emulates an OpenPGP security token for flows and tests: ed25519
//! signatures over requested hashes, x25519 agreement for decryption of
//! session key blobs and a retry-limited user PIN.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use log::{debug, error, warn};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, MutexGuard};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use keyop_core::engine::{FlowOutcome, InputDelta, InputHash, Passphrase, RequiredInput, Secret};

use crate::{
    flow::{FlowContext, Prompt, SecurityTokenFlow, MAX_PROMPTS},
    metadata::SecretKind,
};

/// PIN attempts before the token is blocked
pub const PIN_RETRIES: u8 = 3;

/// Token errors, reported as ISO 7816 status words
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[repr(u16)]
pub enum TokenError {
    /// Wrong PIN
    #[error("security status not satisfied")]
    WrongPin = 0x6982,
    /// PIN retries exhausted
    #[error("authentication method blocked")]
    Blocked = 0x6983,
    /// Malformed request data
    #[error("wrong data")]
    WrongData = 0x6a80,
}

impl TokenError {
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

struct TokenState {
    signing: SigningKey,
    decryption: StaticSecret,
    pin: Passphrase,
    admin_pin: Passphrase,
    retries: u8,
}

impl TokenState {
    fn verify(&mut self, pin: &Passphrase, admin: bool) -> Result<(), TokenError> {
        if self.retries == 0 {
            return Err(TokenError::Blocked);
        }

        let expected = match admin {
            true => &self.admin_pin,
            false => &self.pin,
        };

        if pin != expected {
            self.retries -= 1;
            return Err(TokenError::WrongPin);
        }

        self.retries = PIN_RETRIES;
        Ok(())
    }
}

/// Software [SecurityTokenFlow], prompting for the token PIN per operation
pub struct SoftToken<P> {
    prompt: P,
    state: Mutex<TokenState>,
    failures: AtomicUsize,
}

impl<P: Prompt> SoftToken<P> {
    /// Create a token from a 32 byte seed
    pub fn new(prompt: P, seed: &[u8; 32], pin: Passphrase, admin_pin: Passphrase) -> Self {
        let d: [u8; 32] = Sha256::new()
            .chain_update(b"keyop-token-decrypt")
            .chain_update(seed)
            .finalize()
            .into();
        let d = Zeroizing::new(d);

        Self {
            prompt,
            state: Mutex::new(TokenState {
                signing: SigningKey::from_bytes(seed),
                decryption: StaticSecret::from(*d),
                pin,
                admin_pin,
                retries: PIN_RETRIES,
            }),
            failures: AtomicUsize::new(0),
        }
    }

    /// Create a token with a random seed
    pub fn generate(prompt: P, pin: Passphrase, admin_pin: Passphrase) -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut seed[..]);

        Self::new(prompt, &seed, pin, admin_pin)
    }

    /// Fetch the signature verification key
    pub async fn verifying_key(&self) -> VerifyingKey {
        self.state.lock().await.signing.verifying_key()
    }

    /// Fetch the decryption (agreement) public key
    pub async fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.state.lock().await.decryption)
    }

    /// Remaining PIN attempts
    pub async fn retries(&self) -> u8 {
        self.state.lock().await.retries
    }

    /// Fail the next `n` flows with a device failure (card removed)
    pub fn inject_failures(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Change the admin PIN, for use from executors (blocking threads)
    pub fn change_admin_pin(&self, current: &Passphrase, new: Passphrase) -> Result<(), TokenError> {
        let mut s = self.state.blocking_lock();

        s.verify(current, true)?;
        s.admin_pin = new;

        Ok(())
    }

    /// Prompt for the user PIN until the token accepts it.
    ///
    /// Wrong PINs are re-prompted while the token has retries left, up to
    /// [MAX_PROMPTS] times.
    async fn unlock(&self) -> Result<MutexGuard<'_, TokenState>, FlowOutcome> {
        let mut description = "Enter security token PIN".to_string();

        for _ in 0..MAX_PROMPTS {
            if self.state.lock().await.retries == 0 {
                error!("token blocked");
                return Err(FlowOutcome::Cancelled);
            }

            let pin = match self.prompt.ask(SecretKind::Pin, &description).await {
                Some(p) => p,
                None => return Err(FlowOutcome::Cancelled),
            };

            let mut s = self.state.lock().await;

            match s.verify(&pin, false) {
                Ok(_) => return Ok(s),
                Err(TokenError::Blocked) => {
                    error!("token blocked");
                    return Err(FlowOutcome::Cancelled);
                }
                Err(_) => {
                    warn!("token PIN rejected ({} attempts remaining)", s.retries);
                    description = format!(
                        "Wrong PIN, {} attempts remaining. Enter security token PIN",
                        s.retries
                    );
                }
            }
        }

        warn!("no valid token PIN after {} prompts", MAX_PROMPTS);
        Err(FlowOutcome::Cancelled)
    }

    /// Sign each (hash, algorithm) entry of a sign request
    fn sign(
        s: &TokenState,
        required: &RequiredInput,
    ) -> Result<Vec<(InputHash, Secret)>, TokenError> {
        let mut v = vec![];

        for (h, a) in required.hashes().zip(required.algorithms()) {
            if h.as_bytes().len() != a.digest_len() {
                return Err(TokenError::WrongData);
            }

            let sig = s.signing.sign(h.as_bytes());
            v.push((h.clone(), Secret::new(sig.to_bytes())));
        }

        Ok(v)
    }

    /// Decrypt each session key blob (ephemeral x25519 point) of a decrypt request
    fn decrypt(
        s: &TokenState,
        required: &RequiredInput,
    ) -> Result<Vec<(InputHash, Secret)>, TokenError> {
        let mut v = vec![];

        for h in required.hashes() {
            let e: [u8; 32] = h.as_bytes().try_into().map_err(|_| TokenError::WrongData)?;

            let shared = s.decryption.diffie_hellman(&PublicKey::from(e));
            v.push((h.clone(), Secret::new(shared.as_bytes().to_vec())));
        }

        Ok(v)
    }
}

#[async_trait]
impl<P: Prompt> SecurityTokenFlow for SoftToken<P> {
    async fn collect_token(&self, required: &RequiredInput, _ctx: &FlowContext) -> FlowOutcome {
        // Injected transient failures
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            warn!("token connection lost");
            return FlowOutcome::DeviceFailure("token connection lost".to_string());
        }

        let s = match self.unlock().await {
            Ok(s) => s,
            Err(o) => return o,
        };

        let r = match required {
            RequiredInput::NfcSign { .. } => Self::sign(&s, required),
            RequiredInput::NfcDecrypt { .. } => Self::decrypt(&s, required),
            _ => {
                error!("token flow cannot handle {:?}", required);
                return FlowOutcome::Cancelled;
            }
        };

        match r {
            Ok(v) => {
                debug!("token produced {} results", v.len());
                FlowOutcome::Provided(InputDelta::crypto_data(v))
            }
            Err(e) => FlowOutcome::DeviceFailure(e.to_string()),
        }
    }
}
