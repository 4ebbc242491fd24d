// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Accumulated secret input for a single logical operation

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::Error;

/// Passphrase (or passphrase-equivalent PIN / pattern) bytes, cleared on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    pub fn new(v: impl Into<Vec<u8>>) -> Self {
        Self(v.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase(<{} bytes>)", self.0.len())
    }
}

/// Result bytes for a signed / decrypted hash (signature or session key)
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    pub fn new(v: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(v.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes>)", self.0.len())
    }
}

/// Hash handed to a security token for signing or decryption,
/// used as the key for the resulting [Secret]
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputHash(Vec<u8>);

impl InputHash {
    pub fn new(v: impl Into<Vec<u8>>) -> Self {
        Self(v.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for InputHash {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for InputHash {
    fn from(v: [u8; N]) -> Self {
        Self(v.to_vec())
    }
}

impl fmt::Debug for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputHash({:02x?})", self.0)
    }
}

/// Network proxy selection for flows that may need to fetch keys
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Proxy {
    /// Direct connection
    #[default]
    Direct,
    /// SOCKS proxy (eg. a local tor daemon)
    Socks { host: String, port: u16 },
    /// HTTP proxy
    Http { host: String, port: u16 },
}

/// Secret material produced by a single secret-collection flow
#[derive(Clone, PartialEq, Debug, Default)]
pub struct InputDelta {
    pub passphrase: Option<Passphrase>,
    pub crypto_data: Vec<(InputHash, Secret)>,
    pub signature_time: Option<u64>,
    pub proxy: Option<Proxy>,
}

impl InputDelta {
    /// Delta containing only a passphrase
    pub fn passphrase(p: Passphrase) -> Self {
        Self {
            passphrase: Some(p),
            ..Default::default()
        }
    }

    /// Delta containing per-hash results
    pub fn crypto_data(entries: impl IntoIterator<Item = (InputHash, Secret)>) -> Self {
        Self {
            crypto_data: entries.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passphrase.is_none()
            && self.crypto_data.is_empty()
            && self.signature_time.is_none()
            && self.proxy.is_none()
    }
}

/// Secret input accumulated across suspend / resume rounds of one operation.
///
/// Results for a hash are never overwritten once set, see [CryptoInput::insert].
#[derive(Clone, PartialEq, Debug)]
pub struct CryptoInput {
    passphrase: Option<Passphrase>,
    crypto_data: BTreeMap<InputHash, Secret>,
    signature_time: Option<u64>,
    proxy: Option<Proxy>,
    cache_passphrase: bool,
    revision: u64,
}

impl Default for CryptoInput {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoInput {
    /// Create an empty input
    pub const fn new() -> Self {
        Self {
            passphrase: None,
            crypto_data: BTreeMap::new(),
            signature_time: None,
            proxy: None,
            cache_passphrase: true,
            revision: 0,
        }
    }

    pub fn with_passphrase(mut self, p: Passphrase) -> Self {
        self.set_passphrase(p);
        self
    }

    pub fn with_signature_time(mut self, t: u64) -> Self {
        self.set_signature_time(t);
        self
    }

    pub fn with_proxy(mut self, p: Proxy) -> Self {
        self.set_proxy(p);
        self
    }

    pub fn with_cache_passphrase(mut self, cache: bool) -> Self {
        self.cache_passphrase = cache;
        self
    }

    pub fn with_crypto_data(mut self, hash: InputHash, value: Secret) -> Result<Self, Error> {
        self.insert(hash, value)?;
        Ok(self)
    }

    pub fn passphrase(&self) -> Option<&Passphrase> {
        self.passphrase.as_ref()
    }

    pub fn signature_time(&self) -> Option<u64> {
        self.signature_time
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    /// Whether collected passphrases may be written to the passphrase cache
    pub fn cache_passphrase(&self) -> bool {
        self.cache_passphrase
    }

    /// Fetch the result held for a hash
    pub fn get(&self, hash: &InputHash) -> Option<&Secret> {
        self.crypto_data.get(hash)
    }

    pub fn contains(&self, hash: &InputHash) -> bool {
        self.crypto_data.contains_key(hash)
    }

    /// Iterate over held (hash, result) pairs in hash order
    pub fn crypto_data(&self) -> impl Iterator<Item = (&InputHash, &Secret)> {
        self.crypto_data.iter()
    }

    pub fn num_results(&self) -> usize {
        self.crypto_data.len()
    }

    /// Counter bumped on every effective change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert a result for a hash.
    ///
    /// Returns `Ok(true)` if the entry was added, `Ok(false)` if an equal
    /// value was already held and [Error::ConflictingInput] if a different
    /// value is held.
    pub fn insert(&mut self, hash: InputHash, value: Secret) -> Result<bool, Error> {
        match self.crypto_data.get(&hash) {
            Some(v) if *v == value => return Ok(false),
            Some(_) => return Err(Error::ConflictingInput),
            None => (),
        }

        self.crypto_data.insert(hash, value);
        self.revision += 1;

        Ok(true)
    }

    pub fn set_passphrase(&mut self, p: Passphrase) -> bool {
        if self.passphrase.as_ref() == Some(&p) {
            return false;
        }

        self.passphrase = Some(p);
        self.revision += 1;
        true
    }

    pub fn set_signature_time(&mut self, t: u64) -> bool {
        if self.signature_time == Some(t) {
            return false;
        }

        self.signature_time = Some(t);
        self.revision += 1;
        true
    }

    pub fn set_proxy(&mut self, p: Proxy) -> bool {
        if self.proxy.as_ref() == Some(&p) {
            return false;
        }

        self.proxy = Some(p);
        self.revision += 1;
        true
    }

    /// Merge a flow delta, all-or-nothing.
    ///
    /// Every crypto data entry is checked before anything is applied so a
    /// conflicting entry leaves the input untouched. Returns whether the
    /// input changed.
    pub fn merge(&mut self, delta: InputDelta) -> Result<bool, Error> {
        for (i, (hash, value)) in delta.crypto_data.iter().enumerate() {
            if matches!(self.crypto_data.get(hash), Some(v) if v != value) {
                return Err(Error::ConflictingInput);
            }

            // Conflicts within the delta itself
            if delta.crypto_data[..i]
                .iter()
                .any(|(h, v)| h == hash && v != value)
            {
                return Err(Error::ConflictingInput);
            }
        }

        let mut changed = false;

        let InputDelta {
            passphrase,
            crypto_data,
            signature_time,
            proxy,
        } = delta;

        for (hash, value) in crypto_data {
            changed |= self.insert(hash, value)?;
        }
        if let Some(p) = passphrase {
            changed |= self.set_passphrase(p);
        }
        if let Some(t) = signature_time {
            changed |= self.set_signature_time(t);
        }
        if let Some(p) = proxy {
            changed |= self.set_proxy(p);
        }

        Ok(changed)
    }

    /// Clear all held secret material
    pub fn clear(&mut self) {
        self.passphrase = None;
        self.crypto_data.clear();
        self.signature_time = None;
        self.proxy = None;
        self.revision += 1;
    }
}
