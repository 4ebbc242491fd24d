// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Descriptors for secret input an operation cannot proceed without

use heapless::Vec;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter, EnumString};

use super::{Error, InputHash};

/// Maximum number of hashes per security token request
pub const MAX_HASHES: usize = 16;

/// OpenPGP hash algorithm identifiers (RFC 4880 section 9.4)
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum HashAlgorithm {
    Md5 = 1,
    Sha1 = 2,
    Ripemd160 = 3,
    Sha256 = 8,
    Sha384 = 9,
    Sha512 = 10,
    Sha224 = 11,
}

impl HashAlgorithm {
    /// Parse from an OpenPGP algorithm id
    pub fn from_id(id: u8) -> Result<Self, Error> {
        Self::try_from(id).map_err(|_| Error::UnknownAlgorithm)
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 | HashAlgorithm::Ripemd160 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// Security token PIN operations
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PinOperation {
    /// Unlock the token with the user PIN
    #[default]
    Unlock,
    /// Change the admin PIN
    ChangeAdmin,
}

/// Secret-collection flow responsible for a [RequiredInput]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FlowKind {
    /// Passphrase entry (key or symmetric)
    #[default]
    Passphrase,
    /// Security token (NFC / USB) sign or decrypt
    SecurityToken,
    /// Security token PIN entry
    TokenPin,
}

/// Hashes for a decrypt request
pub type HashList = Vec<InputHash, MAX_HASHES>;

/// Index aligned (hash, algorithm) pairs for a sign request
pub type SignList = Vec<(InputHash, HashAlgorithm), MAX_HASHES>;

/// Exactly one piece of missing secret input
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RequiredInput {
    /// Passphrase for a secret subkey
    Passphrase { master_key_id: u64, subkey_id: u64 },

    /// Passphrase for symmetric decryption
    SymmetricPassphrase,

    /// Security token decryption of the provided hashes (session key blobs)
    NfcDecrypt {
        master_key_id: u64,
        subkey_id: u64,
        hashes: HashList,
    },

    /// Security token signature over the provided hashes.
    ///
    /// `signature_time` is the creation time the hashes were computed with,
    /// it must be retained for the hashes to be reproduced on resume.
    NfcSign {
        master_key_id: u64,
        subkey_id: u64,
        entries: SignList,
        signature_time: u64,
    },

    /// Security token PIN
    TokenPin {
        master_key_id: u64,
        operation: PinOperation,
    },
}

impl RequiredInput {
    /// Build a passphrase request
    pub fn passphrase(master_key_id: u64, subkey_id: u64) -> Self {
        Self::Passphrase {
            master_key_id,
            subkey_id,
        }
    }

    /// Build a token decrypt request, rejecting empty or oversized hash lists
    pub fn nfc_decrypt(
        master_key_id: u64,
        subkey_id: u64,
        hashes: impl IntoIterator<Item = InputHash>,
    ) -> Result<Self, Error> {
        let mut l = HashList::new();
        for h in hashes {
            l.push(h).map_err(|_| Error::InvalidLength)?;
        }

        if l.is_empty() {
            return Err(Error::InvalidLength);
        }

        Ok(Self::NfcDecrypt {
            master_key_id,
            subkey_id,
            hashes: l,
        })
    }

    /// Build a token sign request from index aligned hash and algorithm lists
    pub fn nfc_sign(
        master_key_id: u64,
        subkey_id: u64,
        hashes: &[InputHash],
        algorithms: &[HashAlgorithm],
        signature_time: u64,
    ) -> Result<Self, Error> {
        if hashes.len() != algorithms.len() {
            return Err(Error::LengthMismatch);
        }
        if hashes.is_empty() || hashes.len() > MAX_HASHES {
            return Err(Error::InvalidLength);
        }

        let mut entries = SignList::new();
        for (h, a) in hashes.iter().zip(algorithms) {
            entries
                .push((h.clone(), *a))
                .map_err(|_| Error::InvalidLength)?;
        }

        Ok(Self::NfcSign {
            master_key_id,
            subkey_id,
            entries,
            signature_time,
        })
    }

    /// Build a token PIN request
    pub fn token_pin(master_key_id: u64, operation: PinOperation) -> Self {
        Self::TokenPin {
            master_key_id,
            operation,
        }
    }

    /// Fetch the flow kind that satisfies this input
    pub fn kind(&self) -> FlowKind {
        match self {
            RequiredInput::Passphrase { .. } | RequiredInput::SymmetricPassphrase => {
                FlowKind::Passphrase
            }
            RequiredInput::NfcDecrypt { .. } | RequiredInput::NfcSign { .. } => {
                FlowKind::SecurityToken
            }
            RequiredInput::TokenPin { .. } => FlowKind::TokenPin,
        }
    }

    /// Master key this input belongs to, if any
    pub fn master_key_id(&self) -> Option<u64> {
        match self {
            RequiredInput::Passphrase { master_key_id, .. }
            | RequiredInput::NfcDecrypt { master_key_id, .. }
            | RequiredInput::NfcSign { master_key_id, .. }
            | RequiredInput::TokenPin { master_key_id, .. } => Some(*master_key_id),
            RequiredInput::SymmetricPassphrase => None,
        }
    }

    /// Subkey this input belongs to, if any
    pub fn subkey_id(&self) -> Option<u64> {
        match self {
            RequiredInput::Passphrase { subkey_id, .. }
            | RequiredInput::NfcDecrypt { subkey_id, .. }
            | RequiredInput::NfcSign { subkey_id, .. } => Some(*subkey_id),
            _ => None,
        }
    }

    /// Iterate over the hashes to be signed or decrypted, in request order
    pub fn hashes(&self) -> impl Iterator<Item = &InputHash> {
        let (d, s): (&[InputHash], &[(InputHash, HashAlgorithm)]) = match self {
            RequiredInput::NfcDecrypt { hashes, .. } => (hashes.as_slice(), &[][..]),
            RequiredInput::NfcSign { entries, .. } => (&[][..], entries.as_slice()),
            _ => (&[][..], &[][..]),
        };

        d.iter().chain(s.iter().map(|(h, _)| h))
    }

    /// Iterate over sign algorithms, aligned with [RequiredInput::hashes]
    pub fn algorithms(&self) -> impl Iterator<Item = HashAlgorithm> + '_ {
        let s: &[(InputHash, HashAlgorithm)] = match self {
            RequiredInput::NfcSign { entries, .. } => entries.as_slice(),
            _ => &[][..],
        };

        s.iter().map(|(_, a)| *a)
    }
}
