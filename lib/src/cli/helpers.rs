// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::io::{BufRead, Write};

use async_trait::async_trait;

use zeroize::Zeroizing;

use keyop::{
    core::engine::{HashAlgorithm, Passphrase},
    flow::Prompt,
    metadata::SecretKind,
};

#[derive(Clone, PartialEq, Debug)]
pub struct HexData<const N: usize = 32>(pub [u8; N]);

impl<const N: usize> std::str::FromStr for HexData<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; N];

        hex::decode_to_slice(s, &mut b)?;

        Ok(HexData(b))
    }
}

impl<const N: usize> AsRef<[u8; N]> for HexData<N> {
    fn as_ref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for HexData<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Key identifier, hex encoded with optional `0x` prefix
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct KeyId(pub u64);

impl std::str::FromStr for KeyId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches("0x");
        u64::from_str_radix(s, 16).map(KeyId)
    }
}

/// Parse an OpenPGP hash algorithm by name
pub fn parse_algorithm(s: &str) -> Result<HashAlgorithm, String> {
    match s.to_lowercase().as_str() {
        "sha256" => Ok(HashAlgorithm::Sha256),
        "sha512" => Ok(HashAlgorithm::Sha512),
        _ => Err(format!("unsupported hash algorithm: {s} (sha256, sha512)")),
    }
}

/// Terminal [Prompt], reads secrets line by line from stdin
#[derive(Clone, Copy, Debug, Default)]
pub struct TermPrompt;

#[async_trait]
impl Prompt for TermPrompt {
    async fn ask(&self, kind: SecretKind, description: &str) -> Option<Passphrase> {
        let description = format!("{description} ({kind}): ");

        let r = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "{description}");
            let _ = stderr.flush();

            let mut line = Zeroizing::new(String::new());
            match std::io::stdin().lock().read_line(&mut line) {
                // EOF, input declined
                Ok(0) | Err(_) => None,
                Ok(_) => Some(Passphrase::new(line.trim_end_matches(['\r', '\n']))),
            }
        })
        .await;

        r.ok().flatten()
    }
}
