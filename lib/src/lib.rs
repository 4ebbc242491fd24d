// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keyop API Library (and CLI)
//!
//! Async host for crypto operations that suspend on missing secret input.
//! An [OperationHandle] runs an [Executor] against accumulated
//! [CryptoInput][core::engine::CryptoInput], dispatching secret-collection
//! [flow]s whenever the executor reports a pending
//! [RequiredInput][core::engine::RequiredInput], until the operation
//! reaches exactly one terminal [Outcome][core::engine::Outcome].

/// Re-export `keyop-core` for consumers
pub use keyop_core::{self as core};

mod handle;
pub use handle::{OperationHandle, DEFAULT_DEVICE_RETRIES, DEFAULT_USER_TIMEOUT_S};

mod error;
pub use error::Error;

mod executor;
pub use executor::Executor;

mod config;
pub use config::{Config, DEFAULT_PASSPHRASE_TTL_S};

pub mod cache;

pub mod flow;

pub mod metadata;

pub mod ops;

pub mod token;
