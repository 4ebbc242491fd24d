// Copyright (c) 2022-2023 The MobileCoin Foundation

/// [Coordinator][super::Coordinator] errors
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("Invalid argument length"))]
    InvalidLength = 0x00,

    /// Unexpected event
    #[cfg_attr(feature = "thiserror", error("Unexpected event"))]
    UnexpectedEvent = 0x01,

    /// Hash and algorithm lists differ in length
    #[cfg_attr(feature = "thiserror", error("hash / algorithm length mismatch"))]
    LengthMismatch = 0x02,

    /// A different result is already held for this hash
    #[cfg_attr(feature = "thiserror", error("conflicting result for input hash"))]
    ConflictingInput = 0x03,

    /// Unknown hash algorithm identifier
    #[cfg_attr(feature = "thiserror", error("unknown hash algorithm"))]
    UnknownAlgorithm = 0x04,

    /// Invalid coordinator state
    #[cfg_attr(feature = "thiserror", error("invalid coordinator state"))]
    InvalidState = 0x05,

    /// Unknown / not-yet defined error (placeholder)
    #[cfg_attr(feature = "thiserror", error("unknown"))]
    Unknown = 0xf0,
}
