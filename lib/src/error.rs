// Copyright (c) 2022-2023 The MobileCoin Foundation

use tokio::{task::JoinError, time::error::Elapsed};

use keyop_core::engine::{OperationError, Violation};

/// Keyop API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Executor reported a failure
    #[error("Operation failed: {0}")]
    Operation(OperationError),

    /// Secret input declined by the user or system
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal protocol violation
    #[error("Protocol violation: {0}")]
    ProtocolViolation(Violation),

    /// Device failure persisted past the configured retries
    #[error("Device failure: {0}")]
    DeviceFailure(String),

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Executor worker task failed
    #[error("Executor task failed: {0}")]
    Executor(#[from] JoinError),

    /// Coordinator rejected an event
    #[error("Engine error: {0}")]
    Engine(#[from] keyop_core::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// IO Error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::UserTimeout
    }
}
