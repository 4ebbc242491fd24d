// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::{string::String, vec::Vec};

use strum::Display;

use super::RequiredInput;

/// Failure reported by an operation executor, surfaced to callers verbatim
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct OperationError {
    /// Executor-defined error code
    pub code: u16,
    /// Operation log lines leading up to the failure
    pub log: Vec<String>,
}

impl OperationError {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            log: Vec::new(),
        }
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.log.push(line.into());
        self
    }
}

impl core::fmt::Display for OperationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "code 0x{:04x}", self.code)?;
        if let Some(l) = self.log.last() {
            write!(f, " ({l})")?;
        }
        Ok(())
    }
}

/// Result of a single executor invocation
#[derive(Clone, PartialEq, Debug)]
pub enum OperationResult<T> {
    /// Operation complete
    Success(T),
    /// Operation failed
    Error(OperationError),
    /// Operation suspended awaiting secret input
    Pending(RequiredInput),
}

impl<T> OperationResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationResult::Pending(_))
    }

    /// Fetch the required input for pending results
    pub fn required_input(&self) -> Option<&RequiredInput> {
        match self {
            OperationResult::Pending(r) => Some(r),
            _ => None,
        }
    }
}

/// Internal protocol violations, these abort the operation as retrying
/// would loop indefinitely
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[repr(u8)]
pub enum Violation {
    /// Same input requested again with no change to accumulated input
    NoProgress = 0x01,
    /// Flow reported success without providing any data
    EmptyResponse = 0x02,
    /// Flow provided a result conflicting with one already held
    ConflictingInput = 0x03,
}

/// Terminal outcome of a logical operation, exactly one per start
#[derive(Clone, PartialEq, Debug)]
pub enum Outcome<T> {
    /// Operation succeeded
    Success(T),
    /// Executor reported a failure
    Error(OperationError),
    /// Secret input was declined, the operation must be restarted from scratch
    Cancelled,
    /// Internal protocol violation
    Aborted(Violation),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}
