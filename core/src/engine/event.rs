// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::string::String;

use strum::IntoStaticStr;

use super::{CryptoInput, InputDelta, OperationResult};

/// Completion report from a secret-collection flow
#[derive(Clone, PartialEq, Debug)]
pub enum FlowOutcome {
    /// Flow collected secret input
    Provided(InputDelta),
    /// User or system declined to provide input
    Cancelled,
    /// Transient hardware failure (communication error, card removed),
    /// the same flow may be re-offered
    DeviceFailure(String),
}

/// [`Coordinator`][super::Coordinator] input events
#[derive(Clone, Debug, IntoStaticStr)]
pub enum Event<T> {
    None,

    /// Start a logical operation with the provided (secret-free) input
    Start(CryptoInput),

    /// Result of an executor invocation
    Executed(OperationResult<T>),

    /// Result of the active secret-collection flow
    FlowCompleted(FlowOutcome),

    /// Re-offer the active flow for the same required input
    RetryFlow,

    /// Cancel the operation while a flow is active
    Cancel,

    /// Fetch coordinator state
    GetInfo,

    /// Discard any operation in progress
    Reset,
}

impl<T> Event<T> {
    /// Event name for logging (contents may hold secrets)
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl<T> From<OperationResult<T>> for Event<T> {
    fn from(r: OperationResult<T>) -> Self {
        Event::Executed(r)
    }
}

impl<T> From<FlowOutcome> for Event<T> {
    fn from(o: FlowOutcome) -> Self {
        Event::FlowCompleted(o)
    }
}
