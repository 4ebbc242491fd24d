// Copyright (c) 2022-2023 The MobileCoin Foundation

use super::{Outcome, RequiredInput, State};

/// [`Coordinator`][super::Coordinator] outputs (in response to events)
#[derive(Clone, PartialEq, Debug)]
pub enum Output<T> {
    None,

    /// Coordinator state
    State { state: State, rounds: usize },

    /// Invoke the executor with the operation parameters and current input
    Execute,

    /// Suspend and run the secret-collection flow for this input
    Collect(RequiredInput),

    /// Active flow failed with a device error, caller may retry
    /// (see [`Event::RetryFlow`][super::Event::RetryFlow]) or cancel
    DeviceFailed {
        required: RequiredInput,
        attempts: usize,
    },

    /// Operation reached a terminal state
    Done(Outcome<T>),
}

impl<T> Output<T> {
    /// Fetch state for outputs containing this
    pub fn state(&self) -> Option<State> {
        match &self {
            Output::State { state, .. } => Some(*state),
            _ => None,
        }
    }

    /// Fetch required input for outputs containing this
    pub fn required_input(&self) -> Option<&RequiredInput> {
        match &self {
            Output::Collect(r) | Output::DeviceFailed { required: r, .. } => Some(r),
            _ => None,
        }
    }

    /// Consume the output, returning a terminal outcome if available
    pub fn into_outcome(self) -> Option<Outcome<T>> {
        match self {
            Output::Done(o) => Some(o),
            _ => None,
        }
    }
}

impl<T> PartialEq<State> for Output<T> {
    fn eq(&self, other: &State) -> bool {
        match self {
            Output::State { state, .. } => state == other,
            _ => false,
        }
    }
}
