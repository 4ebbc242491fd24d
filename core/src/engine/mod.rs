// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Coordinator] drives a crypto operation across secret-collection rounds.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! executor invocation and secret collection are performed by the caller
//! (see the `keyop` crate for an async host).

use core::marker::PhantomData;

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

mod error;
pub use error::Error;

mod event;
pub use event::{Event, FlowOutcome};

mod output;
pub use output::Output;

mod input;
pub use input::{CryptoInput, InputDelta, InputHash, Passphrase, Proxy, Secret};

mod required;
pub use required::{
    FlowKind, HashAlgorithm, HashList, PinOperation, RequiredInput, SignList, MAX_HASHES,
};

mod result;
pub use result::{OperationError, OperationResult, Outcome, Violation};

/// Maximum number of times an identical request may be re-issued after
/// its first collection round
pub const MAX_REPEATS: usize = 3;

/// Coordinator internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle state, no operation running
    Idle,
    /// Executor invocation outstanding
    Running,
    /// Suspended awaiting a secret-collection flow
    AwaitingFlow(FlowKind),
    /// Operation succeeded
    Complete,
    /// Operation failed (executor error)
    Failed,
    /// Operation cancelled during secret collection
    Cancelled,
    /// Operation aborted on protocol violation
    Aborted,
}

impl State {
    /// Check whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Complete | State::Failed | State::Cancelled | State::Aborted
        )
    }
}

/// [Coordinator] manages suspend / resume of a single logical operation,
/// owning the [CryptoInput] accumulated across rounds.
///
/// `T` is the success payload of the operation.
pub struct Coordinator<T> {
    state: State,

    input: CryptoInput,

    /// Input requested by the last pending result
    pending: Option<RequiredInput>,

    /// Whether the last completed flow resolved the pending input
    progressed: bool,

    /// Consecutive re-issues of the pending request
    repeats: usize,

    /// Completed flow rounds
    rounds: usize,

    /// Device failures for the active flow
    attempts: usize,

    _payload: PhantomData<T>,
}

impl<T> Default for Coordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coordinator<T> {
    /// Create a new idle coordinator
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            input: CryptoInput::new(),
            pending: None,
            progressed: false,
            repeats: 0,
            rounds: 0,
            attempts: 0,
            _payload: PhantomData,
        }
    }

    /// Handle incoming events
    pub fn update(&mut self, evt: Event<T>) -> Result<Output<T>, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {} (state: {})", evt.name(), self.state);

        match (self.state, evt) {
            // Empty event, do nothing
            (_, Event::None) => (),

            // Start a new operation from idle or a prior terminal state
            (s, Event::Start(input)) if s == State::Idle || s.is_terminal() => {
                self.input = input;
                self.pending = None;
                self.progressed = false;
                self.repeats = 0;
                self.rounds = 0;
                self.attempts = 0;

                self.state = State::Running;

                return Ok(Output::Execute);
            }

            // Terminal executor results
            (State::Running, Event::Executed(OperationResult::Success(v))) => {
                return Ok(self.finish(State::Complete, Outcome::Success(v)));
            }
            (State::Running, Event::Executed(OperationResult::Error(e))) => {
                #[cfg(feature = "log")]
                log::debug!("operation failed: {}", e);

                return Ok(self.finish(State::Failed, Outcome::Error(e)));
            }

            // Operation requires secret input
            (State::Running, Event::Executed(OperationResult::Pending(r))) => {
                return Ok(self.suspend(r));
            }

            // Flow provided input, merge and resume
            (State::AwaitingFlow(_), Event::FlowCompleted(FlowOutcome::Provided(delta))) => {
                return Ok(self.resume(delta));
            }

            // Flow declined, cancel whole operation
            (
                State::AwaitingFlow(_),
                Event::FlowCompleted(FlowOutcome::Cancelled) | Event::Cancel,
            ) => {
                return Ok(self.finish(State::Cancelled, Outcome::Cancelled));
            }

            // Device failure, remain suspended on the same input
            (State::AwaitingFlow(_), Event::FlowCompleted(FlowOutcome::DeviceFailure(_e))) => {
                let required = self.pending.clone().ok_or(Error::InvalidState)?;

                self.attempts += 1;

                #[cfg(feature = "log")]
                log::warn!(
                    "device failure for {:?} (attempt {}): {}",
                    required.kind(),
                    self.attempts,
                    _e
                );

                return Ok(Output::DeviceFailed {
                    required,
                    attempts: self.attempts,
                });
            }

            // Re-offer the active flow
            (State::AwaitingFlow(_), Event::RetryFlow) => {
                let required = self.pending.clone().ok_or(Error::InvalidState)?;

                return Ok(Output::Collect(required));
            }

            // Fetch state
            (_, Event::GetInfo) => (),

            // Discard operation
            (_, Event::Reset) => {
                self.input.clear();
                self.pending = None;
                self.repeats = 0;
                self.state = State::Idle;
            }

            // Handle unexpected events
            (_s, _e) => {
                #[cfg(feature = "log")]
                log::error!("Unexpected event in state {:?}: {}", _s, _e.name());

                return Err(Error::UnexpectedEvent);
            }
        }

        // Default to returning updated state
        Ok(Output::State {
            state: self.state,
            rounds: self.rounds,
        })
    }

    /// Fetch current coordinator state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch accumulated input, to be passed to the executor
    pub fn input(&self) -> &CryptoInput {
        &self.input
    }

    /// Fetch the input the active flow must satisfy
    pub fn pending(&self) -> Option<&RequiredInput> {
        match self.state {
            State::AwaitingFlow(_) => self.pending.as_ref(),
            _ => None,
        }
    }

    /// Fetch the number of completed flow rounds
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Fetch the number of device failures for the active flow
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Handle a pending executor result
    fn suspend(&mut self, r: RequiredInput) -> Output<T> {
        if self.pending.as_ref() == Some(&r) {
            self.repeats += 1;

            // The same request following a flow that resolved nothing cannot
            // make progress on the next round either, flows answering with
            // fresh but rejected data are bounded by MAX_REPEATS
            if !self.progressed || self.repeats > MAX_REPEATS {
                #[cfg(feature = "log")]
                log::error!(
                    "no progress resolving {:?} after {} repeats, aborting",
                    r,
                    self.repeats
                );

                return self.finish(State::Aborted, Outcome::Aborted(Violation::NoProgress));
            }
        } else {
            self.repeats = 0;
            self.attempts = 0;
        }

        #[cfg(feature = "log")]
        log::debug!("suspending for {} flow: {:?}", r.kind(), r);

        self.state = State::AwaitingFlow(r.kind());
        self.pending = Some(r.clone());
        self.progressed = false;

        Output::Collect(r)
    }

    /// Merge flow input and resume execution
    fn resume(&mut self, mut delta: InputDelta) -> Output<T> {
        if delta.is_empty() {
            #[cfg(feature = "log")]
            log::error!("flow returned no data");

            return self.finish(State::Aborted, Outcome::Aborted(Violation::EmptyResponse));
        }

        // Pin signature time so the executor reproduces the signed hashes
        if let Some(RequiredInput::NfcSign { signature_time, .. }) = &self.pending {
            delta.signature_time.get_or_insert(*signature_time);
        }

        let changed = match self.input.merge(delta) {
            Ok(v) => v,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("flow input rejected: {:?}", _e);

                return self.finish(
                    State::Aborted,
                    Outcome::Aborted(Violation::ConflictingInput),
                );
            }
        };

        // Token requests are only resolved once every hash has a result
        self.progressed = match &self.pending {
            Some(r @ (RequiredInput::NfcSign { .. } | RequiredInput::NfcDecrypt { .. })) => {
                r.hashes().all(|h| self.input.contains(h)) && changed
            }
            _ => changed,
        };

        self.rounds += 1;
        self.state = State::Running;

        Output::Execute
    }

    /// Move to a terminal state, discarding accumulated input
    fn finish(&mut self, state: State, outcome: Outcome<T>) -> Output<T> {
        self.input.clear();
        self.pending = None;
        self.repeats = 0;
        self.state = state;

        Output::Done(outcome)
    }
}
