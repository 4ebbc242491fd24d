// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pending-input crypto operation core
//!
//! This provides a common [Coordinator][engine::Coordinator] supporting
//! crypto operations (sign, decrypt, token PIN changes) that suspend when
//! secret input is missing and resume once a secret-collection flow has
//! provided it.
//!
//! Interactions with the [Coordinator][engine::Coordinator] are performed via
//! [Event][engine::Event]s and [Output][engine::Output]s, the caller is
//! responsible for invoking executors and flows (see the `keyop` crate).
//!
//! ## Operations
//!
//! 1. Issue [`Event::Start`][engine::Event::Start] with the initial (secret-free)
//!    [`CryptoInput`][engine::CryptoInput], the coordinator responds with
//!    [`Output::Execute`][engine::Output::Execute]
//! 2. Invoke the executor with the operation parameters and
//!    [`Coordinator::input`][engine::Coordinator::input], then issue
//!    [`Event::Executed`][engine::Event::Executed] with the result
//! 3. On [`Output::Collect`][engine::Output::Collect] run the flow for the
//!    provided [`RequiredInput`][engine::RequiredInput] and issue
//!    [`Event::FlowCompleted`][engine::Event::FlowCompleted]
//!     1. On [`Output::DeviceFailed`][engine::Output::DeviceFailed] either issue
//!        [`Event::RetryFlow`][engine::Event::RetryFlow] or
//!        [`Event::Cancel`][engine::Event::Cancel]
//! 4. Repeat from 2. until [`Output::Done`][engine::Output::Done] is returned
//!    with the terminal [`Outcome`][engine::Outcome]
//!
//! Accumulated input is discarded on reaching a terminal state, a cancelled
//! operation must be restarted from scratch.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;

pub use engine::{
    Coordinator, CryptoInput, Error, Event, FlowKind, FlowOutcome, InputDelta, InputHash,
    OperationResult, Outcome, Output, RequiredInput, State, MAX_REPEATS,
};
