// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Scenarios for keyop executors and secret-collection flows.
//!
//! Shared between the `keyop` integration tests and the `keyop-tests`
//! runner, scripted [executor]s and [flows] stand in for real
//! operations and user interaction.
//!

pub mod executor;


pub mod sign;

pub mod cancel;



pub mod token;

pub mod pin;

pub mod cache;
