// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Scripted executors

use std::sync::atomic::{AtomicUsize, Ordering};

use keyop::{
    core::engine::{CryptoInput, InputHash, OperationResult, Passphrase, RequiredInput, Secret},
    Executor,
};

/// Output function for [ScriptedExecutor]
pub type OutputFn<T> = Box<dyn Fn(&CryptoInput) -> T + Send + Sync>;

/// Snapshot of the results held by an input, in hash order
pub fn held_results(input: &CryptoInput) -> Vec<(InputHash, Secret)> {
    input
        .crypto_data()
        .map(|(h, s)| (h.clone(), s.clone()))
        .collect()
}

/// Executor requiring a fixed sequence of inputs before succeeding.
///
/// Passphrase and PIN steps are satisfied by the expected passphrase,
/// token steps once every requested hash has a result.
pub struct ScriptedExecutor<T> {
    steps: Vec<RequiredInput>,
    passphrase: Option<Passphrase>,
    output: OutputFn<T>,
    calls: AtomicUsize,
}

impl<T: Send + 'static> ScriptedExecutor<T> {
    /// Create an executor computing its output from the final input
    pub fn new(
        steps: Vec<RequiredInput>,
        output: impl Fn(&CryptoInput) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            steps,
            passphrase: None,
            output: Box::new(output),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the passphrase expected by passphrase / PIN steps
    pub fn with_passphrase(mut self, p: impl Into<Passphrase>) -> Self {
        self.passphrase = Some(p.into());
        self
    }

    /// Number of executor invocations
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn satisfied(&self, r: &RequiredInput, input: &CryptoInput) -> bool {
        match r {
            RequiredInput::NfcSign { .. } | RequiredInput::NfcDecrypt { .. } => {
                r.hashes().all(|h| input.contains(h))
            }
            _ => match (&self.passphrase, input.passphrase()) {
                (Some(expected), Some(p)) => expected == p,
                (None, Some(_)) => true,
                (_, None) => false,
            },
        }
    }
}

impl<T: Send + 'static> Executor for ScriptedExecutor<T> {
    type Params = ();
    type Output = T;

    fn execute(&self, _params: &(), input: &CryptoInput) -> OperationResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.steps.iter().find(|r| !self.satisfied(r, input)) {
            Some(r) => OperationResult::Pending(r.clone()),
            None => OperationResult::Success((self.output)(input)),
        }
    }
}

/// Executor that never completes, always requesting the same input
pub struct ForeverPending {
    required: RequiredInput,
    calls: AtomicUsize,
}

impl ForeverPending {
    pub fn new(required: RequiredInput) -> Self {
        Self {
            required,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Executor for ForeverPending {
    type Params = ();
    type Output = ();

    fn execute(&self, _params: &(), _input: &CryptoInput) -> OperationResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        OperationResult::Pending(self.required.clone())
    }
}
