#![allow(unused)]

use log::debug;

use keyop_core::engine::{
    Coordinator, CryptoInput, Event, FlowOutcome, HashAlgorithm, InputDelta, InputHash,
    OperationResult, Outcome, Output, RequiredInput, Secret,
};

/// Test executor signing a fixed list of hashes, one token round per hash
pub struct SignEach {
    pub hashes: Vec<InputHash>,
    pub calls: usize,
}

impl SignEach {
    pub fn new(n: u8) -> Self {
        Self {
            hashes: (0..n).map(|i| InputHash::from([i; 32])).collect(),
            calls: 0,
        }
    }

    pub fn execute(&mut self, input: &CryptoInput) -> OperationResult<Vec<Secret>> {
        self.calls += 1;

        // Request the first hash without a result
        if let Some(h) = self.hashes.iter().find(|h| !input.contains(h)) {
            let r = RequiredInput::nfc_sign(
                0xaa,
                0xbb,
                &[h.clone()],
                &[HashAlgorithm::Sha256],
                1_700_000_000,
            )
            .unwrap();
            return OperationResult::Pending(r);
        }

        OperationResult::Success(
            self.hashes
                .iter()
                .map(|h| input.get(h).unwrap().clone())
                .collect(),
        )
    }
}

/// Deterministic token answer for a hash
pub fn token_sig(h: &InputHash) -> Secret {
    let mut v = h.as_bytes().to_vec();
    v.reverse();
    Secret::new(v)
}

/// Token flow answering every hash in the request
pub fn token_flow(r: &RequiredInput) -> FlowOutcome {
    FlowOutcome::Provided(InputDelta::crypto_data(
        r.hashes().map(|h| (h.clone(), token_sig(h))),
    ))
}

/// Drive a coordinator to completion, returning the outcome and the
/// sequence of requested inputs
pub fn drive<T>(
    c: &mut Coordinator<T>,
    input: CryptoInput,
    mut exec: impl FnMut(&CryptoInput) -> OperationResult<T>,
    mut flow: impl FnMut(&RequiredInput) -> FlowOutcome,
) -> (Outcome<T>, Vec<RequiredInput>) {
    let mut requests = vec![];

    let mut out = c.update(Event::Start(input)).unwrap();

    loop {
        out = match out {
            Output::Execute => {
                let r = exec(c.input());
                c.update(Event::Executed(r)).unwrap()
            }
            Output::Collect(r) => {
                debug!("collect: {:?}", r);
                requests.push(r.clone());
                c.update(Event::FlowCompleted(flow(&r))).unwrap()
            }
            Output::DeviceFailed { .. } => c.update(Event::RetryFlow).unwrap(),
            Output::Done(o) => return (o, requests),
            o => panic!("unexpected output: {:?}", o.state()),
        }
    }
}
