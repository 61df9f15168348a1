//! Test Utilities Module
//!
//! A scripted, in-memory [`QuoteRpc`] for deterministic driver tests.
//! Only compiled when running tests or when the `test_utils` feature is
//! enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    native_token::LAMPORTS_PER_SOL,
    signature::Signature,
    transaction::VersionedTransaction,
};

use crate::program::{anchor_discriminator, INITIALIZE, QUOTE_SOL_FOR_USD};
use crate::rpc::{QuoteRpc, SignatureState, SimulationOutcome, SubmitConfig};
use crate::tx_builder::QuoteError;

/// One recorded RPC call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    LatestBlockhash,
    /// `probe` is true for the unsigned compute-budget probe
    Simulate { probe: bool, usd_cents: Option<u64> },
    Send { usd_cents: Option<u64> },
    SignatureState { usd_cents: Option<u64> },
    BlockHeight,
}

/// How a submitted signature progresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// Reaches the commitment after this many pending polls
    ConfirmAfter(u32),
    /// Lands with an instruction error
    Fail,
    /// Never seen by the node
    Never,
}

/// Scripted RPC double
pub struct MockRpc {
    /// SOL/USD price the fake program quotes against
    pub sol_price_usd: f64,
    /// Compute units the probe simulation reports
    pub units_consumed: Option<u64>,
    /// Log lines returned when the transaction is not a quote
    pub plain_logs: Option<Vec<String>>,
    /// Amounts whose send call fails
    pub fail_send_for: HashSet<u64>,
    /// Amounts whose real simulation call fails
    pub fail_simulate_for: HashSet<u64>,
    /// Amounts whose simulation logs carry no result line
    pub silent_for: HashSet<u64>,
    pub landing: Landing,
    pub last_valid_block_height: u64,
    /// Block height returned by the first `block_height` call
    pub start_block_height: u64,
    /// Increment applied on each `block_height` call
    pub block_height_step: u64,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RpcCall>,
    block_height_calls: u64,
    sent: HashMap<Signature, Option<u64>>,
    polls: HashMap<Signature, u32>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRpc {
    /// Everything succeeds; SOL at $150
    pub fn new() -> Self {
        Self {
            sol_price_usd: 150.0,
            units_consumed: Some(9_500),
            plain_logs: Some(vec![
                "Program GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF invoke [1]".to_string(),
                "Program log: Instruction: Initialize".to_string(),
                "Program GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF success".to_string(),
            ]),
            fail_send_for: HashSet::new(),
            fail_simulate_for: HashSet::new(),
            silent_for: HashSet::new(),
            landing: Landing::ConfirmAfter(1),
            last_valid_block_height: 1_000,
            start_block_height: 900,
            block_height_step: 1,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn failing_send_for(mut self, usd_cents: u64) -> Self {
        self.fail_send_for.insert(usd_cents);
        self
    }

    pub fn failing_simulate_for(mut self, usd_cents: u64) -> Self {
        self.fail_simulate_for.insert(usd_cents);
        self
    }

    pub fn silent_for(mut self, usd_cents: u64) -> Self {
        self.silent_for.insert(usd_cents);
        self
    }

    pub fn with_landing(mut self, landing: Landing) -> Self {
        self.landing = landing;
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RpcCall> {
        self.state.lock().expect("mock state poisoned").calls.clone()
    }

    /// Amounts that reached `send`, in order
    pub fn sent_amounts(&self) -> Vec<Option<u64>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RpcCall::Send { usd_cents } => Some(usd_cents),
                _ => None,
            })
            .collect()
    }

    /// Amounts whose signed transaction was simulated, in order
    pub fn simulated_amounts(&self) -> Vec<Option<u64>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RpcCall::Simulate {
                    probe: false,
                    usd_cents,
                } => Some(usd_cents),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RpcCall) {
        self.state.lock().expect("mock state poisoned").calls.push(call);
    }

    /// The log line the on-chain program writes for `usd_cents`
    pub fn result_line(&self, usd_cents: u64) -> String {
        let sol = usd_cents as f64 / 100.0 / self.sol_price_usd;
        let lamports = (sol * LAMPORTS_PER_SOL as f64) as u64;
        format!(
            "Program log: For {} USD cents, you would receive {} SOL lamports (approx. {} SOL)",
            usd_cents,
            lamports,
            lamports as f64 / LAMPORTS_PER_SOL as f64
        )
    }
}

/// Amount carried by a `quote_sol_for_usd` instruction in `tx`, if any
pub fn quoted_cents(tx: &VersionedTransaction) -> Option<u64> {
    let disc = anchor_discriminator(QUOTE_SOL_FOR_USD);
    tx.message.instructions().iter().find_map(|ix| {
        if ix.data.len() == 16 && ix.data[..8] == disc {
            let mut amount = [0u8; 8];
            amount.copy_from_slice(&ix.data[8..16]);
            Some(u64::from_le_bytes(amount))
        } else {
            None
        }
    })
}

/// Whether `tx` carries an `initialize` instruction
pub fn carries_initialize(tx: &VersionedTransaction) -> bool {
    let disc = anchor_discriminator(INITIALIZE);
    tx.message
        .instructions()
        .iter()
        .any(|ix| ix.data.as_slice() == disc.as_slice())
}

fn is_unsigned(tx: &VersionedTransaction) -> bool {
    tx.signatures.iter().all(|s| *s == Signature::default())
}

#[async_trait]
impl QuoteRpc for MockRpc {
    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> Result<(Hash, u64), QuoteError> {
        self.record(RpcCall::LatestBlockhash);
        Ok((Hash::new_unique(), self.last_valid_block_height))
    }

    async fn simulate(
        &self,
        tx: &VersionedTransaction,
        _sig_verify: bool,
        _config: SubmitConfig,
    ) -> Result<SimulationOutcome, QuoteError> {
        let probe = is_unsigned(tx);
        let usd_cents = quoted_cents(tx);
        self.record(RpcCall::Simulate { probe, usd_cents });

        if probe {
            return Ok(SimulationOutcome {
                err: None,
                logs: None,
                units_consumed: self.units_consumed,
            });
        }

        match usd_cents {
            Some(c) if self.fail_simulate_for.contains(&c) => {
                Err(QuoteError::simulation_failed("node unavailable"))
            }
            Some(c) if self.silent_for.contains(&c) => Ok(SimulationOutcome {
                err: None,
                logs: self.plain_logs.clone(),
                units_consumed: self.units_consumed,
            }),
            Some(c) => Ok(SimulationOutcome {
                err: None,
                logs: Some(vec![
                    "Program GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF invoke [1]".to_string(),
                    "Program log: Instruction: QuoteSolForUsd".to_string(),
                    self.result_line(c),
                    "Program GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF success".to_string(),
                ]),
                units_consumed: self.units_consumed,
            }),
            None => Ok(SimulationOutcome {
                err: None,
                logs: self.plain_logs.clone(),
                units_consumed: self.units_consumed,
            }),
        }
    }

    async fn send(&self, tx: &VersionedTransaction, _config: SubmitConfig) -> Result<Signature, QuoteError> {
        let usd_cents = quoted_cents(tx);
        self.record(RpcCall::Send { usd_cents });

        if let Some(c) = usd_cents {
            if self.fail_send_for.contains(&c) {
                return Err(QuoteError::Rpc(format!("send rejected for {} cents", c)));
            }
        }

        let signature = tx.signatures[0];
        self.state
            .lock()
            .expect("mock state poisoned")
            .sent
            .insert(signature, usd_cents);
        Ok(signature)
    }

    async fn signature_state(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SignatureState, QuoteError> {
        let mut state = self.state.lock().expect("mock state poisoned");
        let usd_cents = state.sent.get(signature).copied().flatten();
        state.calls.push(RpcCall::SignatureState { usd_cents });

        let polls = state.polls.entry(*signature).or_insert(0);
        *polls += 1;

        Ok(match self.landing {
            Landing::ConfirmAfter(pending) if *polls > pending => SignatureState::Reached,
            Landing::ConfirmAfter(_) | Landing::Never => SignatureState::Pending,
            Landing::Fail => SignatureState::Failed("InstructionError(2, Custom(6001))".to_string()),
        })
    }

    async fn block_height(&self, _commitment: CommitmentConfig) -> Result<u64, QuoteError> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.push(RpcCall::BlockHeight);
        let height = self.start_block_height + state.block_height_calls * self.block_height_step;
        state.block_height_calls += 1;
        Ok(height)
    }
}
