//! RPC seam used by the transaction builder and the quote driver
//!
//! Only the handful of calls the drivers make are exposed, in owned,
//! version-independent types. [`RpcClient`] implements the trait for real
//! clusters; tests provide scripted implementations.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;

use crate::tx_builder::errors::QuoteError;

/// Settings shared by simulation and submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitConfig {
    /// Commitment used for simulation and the preflight check
    pub commitment: CommitmentLevel,
    /// Skip the node-side preflight simulation on send
    pub skip_preflight: bool,
    /// Retries the node may make on its own; `Some(0)` disables them
    pub max_retries: Option<usize>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentLevel::Processed,
            skip_preflight: true,
            max_retries: Some(0),
        }
    }
}

/// Result of one simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Transaction error reported by the simulated execution
    pub err: Option<String>,
    /// Program log lines
    pub logs: Option<Vec<String>>,
    /// Compute units consumed
    pub units_consumed: Option<u64>,
}

/// Status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not seen yet, or seen below the requested commitment
    Pending,
    /// Reached the requested commitment without error
    Reached,
    /// Landed with an error
    Failed(String),
}

/// The RPC calls a quote run depends on.
#[async_trait]
pub trait QuoteRpc: Send + Sync {
    /// Latest blockhash and its last valid block height
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<(Hash, u64), QuoteError>;

    /// Dry-run a transaction
    async fn simulate(
        &self,
        tx: &VersionedTransaction,
        sig_verify: bool,
        config: SubmitConfig,
    ) -> Result<SimulationOutcome, QuoteError>;

    /// Submit a signed transaction
    async fn send(&self, tx: &VersionedTransaction, config: SubmitConfig) -> Result<Signature, QuoteError>;

    /// Status of `signature` against `commitment`
    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, QuoteError>;

    /// Current block height at `commitment`
    async fn block_height(&self, commitment: CommitmentConfig) -> Result<u64, QuoteError>;
}

#[async_trait]
impl QuoteRpc for RpcClient {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<(Hash, u64), QuoteError> {
        Ok(self.get_latest_blockhash_with_commitment(commitment).await?)
    }

    async fn simulate(
        &self,
        tx: &VersionedTransaction,
        sig_verify: bool,
        config: SubmitConfig,
    ) -> Result<SimulationOutcome, QuoteError> {
        let sim_config = RpcSimulateTransactionConfig {
            sig_verify,
            commitment: Some(CommitmentConfig {
                commitment: config.commitment,
            }),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSimulateTransactionConfig::default()
        };

        let response = self
            .simulate_transaction_with_config(tx, sim_config)
            .await
            .map_err(|e| QuoteError::simulation_failed(e.to_string()))?;

        Ok(SimulationOutcome {
            err: response.value.err.map(|e| format!("{:?}", e)),
            logs: response.value.logs,
            units_consumed: response.value.units_consumed,
        })
    }

    async fn send(&self, tx: &VersionedTransaction, config: SubmitConfig) -> Result<Signature, QuoteError> {
        let send_config = RpcSendTransactionConfig {
            skip_preflight: config.skip_preflight,
            preflight_commitment: Some(config.commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: config.max_retries,
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.send_transaction_with_config(tx, send_config).await?)
    }

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, QuoteError> {
        let response = self.get_signature_statuses(&[*signature]).await?;

        let state = match response.value.into_iter().next().flatten() {
            None => SignatureState::Pending,
            Some(status) => match status.err {
                Some(err) => SignatureState::Failed(format!("{:?}", err)),
                None if status.satisfies_commitment(commitment) => SignatureState::Reached,
                None => SignatureState::Pending,
            },
        };
        Ok(state)
    }

    async fn block_height(&self, commitment: CommitmentConfig) -> Result<u64, QuoteError> {
        Ok(self.get_block_height_with_commitment(commitment).await?)
    }
}

/// Build the nonblocking client for `url`.
pub fn connect(url: &str, commitment: CommitmentConfig, timeout: Duration) -> RpcClient {
    RpcClient::new_with_timeout_and_commitment(url.to_string(), timeout, commitment)
}
