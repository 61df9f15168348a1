//! Versioned transaction assembly
//!
//! [`TxBuilder`] turns program instructions into a signed v0 transaction:
//! fetch a blockhash, probe-simulate with the maximum compute limit, scale
//! the consumed units by the configured multiplier, then compile and sign
//! the final message.

use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Signature, Signer},
    signer::signers::Signers,
    transaction::VersionedTransaction,
};
use tracing::{debug, warn};

use crate::rpc::{QuoteRpc, SubmitConfig};
use crate::tx_builder::errors::QuoteError;
use crate::tx_builder::instructions::{
    plan_quote_instructions, scaled_compute_unit_limit, validate_multiplier,
    MAX_COMPUTE_UNIT_LIMIT,
};

/// Fee policy applied to every transaction a builder produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    /// Priority fee in micro-lamports per compute unit
    pub compute_unit_price: u64,
    /// Factor applied to simulated compute usage
    pub compute_unit_limit_multiple: f64,
}

impl FeePolicy {
    /// No priority fee, limit equal to simulated usage.
    pub fn plain() -> Self {
        Self {
            compute_unit_price: 0,
            compute_unit_limit_multiple: 1.0,
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            compute_unit_price: 200_000,
            compute_unit_limit_multiple: 1.3,
        }
    }
}

/// A built transaction with the blockhash it was compiled against
#[derive(Debug, Clone)]
pub struct BuiltTx {
    pub tx: VersionedTransaction,
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
    pub cu_limit: u32,
}

/// Builds signed v0 transactions against one RPC connection
pub struct TxBuilder<'a, R: QuoteRpc + ?Sized> {
    rpc: &'a R,
    policy: FeePolicy,
    commitment: CommitmentConfig,
    submit: SubmitConfig,
}

impl<'a, R: QuoteRpc + ?Sized> TxBuilder<'a, R> {
    pub fn new(
        rpc: &'a R,
        policy: FeePolicy,
        commitment: CommitmentConfig,
        submit: SubmitConfig,
    ) -> Result<Self, QuoteError> {
        validate_multiplier(policy.compute_unit_limit_multiple)?;
        Ok(Self {
            rpc,
            policy,
            commitment,
            submit,
        })
    }

    /// Build and sign a v0 transaction carrying `ixs`.
    ///
    /// `payer` must be one of `signers`.
    pub async fn build<S: Signers + ?Sized>(
        &self,
        ixs: &[Instruction],
        payer: &Pubkey,
        signers: &S,
    ) -> Result<BuiltTx, QuoteError> {
        let (blockhash, last_valid_block_height) = self.rpc.latest_blockhash(self.commitment).await?;

        let probe_plan =
            plan_quote_instructions(self.policy.compute_unit_price, MAX_COMPUTE_UNIT_LIMIT, ixs)?;
        let probe_message = compile(payer, &probe_plan.instructions, blockhash)?;
        let probe = unsigned(probe_message);

        let outcome = self.rpc.simulate(&probe, false, self.submit).await?;
        if outcome.units_consumed.is_none() {
            warn!(
                limit = MAX_COMPUTE_UNIT_LIMIT,
                "Probe simulation reported no compute usage, using maximum limit"
            );
        }
        let cu_limit = scaled_compute_unit_limit(
            outcome.units_consumed,
            self.policy.compute_unit_limit_multiple,
        );
        debug!(
            units_consumed = ?outcome.units_consumed,
            cu_limit,
            cu_price = self.policy.compute_unit_price,
            "Compute budget resolved"
        );

        let plan = plan_quote_instructions(self.policy.compute_unit_price, cu_limit, ixs)?;
        let message = compile(payer, &plan.instructions, blockhash)?;
        let tx = VersionedTransaction::try_new(message, signers)
            .map_err(|e| QuoteError::Signing(e.to_string()))?;

        Ok(BuiltTx {
            tx,
            blockhash,
            last_valid_block_height,
            cu_limit,
        })
    }
}

fn compile(
    payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
) -> Result<VersionedMessage, QuoteError> {
    let message = v0::Message::try_compile(payer, instructions, &[], blockhash)
        .map_err(|e| QuoteError::Signing(format!("Failed to compile v0 message: {}", e)))?;
    Ok(VersionedMessage::V0(message))
}

/// Transaction with placeholder signatures, for `sig_verify = false` simulation.
fn unsigned(message: VersionedMessage) -> VersionedTransaction {
    let required = message.header().num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message,
    }
}

/// Convenience for single-keypair callers.
pub async fn build_for_signer<R: QuoteRpc + ?Sized, K: Signer>(
    builder: &TxBuilder<'_, R>,
    ixs: &[Instruction],
    signer: &K,
) -> Result<BuiltTx, QuoteError> {
    builder.build(ixs, &signer.pubkey(), &[signer]).await
}
