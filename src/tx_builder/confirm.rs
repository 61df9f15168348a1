//! Blockhash-bounded confirmation polling
//!
//! A signature is polled until it reaches the requested commitment, lands
//! with an error, or the chain moves past the last block height at which
//! its blockhash is valid. Nothing is resubmitted.

use std::time::Duration;

use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use tracing::debug;

use crate::rpc::{QuoteRpc, SignatureState};
use crate::tx_builder::errors::QuoteError;

/// Block until `signature` reaches `commitment`.
pub async fn confirm_signature<R: QuoteRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    last_valid_block_height: u64,
    commitment: CommitmentConfig,
    poll_interval: Duration,
) -> Result<(), QuoteError> {
    let mut polls: u32 = 0;
    loop {
        polls += 1;
        match rpc.signature_state(signature, commitment).await? {
            SignatureState::Reached => {
                debug!(%signature, polls, "Signature confirmed");
                return Ok(());
            }
            SignatureState::Failed(reason) => {
                return Err(QuoteError::TransactionFailed {
                    signature: *signature,
                    reason,
                });
            }
            SignatureState::Pending => {}
        }

        let current = rpc.block_height(commitment).await?;
        if current > last_valid_block_height {
            return Err(QuoteError::BlockheightExceeded {
                signature: *signature,
                current,
                last_valid: last_valid_block_height,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}
