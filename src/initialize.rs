//! `initialize` smoke check against a deployed quote program

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::info;

use crate::driver::DriverSettings;
use crate::program::initialize_ix;
use crate::rpc::QuoteRpc;
use crate::tx_builder::{builder::build_for_signer, confirm_signature, FeePolicy, QuoteError, TxBuilder};
use crate::wallet::WalletManager;

/// Send `initialize` to `program_id` and wait for it to confirm.
///
/// No priority fee is attached and the compute limit equals simulated use.
pub async fn run_initialize<R: QuoteRpc + ?Sized>(
    rpc: &R,
    wallet: &WalletManager,
    program_id: &Pubkey,
    settings: &DriverSettings,
) -> Result<Signature, QuoteError> {
    let builder = TxBuilder::new(rpc, FeePolicy::plain(), settings.commitment, settings.submit)?;
    let built = build_for_signer(&builder, &[initialize_ix(program_id)], wallet.keypair()).await?;

    let signature = rpc.send(&built.tx, settings.submit).await?;
    confirm_signature(
        rpc,
        &signature,
        built.last_valid_block_height,
        settings.commitment,
        settings.confirm_poll_interval,
    )
    .await?;

    info!("Your transaction signature {}", signature);
    Ok(signature)
}
