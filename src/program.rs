//! Client-side instruction builders for the quote program
//!
//! The program is an Anchor program, so every instruction is an 8-byte
//! method discriminator (`sha256("global:<method>")[..8]`) followed by the
//! Borsh-encoded arguments. Account order follows the program's
//! `#[derive(Accounts)]` structs.

use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program,
};

use crate::tx_builder::errors::QuoteError;

/// Default deployment of the quote program
pub const QUOTE_PROGRAM_ID: Pubkey = pubkey!("GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF");

/// Name the program is registered under in an Anchor workspace
pub const QUOTE_PROGRAM_NAME: &str = "sb_on_demand_solana";

/// SOL/USD Switchboard on-demand pull feed used by default
pub const DEFAULT_FEED: Pubkey = pubkey!("9qSUHitBBUrh6k1DyBqR38M2tmzW7aPYuTZ13qNdYzo3");

pub const INITIALIZE: &str = "initialize";
pub const QUOTE_SOL_FOR_USD: &str = "quote_sol_for_usd";

/// Compute the Anchor instruction discriminator for `method`.
pub fn anchor_discriminator(method: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{}", method).as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// `initialize()`: no accounts, no arguments.
pub fn initialize_ix(program_id: &Pubkey) -> Instruction {
    Instruction::new_with_bytes(*program_id, &anchor_discriminator(INITIALIZE), Vec::new())
}

/// `quote_sol_for_usd(usd_amount: u64)`.
///
/// Accounts: `feed` (read-only), `user` (signer), `system_program`.
/// A zero amount can never produce a positive lamport quote, so it is
/// rejected before it costs a round trip.
pub fn quote_sol_for_usd_ix(
    program_id: &Pubkey,
    feed: &Pubkey,
    user: &Pubkey,
    usd_cents: u64,
) -> Result<Instruction, QuoteError> {
    if usd_cents == 0 {
        return Err(QuoteError::instruction_failed(
            QUOTE_PROGRAM_NAME,
            "USD amount must be positive",
        ));
    }

    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&anchor_discriminator(QUOTE_SOL_FOR_USD));
    data.extend_from_slice(&usd_cents.to_le_bytes());

    Ok(Instruction::new_with_bytes(
        *program_id,
        &data,
        vec![
            AccountMeta::new_readonly(*feed, false),
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_matches_sha256_prefix() {
        let full = Sha256::digest(b"global:quote_sol_for_usd");
        assert_eq!(anchor_discriminator(QUOTE_SOL_FOR_USD), full[..8]);
        assert_ne!(
            anchor_discriminator(INITIALIZE),
            anchor_discriminator(QUOTE_SOL_FOR_USD)
        );
    }

    #[test]
    fn test_initialize_discriminator_known_value() {
        // Anchor's well-known discriminator for `initialize`
        assert_eq!(
            anchor_discriminator(INITIALIZE),
            [175, 175, 109, 31, 13, 152, 155, 237]
        );
    }

    #[test]
    fn test_quote_ix_layout() {
        let user = Pubkey::new_unique();
        let ix = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &user, 5000).unwrap();

        assert_eq!(ix.program_id, QUOTE_PROGRAM_ID);
        assert_eq!(ix.data.len(), 16);
        assert_eq!(&ix.data[..8], &anchor_discriminator(QUOTE_SOL_FOR_USD));
        assert_eq!(&ix.data[8..], &5000u64.to_le_bytes());

        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[0], AccountMeta::new_readonly(DEFAULT_FEED, false));
        assert_eq!(ix.accounts[1], AccountMeta::new_readonly(user, true));
        assert_eq!(
            ix.accounts[2],
            AccountMeta::new_readonly(system_program::id(), false)
        );
    }

    #[test]
    fn test_quote_ix_rejects_zero() {
        let err = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &Pubkey::new_unique(), 0)
            .unwrap_err();
        assert_eq!(err.category(), "instruction");
    }

    #[test]
    fn test_initialize_ix_is_bare() {
        let ix = initialize_ix(&QUOTE_PROGRAM_ID);
        assert!(ix.accounts.is_empty());
        assert_eq!(ix.data, anchor_discriminator(INITIALIZE).to_vec());
    }
}
