//! SOL/USD quote driver library
//!
//! Builds, simulates, submits and confirms `quote_sol_for_usd` transactions
//! against an Anchor program that prices SOL from a Switchboard on-demand
//! feed, plus an `initialize` smoke check.

pub mod config;
pub mod driver;
pub mod initialize;
pub mod metrics;
pub mod program;
pub mod rpc;
pub mod test_utils;
pub mod tx_builder;
pub mod wallet;

// Re-export commonly used types
pub use driver::{format_usd, DriverSettings, QuoteDriver, QuoteOutcome, QuoteReceipt, RunSummary};
pub use rpc::QuoteRpc;
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::QuoteError;
