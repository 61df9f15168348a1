//! Quote loop driver
//!
//! For each USD amount, in the order given: build the
//! `quote_sol_for_usd` instruction, wrap it in a v0 transaction, simulate
//! it to read the quote from the program log, submit it, and wait for
//! confirmation. A failing amount is logged and recorded; the loop always
//! moves on to the next amount.

use std::time::Duration;

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use tracing::{debug, error, info, warn};

use crate::config::{Config, ResolvedEnv};
use crate::metrics::{metrics, Timer};
use crate::program::quote_sol_for_usd_ix;
use crate::rpc::{QuoteRpc, SubmitConfig};
use crate::tx_builder::{
    builder::build_for_signer, confirm_signature, scan_simulation_logs, FeePolicy, QuoteError,
    QuoteLine, SimulationReport, TxBuilder,
};
use crate::wallet::WalletManager;

/// Everything a quote run needs besides the RPC connection and wallet
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub program_id: Pubkey,
    pub feed: Pubkey,
    pub policy: FeePolicy,
    pub commitment: CommitmentConfig,
    pub submit: SubmitConfig,
    pub confirm_poll_interval: Duration,
}

impl DriverSettings {
    pub fn from_config(config: &Config, env: &ResolvedEnv) -> anyhow::Result<Self> {
        Ok(Self {
            program_id: env.program_id,
            feed: env.feed,
            policy: config.fee_policy(),
            commitment: config.commitment()?,
            submit: config.submit_config()?,
            confirm_poll_interval: config.confirm_poll_interval(),
        })
    }
}

/// A confirmed quote transaction
#[derive(Debug, Clone)]
pub struct QuoteReceipt {
    pub signature: Signature,
    pub report: SimulationReport,
    /// Parsed result line, when the simulation produced one
    pub quote: Option<QuoteLine>,
    pub cu_limit: u32,
}

/// Result of one amount's iteration
#[derive(Debug)]
pub struct QuoteOutcome {
    pub usd_cents: u64,
    pub result: Result<QuoteReceipt, QuoteError>,
}

impl QuoteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts over a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub with_result_line: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[QuoteOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            acc.attempted += 1;
            match &o.result {
                Ok(receipt) => {
                    acc.confirmed += 1;
                    if receipt.report.result_line().is_some() {
                        acc.with_result_line += 1;
                    }
                }
                Err(_) => acc.failed += 1,
            }
            acc
        })
    }
}

/// Render a cent amount as dollars the way the operator reads it:
/// `100` → `1`, `150` → `1.5`, `105` → `1.05`.
pub fn format_usd(cents: u64) -> String {
    let whole = cents / 100;
    let frac = cents % 100;
    if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    }
}

pub struct QuoteDriver<'a, R: QuoteRpc + ?Sized> {
    rpc: &'a R,
    wallet: &'a WalletManager,
    settings: DriverSettings,
}

impl<'a, R: QuoteRpc + ?Sized> QuoteDriver<'a, R> {
    pub fn new(rpc: &'a R, wallet: &'a WalletManager, settings: DriverSettings) -> Self {
        Self {
            rpc,
            wallet,
            settings,
        }
    }

    /// Quote every amount in order, one at a time.
    ///
    /// Returns one outcome per input amount, in input order.
    pub async fn run(&self, amounts_cents: &[u64]) -> Vec<QuoteOutcome> {
        let mut outcomes = Vec::with_capacity(amounts_cents.len());

        for &usd_cents in amounts_cents {
            info!("Quoting for ${} USD...", format_usd(usd_cents));
            metrics().quotes_attempted.inc();
            let timer = Timer::new();

            let result = self.quote_once(usd_cents).await;
            match &result {
                Ok(receipt) => {
                    timer.observe_duration(&metrics().quote_latency);
                    metrics().quotes_succeeded.inc();
                    debug!(
                        usd_cents,
                        signature = %receipt.signature,
                        cu_limit = receipt.cu_limit,
                        "Quote confirmed"
                    );
                }
                Err(e) => {
                    metrics().record_failure(e.category());
                    error!(
                        usd_cents,
                        category = e.category(),
                        "Error quoting ${} USD: {}",
                        format_usd(usd_cents),
                        e
                    );
                }
            }

            outcomes.push(QuoteOutcome { usd_cents, result });
        }

        outcomes
    }

    /// One construct/simulate/submit/confirm cycle.
    pub async fn quote_once(&self, usd_cents: u64) -> Result<QuoteReceipt, QuoteError> {
        let s = &self.settings;
        let ix = quote_sol_for_usd_ix(&s.program_id, &s.feed, &self.wallet.pubkey(), usd_cents)?;

        let builder = TxBuilder::new(self.rpc, s.policy, s.commitment, s.submit)?;
        let built = build_for_signer(&builder, &[ix], self.wallet.keypair()).await?;

        let timer = Timer::new();
        let sim = self.rpc.simulate(&built.tx, false, s.submit).await?;
        timer.observe_duration(&metrics().rpc_latency);

        if let Some(err) = &sim.err {
            warn!(usd_cents, error = %err, "Simulation reported a transaction error");
        }

        let report = scan_simulation_logs(sim.logs.as_deref());
        let quote = match &report {
            SimulationReport::ResultLine(line) => {
                metrics().result_lines_found.inc();
                info!("Result: {}", line);
                let parsed = QuoteLine::parse(line);
                if let Some(q) = &parsed {
                    debug!(
                        usd_cents = q.usd_cents,
                        lamports = q.lamports,
                        implied_price_usd = ?q.implied_price_usd(),
                        "Parsed quote"
                    );
                }
                parsed
            }
            SimulationReport::AllLogs(logs) => {
                info!("Simulation logs: {:?}", logs);
                None
            }
            SimulationReport::NoLogs => {
                debug!(usd_cents, "Simulation returned no logs");
                None
            }
        };

        let timer = Timer::new();
        let signature = self.rpc.send(&built.tx, s.submit).await?;
        timer.observe_duration(&metrics().rpc_latency);
        info!("Transaction signature: {}", signature);

        let (_, last_valid_block_height) = self.rpc.latest_blockhash(s.commitment).await?;
        confirm_signature(
            self.rpc,
            &signature,
            last_valid_block_height,
            s.commitment,
            s.confirm_poll_interval,
        )
        .await?;

        Ok(QuoteReceipt {
            signature,
            report,
            quote,
            cu_limit: built.cu_limit,
        })
    }
}
