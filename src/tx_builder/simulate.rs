//! Simulation log inspection
//!
//! The quote program reports its answer through `msg!`, so the only way to
//! read a quote without landing a transaction is to simulate it and scan
//! the program log. The wording is owned by the on-chain program; the
//! markers below must track it.

use once_cell::sync::Lazy;
use regex::Regex;
use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// First marker a result line must contain.
pub const RESULT_MARKER: &str = "For";

/// Second marker a result line must contain.
pub const CURRENCY_MARKER: &str = "USD cents";

/// What a simulation surfaced for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationReport {
    /// First log line carrying both markers
    ResultLine(String),
    /// No line matched; every log line the node returned
    AllLogs(Vec<String>),
    /// The node returned no log list at all
    NoLogs,
}

impl SimulationReport {
    /// The matched result line, if any
    pub fn result_line(&self) -> Option<&str> {
        match self {
            Self::ResultLine(line) => Some(line),
            _ => None,
        }
    }
}

/// Scan simulation logs for the quote result line.
///
/// The first line containing both [`RESULT_MARKER`] and
/// [`CURRENCY_MARKER`] wins. Otherwise the full log set is returned
/// untouched.
pub fn scan_simulation_logs(logs: Option<&[String]>) -> SimulationReport {
    let Some(logs) = logs else {
        return SimulationReport::NoLogs;
    };

    logs.iter()
        .find(|line| line.contains(RESULT_MARKER) && line.contains(CURRENCY_MARKER))
        .map(|line| SimulationReport::ResultLine(line.clone()))
        .unwrap_or_else(|| SimulationReport::AllLogs(logs.to_vec()))
}

static QUOTE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"For (\d+) USD cents, you would receive (\d+) SOL lamports \(approx\. ([0-9.eE+-]+) SOL\)",
    )
    .expect("quote line pattern is valid")
});

/// A parsed quote result line.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLine {
    pub usd_cents: u64,
    pub lamports: u64,
    pub sol: f64,
}

impl QuoteLine {
    /// Parse a program log line such as
    /// `Program log: For 100 USD cents, you would receive 6666666 SOL lamports (approx. 0.006666666 SOL)`.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = QUOTE_LINE_RE.captures(line)?;
        Some(Self {
            usd_cents: caps[1].parse().ok()?,
            lamports: caps[2].parse().ok()?,
            sol: caps[3].parse().ok()?,
        })
    }

    /// SOL/USD price implied by the quote
    pub fn implied_price_usd(&self) -> Option<f64> {
        if self.lamports == 0 {
            return None;
        }
        let usd = self.usd_cents as f64 / 100.0;
        let sol = self.lamports as f64 / LAMPORTS_PER_SOL as f64;
        Some(usd / sol)
    }
}
