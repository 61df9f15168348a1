//! sol-quote - SOL/USD quote loop
//!
//! Quotes a fixed list of USD amounts against the on-chain quote program,
//! one transaction per amount: simulate to read the quote from the program
//! log, then submit and confirm. Running with no flags performs the full
//! sequence and exits.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sol_quote::config::{AnchorWorkspace, Config};
use sol_quote::driver::{DriverSettings, QuoteDriver, RunSummary};
use sol_quote::metrics::metrics;
use sol_quote::rpc;
use sol_quote::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "quote.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    dump_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Starting SOL/USD quote test...");

    // Setup failures end the run here; per-amount failures never reach this point
    if let Err(e) = run(&args).await {
        error!("Top-level error: {:#}", e);
    }

    if args.dump_metrics {
        match metrics().render() {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to render metrics: {}", e),
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "sol_quote=debug,info"
    } else {
        "sol_quote=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = load_config(&args.config)?;
    config.validate().context("Invalid configuration")?;

    let anchor = AnchorWorkspace::discover(&config.program.anchor_toml)?;
    if anchor.is_some() {
        info!("Using Anchor workspace: {}", config.program.anchor_toml);
    }
    let env = config.resolve(anchor.as_ref())?;

    let wallet = WalletManager::from_file(&env.keypair_path).context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());

    let client = rpc::connect(&env.rpc_url, config.commitment()?, config.rpc_timeout());
    info!("RPC endpoint: {}", env.rpc_url);
    info!("Program: {}", env.program_id);
    info!("Using Feed Account: {}", env.feed);

    let settings = DriverSettings::from_config(&config, &env)?;
    let driver = QuoteDriver::new(&client, &wallet, settings);
    let outcomes = driver.run(&config.quote.amounts_cents).await;

    let summary = RunSummary::from_outcomes(&outcomes);
    info!(
        attempted = summary.attempted,
        confirmed = summary.confirmed,
        failed = summary.failed,
        with_result_line = summary.with_result_line,
        "Quote run finished"
    );

    Ok(())
}
