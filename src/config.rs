//! Configuration module for the quote driver
//!
//! Settings come from four layers, lowest precedence first:
//! 1. built-in defaults (the fixed quote run: five amounts, default feed,
//!    200,000 micro-lamport priority fee, 1.3 compute multiplier)
//! 2. the Anchor workspace manifest (`Anchor.toml`): provider cluster,
//!    provider wallet, program id
//! 3. the driver's own TOML file
//! 4. environment variables (a `.env` file is honoured)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};

use crate::program::{DEFAULT_FEED, QUOTE_PROGRAM_ID, QUOTE_PROGRAM_NAME};
use crate::rpc::SubmitConfig;
use crate::tx_builder::{instructions::validate_multiplier, FeePolicy};

pub const ENV_RPC_URL: &str = "SOL_QUOTE_RPC_URL";
pub const ENV_KEYPAIR: &str = "SOL_QUOTE_KEYPAIR";
pub const ENV_FEED: &str = "SOL_QUOTE_FEED";
pub const ENV_PROGRAM_ID: &str = "SOL_QUOTE_PROGRAM_ID";
pub const ENV_ANCHOR_PROVIDER_URL: &str = "ANCHOR_PROVIDER_URL";
pub const ENV_ANCHOR_WALLET: &str = "ANCHOR_WALLET";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub program: ProgramConfig,
    pub quote: QuoteConfig,
    pub submit: SubmitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// RPC endpoint; falls back to the Anchor provider cluster
    pub url: Option<String>,

    /// Commitment for blockhashes and confirmation
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Delay between confirmation polls in milliseconds
    #[serde(default = "default_confirm_poll_ms")]
    pub confirm_poll_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Path to keypair file; falls back to the Anchor provider wallet
    pub keypair_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Program id; falls back to the Anchor workspace entry
    pub program_id: Option<String>,

    /// Name of the program in the Anchor workspace
    #[serde(default = "default_program_name")]
    pub name: String,

    /// Price feed account
    #[serde(default = "default_feed")]
    pub feed: String,

    /// Path to the Anchor workspace manifest
    #[serde(default = "default_anchor_toml")]
    pub anchor_toml: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// USD amounts to quote, in cents, processed in this order
    #[serde(default = "default_amounts")]
    pub amounts_cents: Vec<u64>,

    /// Priority fee in micro-lamports per compute unit
    #[serde(default = "default_compute_unit_price")]
    pub compute_unit_price: u64,

    /// Factor applied to simulated compute usage
    #[serde(default = "default_compute_unit_limit_multiple")]
    pub compute_unit_limit_multiple: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitSettings {
    #[serde(default = "default_submit_commitment")]
    pub commitment: String,

    #[serde(default = "default_true")]
    pub skip_preflight: bool,

    /// Node-side resend attempts; zero keeps each amount to one submission
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<usize>,
}

// Default value functions
fn default_commitment() -> String { "confirmed".to_string() }
fn default_submit_commitment() -> String { "processed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_confirm_poll_ms() -> u64 { 500 }
fn default_program_name() -> String { QUOTE_PROGRAM_NAME.to_string() }
fn default_feed() -> String { DEFAULT_FEED.to_string() }
fn default_anchor_toml() -> String { "Anchor.toml".to_string() }
fn default_amounts() -> Vec<u64> { vec![100, 500, 1000, 5000, 10000] }
fn default_compute_unit_price() -> u64 { 200_000 }
fn default_compute_unit_limit_multiple() -> f64 { 1.3 }
fn default_true() -> bool { true }
fn default_max_retries() -> Option<usize> { Some(0) }

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: None,
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
            confirm_poll_ms: default_confirm_poll_ms(),
        }
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: None,
            name: default_program_name(),
            feed: default_feed(),
            anchor_toml: default_anchor_toml(),
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            amounts_cents: default_amounts(),
            compute_unit_price: default_compute_unit_price(),
            compute_unit_limit_multiple: default_compute_unit_limit_multiple(),
        }
    }
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            commitment: default_submit_commitment(),
            skip_preflight: default_true(),
            max_retries: default_max_retries(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration after reading `.env`
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Check values that would otherwise fail mid-run
    pub fn validate(&self) -> Result<()> {
        if self.quote.amounts_cents.is_empty() {
            bail!("quote.amounts_cents must not be empty");
        }
        if let Some(idx) = self.quote.amounts_cents.iter().position(|&a| a == 0) {
            bail!("quote.amounts_cents[{}] must be positive", idx);
        }
        validate_multiplier(self.quote.compute_unit_limit_multiple)?;
        parse_commitment(&self.rpc.commitment)?;
        parse_commitment(&self.submit.commitment)?;
        Pubkey::from_str(&self.program.feed)
            .with_context(|| format!("Invalid feed account: {}", self.program.feed))?;
        Ok(())
    }

    /// Resolve the run environment from process environment variables.
    pub fn resolve(&self, anchor: Option<&AnchorWorkspace>) -> Result<ResolvedEnv> {
        dotenvy::dotenv().ok();
        self.resolve_with(anchor, |key| std::env::var(key).ok())
    }

    /// Resolve the run environment with an explicit variable lookup.
    pub fn resolve_with<F>(&self, anchor: Option<&AnchorWorkspace>, env: F) -> Result<ResolvedEnv>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = first_set(&env, &[ENV_RPC_URL, ENV_ANCHOR_PROVIDER_URL])
            .or_else(|| self.rpc.url.clone())
            .or_else(|| anchor.map(|a| cluster_url(&a.provider.cluster)))
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let keypair_path = first_set(&env, &[ENV_KEYPAIR, ENV_ANCHOR_WALLET])
            .or_else(|| self.wallet.keypair_path.clone())
            .or_else(|| anchor.map(|a| a.provider.wallet.clone()))
            .unwrap_or_else(|| DEFAULT_KEYPAIR_PATH.to_string());

        let program_id = match first_set(&env, &[ENV_PROGRAM_ID])
            .or_else(|| self.program.program_id.clone())
            .or_else(|| anchor.and_then(|a| a.program_id(&self.program.name)))
        {
            Some(id) => Pubkey::from_str(&id).with_context(|| format!("Invalid program id: {}", id))?,
            None => QUOTE_PROGRAM_ID,
        };

        let feed_str = first_set(&env, &[ENV_FEED]).unwrap_or_else(|| self.program.feed.clone());
        let feed = Pubkey::from_str(&feed_str)
            .with_context(|| format!("Invalid feed account: {}", feed_str))?;

        Ok(ResolvedEnv {
            rpc_url,
            keypair_path: expand_home(&keypair_path, env("HOME").as_deref()),
            program_id,
            feed,
        })
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        Ok(CommitmentConfig {
            commitment: parse_commitment(&self.rpc.commitment)?,
        })
    }

    pub fn submit_config(&self) -> Result<SubmitConfig> {
        Ok(SubmitConfig {
            commitment: parse_commitment(&self.submit.commitment)?,
            skip_preflight: self.submit.skip_preflight,
            max_retries: self.submit.max_retries,
        })
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            compute_unit_price: self.quote.compute_unit_price,
            compute_unit_limit_multiple: self.quote.compute_unit_limit_multiple,
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rpc.confirm_poll_ms)
    }
}

/// Connection and identity settings after all layers are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnv {
    pub rpc_url: String,
    pub keypair_path: PathBuf,
    pub program_id: Pubkey,
    pub feed: Pubkey,
}

/// The parts of `Anchor.toml` the drivers read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnchorWorkspace {
    #[serde(default)]
    pub provider: AnchorProvider,

    /// `[programs.<cluster>]` tables: program name → program id
    #[serde(default)]
    pub programs: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorProvider {
    #[serde(default = "default_cluster")]
    pub cluster: String,
    #[serde(default = "default_wallet")]
    pub wallet: String,
}

fn default_cluster() -> String { "localnet".to_string() }
fn default_wallet() -> String { DEFAULT_KEYPAIR_PATH.to_string() }

impl Default for AnchorProvider {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            wallet: default_wallet(),
        }
    }
}

impl AnchorWorkspace {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse Anchor workspace manifest")
    }

    /// Load the manifest if it exists
    pub fn discover(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Program id for `name` on the provider cluster.
    ///
    /// Anchor registers programs under their snake_case crate name.
    pub fn program_id(&self, name: &str) -> Option<String> {
        let cluster = cluster_key(&self.provider.cluster);
        let table = self.programs.get(cluster)?;
        table
            .get(name)
            .or_else(|| table.get(&name.replace('-', "_")))
            .cloned()
    }
}

fn cluster_key(cluster: &str) -> &str {
    match cluster.to_ascii_lowercase().as_str() {
        "l" | "localnet" | "localhost" => "localnet",
        "d" | "devnet" => "devnet",
        "t" | "testnet" => "testnet",
        "m" | "mainnet" | "mainnet-beta" => "mainnet",
        _ => cluster,
    }
}

/// Map an Anchor cluster moniker to an RPC URL; anything else is taken as a URL.
pub fn cluster_url(cluster: &str) -> String {
    match cluster_key(cluster) {
        "localnet" => "http://127.0.0.1:8899".to_string(),
        "devnet" => "https://api.devnet.solana.com".to_string(),
        "testnet" => "https://api.testnet.solana.com".to_string(),
        "mainnet" => "https://api.mainnet-beta.solana.com".to_string(),
        other => other.to_string(),
    }
}

pub fn parse_commitment(value: &str) -> Result<CommitmentLevel> {
    CommitmentLevel::from_str(value).map_err(|_| anyhow::anyhow!("Invalid commitment level: {}", value))
}

/// First non-empty variable among `keys`
fn first_set<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|k| env(*k).filter(|v| !v.is_empty()))
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => Path::new(home).join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const ANCHOR_TOML: &str = r#"
[toolchain]

[features]
resolution = true
skip-lint = false

[programs.devnet]
sb_on_demand_solana = "GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF"

[provider]
cluster = "Devnet"
wallet = "~/.config/solana/devnet.json"

[scripts]
test = "yarn run ts-mocha -p ./tsconfig.json -t 1000000 tests/**/*.ts"
"#;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.quote.amounts_cents, vec![100, 500, 1000, 5000, 10000]);
        assert_eq!(config.quote.compute_unit_price, 200_000);
        assert_eq!(config.quote.compute_unit_limit_multiple, 1.3);
        assert_eq!(config.program.feed, DEFAULT_FEED.to_string());
        assert_eq!(config.commitment().unwrap(), CommitmentConfig::confirmed());
        assert_eq!(config.submit_config().unwrap(), SubmitConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.quote.amounts_cents, default_amounts());
        assert_eq!(config.rpc.confirm_poll_ms, 500);
        assert!(config.rpc.url.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
[rpc]
url = "http://127.0.0.1:8899"

[quote]
amounts_cents = [250, 100]
"#,
        )
        .unwrap();
        assert_eq!(config.rpc.url.as_deref(), Some("http://127.0.0.1:8899"));
        assert_eq!(config.quote.amounts_cents, vec![250, 100]);
        assert_eq!(config.quote.compute_unit_price, 200_000);
    }

    #[test]
    fn test_partial_submit_table_keeps_single_attempt() {
        let config: Config = toml::from_str("[submit]\nskip_preflight = true\n").unwrap();
        assert_eq!(config.submit.max_retries, Some(0));
        assert_eq!(config.submit_config().unwrap().max_retries, Some(0));

        let config: Config = toml::from_str("[submit]\nmax_retries = 3\n").unwrap();
        assert_eq!(config.submit_config().unwrap().max_retries, Some(3));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.quote.amounts_cents = vec![100, 0];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quote.amounts_cents.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quote.compute_unit_limit_multiple = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.commitment = "eventually".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_anchor_workspace_resolution() {
        let anchor = AnchorWorkspace::from_toml(ANCHOR_TOML).unwrap();
        assert_eq!(
            anchor.program_id(QUOTE_PROGRAM_NAME).as_deref(),
            Some("GaGzYqevtXiWfSqUZe6hENGXsNxGpSWEDyBn4bHRKZhF")
        );

        let env = Config::default()
            .resolve_with(Some(&anchor), env_of(&[("HOME", "/home/quoter")]))
            .unwrap();
        assert_eq!(env.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(
            env.keypair_path,
            PathBuf::from("/home/quoter/.config/solana/devnet.json")
        );
        assert_eq!(env.program_id, QUOTE_PROGRAM_ID);
        assert_eq!(env.feed, DEFAULT_FEED);
    }

    #[test]
    fn test_env_overrides_config_and_anchor() {
        let anchor = AnchorWorkspace::from_toml(ANCHOR_TOML).unwrap();
        let mut config = Config::default();
        config.rpc.url = Some("http://config:8899".to_string());

        let env = config
            .resolve_with(
                Some(&anchor),
                env_of(&[
                    (ENV_ANCHOR_PROVIDER_URL, "http://anchor-env:8899"),
                    (ENV_ANCHOR_WALLET, "/tmp/id.json"),
                ]),
            )
            .unwrap();
        assert_eq!(env.rpc_url, "http://anchor-env:8899");
        assert_eq!(env.keypair_path, PathBuf::from("/tmp/id.json"));

        let env = config.resolve_with(Some(&anchor), env_of(&[])).unwrap();
        assert_eq!(env.rpc_url, "http://config:8899");
    }

    #[test]
    fn test_resolve_without_anchor() {
        let env = Config::default().resolve_with(None, env_of(&[])).unwrap();
        assert_eq!(env.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(env.keypair_path, PathBuf::from(DEFAULT_KEYPAIR_PATH));
        assert_eq!(env.program_id, QUOTE_PROGRAM_ID);
    }

    #[test]
    fn test_resolve_rejects_bad_feed() {
        let result = Config::default().resolve_with(None, env_of(&[(ENV_FEED, "not-a-key")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_cluster_url() {
        assert_eq!(cluster_url("localnet"), "http://127.0.0.1:8899");
        assert_eq!(cluster_url("Mainnet"), "https://api.mainnet-beta.solana.com");
        assert_eq!(cluster_url("http://my-node:8899"), "http://my-node:8899");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quote.toml");
        std::fs::write(&path, "[program]\nfeed = \"11111111111111111111111111111111\"\n").unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.program.feed, "11111111111111111111111111111111");

        let missing = AnchorWorkspace::discover(dir.path().join("Anchor.toml")).unwrap();
        assert!(missing.is_none());
    }
}
