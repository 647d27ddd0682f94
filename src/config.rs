//! Configuration module for the gauge vote bot
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoints configuration
    pub rpc: RpcConfig,

    /// Wallet configuration
    pub wallet: WalletConfig,

    /// Remote feed URLs
    pub feeds: FeedsConfig,

    /// Governance program configuration
    pub governance: GovernanceConfig,

    /// Checkpoint store configuration
    pub checkpoint: CheckpointConfig,

    /// Number of voters processed concurrently. The epoch-gauge creation
    /// instructions are not deduplicated across voters, so values above 1
    /// can make two transactions race to create the same epoch record;
    /// the loser fails terminally for that voter.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Primary RPC endpoint (account reads, simulation, confirmation)
    pub url: String,

    /// Optional staked endpoint used only for broadcasting transactions
    #[serde(default)]
    pub staked_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Escrow holder snapshot (JSON list of escrow positions)
    #[serde(default = "default_voters_url")]
    pub voters_url: String,

    /// Staked-token registry (JSON map of validator name to token mint)
    #[serde(default = "default_gauge_list_url")]
    pub gauge_list_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Gaugemeister configuration account
    #[serde(default = "default_gaugemeister")]
    pub gaugemeister: String,

    /// Quarry rewarder backing the gauge set
    #[serde(default = "default_rewarder")]
    pub rewarder: String,

    /// Minimum voting power (in whole tokens; scaled by 1e6 internally)
    #[serde(default = "default_min_voting_power")]
    pub min_voting_power: f64,

    /// Owners exempt from the minimum power threshold
    #[serde(default)]
    pub whitelist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Path to the sled database holding the last processed epoch
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
}

// Default value functions
fn default_rpc_timeout() -> u64 {
    30
}
fn default_concurrency() -> usize {
    1
}
fn default_voters_url() -> String {
    "https://raw.githubusercontent.com/saberdao/birdeye-data/refs/heads/main/veTokenHolders/VAULTVXqi93aaq9FsyPKgdgp6Ge1H1HoSvNC4ZbqFDs.json".to_string()
}
fn default_gauge_list_url() -> String {
    "https://raw.githubusercontent.com/SolanaVault/gauge-validator-sync-list-build/refs/heads/main/list.json".to_string()
}
fn default_gaugemeister() -> String {
    "28ZDtf6d2wsYhBvabTxUHTRT6MDxqjmqR7RMCp348tyU".to_string()
}
fn default_rewarder() -> String {
    "rXhAofQCT7NN9TUqigyEAUzV1uLL4boeD8CRkNBSkYk".to_string()
}
fn default_min_voting_power() -> f64 {
    50_000.0
}
fn default_checkpoint_path() -> String {
    "checkpoint.db".to_string()
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// `RPC_URL` and `STAKED_RPC_URL` take precedence over the file.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        if let Ok(url) = std::env::var("RPC_URL") {
            config.rpc.url = url;
        }
        if let Ok(url) = std::env::var("STAKED_RPC_URL") {
            config.rpc.staked_url = Some(url);
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://api.mainnet-beta.solana.com".to_string(),
                staked_url: None,
                timeout_secs: default_rpc_timeout(),
            },
            wallet: WalletConfig {
                keypair_path: "~/.config/solana/id.json".to_string(),
            },
            feeds: FeedsConfig {
                voters_url: default_voters_url(),
                gauge_list_url: default_gauge_list_url(),
            },
            governance: GovernanceConfig {
                gaugemeister: default_gaugemeister(),
                rewarder: default_rewarder(),
                min_voting_power: default_min_voting_power(),
                whitelist: Vec::new(),
            },
            checkpoint: CheckpointConfig {
                path: default_checkpoint_path(),
            },
            concurrency: default_concurrency(),
        }
    }
}
