//! Gaugebot - Automated gauge vote committer
//!
//! Once per voting epoch, selects eligible stake-weighted voters from the
//! holder feed, computes their voting power, and submits vote-commit
//! transactions on their behalf. Safe to re-run: on-chain vote state is
//! re-resolved on every run and an epoch checkpoint gates the whole run.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gaugebot::checkpoint::CheckpointStore;
use gaugebot::config::Config;
use gaugebot::engine::{RunStatus, VoteEngine};
use gaugebot::ledger::RpcLedger;
use gaugebot::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Build and log transactions without submitting them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("🗳️ Starting gauge vote bot");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;

    info!(
        "🔑 Initializing wallet from: {}",
        config.wallet.keypair_path
    );
    let wallet =
        WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?;
    info!("💼 Wallet address: {}", wallet.pubkey());

    info!("🌐 RPC endpoint: {}", config.rpc.url);
    if let Some(staked) = &config.rpc.staked_url {
        info!("🌐 Staked broadcast endpoint: {}", staked);
    }
    let ledger = Arc::new(RpcLedger::new(&config.rpc));

    let checkpoint = CheckpointStore::open(&config.checkpoint.path)
        .context("Failed to open checkpoint store")?;

    if args.dry_run {
        info!("🧪 Dry run: transactions will be built but not submitted");
    }

    let engine = VoteEngine::new(ledger, wallet, checkpoint, config);
    match engine.run(args.dry_run).await? {
        RunStatus::NothingToDo { reason } => {
            info!("Nothing to do: {}", reason);
        }
        RunStatus::Completed {
            committed,
            skipped,
            failed,
        } => {
            info!(committed, skipped, failed, "✅ Run finished");
            if failed > 0 {
                warn!(failed, "Some voters failed; they will be retried next run only if the epoch advances");
            }
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "gaugebot=debug,info"
    } else {
        "gaugebot=info,warn,error"
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
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}
