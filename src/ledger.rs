//! Ledger network access
//!
//! [`LedgerClient`] is the seam between the pipeline and the RPC layer:
//! account reads, simulation, broadcast and confirmation. [`RpcLedger`]
//! implements it against real endpoints; tests drive the pipeline through
//! in-memory implementations.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSimulateTransactionConfig;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use std::time::Duration;
use tracing::debug;

use crate::config::RpcConfig;

/// Network-imposed ceiling on addresses per batched account read
pub const MAX_ACCOUNT_BATCH: usize = 100;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of a dry-run simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    /// Compute units the network reports the transaction would consume
    pub units_consumed: Option<u64>,
    /// Execution error reported by the simulator, if any
    pub err: Option<String>,
}

/// Ledger network operations consumed by the pipeline.
///
/// Handles are shared, read-only-in-intent, and reused across all tasks;
/// implementations must be safe to call from interleaved tasks.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// One batched account read (at most [`MAX_ACCOUNT_BATCH`] keys),
    /// returning raw accounts or an explicit absent marker in input order.
    async fn account_batch(&self, keys: &[Pubkey]) -> Result<Vec<Option<Account>>>;

    /// Latest finalized blockhash with its last valid block height
    async fn latest_blockhash(&self) -> Result<(Hash, u64)>;

    /// Dry-run a transaction without submitting it
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome>;

    /// Broadcast a signed transaction
    async fn broadcast(&self, tx: &VersionedTransaction) -> Result<Signature>;

    /// Wait until the signature is observed at processed commitment or the
    /// blockhash validity window closes.
    async fn confirm(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()>;

    /// Single account read
    async fn account(&self, key: &Pubkey) -> Result<Option<Account>> {
        let mut batch = self.account_batch(std::slice::from_ref(key)).await?;
        Ok(batch.pop().flatten())
    }
}

/// Read arbitrarily many accounts, chunked to the network batch ceiling,
/// merging results back into one ordered list. Network errors propagate
/// uncaught; retry policy belongs to the caller.
pub async fn read_accounts<L: LedgerClient + ?Sized>(
    ledger: &L,
    keys: &[Pubkey],
) -> Result<Vec<Option<Account>>> {
    let mut accounts = Vec::with_capacity(keys.len());
    for chunk in keys.chunks(MAX_ACCOUNT_BATCH) {
        accounts.extend(ledger.account_batch(chunk).await?);
    }
    Ok(accounts)
}

/// [`LedgerClient`] over JSON-RPC endpoints. Broadcasts go through the
/// staked endpoint when one is configured; everything else uses the
/// primary.
pub struct RpcLedger {
    rpc: RpcClient,
    staked: Option<RpcClient>,
}

impl RpcLedger {
    pub fn new(config: &RpcConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let commitment = CommitmentConfig::confirmed();
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                config.url.clone(),
                timeout,
                commitment,
            ),
            staked: config.staked_url.as_ref().map(|url| {
                RpcClient::new_with_timeout_and_commitment(url.clone(), timeout, commitment)
            }),
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn account_batch(&self, keys: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        self.rpc
            .get_multiple_accounts(keys)
            .await
            .with_context(|| format!("Batched account read failed ({} keys)", keys.len()))
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        self.rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await
            .context("Failed to fetch latest blockhash")
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome> {
        let response = self
            .rpc
            .simulate_transaction_with_config(
                tx,
                RpcSimulateTransactionConfig {
                    commitment: Some(CommitmentConfig::processed()),
                    ..Default::default()
                },
            )
            .await
            .context("Transaction simulation request failed")?;
        Ok(SimulationOutcome {
            units_consumed: response.value.units_consumed,
            err: response.value.err.map(|err| format!("{:?}", err)),
        })
    }

    async fn broadcast(&self, tx: &VersionedTransaction) -> Result<Signature> {
        let rpc = self.staked.as_ref().unwrap_or(&self.rpc);
        rpc.send_transaction(tx)
            .await
            .map_err(|e| anyhow!("{}", e))
    }

    async fn confirm(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()> {
        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(std::slice::from_ref(signature))
                .await
                .context("Signature status request failed")?;

            if let Some(Some(status)) = statuses.value.first() {
                if let Some(err) = &status.err {
                    return Err(anyhow!("Transaction failed on chain: {:?}", err));
                }
                if status.satisfies_commitment(CommitmentConfig::processed()) {
                    return Ok(());
                }
            }

            let block_height = self
                .rpc
                .get_block_height()
                .await
                .context("Block height request failed")?;
            if block_height > last_valid_block_height {
                return Err(anyhow!(
                    "Signature {} not confirmed: block height exceeded (last valid {})",
                    signature,
                    last_valid_block_height
                ));
            }

            debug!(signature = %signature, block_height, "Awaiting confirmation");
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}
