//! Compute budget estimation
//!
//! Discovers the true compute cost of an instruction list by simulating a
//! disposable transaction. The simulator occasionally reports zero consumed
//! units for a transaction that plainly does work; that is treated as a
//! stale simulation and retried on a fixed delay, bounded, before falling
//! back to a conservative upper bound.

use anyhow::{Context, Result};
use solana_sdk::{
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::ledger::LedgerClient;

/// Conservative upper bound returned when simulation never yields a cost
pub const FALLBACK_COMPUTE_UNITS: u64 = 1_400_000;

/// Retry policy for zero-unit simulation responses
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    /// Attempts beyond the first before giving up on a real cost
    pub max_zero_retries: u32,
    /// Delay between attempts
    pub zero_retry_delay: Duration,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            max_zero_retries: 900,
            zero_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Simulate the instruction list and return the network-reported compute
/// cost. A nonzero result is accepted as-is even when the simulation
/// reports an execution error; cost discovery is the only job here.
pub async fn estimate_compute_units<L: LedgerClient + ?Sized>(
    ledger: &L,
    instructions: &[Instruction],
    payer: &Pubkey,
    options: &EstimateOptions,
) -> Result<u64> {
    let (blockhash, _) = ledger.latest_blockhash().await?;
    let message = MessageV0::try_compile(payer, instructions, &[], blockhash)
        .context("Failed to compile simulation message")?;
    let required = message.header.num_required_signatures as usize;
    let tx = VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    };

    for attempt in 0..=options.max_zero_retries {
        let outcome = ledger.simulate(&tx).await?;
        match outcome.units_consumed {
            Some(units) if units > 0 => {
                if let Some(err) = outcome.err {
                    debug!(error = %err, units, "Simulation reported an error; cost accepted");
                }
                return Ok(units);
            }
            Some(_) => {
                if attempt < options.max_zero_retries {
                    warn!(attempt, "Simulation reported zero consumed units, retrying");
                    tokio::time::sleep(options.zero_retry_delay).await;
                }
            }
            None => {
                debug!("Simulation reported no unit count, assuming worst case");
                return Ok(FALLBACK_COMPUTE_UNITS);
            }
        }
    }

    warn!(
        retries = options.max_zero_retries,
        fallback = FALLBACK_COMPUTE_UNITS,
        "Simulation never reported a cost, using fallback"
    );
    Ok(FALLBACK_COMPUTE_UNITS)
}
