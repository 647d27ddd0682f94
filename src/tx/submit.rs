//! Transaction submission
//!
//! Signs with the minimal required-signer subset, broadcasts, and races
//! confirmation against a wall-clock timeout. Transient failures resubmit
//! the same signed transaction in an explicit loop, unbounded; everything
//! else is terminal for the attempt.

use base64::Engine;
use solana_sdk::{
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ledger::LedgerClient;
use crate::tx::build::PreparedTransaction;
use crate::tx::errors::TxError;

/// Wall-clock window for one broadcast-and-confirm attempt
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Sign the prepared transaction with every available key that the message
/// header actually requires. Superfluous keys are not applied; a required
/// key with no available keypair fails the attempt before broadcast.
pub fn sign_transaction(
    prepared: &PreparedTransaction,
    available: &[Arc<Keypair>],
) -> Result<VersionedTransaction, TxError> {
    let mut tx = prepared.tx.clone();
    let required = tx.message.header().num_required_signatures as usize;
    let required_keys = &tx.message.static_account_keys()[..required];
    let message_bytes = tx.message.serialize();

    let mut signatures = vec![Signature::default(); required];
    for (slot, key) in required_keys.iter().enumerate() {
        match available.iter().find(|kp| kp.pubkey() == *key) {
            Some(keypair) => signatures[slot] = keypair.sign_message(&message_bytes),
            None => {
                return Err(TxError::Signing(format!(
                    "No available key for required signer {}",
                    key
                )))
            }
        }
    }
    tx.signatures = signatures;
    Ok(tx)
}

/// Broadcast a signed transaction and wait for confirmation, retrying
/// forever on the transient allow-list. Returns the network-assigned
/// signature on success, or the first terminal failure.
pub async fn submit_transaction<L: LedgerClient + 'static>(
    ledger: Arc<L>,
    prepared: &PreparedTransaction,
    available: &[Arc<Keypair>],
) -> Result<Signature, TxError> {
    let tx = sign_transaction(prepared, available)?;

    if let Ok(bytes) = bincode::serialize(&tx) {
        debug!(
            tx_base64 = %base64::engine::general_purpose::STANDARD.encode(bytes),
            "Serialized transaction"
        );
    }

    let last_valid_block_height = prepared.last_valid_block_height;
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match attempt_submission(Arc::clone(&ledger), tx.clone(), last_valid_block_height).await {
            Ok(signature) => {
                info!(signature = %signature, attempt, "Transaction confirmed");
                return Ok(signature);
            }
            Err(e) if e.is_transient() => {
                warn!(attempt, category = e.category(), error = %e, "Transient failure, resubmitting");
            }
            Err(e) => return Err(e),
        }
    }
}

/// One broadcast-and-confirm attempt raced against the timeout.
///
/// The attempt runs as a spawned task; when the timeout wins, the loser is
/// abandoned, not cancelled, so the broadcast's network side effects stand.
/// A timeout therefore does not mean the transaction failed, only that
/// confirmation was not observed in time.
async fn attempt_submission<L: LedgerClient + 'static>(
    ledger: Arc<L>,
    tx: VersionedTransaction,
    last_valid_block_height: u64,
) -> Result<Signature, TxError> {
    let attempt = tokio::spawn(async move {
        let signature = ledger
            .broadcast(&tx)
            .await
            .map_err(|e| TxError::Broadcast(format!("{:#}", e)))?;
        debug!(signature = %signature, "Broadcast accepted, awaiting confirmation");
        ledger
            .confirm(&signature, last_valid_block_height)
            .await
            .map_err(|e| TxError::Confirm(format!("{:#}", e)))?;
        Ok(signature)
    });

    tokio::select! {
        joined = attempt => {
            joined.map_err(|e| TxError::Confirm(format!("Submission task failed: {}", e)))?
        }
        _ = tokio::time::sleep(CONFIRMATION_TIMEOUT) => Err(TxError::ConfirmTimeout),
    }
}
