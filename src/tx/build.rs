//! Transaction building
//!
//! Wraps an assembled instruction list with compute-budget directives and
//! compiles it into one unsigned v0 transaction bound to a fresh finalized
//! blockhash. Output is immutable; once the blockhash expires the
//! transaction must be rebuilt here, not resigned.

use anyhow::Result;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{debug, warn};

use crate::ledger::LedgerClient;
use crate::tx::errors::TxError;

/// Fixed compute-unit ceiling. A safety margin above typical estimates,
/// deliberately not the estimate itself.
pub const COMPUTE_UNIT_CEILING: u32 = 400_000;

/// Total priority fee budget per transaction, spread across the ceiling so
/// the extra cost is bounded regardless of actual consumption.
const PRIORITY_FEE_BUDGET_SOL: f64 = 0.0001;

/// Price per compute unit in micro-lamports
pub fn compute_unit_price_micro_lamports() -> u64 {
    let budget_micro_lamports = PRIORITY_FEE_BUDGET_SOL * LAMPORTS_PER_SOL as f64 * 1e6;
    (budget_micro_lamports / COMPUTE_UNIT_CEILING as f64).ceil() as u64
}

/// A compiled, unsigned transaction plus the checkpoint it is bound to
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub tx: VersionedTransaction,
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Compile one transaction: priority-fee and compute-limit directives
/// ahead of all caller instructions, bound to a fresh finalized blockhash.
pub async fn build_transaction<L: LedgerClient + ?Sized>(
    ledger: &L,
    instructions: &[Instruction],
    payer: &Pubkey,
    estimated_units: u64,
) -> Result<PreparedTransaction> {
    if estimated_units > COMPUTE_UNIT_CEILING as u64 {
        warn!(
            estimated_units,
            ceiling = COMPUTE_UNIT_CEILING,
            "Estimated cost exceeds the fixed ceiling; submitting anyway"
        );
    }

    let (blockhash, last_valid_block_height) = ledger.latest_blockhash().await?;

    let directives = [
        ComputeBudgetInstruction::set_compute_unit_price(compute_unit_price_micro_lamports()),
        ComputeBudgetInstruction::set_compute_unit_limit(COMPUTE_UNIT_CEILING),
    ];
    let all_instructions: Vec<Instruction> = directives
        .into_iter()
        .chain(instructions.iter().cloned())
        .collect();

    let message = MessageV0::try_compile(payer, &all_instructions, &[], blockhash)
        .map_err(|e| TxError::Compile(e.to_string()))?;
    let required = message.header.num_required_signatures as usize;
    let tx = VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    };

    debug!(
        instruction_count = all_instructions.len(),
        estimated_units,
        blockhash = %blockhash,
        last_valid_block_height,
        "Transaction compiled"
    );

    Ok(PreparedTransaction {
        tx,
        blockhash,
        last_valid_block_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SimulationOutcome;
    use anyhow::Result;
    use async_trait::async_trait;
    use solana_sdk::{account::Account, system_instruction};

    struct FixedBlockhash;

    #[async_trait]
    impl LedgerClient for FixedBlockhash {
        async fn account_batch(&self, _keys: &[Pubkey]) -> Result<Vec<Option<Account>>> {
            unimplemented!()
        }

        async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
            Ok((Hash::new_unique(), 1234))
        }

        async fn simulate(&self, _tx: &VersionedTransaction) -> Result<SimulationOutcome> {
            unimplemented!()
        }

        async fn broadcast(&self, _tx: &VersionedTransaction) -> Result<Signature> {
            unimplemented!()
        }

        async fn confirm(&self, _signature: &Signature, _height: u64) -> Result<()> {
            unimplemented!()
        }
    }

    #[test]
    fn test_unit_price_spreads_fee_over_ceiling() {
        // 0.0001 SOL = 100_000 lamports = 1e11 micro-lamports over 400k CU
        assert_eq!(compute_unit_price_micro_lamports(), 250_000);
    }

    #[tokio::test]
    async fn test_directives_precede_caller_instructions() {
        let payer = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let caller_ix = system_instruction::transfer(&payer, &recipient, 1);

        let prepared = build_transaction(&FixedBlockhash, &[caller_ix.clone()], &payer, 50_000)
            .await
            .unwrap();

        let message = match &prepared.tx.message {
            VersionedMessage::V0(message) => message,
            _ => panic!("expected v0 message"),
        };
        assert_eq!(message.instructions.len(), 3);

        let keys = &message.account_keys;
        assert_eq!(keys[0], payer);

        let expected_price = ComputeBudgetInstruction::set_compute_unit_price(
            compute_unit_price_micro_lamports(),
        );
        let expected_limit = ComputeBudgetInstruction::set_compute_unit_limit(COMPUTE_UNIT_CEILING);
        assert_eq!(message.instructions[0].data, expected_price.data);
        assert_eq!(message.instructions[1].data, expected_limit.data);
        assert_eq!(message.instructions[2].data, caller_ix.data);
        assert_eq!(
            keys[message.instructions[0].program_id_index as usize],
            solana_sdk::compute_budget::id()
        );
    }

    #[tokio::test]
    async fn test_output_is_unsigned_and_carries_validity_window() {
        let payer = Pubkey::new_unique();
        let caller_ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let prepared = build_transaction(&FixedBlockhash, &[caller_ix], &payer, 10_000)
            .await
            .unwrap();

        assert_eq!(prepared.last_valid_block_height, 1234);
        assert_eq!(prepared.tx.signatures, vec![Signature::default()]);
        match &prepared.tx.message {
            VersionedMessage::V0(message) => {
                assert_eq!(message.recent_blockhash, prepared.blockhash)
            }
            _ => panic!("expected v0 message"),
        }
    }
}
