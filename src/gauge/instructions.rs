//! Instruction encoders for the gauge program
//!
//! Anchor wire format: 8-byte discriminator of `sha256("global:<name>")`
//! followed by little-endian arguments. Account metas follow the order the
//! program declares them in.

use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::addresses::GAUGE_PROGRAM_ID;

/// Anchor instruction discriminator: first 8 bytes of sha256("global:<name>")
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Create the epoch-scoped voter record for the voting epoch, deriving its
/// power from the current escrow state.
pub fn prepare_epoch_gauge_voter(
    gaugemeister: &Pubkey,
    locker: &Pubkey,
    escrow: &Pubkey,
    gauge_voter: &Pubkey,
    epoch_gauge_voter: &Pubkey,
    epoch_gauge_voter_bump: u8,
    payer: &Pubkey,
) -> Instruction {
    let mut data = instruction_discriminator("prepare_epoch_gauge_voter").to_vec();
    data.push(epoch_gauge_voter_bump);
    Instruction {
        program_id: GAUGE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*gaugemeister, false),
            AccountMeta::new_readonly(*locker, false),
            AccountMeta::new_readonly(*escrow, false),
            AccountMeta::new_readonly(*gauge_voter, false),
            AccountMeta::new(*epoch_gauge_voter, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Re-derive the epoch record's power from current escrow state. Valid only
/// while no votes have been committed for the epoch.
pub fn reset_epoch_gauge_voter(
    gaugemeister: &Pubkey,
    locker: &Pubkey,
    escrow: &Pubkey,
    gauge_voter: &Pubkey,
    epoch_gauge_voter: &Pubkey,
) -> Instruction {
    let data = instruction_discriminator("reset_epoch_gauge_voter").to_vec();
    Instruction {
        program_id: GAUGE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*gaugemeister, false),
            AccountMeta::new_readonly(*locker, false),
            AccountMeta::new_readonly(*escrow, false),
            AccountMeta::new_readonly(*gauge_voter, false),
            AccountMeta::new(*epoch_gauge_voter, false),
        ],
        data,
    }
}

/// Create the per-(gauge, epoch) aggregation record. Must precede the first
/// commit referencing it; a duplicate create fails as a no-op on chain.
pub fn create_epoch_gauge(
    epoch_gauge: &Pubkey,
    epoch_gauge_bump: u8,
    gauge: &Pubkey,
    voting_epoch: u32,
    payer: &Pubkey,
) -> Instruction {
    let mut data = instruction_discriminator("create_epoch_gauge").to_vec();
    data.push(epoch_gauge_bump);
    data.extend_from_slice(&voting_epoch.to_le_bytes());
    Instruction {
        program_id: GAUGE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*epoch_gauge, false),
            AccountMeta::new_readonly(*gauge, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Commit one gauge's stored weight into the epoch records.
#[allow(clippy::too_many_arguments)]
pub fn gauge_commit_vote_v2(
    gaugemeister: &Pubkey,
    gauge: &Pubkey,
    gauge_voter: &Pubkey,
    gauge_vote: &Pubkey,
    epoch_gauge: &Pubkey,
    epoch_gauge_voter: &Pubkey,
    epoch_gauge_vote: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    let data = instruction_discriminator("gauge_commit_vote_v2").to_vec();
    Instruction {
        program_id: GAUGE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*gaugemeister, false),
            AccountMeta::new_readonly(*gauge, false),
            AccountMeta::new_readonly(*gauge_voter, false),
            AccountMeta::new_readonly(*gauge_vote, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new(*epoch_gauge, false),
            AccountMeta::new(*epoch_gauge_voter, false),
            AccountMeta::new(*epoch_gauge_vote, false),
        ],
        data,
    }
}
