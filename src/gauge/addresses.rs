//! Program-derived address derivations
//!
//! Pure functions of fixed seeds, program id, and inputs; no network I/O.
//! Epoch-scoped seeds encode the voting epoch as little-endian u32.

use solana_sdk::pubkey::Pubkey;

/// Quarry gauge program
pub const GAUGE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("GaugesLJrnVjNNWLReiw3Q7xQhycSBRgeHGTMDUaX231");

/// Quarry mine program (quarry addresses for staked-token mints)
pub const QUARRY_MINE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("QMNeHCGYnLVDn1icRAfQZpjPLBNkfGbSKRB83G5d8KB");

/// Locked-voter program (escrow addresses)
pub const LOCKED_VOTER_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("LocktDzaV1W2Bm9DeZeiyz4J9zs4fRqNiYqQyracRXw");

/// Escrow backing an owner's locked stake position
pub fn find_escrow_address(locker: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"Escrow", locker.as_ref(), owner.as_ref()],
        &LOCKED_VOTER_PROGRAM_ID,
    )
}

/// Quarry for a staked-token mint under a rewarder
pub fn find_quarry_address(rewarder: &Pubkey, token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"Quarry", rewarder.as_ref(), token_mint.as_ref()],
        &QUARRY_MINE_PROGRAM_ID,
    )
}

/// Gauge for a quarry under a gaugemeister
pub fn find_gauge_address(gaugemeister: &Pubkey, quarry: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"Gauge", gaugemeister.as_ref(), quarry.as_ref()],
        &GAUGE_PROGRAM_ID,
    )
}

/// Per-escrow gauge voter record
pub fn find_gauge_voter_address(gaugemeister: &Pubkey, escrow: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"GaugeVoter", gaugemeister.as_ref(), escrow.as_ref()],
        &GAUGE_PROGRAM_ID,
    )
}

/// Persistent per-(voter, gauge) weight record
pub fn find_gauge_vote_address(gauge_voter: &Pubkey, gauge: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"GaugeVote", gauge_voter.as_ref(), gauge.as_ref()],
        &GAUGE_PROGRAM_ID,
    )
}

/// Epoch-scoped voter record (total allocated power for one epoch)
pub fn find_epoch_gauge_voter_address(gauge_voter: &Pubkey, voting_epoch: u32) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            b"EpochGaugeVoter",
            gauge_voter.as_ref(),
            &voting_epoch.to_le_bytes(),
        ],
        &GAUGE_PROGRAM_ID,
    )
}

/// Epoch-scoped per-gauge aggregation record
pub fn find_epoch_gauge_address(gauge: &Pubkey, voting_epoch: u32) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"EpochGauge", gauge.as_ref(), &voting_epoch.to_le_bytes()],
        &GAUGE_PROGRAM_ID,
    )
}

/// Epoch-scoped per-(voter, gauge) committed vote record
pub fn find_epoch_gauge_vote_address(gauge_vote: &Pubkey, voting_epoch: u32) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            b"EpochGaugeVote",
            gauge_vote.as_ref(),
            &voting_epoch.to_le_bytes(),
        ],
        &GAUGE_PROGRAM_ID,
    )
}
