//! Gauge program domain layer
//!
//! Everything the pipeline needs to know about the on-chain gauge system:
//! - **addresses**: deterministic program-derived address derivations
//! - **state**: parsers for the three accounts the bot reads
//! - **instructions**: encoders for the four instructions the bot emits
//!
//! The on-chain program itself enforces vote-commit validity; this layer
//! only mirrors its address scheme and wire formats.

pub mod addresses;
pub mod instructions;
pub mod state;

pub use addresses::{
    find_epoch_gauge_address, find_epoch_gauge_vote_address, find_epoch_gauge_voter_address,
    find_escrow_address, find_gauge_address, find_gauge_vote_address, find_gauge_voter_address,
    find_quarry_address, GAUGE_PROGRAM_ID, LOCKED_VOTER_PROGRAM_ID, QUARRY_MINE_PROGRAM_ID,
};
pub use state::{EpochGaugeVoter, GaugeVote, Gaugemeister, StateError};
