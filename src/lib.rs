//! Gaugebot - Automated gauge vote committer
//!
//! This library exposes the pipeline modules for testing and integration
//! purposes. The binary in `main.rs` is a thin CLI wrapper around
//! [`engine::VoteEngine`].

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod feeds;
pub mod gauge;
pub mod ledger;
pub mod tx;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
