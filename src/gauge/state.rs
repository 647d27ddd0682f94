//! On-chain account parsers
//!
//! The bot reads three account types: the gaugemeister (current epoch),
//! epoch gauge voter records (allocated power), and gauge vote records
//! (per-gauge weight). Accounts are Anchor-encoded: an 8-byte
//! discriminator of `sha256("account:<Name>")` followed by the fields in
//! declaration order.

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Account data shorter than the declared layout
    #[error("Account data too short for {account}: {len} bytes")]
    TooShort { account: &'static str, len: usize },

    /// First 8 bytes do not match the expected account discriminator
    #[error("Discriminator mismatch for {account}")]
    DiscriminatorMismatch { account: &'static str },
}

/// Anchor account discriminator: first 8 bytes of sha256("account:<name>")
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{}", name).as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Sequential little-endian reader over account data
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
    account: &'static str,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], account: &'static str) -> Result<Self, StateError> {
        if data.len() < 8 {
            return Err(StateError::TooShort {
                account,
                len: data.len(),
            });
        }
        if data[..8] != account_discriminator(account) {
            return Err(StateError::DiscriminatorMismatch { account });
        }
        Ok(Self {
            data,
            offset: 8,
            account,
        })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        let end = self.offset + len;
        if end > self.data.len() {
            return Err(StateError::TooShort {
                account: self.account,
                len: self.data.len(),
            });
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn pubkey(&mut self) -> Result<Pubkey, StateError> {
        let bytes: [u8; 32] = self.take(32)?.try_into().expect("slice length checked");
        Ok(Pubkey::new_from_array(bytes))
    }

    fn u8(&mut self) -> Result<u8, StateError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, StateError> {
        Ok(u32::from_le_bytes(
            self.take(4)?.try_into().expect("slice length checked"),
        ))
    }

    fn u64(&mut self) -> Result<u64, StateError> {
        Ok(u64::from_le_bytes(
            self.take(8)?.try_into().expect("slice length checked"),
        ))
    }
}

/// Gaugemeister configuration account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gaugemeister {
    pub base: Pubkey,
    pub bump: u8,
    pub rewarder: Pubkey,
    pub operator: Pubkey,
    pub foreman: Pubkey,
    pub epoch_duration_seconds: u32,
    pub current_rewards_epoch: u32,
    pub next_epoch_starts_at: u64,
    pub locker_token_mint: Pubkey,
    pub locker_governor: Pubkey,
    pub locker: Pubkey,
}

impl Gaugemeister {
    pub const DISCRIMINATOR_NAME: &'static str = "Gaugemeister";

    pub fn deserialize(data: &[u8]) -> Result<Self, StateError> {
        let mut cur = Cursor::new(data, Self::DISCRIMINATOR_NAME)?;
        Ok(Self {
            base: cur.pubkey()?,
            bump: cur.u8()?,
            rewarder: cur.pubkey()?,
            operator: cur.pubkey()?,
            foreman: cur.pubkey()?,
            epoch_duration_seconds: cur.u32()?,
            current_rewards_epoch: cur.u32()?,
            next_epoch_starts_at: cur.u64()?,
            locker_token_mint: cur.pubkey()?,
            locker_governor: cur.pubkey()?,
            locker: cur.pubkey()?,
        })
    }

    /// Votes are committed one epoch ahead of activation
    pub fn voting_epoch(&self) -> u32 {
        self.current_rewards_epoch + 1
    }
}

/// Epoch-scoped voter record: total power allocated for one voting epoch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochGaugeVoter {
    pub gauge_voter: Pubkey,
    pub voting_epoch: u32,
    pub bump: u8,
    pub weight_change_seqno: u64,
    pub voting_power: u64,
    pub allocated_power: u64,
}

impl EpochGaugeVoter {
    pub const DISCRIMINATOR_NAME: &'static str = "EpochGaugeVoter";

    pub fn deserialize(data: &[u8]) -> Result<Self, StateError> {
        let mut cur = Cursor::new(data, Self::DISCRIMINATOR_NAME)?;
        Ok(Self {
            gauge_voter: cur.pubkey()?,
            voting_epoch: cur.u32()?,
            bump: cur.u8()?,
            weight_change_seqno: cur.u64()?,
            voting_power: cur.u64()?,
            allocated_power: cur.u64()?,
        })
    }
}

/// Persistent per-(voter, gauge) weight record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeVote {
    pub gauge_voter: Pubkey,
    pub gauge: Pubkey,
    pub bump: u8,
    pub weight: u32,
}

impl GaugeVote {
    pub const DISCRIMINATOR_NAME: &'static str = "GaugeVote";

    pub fn deserialize(data: &[u8]) -> Result<Self, StateError> {
        let mut cur = Cursor::new(data, Self::DISCRIMINATOR_NAME)?;
        Ok(Self {
            gauge_voter: cur.pubkey()?,
            gauge: cur.pubkey()?,
            bump: cur.u8()?,
            weight: cur.u32()?,
        })
    }
}
