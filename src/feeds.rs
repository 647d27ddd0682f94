//! Remote data feeds
//!
//! Two JSON feeds drive a run: the escrow-holder snapshot (who can vote,
//! with how much locked) and the staked-token registry the gauge set is
//! derived from. Both are treated as point-in-time snapshots.

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::gauge::{find_gauge_address, find_quarry_address};

/// Maximum lock duration; a lock this long decays to zero over five years
pub const MAX_LOCK_SECONDS: i64 = 5 * 365 * 86400;

/// Scale factor applied to the decayed locked amount
pub const POWER_SCALE: f64 = 10.0;

/// One escrow position as published by the holder feed. Numeric fields
/// arrive as JSON strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowData {
    pub locker: String,
    pub owner: String,
    pub amount: String,
    pub escrow_started_at: String,
    pub escrow_ends_at: String,
    pub vote_delegate: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscrowHolder {
    pub data: EscrowData,
}

/// A holder that passed eligibility, with resolved addresses
#[derive(Debug, Clone)]
pub struct Voter {
    pub owner: Pubkey,
    pub locker: Pubkey,
    pub voting_power: f64,
}

/// Linear-decay voting power: the locked amount scaled by the remaining
/// lock fraction. Zero elapsed time on a full-length lock yields the
/// undecayed scaled amount; expired locks clamp to zero.
pub fn voting_power(amount: u64, escrow_ends_at: i64, now: i64) -> f64 {
    let remaining = escrow_ends_at.saturating_sub(now);
    let power = (amount as f64 * remaining as f64 / MAX_LOCK_SECONDS as f64) * POWER_SCALE;
    power.max(0.0)
}

impl EscrowHolder {
    /// Computed voting power at `now`, or zero when numeric fields are
    /// malformed (the feed is external input).
    pub fn voting_power(&self, now: i64) -> f64 {
        let amount = match self.data.amount.parse::<u64>() {
            Ok(amount) => amount,
            Err(_) => {
                warn!(owner = %self.data.owner, amount = %self.data.amount, "Unparseable escrow amount");
                return 0.0;
            }
        };
        let ends_at = match self.data.escrow_ends_at.parse::<i64>() {
            Ok(ends_at) => ends_at,
            Err(_) => {
                warn!(owner = %self.data.owner, "Unparseable escrow end time");
                return 0.0;
            }
        };
        voting_power(amount, ends_at, now)
    }

    /// A holder may only be voted for when self-delegated
    pub fn is_self_delegated(&self) -> bool {
        self.data.owner == self.data.vote_delegate
    }
}

/// Fetch the escrow-holder snapshot
pub async fn fetch_escrow_holders(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<EscrowHolder>> {
    let holders: Vec<EscrowHolder> = client
        .get(url)
        .send()
        .await
        .context("Holder feed request failed")?
        .error_for_status()
        .context("Holder feed returned an error status")?
        .json()
        .await
        .context("Holder feed returned malformed JSON")?;
    Ok(holders)
}

/// Filter the snapshot down to voters worth acting for: self-delegated,
/// and above the power threshold (scaled by 1e6) or whitelisted.
pub fn eligible_voters(
    holders: &[EscrowHolder],
    min_voting_power: f64,
    whitelist: &[String],
    now: i64,
) -> Result<Vec<Voter>> {
    let threshold = min_voting_power * 1e6;
    let mut voters = Vec::new();
    for holder in holders {
        if !holder.is_self_delegated() {
            debug!(owner = %holder.data.owner, "Skipping delegated escrow");
            continue;
        }
        let power = holder.voting_power(now);
        if power <= threshold && !whitelist.contains(&holder.data.owner) {
            continue;
        }
        voters.push(Voter {
            owner: Pubkey::from_str(&holder.data.owner)
                .with_context(|| format!("Bad owner address in feed: {}", holder.data.owner))?,
            locker: Pubkey::from_str(&holder.data.locker)
                .with_context(|| format!("Bad locker address in feed: {}", holder.data.locker))?,
            voting_power: power,
        });
    }
    Ok(voters)
}

/// Fetch the staked-token registry and derive the fixed, ordered gauge set
/// for this run: token mint -> quarry -> gauge. Registry entries are
/// ordered by name so the set is deterministic.
pub async fn fetch_gauge_set(
    client: &reqwest::Client,
    url: &str,
    rewarder: &Pubkey,
    gaugemeister: &Pubkey,
) -> Result<Vec<Pubkey>> {
    let registry: BTreeMap<String, String> = client
        .get(url)
        .send()
        .await
        .context("Gauge registry request failed")?
        .error_for_status()
        .context("Gauge registry returned an error status")?
        .json()
        .await
        .context("Gauge registry returned malformed JSON")?;

    registry
        .values()
        .map(|mint| {
            let mint = Pubkey::from_str(mint)
                .with_context(|| format!("Bad token mint in registry: {}", mint))?;
            let (quarry, _) = find_quarry_address(rewarder, &mint);
            let (gauge, _) = find_gauge_address(gaugemeister, &quarry);
            Ok(gauge)
        })
        .collect()
}
