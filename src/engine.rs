//! Vote engine
//!
//! One voter's full path (resolve -> assemble -> budget -> build -> submit)
//! is the unit of work; voters are processed with bounded concurrency,
//! serialized by default. The vote-state check at the head of the path is
//! the idempotency gate: it is evaluated fresh on every run and is what
//! prevents double-voting an epoch, including after partial failures.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::feeds::{self, Voter};
use crate::gauge::instructions::{
    create_epoch_gauge, gauge_commit_vote_v2, prepare_epoch_gauge_voter, reset_epoch_gauge_voter,
};
use crate::gauge::{
    find_epoch_gauge_address, find_epoch_gauge_vote_address, find_epoch_gauge_voter_address,
    find_escrow_address, find_gauge_vote_address, find_gauge_voter_address, EpochGaugeVoter,
    GaugeVote, Gaugemeister,
};
use crate::ledger::{read_accounts, LedgerClient};
use crate::tx::{
    build_transaction, estimate_compute_units, submit_transaction, EstimateOptions,
};
use crate::wallet::WalletManager;

/// Why a voter needs no transaction this epoch. Not an error; the run
/// continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No gauge-voter record and no epoch record: nothing to vote on
    NeverParticipated,
    /// The epoch record already carries allocated power
    AlreadyVoted,
}

/// Per-(voter, epoch) state of the epoch-scoped voting record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NeverParticipated,
    NeedsPreparation,
    NeedsReset,
    AlreadyVoted { allocated_power: u64 },
}

/// Assembly result for one voter
#[derive(Debug, Clone)]
pub enum VotePlan {
    Skip(SkipReason),
    Commit { instructions: Vec<Instruction> },
}

/// Final outcome for one voter
#[derive(Debug)]
pub enum VoterOutcome {
    Committed { signature: Signature },
    DryRun { instruction_count: usize },
    Skipped(SkipReason),
    Failed { reason: String },
}

/// Overall result of one run
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Success-equivalent early exit; nothing needed doing
    NothingToDo { reason: String },
    Completed {
        committed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Classify the epoch-scoped voting record. Reads the epoch record, and
/// only when that is absent, the base gauge-voter record; a voter who has
/// neither never participated and none of the record's children are
/// touched.
pub async fn resolve_vote_state<L: LedgerClient + ?Sized>(
    ledger: &L,
    gauge_voter: &Pubkey,
    epoch_gauge_voter: &Pubkey,
) -> Result<VoteState> {
    match ledger.account(epoch_gauge_voter).await? {
        None => {
            if ledger.account(gauge_voter).await?.is_none() {
                Ok(VoteState::NeverParticipated)
            } else {
                Ok(VoteState::NeedsPreparation)
            }
        }
        Some(account) => {
            let record = EpochGaugeVoter::deserialize(&account.data)?;
            if record.allocated_power != 0 {
                Ok(VoteState::AlreadyVoted {
                    allocated_power: record.allocated_power,
                })
            } else {
                Ok(VoteState::NeedsReset)
            }
        }
    }
}

/// Build the per-gauge commit sequence: gauges whose stored weight is zero
/// or absent are dropped (each instruction costs transaction space and
/// fee), and a create instruction is emitted for an epoch aggregation
/// record if and only if it does not yet exist.
pub async fn plan_gauge_commits<L: LedgerClient + ?Sized>(
    ledger: &L,
    gaugemeister: &Pubkey,
    gauge_voter: &Pubkey,
    gauges: &[Pubkey],
    voting_epoch: u32,
    payer: &Pubkey,
) -> Result<Vec<Instruction>> {
    let gauge_votes: Vec<Pubkey> = gauges
        .iter()
        .map(|gauge| find_gauge_vote_address(gauge_voter, gauge).0)
        .collect();
    let vote_accounts = read_accounts(ledger, &gauge_votes).await?;

    let mut weighted: Vec<(Pubkey, Pubkey)> = Vec::new();
    for ((gauge, gauge_vote), account) in gauges.iter().zip(&gauge_votes).zip(vote_accounts) {
        let Some(account) = account else { continue };
        let record = GaugeVote::deserialize(&account.data)?;
        if record.weight != 0 {
            weighted.push((*gauge, *gauge_vote));
        }
    }

    let epoch_gauges: Vec<(Pubkey, u8)> = weighted
        .iter()
        .map(|(gauge, _)| find_epoch_gauge_address(gauge, voting_epoch))
        .collect();
    let epoch_gauge_keys: Vec<Pubkey> = epoch_gauges.iter().map(|(key, _)| *key).collect();
    let existing = read_accounts(ledger, &epoch_gauge_keys).await?;

    let (epoch_gauge_voter, _) = find_epoch_gauge_voter_address(gauge_voter, voting_epoch);
    let instructions = weighted
        .iter()
        .zip(&epoch_gauges)
        .zip(existing)
        .flat_map(|(((gauge, gauge_vote), (epoch_gauge, bump)), existing)| {
            let (epoch_gauge_vote, _) = find_epoch_gauge_vote_address(gauge_vote, voting_epoch);
            let create = existing
                .is_none()
                .then(|| create_epoch_gauge(epoch_gauge, *bump, gauge, voting_epoch, payer));
            let commit = gauge_commit_vote_v2(
                gaugemeister,
                gauge,
                gauge_voter,
                gauge_vote,
                epoch_gauge,
                &epoch_gauge_voter,
                &epoch_gauge_vote,
                payer,
            );
            create.into_iter().chain(std::iter::once(commit))
        })
        .collect();

    Ok(instructions)
}

/// Assemble the full ordered instruction list for one voter: the
/// prepare/reset instruction first, then the per-gauge commits.
pub async fn assemble_vote_instructions<L: LedgerClient + ?Sized>(
    ledger: &L,
    gaugemeister: &Pubkey,
    locker: &Pubkey,
    owner: &Pubkey,
    gauges: &[Pubkey],
    voting_epoch: u32,
    payer: &Pubkey,
) -> Result<VotePlan> {
    let (escrow, _) = find_escrow_address(locker, owner);
    let (gauge_voter, _) = find_gauge_voter_address(gaugemeister, &escrow);
    let (epoch_gauge_voter, epoch_gauge_voter_bump) =
        find_epoch_gauge_voter_address(&gauge_voter, voting_epoch);

    let state = resolve_vote_state(ledger, &gauge_voter, &epoch_gauge_voter).await?;
    let base = match state {
        VoteState::NeverParticipated => return Ok(VotePlan::Skip(SkipReason::NeverParticipated)),
        VoteState::AlreadyVoted { allocated_power } => {
            info!(owner = %owner, allocated_power, "Already voted this epoch");
            return Ok(VotePlan::Skip(SkipReason::AlreadyVoted));
        }
        VoteState::NeedsPreparation => prepare_epoch_gauge_voter(
            gaugemeister,
            locker,
            &escrow,
            &gauge_voter,
            &epoch_gauge_voter,
            epoch_gauge_voter_bump,
            payer,
        ),
        VoteState::NeedsReset => reset_epoch_gauge_voter(
            gaugemeister,
            locker,
            &escrow,
            &gauge_voter,
            &epoch_gauge_voter,
        ),
    };

    let commits = plan_gauge_commits(
        ledger,
        gaugemeister,
        &gauge_voter,
        gauges,
        voting_epoch,
        payer,
    )
    .await?;

    let instructions = std::iter::once(base).chain(commits).collect();
    Ok(VotePlan::Commit { instructions })
}

/// Orchestrates one run: epoch gating, voter selection, and the per-voter
/// pipeline.
pub struct VoteEngine<L: LedgerClient + 'static> {
    ledger: Arc<L>,
    wallet: WalletManager,
    checkpoint: CheckpointStore,
    http: reqwest::Client,
    config: Config,
}

impl<L: LedgerClient + 'static> VoteEngine<L> {
    pub fn new(
        ledger: Arc<L>,
        wallet: WalletManager,
        checkpoint: CheckpointStore,
        config: Config,
    ) -> Self {
        Self {
            ledger,
            wallet,
            checkpoint,
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn run(&self, dry_run: bool) -> Result<RunStatus> {
        let gaugemeister_key = Pubkey::from_str(&self.config.governance.gaugemeister)
            .context("Bad gaugemeister address in config")?;
        let rewarder = Pubkey::from_str(&self.config.governance.rewarder)
            .context("Bad rewarder address in config")?;

        let Some(account) = self.ledger.account(&gaugemeister_key).await? else {
            warn!(gaugemeister = %gaugemeister_key, "Gaugemeister account not found");
            return Ok(RunStatus::NothingToDo {
                reason: "gaugemeister not found".to_string(),
            });
        };
        let gaugemeister = match Gaugemeister::deserialize(&account.data) {
            Ok(gaugemeister) => gaugemeister,
            Err(e) => {
                warn!(error = %e, "Gaugemeister account unreadable");
                return Ok(RunStatus::NothingToDo {
                    reason: "gaugemeister unreadable".to_string(),
                });
            }
        };

        let current_epoch = gaugemeister.current_rewards_epoch;
        let voting_epoch = gaugemeister.voting_epoch();
        info!(
            current_epoch,
            voting_epoch,
            last_epoch = ?self.checkpoint.last_epoch()?,
            "Epoch state"
        );
        if self.checkpoint.already_processed(current_epoch)? {
            info!(current_epoch, "Epoch already processed");
            return Ok(RunStatus::NothingToDo {
                reason: format!("epoch {} already processed", current_epoch),
            });
        }

        let holders = feeds::fetch_escrow_holders(&self.http, &self.config.feeds.voters_url).await?;
        let now = chrono::Utc::now().timestamp();
        let voters = feeds::eligible_voters(
            &holders,
            self.config.governance.min_voting_power,
            &self.config.governance.whitelist,
            now,
        )?;
        info!(eligible = voters.len(), total = holders.len(), "Voter snapshot");

        let gauges = feeds::fetch_gauge_set(
            &self.http,
            &self.config.feeds.gauge_list_url,
            &rewarder,
            &gaugemeister_key,
        )
        .await?;
        info!(gauges = gauges.len(), "Gauge set");

        let total = voters.len();
        let outcomes: Vec<VoterOutcome> = stream::iter(voters.iter().enumerate())
            .map(|(index, voter)| {
                let gauges = &gauges;
                let gaugemeister_key = &gaugemeister_key;
                async move {
                    let outcome = self
                        .process_voter(voter, gaugemeister_key, gauges, voting_epoch, dry_run)
                        .await;
                    match &outcome {
                        VoterOutcome::Committed { signature } => {
                            info!(owner = %voter.owner, signature = %signature, "Votes committed")
                        }
                        VoterOutcome::DryRun { instruction_count } => {
                            info!(owner = %voter.owner, instruction_count, "Dry run, not submitted")
                        }
                        VoterOutcome::Skipped(reason) => {
                            info!(owner = %voter.owner, reason = ?reason, "Skipped")
                        }
                        VoterOutcome::Failed { reason } => {
                            warn!(owner = %voter.owner, reason = %reason, "Voter failed")
                        }
                    }
                    info!("Processed {} of {} voters", index + 1, total);
                    outcome
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let committed = outcomes
            .iter()
            .filter(|o| matches!(o, VoterOutcome::Committed { .. } | VoterOutcome::DryRun { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, VoterOutcome::Skipped(_)))
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, VoterOutcome::Failed { .. }))
            .count();

        // The checkpoint is written once, after every voter was attempted,
        // even when some of them failed terminally.
        if !dry_run {
            self.checkpoint.record_epoch(current_epoch)?;
        }
        info!(committed, skipped, failed, current_epoch, "Run complete");

        Ok(RunStatus::Completed {
            committed,
            skipped,
            failed,
        })
    }

    /// One voter's full path. Errors become an explicit failure outcome;
    /// they never abort the run for the other voters.
    async fn process_voter(
        &self,
        voter: &Voter,
        gaugemeister: &Pubkey,
        gauges: &[Pubkey],
        voting_epoch: u32,
        dry_run: bool,
    ) -> VoterOutcome {
        match self
            .try_process_voter(voter, gaugemeister, gauges, voting_epoch, dry_run)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => VoterOutcome::Failed {
                reason: format!("{:#}", e),
            },
        }
    }

    async fn try_process_voter(
        &self,
        voter: &Voter,
        gaugemeister: &Pubkey,
        gauges: &[Pubkey],
        voting_epoch: u32,
        dry_run: bool,
    ) -> Result<VoterOutcome> {
        info!(owner = %voter.owner, voting_power = voter.voting_power, "Processing voter");
        let payer = self.wallet.pubkey();

        let plan = assemble_vote_instructions(
            self.ledger.as_ref(),
            gaugemeister,
            &voter.locker,
            &voter.owner,
            gauges,
            voting_epoch,
            &payer,
        )
        .await?;
        let instructions = match plan {
            VotePlan::Skip(reason) => return Ok(VoterOutcome::Skipped(reason)),
            VotePlan::Commit { instructions } => instructions,
        };

        let estimated_units = estimate_compute_units(
            self.ledger.as_ref(),
            &instructions,
            &payer,
            &EstimateOptions::default(),
        )
        .await?;
        let prepared =
            build_transaction(self.ledger.as_ref(), &instructions, &payer, estimated_units).await?;

        if dry_run {
            return Ok(VoterOutcome::DryRun {
                instruction_count: instructions.len(),
            });
        }

        let signature = submit_transaction(
            Arc::clone(&self.ledger),
            &prepared,
            &[self.wallet.keypair_arc()],
        )
        .await?;
        Ok(VoterOutcome::Committed { signature })
    }
}
