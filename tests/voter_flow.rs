//! End-to-end voter flow over an in-memory ledger
//!
//! Drives the full engine (epoch gating, feeds, resolve, assemble, build,
//! submit) against a fake ledger whose broadcast applies the on-chain
//! effect, and checks that an immediate re-run observes the committed vote
//! and performs no further mutation.

use anyhow::Result;
use async_trait::async_trait;
use gaugebot::checkpoint::CheckpointStore;
use gaugebot::config::Config;
use gaugebot::engine::{RunStatus, VoteEngine};
use gaugebot::gauge::state::account_discriminator;
use gaugebot::gauge::{
    find_epoch_gauge_voter_address, find_escrow_address, find_gauge_address,
    find_gauge_vote_address, find_gauge_voter_address, find_quarry_address, GAUGE_PROGRAM_ID,
};
use gaugebot::ledger::{LedgerClient, SimulationOutcome};
use gaugebot::wallet::WalletManager;
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Account encoders mirroring the on-chain layouts the bot parses

fn encode_gaugemeister(rewarder: &Pubkey, locker: &Pubkey, current_rewards_epoch: u32) -> Vec<u8> {
    let mut data = account_discriminator("Gaugemeister").to_vec();
    data.extend_from_slice(Pubkey::new_unique().as_ref()); // base
    data.push(255); // bump
    data.extend_from_slice(rewarder.as_ref());
    data.extend_from_slice(Pubkey::new_unique().as_ref()); // operator
    data.extend_from_slice(Pubkey::new_unique().as_ref()); // foreman
    data.extend_from_slice(&604_800u32.to_le_bytes()); // epoch duration
    data.extend_from_slice(&current_rewards_epoch.to_le_bytes());
    data.extend_from_slice(&1_730_000_000u64.to_le_bytes()); // next epoch start
    data.extend_from_slice(Pubkey::new_unique().as_ref()); // locker token mint
    data.extend_from_slice(Pubkey::new_unique().as_ref()); // locker governor
    data.extend_from_slice(locker.as_ref());
    data
}

fn encode_epoch_gauge_voter(gauge_voter: &Pubkey, voting_epoch: u32, allocated_power: u64) -> Vec<u8> {
    let mut data = account_discriminator("EpochGaugeVoter").to_vec();
    data.extend_from_slice(gauge_voter.as_ref());
    data.extend_from_slice(&voting_epoch.to_le_bytes());
    data.push(255);
    data.extend_from_slice(&1u64.to_le_bytes()); // weight change seqno
    data.extend_from_slice(&1_000_000u64.to_le_bytes()); // voting power
    data.extend_from_slice(&allocated_power.to_le_bytes());
    data
}

fn encode_gauge_vote(gauge_voter: &Pubkey, gauge: &Pubkey, weight: u32) -> Vec<u8> {
    let mut data = account_discriminator("GaugeVote").to_vec();
    data.extend_from_slice(gauge_voter.as_ref());
    data.extend_from_slice(gauge.as_ref());
    data.push(254);
    data.extend_from_slice(&weight.to_le_bytes());
    data
}

fn gauge_account(data: Vec<u8>) -> Account {
    Account {
        lamports: 1,
        data,
        owner: GAUGE_PROGRAM_ID,
        executable: false,
        rent_epoch: 0,
    }
}

/// In-memory ledger. Broadcasting applies a prepared set of account
/// writes, standing in for the on-chain program executing the
/// transaction.
struct FakeLedger {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    on_broadcast_insert: Mutex<Vec<(Pubkey, Account)>>,
    broadcasts: Mutex<u32>,
}

impl FakeLedger {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            on_broadcast_insert: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(0),
        }
    }

    fn insert(&self, key: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(key, account);
    }

    fn broadcasts(&self) -> u32 {
        *self.broadcasts.lock().unwrap()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn account_batch(&self, keys: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let accounts = self.accounts.lock().unwrap();
        Ok(keys.iter().map(|k| accounts.get(k).cloned()).collect())
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok((Hash::new_unique(), 5000))
    }

    async fn simulate(&self, _tx: &VersionedTransaction) -> Result<SimulationOutcome> {
        Ok(SimulationOutcome {
            units_consumed: Some(55_000),
            err: None,
        })
    }

    async fn broadcast(&self, _tx: &VersionedTransaction) -> Result<Signature> {
        *self.broadcasts.lock().unwrap() += 1;
        let writes: Vec<(Pubkey, Account)> =
            self.on_broadcast_insert.lock().unwrap().drain(..).collect();
        let mut accounts = self.accounts.lock().unwrap();
        for (key, account) in writes {
            accounts.insert(key, account);
        }
        Ok(Signature::from([7u8; 64]))
    }

    async fn confirm(&self, _signature: &Signature, _height: u64) -> Result<()> {
        Ok(())
    }
}

struct World {
    ledger: Arc<FakeLedger>,
    config: Config,
    wallet: WalletManager,
    _server: mockito::ServerGuard,
    _checkpoint_dir: tempfile::TempDir,
}

async fn build_world() -> World {
    let mut server = mockito::Server::new_async().await;

    let rewarder = Pubkey::new_unique();
    let gaugemeister = Pubkey::new_unique();
    let locker = Pubkey::new_unique();
    let owner = Keypair::new().pubkey();
    let mint = Pubkey::new_unique();
    let voting_epoch = 42;

    // Holder feed: one self-delegated whale with a long-dated lock
    let holders = format!(
        r#"[{{"data":{{"locker":"{locker}","owner":"{owner}","bump":255,"tokens":"{mint}","amount":"1000000000000","escrowStartedAt":"1700000000","escrowEndsAt":"4102444800","voteDelegate":"{owner}"}}}}]"#
    );
    server
        .mock("GET", "/holders.json")
        .with_status(200)
        .with_body(holders)
        .create_async()
        .await;
    server
        .mock("GET", "/list.json")
        .with_status(200)
        .with_body(format!(r#"{{"validator":"{mint}"}}"#))
        .create_async()
        .await;

    let ledger = Arc::new(FakeLedger::new());

    // Gaugemeister: current epoch 41, so the bot votes for epoch 42
    ledger.insert(
        gaugemeister,
        gauge_account(encode_gaugemeister(&rewarder, &locker, voting_epoch - 1)),
    );

    // The voter participated before: base record exists, weight stored
    let (escrow, _) = find_escrow_address(&locker, &owner);
    let (gauge_voter, _) = find_gauge_voter_address(&gaugemeister, &escrow);
    ledger.insert(gauge_voter, gauge_account(vec![1]));

    let (quarry, _) = find_quarry_address(&rewarder, &mint);
    let (gauge, _) = find_gauge_address(&gaugemeister, &quarry);
    let (gauge_vote, _) = find_gauge_vote_address(&gauge_voter, &gauge);
    ledger.insert(
        gauge_vote,
        gauge_account(encode_gauge_vote(&gauge_voter, &gauge, 500)),
    );

    // Broadcasting the transaction makes the chain materialize the epoch
    // record with the committed power
    let (epoch_gauge_voter, _) = find_epoch_gauge_voter_address(&gauge_voter, voting_epoch);
    ledger.on_broadcast_insert.lock().unwrap().push((
        epoch_gauge_voter,
        gauge_account(encode_epoch_gauge_voter(&gauge_voter, voting_epoch, 500)),
    ));

    let checkpoint_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.rpc.url = "http://unused.invalid".to_string();
    config.feeds.voters_url = format!("{}/holders.json", server.url());
    config.feeds.gauge_list_url = format!("{}/list.json", server.url());
    config.governance.gaugemeister = gaugemeister.to_string();
    config.governance.rewarder = rewarder.to_string();
    config.governance.min_voting_power = 50_000.0;
    config.checkpoint.path = checkpoint_dir
        .path()
        .join("checkpoint")
        .to_string_lossy()
        .into_owned();

    World {
        ledger,
        config,
        wallet: WalletManager::from_keypair(Keypair::new()),
        _server: server,
        _checkpoint_dir: checkpoint_dir,
    }
}

fn fresh_checkpoint() -> (tempfile::TempDir, CheckpointStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::open(dir.path().join("checkpoint").to_str().unwrap()).unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_commit_then_rerun_is_idempotent() {
    let world = build_world().await;

    // First run commits the vote
    let store = CheckpointStore::open(&world.config.checkpoint.path).unwrap();
    let engine = VoteEngine::new(
        Arc::clone(&world.ledger),
        world.wallet.clone(),
        store,
        world.config.clone(),
    );
    let status = engine.run(false).await.unwrap();
    assert_eq!(
        status,
        RunStatus::Completed {
            committed: 1,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(world.ledger.broadcasts(), 1);
    drop(engine); // releases the sled lock on the checkpoint path

    // Re-run with the checkpoint intact: the epoch gate short-circuits
    let store = CheckpointStore::open(&world.config.checkpoint.path).unwrap();
    let engine = VoteEngine::new(
        Arc::clone(&world.ledger),
        world.wallet.clone(),
        store,
        world.config.clone(),
    );
    let status = engine.run(false).await.unwrap();
    assert!(matches!(status, RunStatus::NothingToDo { .. }));
    assert_eq!(world.ledger.broadcasts(), 1);
    drop(engine);

    // Re-run as if the checkpoint write had been lost: the on-chain state
    // gate still prevents a second vote
    let (_dir, store) = fresh_checkpoint();
    let engine = VoteEngine::new(
        Arc::clone(&world.ledger),
        world.wallet.clone(),
        store,
        world.config.clone(),
    );
    let status = engine.run(false).await.unwrap();
    assert_eq!(
        status,
        RunStatus::Completed {
            committed: 0,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(world.ledger.broadcasts(), 1);
}

#[tokio::test]
async fn test_dry_run_submits_nothing_and_keeps_checkpoint() {
    let world = build_world().await;

    let store = CheckpointStore::open(&world.config.checkpoint.path).unwrap();
    let engine = VoteEngine::new(
        Arc::clone(&world.ledger),
        world.wallet.clone(),
        store,
        world.config.clone(),
    );
    let status = engine.run(true).await.unwrap();
    assert_eq!(
        status,
        RunStatus::Completed {
            committed: 1,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(world.ledger.broadcasts(), 0);
    drop(engine);

    // Checkpoint untouched, so a real run afterwards still proceeds
    let store = CheckpointStore::open(&world.config.checkpoint.path).unwrap();
    assert_eq!(store.last_epoch().unwrap(), None);
}

#[tokio::test]
async fn test_missing_gaugemeister_is_a_noop() {
    let world = build_world().await;
    let mut config = world.config.clone();
    config.governance.gaugemeister = Pubkey::new_unique().to_string();

    let (_dir, store) = fresh_checkpoint();
    let engine = VoteEngine::new(Arc::clone(&world.ledger), world.wallet.clone(), store, config);
    let status = engine.run(false).await.unwrap();
    assert!(matches!(status, RunStatus::NothingToDo { .. }));
    assert_eq!(world.ledger.broadcasts(), 0);
}
