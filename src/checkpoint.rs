//! Last-processed-epoch checkpoint store
//!
//! A single key/value pair in a local sled database. Read at startup to
//! decide whether the run has anything to do; written once, after all
//! voters have been attempted.

use anyhow::{Context, Result};

const LAST_EPOCH_KEY: &[u8] = b"last_voting_epoch";

pub struct CheckpointStore {
    db: sled::Db,
}

impl CheckpointStore {
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("Failed to open checkpoint store at {}", path))?;
        Ok(Self { db })
    }

    /// The last epoch a run completed for, if any
    pub fn last_epoch(&self) -> Result<Option<u32>> {
        let value = self
            .db
            .get(LAST_EPOCH_KEY)
            .context("Checkpoint read failed")?;
        match value {
            Some(bytes) => {
                let bytes: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .context("Corrupt checkpoint value")?;
                Ok(Some(u32::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    /// Record a completed epoch
    pub fn record_epoch(&self, epoch: u32) -> Result<()> {
        self.db
            .insert(LAST_EPOCH_KEY, epoch.to_be_bytes().to_vec())
            .context("Checkpoint write failed")?;
        self.db.flush().context("Checkpoint flush failed")?;
        Ok(())
    }

    /// Whether the current epoch was already handled by a previous run
    pub fn already_processed(&self, current_epoch: u32) -> Result<bool> {
        Ok(matches!(self.last_epoch()?, Some(last) if current_epoch <= last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().join("db").to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_fresh_store_has_no_epoch() {
        let (_dir, store) = temp_store();
        assert_eq!(store.last_epoch().unwrap(), None);
        assert!(!store.already_processed(0).unwrap());
    }

    #[test]
    fn test_roundtrip() {
        let (_dir, store) = temp_store();
        store.record_epoch(42).unwrap();
        assert_eq!(store.last_epoch().unwrap(), Some(42));
    }

    #[test]
    fn test_already_processed_gate() {
        let (_dir, store) = temp_store();
        store.record_epoch(42).unwrap();
        assert!(store.already_processed(41).unwrap());
        assert!(store.already_processed(42).unwrap());
        assert!(!store.already_processed(43).unwrap());
    }
}
