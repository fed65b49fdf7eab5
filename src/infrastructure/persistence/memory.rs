//! In-memory checkpoint store for tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::Checkpoint;
use crate::domain::ports::{CheckpointStore, PersistenceError};

/// Checkpoint store that keeps the latest snapshot in memory and counts
/// saves, so tests can assert checkpoint-after-every-evaluation behavior.
#[derive(Default)]
pub struct MemoryStore {
    checkpoint: Mutex<Option<Checkpoint>>,
    saves: AtomicU64,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with a checkpoint, as if a previous run had
    /// persisted it.
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint: Mutex::new(Some(checkpoint)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of saves performed.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// The most recently saved checkpoint, if any.
    pub async fn latest(&self) -> Option<Checkpoint> {
        self.checkpoint.lock().await.clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self) -> Result<Option<Checkpoint>, PersistenceError> {
        Ok(self.checkpoint.lock().await.clone())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        *self.checkpoint.lock().await = Some(checkpoint.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Assignment, BestState, ConfidenceModel, ConfirmedMap};

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let model = ConfidenceModel::new(1, 2);
        let confirmed = ConfirmedMap::new(1);
        let best = BestState::new(Assignment::uniform(1));
        let checkpoint = Checkpoint::capture(&model, &confirmed, &best, &[], 0, 1, 10);

        store.save(&checkpoint).await.unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().await.unwrap().unwrap(), checkpoint);
    }
}
