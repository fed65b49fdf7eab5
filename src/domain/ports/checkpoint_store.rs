//! Checkpoint store port - durable persistence for solver state.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::Checkpoint;

/// Errors from checkpoint persistence.
///
/// Persistence is best-effort durability: the engine logs these and keeps
/// searching in memory rather than aborting.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for checkpoint storage backends.
///
/// The engine saves after every oracle evaluation and loads once at
/// startup; a resumed run never replays state older than the last
/// completed save.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the persisted checkpoint, or `None` when no run has been
    /// persisted yet.
    async fn load(&self) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Persist a checkpoint, replacing any previous one.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;
}
