//! Domain errors for the assay search engine.

use thiserror::Error;

/// Domain-level errors that can occur while driving a search.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Slot {slot} out of range (assignment has {num_slots} slots)")]
    SlotOutOfRange { slot: usize, num_slots: usize },

    #[error("Option {option} out of range (valid options are 1..={num_options})")]
    OptionOutOfRange { option: u8, num_options: u8 },

    #[error("Slot {slot} is already confirmed with option {existing}; refusing to overwrite with {proposed}")]
    ConfirmedConflict {
        slot: usize,
        existing: u8,
        proposed: u8,
    },

    #[error("Checkpoint is inconsistent: {0}")]
    CorruptCheckpoint(String),

    #[error("Advisor unavailable: {0}")]
    AdvisorUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
