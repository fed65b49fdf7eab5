//! Oracle port - interface to the external scoring system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::Assignment;

/// Raw result of one oracle evaluation, before interpretation.
///
/// The score arrives as free text (or not at all); the engine runs it
/// through the score interpreter and never trusts it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvaluation {
    /// Adapter-defined status string, for logging.
    pub status: String,
    /// Raw score text, e.g. `"23/30"`. `None` when the adapter could not
    /// read a score at all.
    pub raw_score: Option<String>,
}

/// Errors an oracle adapter can signal.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Rate limited by the external system; retry after backoff.
    #[error("Oracle rate limited")]
    RateLimited,

    /// The request timed out.
    #[error("Oracle timed out")]
    Timeout,

    /// Transient failure (connectivity, 5xx); retry after backoff.
    #[error("Transient oracle error: {0}")]
    Transient(String),

    /// Irrecoverable failure; the run must abort.
    #[error("Fatal oracle error: {0}")]
    Fatal(String),
}

impl OracleError {
    /// Whether the error should be retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::RateLimited | OracleError::Timeout | OracleError::Transient(_)
        )
    }
}

/// Trait for oracle implementations.
///
/// The oracle evaluates one complete assignment and reveals only an
/// aggregate correctness count. It represents a single shared external
/// session: calls must never be issued concurrently, and the engine
/// guarantees strictly sequential access.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Adapter name, for logs.
    fn name(&self) -> &'static str;

    /// Evaluate a complete assignment.
    async fn evaluate(&self, assignment: &Assignment) -> Result<RawEvaluation, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(OracleError::RateLimited.is_transient());
        assert!(OracleError::Timeout.is_transient());
        assert!(OracleError::Transient("connection reset".into()).is_transient());
        assert!(!OracleError::Fatal("session expired".into()).is_transient());
    }
}
