//! Search phases and run reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::assignment::Assignment;

/// The control-loop state machine.
///
/// `Searching -> Stuck -> BruteForce -> Searching` until a terminal phase
/// is reached. `Stuck` is transitional: it marks the stagnation threshold
/// being hit and immediately escalates to brute force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    /// Normal generate → evaluate → attribute iteration.
    Searching,
    /// Stagnation threshold reached; escalation pending.
    Stuck,
    /// Exhaustive enumeration of small uncertain-slot clusters.
    BruteForce,
    /// Every slot confirmed, or the best score hit the maximum.
    Converged,
    /// Attempt budget exhausted or the oracle failed fatally.
    Aborted,
}

impl SearchPhase {
    /// Whether the phase ends the run.
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchPhase::Converged | SearchPhase::Aborted)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All slots confirmed or best score reached the maximum.
    Converged,
    /// The oracle-call budget ran out first.
    BudgetExhausted,
    /// The oracle signalled an irrecoverable error.
    OracleFatal,
}

impl RunOutcome {
    /// Whether the run found the full hidden assignment.
    pub fn is_converged(self) -> bool {
        matches!(self, RunOutcome::Converged)
    }
}

/// Summary returned when a run ends, converged or not.
///
/// `final_answers` always holds a complete assignment: unconfirmed slots
/// are filled with their highest-weighted option, so an aborted run still
/// hands back its best knowledge instead of failing silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Best-known complete assignment.
    pub final_answers: Assignment,
    /// Score of the best assignment observed.
    pub best_score: u32,
    /// Slots with proven options.
    pub confirmed_slots: usize,
    /// Total slots.
    pub total_slots: usize,
    /// Oracle queries consumed, including skipped trials.
    pub total_trials: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}
