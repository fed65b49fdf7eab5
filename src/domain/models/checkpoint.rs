//! Durable checkpoint of all mutable solver state.
//!
//! The checkpoint is rewritten after every oracle evaluation and loaded
//! once at process start, so an interrupted run resumes exactly where it
//! left off. The JSON layout is the wire format consumed by read-only
//! collaborators (status display, dashboards); maps use string keys in
//! `BTreeMap`s so a load-then-save round trip is byte-identical.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::assignment::{Assignment, Attempt, BestState, ConfirmedMap};
use crate::domain::models::search::confidence::ConfidenceModel;

/// Serializable snapshot of the search state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Best score observed so far.
    pub best_score: u32,
    /// The assignment that achieved `best_score`.
    pub best_answers: Assignment,
    /// Proven option per slot, `null` while unproven.
    pub correct_answers: ConfirmedMap,
    /// `slot -> option -> weight`.
    pub option_weights: BTreeMap<String, BTreeMap<String, f64>>,
    /// `slot -> options already tried`, ascending.
    pub tested_options: BTreeMap<String, Vec<u8>>,
    /// Bounded tail of the attempt history.
    pub attempts: Vec<Attempt>,
    /// Consecutive trials without a best-score improvement.
    pub stuck_counter: u32,
    /// Oracle queries consumed, including skipped trials.
    pub total_trials: u64,
}

/// In-memory state rebuilt from a checkpoint.
#[derive(Debug)]
pub struct RestoredState {
    /// Per-slot/option weights and tested flags.
    pub model: ConfidenceModel,
    /// Proven options.
    pub confirmed: ConfirmedMap,
    /// Best assignment and score.
    pub best: BestState,
    /// The persisted attempt tail.
    pub attempts: Vec<Attempt>,
    /// Stagnation counter at checkpoint time.
    pub stuck_counter: u32,
    /// Query counter at checkpoint time.
    pub total_trials: u64,
}

impl Checkpoint {
    /// Snapshot the live state, keeping only the last
    /// `attempt_tail_limit` attempts.
    pub fn capture(
        model: &ConfidenceModel,
        confirmed: &ConfirmedMap,
        best: &BestState,
        attempts: &[Attempt],
        stuck_counter: u32,
        total_trials: u64,
        attempt_tail_limit: usize,
    ) -> Self {
        let mut option_weights = BTreeMap::new();
        for (slot, weights) in model.weights_snapshot().iter().enumerate() {
            let mut per_option = BTreeMap::new();
            for (idx, &weight) in weights.iter().enumerate() {
                per_option.insert((idx + 1).to_string(), weight);
            }
            option_weights.insert(slot.to_string(), per_option);
        }

        let mut tested_options = BTreeMap::new();
        for (slot, tested) in model.tested_snapshot().iter().enumerate() {
            if !tested.is_empty() {
                tested_options.insert(slot.to_string(), tested.iter().copied().collect());
            }
        }

        let tail_start = attempts.len().saturating_sub(attempt_tail_limit);

        Self {
            best_score: best.score,
            best_answers: best.answers.clone(),
            correct_answers: confirmed.clone(),
            option_weights,
            tested_options,
            attempts: attempts[tail_start..].to_vec(),
            stuck_counter,
            total_trials,
        }
    }

    /// Rebuild the in-memory state. `num_options` must match the run
    /// configuration; slot count is taken from `best_answers`.
    pub fn restore(&self, num_options: u8) -> DomainResult<RestoredState> {
        let num_slots = self.best_answers.len();
        if self.correct_answers.len() != num_slots {
            return Err(DomainError::CorruptCheckpoint(format!(
                "correct_answers covers {} slots but best_answers has {}",
                self.correct_answers.len(),
                num_slots
            )));
        }

        let mut weights = Vec::with_capacity(num_slots);
        let mut tested = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            let key = slot.to_string();
            let per_option = self.option_weights.get(&key).ok_or_else(|| {
                DomainError::CorruptCheckpoint(format!("missing weights for slot {slot}"))
            })?;

            let mut slot_weights = Vec::with_capacity(num_options as usize);
            for option in 1..=num_options {
                let weight = per_option.get(&option.to_string()).ok_or_else(|| {
                    DomainError::CorruptCheckpoint(format!(
                        "missing weight for slot {slot} option {option}"
                    ))
                })?;
                slot_weights.push(*weight);
            }
            weights.push(slot_weights);

            let slot_tested: BTreeSet<u8> = self
                .tested_options
                .get(&key)
                .map(|options| options.iter().copied().collect())
                .unwrap_or_default();
            tested.push(slot_tested);
        }

        Ok(RestoredState {
            model: ConfidenceModel::from_parts(num_options, weights, tested)?,
            confirmed: self.correct_answers.clone(),
            best: BestState {
                answers: self.best_answers.clone(),
                score: self.best_score,
            },
            attempts: self.attempts.clone(),
            stuck_counter: self.stuck_counter,
            total_trials: self.total_trials,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_checkpoint() -> Checkpoint {
        let mut model = ConfidenceModel::new(3, 4);
        model.reward(0, 2, 1.0).unwrap();
        model.penalize(1, 3, 0.5).unwrap();
        model.mark_tested(0, 2).unwrap();
        model.mark_tested(1, 3).unwrap();

        let mut confirmed = ConfirmedMap::new(3);
        confirmed.confirm(0, 2).unwrap();

        let best = BestState {
            answers: Assignment::new(vec![2, 1, 1]),
            score: 2,
        };
        let attempts = vec![
            Attempt {
                answers: Assignment::new(vec![1, 1, 1]),
                score: 1,
                changed_indices: vec![],
            },
            Attempt {
                answers: Assignment::new(vec![2, 1, 1]),
                score: 2,
                changed_indices: vec![0],
            },
        ];

        Checkpoint::capture(&model, &confirmed, &best, &attempts, 1, 2, 100)
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let checkpoint = sample_checkpoint();
        let json = serde_json::to_string_pretty(&checkpoint).unwrap();
        let reloaded: Checkpoint = serde_json::from_str(&json).unwrap();
        let rewritten = serde_json::to_string_pretty(&reloaded).unwrap();
        assert_eq!(json, rewritten);
    }

    #[test]
    fn test_restore_rebuilds_state() {
        let checkpoint = sample_checkpoint();
        let restored = checkpoint.restore(4).unwrap();

        assert_eq!(restored.best.score, 2);
        assert_eq!(restored.best.answers.options(), &[2, 1, 1]);
        assert_eq!(restored.confirmed.get(0), Some(2));
        assert_eq!(restored.model.weight(0, 2).unwrap(), 2.0);
        assert_eq!(restored.model.weight(1, 3).unwrap(), 0.5);
        assert!(restored.model.is_tested(0, 2));
        assert!(restored.model.is_tested(1, 3));
        assert!(!restored.model.is_tested(2, 1));
        assert_eq!(restored.attempts.len(), 2);
        assert_eq!(restored.stuck_counter, 1);
        assert_eq!(restored.total_trials, 2);
    }

    #[test]
    fn test_capture_bounds_attempt_tail() {
        let model = ConfidenceModel::new(1, 2);
        let confirmed = ConfirmedMap::new(1);
        let best = BestState::new(Assignment::uniform(1));
        let attempts: Vec<Attempt> = (0..10)
            .map(|i| Attempt {
                answers: Assignment::uniform(1),
                score: i % 2,
                changed_indices: vec![],
            })
            .collect();

        let checkpoint = Checkpoint::capture(&model, &confirmed, &best, &attempts, 0, 10, 3);
        assert_eq!(checkpoint.attempts.len(), 3);
        // The tail keeps the newest entries.
        assert_eq!(checkpoint.attempts[2].score, 9 % 2);
    }

    #[test]
    fn test_restore_rejects_missing_weights() {
        let mut checkpoint = sample_checkpoint();
        checkpoint.option_weights.remove("1");
        assert!(matches!(
            checkpoint.restore(4),
            Err(DomainError::CorruptCheckpoint(_))
        ));
    }

    #[test]
    fn test_field_layout_matches_wire_format() {
        let checkpoint = sample_checkpoint();
        let value: serde_json::Value = serde_json::to_value(&checkpoint).unwrap();
        for key in [
            "best_score",
            "best_answers",
            "correct_answers",
            "option_weights",
            "tested_options",
            "attempts",
            "stuck_counter",
            "total_trials",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["option_weights"]["0"]["2"], 2.0);
        assert_eq!(value["correct_answers"][0], 2);
        assert!(value["correct_answers"][1].is_null());
    }
}
