//! Assignments, attempts, and best-state bookkeeping.
//!
//! An [`Assignment`] is the unit submitted to the oracle: one option value
//! per slot, options numbered from 1. The oracle only ever answers with an
//! aggregate correctness count, so everything the engine learns about
//! individual slots is inferred from how scores move between assignments.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// An ordered sequence of option values, one per slot.
///
/// Serializes as a bare JSON array so checkpoints read as `[2, 1, 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(Vec<u8>);

impl Assignment {
    /// Create an assignment from raw option values.
    pub fn new(options: Vec<u8>) -> Self {
        Self(options)
    }

    /// An assignment with every slot set to option 1 (the uniform-prior
    /// argmax, so a fresh run starts from the deterministic baseline).
    pub fn uniform(num_slots: usize) -> Self {
        Self(vec![1; num_slots])
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the assignment has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Option value at `slot`.
    pub fn option(&self, slot: usize) -> DomainResult<u8> {
        self.0
            .get(slot)
            .copied()
            .ok_or(DomainError::SlotOutOfRange {
                slot,
                num_slots: self.0.len(),
            })
    }

    /// Set the option value at `slot` in place.
    pub fn set_option(&mut self, slot: usize, option: u8) -> DomainResult<()> {
        let num_slots = self.0.len();
        let value = self
            .0
            .get_mut(slot)
            .ok_or(DomainError::SlotOutOfRange { slot, num_slots })?;
        *value = option;
        Ok(())
    }

    /// A copy of this assignment with a single slot changed.
    pub fn with_option(&self, slot: usize, option: u8) -> DomainResult<Self> {
        let mut copy = self.clone();
        copy.set_option(slot, option)?;
        Ok(copy)
    }

    /// Indices of slots whose option differs from `other`.
    pub fn diff(&self, other: &Self) -> Vec<usize> {
        self.0
            .iter()
            .zip(other.0.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect()
    }

    /// The raw option values.
    pub fn options(&self) -> &[u8] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// One completed oracle evaluation: the submitted assignment, the validated
/// score, and which slots differed from the best assignment at the time.
///
/// Attempts are append-only; the checkpoint keeps a bounded tail of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// The submitted option values.
    pub answers: Assignment,
    /// The validated aggregate score.
    pub score: u32,
    /// Slots changed relative to the previous best assignment.
    pub changed_indices: Vec<usize>,
}

// ---------------------------------------------------------------------------
// BestState
// ---------------------------------------------------------------------------

/// The highest-scoring assignment observed so far.
///
/// The score is monotone: once recorded, it never decreases, and a tied
/// score never rotates the answers (strict-improvement policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestState {
    /// The best-known option values.
    pub answers: Assignment,
    /// The score those answers achieved.
    pub score: u32,
}

impl BestState {
    /// Start from an initial assignment with no recorded score.
    pub fn new(answers: Assignment) -> Self {
        Self { answers, score: 0 }
    }

    /// Record a trial. Returns `true` when the trial strictly improved on
    /// the recorded best and was adopted.
    ///
    /// `baseline` forces adoption of the very first evaluated assignment so
    /// the best state always refers to a score the oracle actually
    /// reported, even when that score is 0.
    pub fn record(&mut self, answers: &Assignment, score: u32, baseline: bool) -> bool {
        if baseline || score > self.score {
            self.answers = answers.clone();
            self.score = score;
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// ConfirmedMap
// ---------------------------------------------------------------------------

/// Slots whose correct option has been proven by an unambiguous probe.
///
/// A confirmed entry is write-once: re-confirming the same option is a
/// no-op, and confirming a different option is an invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmedMap(Vec<Option<u8>>);

impl ConfirmedMap {
    /// An empty map over `num_slots` slots.
    pub fn new(num_slots: usize) -> Self {
        Self(vec![None; num_slots])
    }

    /// Rehydrate from checkpointed values.
    pub fn from_entries(entries: Vec<Option<u8>>) -> Self {
        Self(entries)
    }

    /// The confirmed option for `slot`, if proven.
    pub fn get(&self, slot: usize) -> Option<u8> {
        self.0.get(slot).copied().flatten()
    }

    /// Whether `slot` has a proven option.
    pub fn is_confirmed(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Record a proven option for `slot`.
    pub fn confirm(&mut self, slot: usize, option: u8) -> DomainResult<()> {
        let num_slots = self.0.len();
        let entry = self
            .0
            .get_mut(slot)
            .ok_or(DomainError::SlotOutOfRange { slot, num_slots })?;
        match entry {
            Some(existing) if *existing != option => Err(DomainError::ConfirmedConflict {
                slot,
                existing: *existing,
                proposed: option,
            }),
            _ => {
                *entry = Some(option);
                Ok(())
            }
        }
    }

    /// Number of confirmed slots.
    pub fn confirmed_count(&self) -> usize {
        self.0.iter().filter(|e| e.is_some()).count()
    }

    /// Whether every slot is confirmed (the "fully solved" condition).
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// Total number of slots tracked.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map tracks no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw per-slot entries.
    pub fn entries(&self) -> &[Option<u8>] {
        &self.0
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_diff() {
        let a = Assignment::new(vec![1, 1, 1]);
        let b = Assignment::new(vec![2, 1, 3]);
        assert_eq!(a.diff(&b), vec![0, 2]);
        assert_eq!(a.diff(&a), Vec::<usize>::new());
    }

    #[test]
    fn test_assignment_with_option() {
        let a = Assignment::uniform(3);
        let b = a.with_option(1, 4).unwrap();
        assert_eq!(b.options(), &[1, 4, 1]);
        // The original is untouched.
        assert_eq!(a.options(), &[1, 1, 1]);
    }

    #[test]
    fn test_assignment_out_of_range_slot() {
        let a = Assignment::uniform(2);
        assert!(matches!(
            a.with_option(5, 1),
            Err(DomainError::SlotOutOfRange { slot: 5, .. })
        ));
    }

    #[test]
    fn test_assignment_serializes_transparent() {
        let a = Assignment::new(vec![2, 1, 2]);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[2,1,2]");
        let back: Assignment = serde_json::from_str("[2,1,2]").unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_best_state_strict_improvement() {
        let mut best = BestState::new(Assignment::uniform(3));
        assert!(best.record(&Assignment::new(vec![1, 1, 1]), 1, true));

        // A tie is a no-op: the answers do not rotate.
        let tied = Assignment::new(vec![2, 1, 1]);
        assert!(!best.record(&tied, 1, false));
        assert_eq!(best.answers.options(), &[1, 1, 1]);

        // A strict improvement is adopted.
        assert!(best.record(&tied, 2, false));
        assert_eq!(best.score, 2);
        assert_eq!(best.answers.options(), &[2, 1, 1]);
    }

    #[test]
    fn test_best_state_baseline_adopts_zero_score() {
        let mut best = BestState::new(Assignment::uniform(2));
        let first = Assignment::new(vec![1, 2]);
        assert!(best.record(&first, 0, true));
        assert_eq!(best.answers, first);
        assert_eq!(best.score, 0);

        // A later zero is not an improvement.
        assert!(!best.record(&Assignment::new(vec![2, 2]), 0, false));
        assert_eq!(best.answers, first);
    }

    #[test]
    fn test_confirmed_map_write_once() {
        let mut map = ConfirmedMap::new(3);
        assert!(!map.is_confirmed(1));

        map.confirm(1, 3).unwrap();
        assert_eq!(map.get(1), Some(3));
        assert_eq!(map.confirmed_count(), 1);

        // Same option again is fine.
        map.confirm(1, 3).unwrap();

        // A different option is a conflict.
        assert!(matches!(
            map.confirm(1, 2),
            Err(DomainError::ConfirmedConflict {
                slot: 1,
                existing: 3,
                proposed: 2
            })
        ));
        assert_eq!(map.get(1), Some(3));
    }

    #[test]
    fn test_confirmed_map_completeness() {
        let mut map = ConfirmedMap::new(2);
        assert!(!map.is_complete());
        map.confirm(0, 1).unwrap();
        map.confirm(1, 4).unwrap();
        assert!(map.is_complete());
        assert_eq!(map.confirmed_count(), 2);
    }

    #[test]
    fn test_confirmed_map_serializes_transparent() {
        let mut map = ConfirmedMap::new(3);
        map.confirm(0, 2).unwrap();
        assert_eq!(serde_json::to_string(&map).unwrap(), "[2,null,null]");
    }
}
