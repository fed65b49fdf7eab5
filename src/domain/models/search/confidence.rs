//! Per-slot, per-option confidence estimation.
//!
//! The oracle never says which slots are correct, so certainty about an
//! individual slot has to be accumulated indirectly across trials. Each
//! (slot, option) pair carries a non-negative weight; weights normalize to
//! a probability-like distribution per slot, and the normalized Shannon
//! entropy of that distribution ranks which slots most need testing.
//!
//! Weights start at a uniform positive prior. Improvements reward, ties and
//! regressions penalize (floored at zero), and advisor votes seed small
//! prior rewards before the first oracle call.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::assignment::ConfirmedMap;

/// Uniform prior weight assigned to every option at initialization.
pub const UNIFORM_PRIOR: f64 = 1.0;

/// Per-slot confidence summary derived from the weight distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// Probability mass of the strongest option, in `[0, 1]`.
    pub top_probability: f64,
    /// Shannon entropy divided by `log2(K)`: 0 = certain, 1 = uniform.
    pub entropy_ratio: f64,
}

/// Running score estimate for every (slot, option) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceModel {
    num_options: u8,
    /// `weights[slot][option - 1]`, always `>= 0`.
    weights: Vec<Vec<f64>>,
    /// Options already tried per slot, cleared when the slot exhausts them.
    tested: Vec<BTreeSet<u8>>,
}

impl ConfidenceModel {
    /// A fresh model with uniform priors and nothing tested.
    pub fn new(num_slots: usize, num_options: u8) -> Self {
        Self {
            num_options,
            weights: vec![vec![UNIFORM_PRIOR; num_options as usize]; num_slots],
            tested: vec![BTreeSet::new(); num_slots],
        }
    }

    /// Rebuild a model from checkpointed weights and tested sets.
    pub fn from_parts(
        num_options: u8,
        weights: Vec<Vec<f64>>,
        tested: Vec<BTreeSet<u8>>,
    ) -> DomainResult<Self> {
        if weights.len() != tested.len() {
            return Err(DomainError::CorruptCheckpoint(format!(
                "weights cover {} slots but tested sets cover {}",
                weights.len(),
                tested.len()
            )));
        }
        for per_slot in &weights {
            if per_slot.len() != num_options as usize {
                return Err(DomainError::CorruptCheckpoint(format!(
                    "slot has {} option weights, expected {}",
                    per_slot.len(),
                    num_options
                )));
            }
        }
        Ok(Self {
            num_options,
            weights,
            tested,
        })
    }

    /// Number of slots tracked.
    pub fn num_slots(&self) -> usize {
        self.weights.len()
    }

    /// Number of options per slot (K).
    pub fn num_options(&self) -> u8 {
        self.num_options
    }

    /// Current weight of `(slot, option)`.
    pub fn weight(&self, slot: usize, option: u8) -> DomainResult<f64> {
        let idx = self.option_index(option)?;
        Ok(self.slot_weights(slot)?[idx])
    }

    /// Increase an option's weight on supporting evidence.
    pub fn reward(&mut self, slot: usize, option: u8, magnitude: f64) -> DomainResult<()> {
        let idx = self.option_index(option)?;
        let weights = self.slot_weights_mut(slot)?;
        weights[idx] += magnitude;
        Ok(())
    }

    /// Decrease an option's weight on contradicting evidence, never below
    /// zero.
    pub fn penalize(&mut self, slot: usize, option: u8, magnitude: f64) -> DomainResult<()> {
        let idx = self.option_index(option)?;
        let weights = self.slot_weights_mut(slot)?;
        weights[idx] = (weights[idx] - magnitude).max(0.0);
        Ok(())
    }

    /// Confidence summary for `slot`.
    ///
    /// When every weight has been driven to zero the distribution is
    /// treated as uniform again: the slot is maximally uncertain, not
    /// maximally certain.
    pub fn confidence(&self, slot: usize) -> DomainResult<Confidence> {
        let weights = self.slot_weights(slot)?;
        let k = weights.len();
        let total: f64 = weights.iter().sum();

        if total <= 0.0 || k < 2 {
            return Ok(Confidence {
                top_probability: 1.0 / k.max(1) as f64,
                entropy_ratio: if k < 2 { 0.0 } else { 1.0 },
            });
        }

        let mut top = 0.0_f64;
        let mut entropy = 0.0_f64;
        for &w in weights {
            let p = w / total;
            top = top.max(p);
            if p > 0.0 {
                entropy -= p * p.log2();
            }
        }

        Ok(Confidence {
            top_probability: top,
            entropy_ratio: (entropy / (k as f64).log2()).clamp(0.0, 1.0),
        })
    }

    /// The strongest option for `slot`; ties break toward the lowest
    /// option index so the result is deterministic.
    pub fn best_option(&self, slot: usize) -> DomainResult<u8> {
        let weights = self.slot_weights(slot)?;
        let mut best_idx = 0;
        for (idx, &w) in weights.iter().enumerate() {
            if w > weights[best_idx] {
                best_idx = idx;
            }
        }
        Ok(best_idx as u8 + 1)
    }

    /// Unconfirmed slots ordered most-uncertain first (entropy descending,
    /// slot index ascending on ties).
    pub fn slots_by_uncertainty(&self, confirmed: &ConfirmedMap) -> Vec<usize> {
        let mut ranked: Vec<(usize, f64)> = (0..self.num_slots())
            .filter(|slot| !confirmed.is_confirmed(*slot))
            .map(|slot| {
                let entropy = self
                    .confidence(slot)
                    .map(|c| c.entropy_ratio)
                    .unwrap_or(1.0);
                (slot, entropy)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.into_iter().map(|(slot, _)| slot).collect()
    }

    /// Mark an option as tried for `slot`.
    pub fn mark_tested(&mut self, slot: usize, option: u8) -> DomainResult<()> {
        self.option_index(option)?;
        let num_slots = self.num_slots();
        self.tested
            .get_mut(slot)
            .ok_or(DomainError::SlotOutOfRange { slot, num_slots })?
            .insert(option);
        Ok(())
    }

    /// Whether `(slot, option)` has been tried.
    pub fn is_tested(&self, slot: usize, option: u8) -> bool {
        self.tested
            .get(slot)
            .is_some_and(|set| set.contains(&option))
    }

    /// Options not yet tried for `slot`, ascending.
    pub fn untested_options(&self, slot: usize) -> Vec<u8> {
        let tested = self.tested.get(slot);
        (1..=self.num_options)
            .filter(|option| !tested.is_some_and(|set| set.contains(option)))
            .collect()
    }

    /// Forget which options were tried for `slot`, so a fully-exhausted
    /// slot can be re-sampled instead of locking out forever.
    pub fn clear_tested(&mut self, slot: usize) {
        if let Some(set) = self.tested.get_mut(slot) {
            set.clear();
        }
    }

    /// Whether evidence has eliminated every alternative to `option` for
    /// `slot`: all other options tried and driven to zero weight. Used to
    /// confirm a slot that was correct from the start and therefore can
    /// never show a score increase of its own.
    pub fn eliminated_to(&self, slot: usize, option: u8) -> DomainResult<bool> {
        let weights = self.slot_weights(slot)?;
        for candidate in 1..=self.num_options {
            if candidate == option {
                continue;
            }
            let idx = (candidate - 1) as usize;
            if weights[idx] > 0.0 || !self.is_tested(slot, candidate) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Snapshot of all weights, `[slot][option - 1]`.
    pub fn weights_snapshot(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Snapshot of the tested sets, per slot.
    pub fn tested_snapshot(&self) -> &[BTreeSet<u8>] {
        &self.tested
    }

    fn option_index(&self, option: u8) -> DomainResult<usize> {
        if option == 0 || option > self.num_options {
            return Err(DomainError::OptionOutOfRange {
                option,
                num_options: self.num_options,
            });
        }
        Ok((option - 1) as usize)
    }

    fn slot_weights(&self, slot: usize) -> DomainResult<&Vec<f64>> {
        let num_slots = self.num_slots();
        self.weights
            .get(slot)
            .ok_or(DomainError::SlotOutOfRange { slot, num_slots })
    }

    fn slot_weights_mut(&mut self, slot: usize) -> DomainResult<&mut Vec<f64>> {
        let num_slots = self.num_slots();
        self.weights
            .get_mut(slot)
            .ok_or(DomainError::SlotOutOfRange { slot, num_slots })
    }
}

// =========================================================================
// Tests
// =========================================================================
