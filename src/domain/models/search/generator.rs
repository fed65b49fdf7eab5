//! Guess generation: choosing the next assignment to try.
//!
//! The generator balances exploitation of accumulated evidence against
//! exploration of untested options. Confirmed slots are never touched.
//! Unconfirmed slots are ranked most-uncertain first (normalized entropy),
//! and up to a configured number of them are flipped per guess so that
//! attribution stays tractable. Options are tried untested-first; a small
//! exploration probability overrides that with sampling inversely
//! proportional to current weight, which recovers from misleading early
//! evidence. Exact repeats of recently tried assignments are rejected and
//! regenerated.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::errors::DomainResult;
use crate::domain::models::assignment::{Assignment, ConfirmedMap};
use crate::domain::models::search::confidence::ConfidenceModel;

/// Smoothing added to zero weights so inverse-weight sampling stays finite.
const INVERSE_WEIGHT_EPSILON: f64 = 0.25;

/// Upper bound on regeneration attempts before accepting a duplicate; the
/// recent-history set is bounded, so this cannot loop forever either way.
const MAX_REGENERATION_ATTEMPTS: usize = 16;

/// Tuning knobs for guess generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum slots changed per guess (small keeps attribution sharp).
    pub max_changes_per_guess: usize,
    /// Probability of overriding untested-first with inverse-weight
    /// sampling.
    pub exploration_probability: f64,
    /// Cap on the recently-tried set; the set is cleared when it would
    /// grow past this.
    pub recent_history_limit: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_changes_per_guess: 2,
            exploration_probability: 0.1,
            recent_history_limit: 512,
        }
    }
}

/// Produces the next assignment to submit to the oracle.
#[derive(Debug)]
pub struct GuessGenerator {
    config: GeneratorConfig,
    recent: HashSet<Assignment>,
    rng: StdRng,
}

impl GuessGenerator {
    /// Create a generator. A fixed `seed` makes exploration reproducible;
    /// `None` seeds from OS entropy.
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            recent: HashSet::new(),
            rng,
        }
    }

    /// Generate the next assignment to try.
    ///
    /// Starts from the best-known assignment, keeps confirmed slots at
    /// their proven options, and flips up to `max_changes_per_guess` of
    /// the most uncertain unconfirmed slots. When every unconfirmed slot
    /// is exhausted the tested set is cleared rather than locking the slot
    /// out permanently.
    pub fn next(
        &mut self,
        model: &mut ConfidenceModel,
        confirmed: &ConfirmedMap,
        best: &Assignment,
    ) -> DomainResult<Assignment> {
        let mut base = best.clone();
        for slot in 0..base.len() {
            if let Some(option) = confirmed.get(slot) {
                base.set_option(slot, option)?;
            }
        }

        let ranked = model.slots_by_uncertainty(confirmed);
        if ranked.is_empty() {
            return Ok(base);
        }

        let changes = self.config.max_changes_per_guess.clamp(1, ranked.len());
        let mut last = None;

        for attempt in 0..MAX_REGENERATION_ATTEMPTS {
            let mut candidate = base.clone();
            let slots = self.pick_slots(&ranked, changes, attempt);

            for &slot in &slots {
                let current = base.option(slot)?;
                let force_explore = attempt > 0;
                let option = self.pick_option(model, slot, current, force_explore)?;
                candidate.set_option(slot, option)?;
            }

            if !self.recent.contains(&candidate) {
                return Ok(candidate);
            }
            last = Some(candidate);
        }

        // Every regeneration collided with recent history; accept the last
        // candidate rather than spinning.
        Ok(last.unwrap_or(base))
    }

    /// Record an assignment as actually evaluated, so `next` avoids exact
    /// repeats. Skipped trials are deliberately not recorded.
    pub fn record_tried(&mut self, assignment: &Assignment) {
        if self.recent.len() >= self.config.recent_history_limit {
            self.recent.clear();
        }
        self.recent.insert(assignment.clone());
    }

    /// Whether an assignment was recorded as tried recently.
    pub fn was_tried(&self, assignment: &Assignment) -> bool {
        self.recent.contains(assignment)
    }

    /// Select which slots to flip this round. The first attempt takes the
    /// most uncertain slots; regeneration attempts sample from the ranking
    /// to break out of collisions.
    fn pick_slots(&mut self, ranked: &[usize], changes: usize, attempt: usize) -> Vec<usize> {
        if attempt == 0 || ranked.len() <= changes {
            return ranked[..changes].to_vec();
        }
        let mut pool: Vec<usize> = ranked.to_vec();
        let mut picked = Vec::with_capacity(changes);
        for _ in 0..changes {
            let idx = self.rng.gen_range(0..pool.len());
            picked.push(pool.swap_remove(idx));
        }
        picked
    }

    /// Choose an option for `slot`, never the current one.
    fn pick_option(
        &mut self,
        model: &mut ConfidenceModel,
        slot: usize,
        current: u8,
        force_explore: bool,
    ) -> DomainResult<u8> {
        let explore = force_explore
            || self.rng.gen::<f64>() < self.config.exploration_probability;

        if !explore {
            let untested: Vec<u8> = model
                .untested_options(slot)
                .into_iter()
                .filter(|&option| option != current)
                .collect();
            if let Some(&option) = untested.first() {
                return Ok(option);
            }
            // Exhausted: clear and fall through to re-sampling.
            model.clear_tested(slot);
        }

        self.sample_inverse_weight(model, slot, current)
    }

    /// Weighted random sampling inversely proportional to current weight,
    /// excluding the current option so the guess always changes the slot.
    fn sample_inverse_weight(
        &mut self,
        model: &ConfidenceModel,
        slot: usize,
        current: u8,
    ) -> DomainResult<u8> {
        let candidates: Vec<u8> = (1..=model.num_options())
            .filter(|&option| option != current)
            .collect();

        let inverses: Vec<f64> = candidates
            .iter()
            .map(|&option| {
                model
                    .weight(slot, option)
                    .map(|w| 1.0 / (w + INVERSE_WEIGHT_EPSILON))
            })
            .collect::<DomainResult<_>>()?;

        let total: f64 = inverses.iter().sum();
        let mut roll = self.rng.gen::<f64>() * total;
        for (option, inv) in candidates.iter().zip(&inverses) {
            roll -= inv;
            if roll <= 0.0 {
                return Ok(*option);
            }
        }
        // Floating-point tail: the last candidate absorbs it.
        Ok(*candidates.last().unwrap_or(&current))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(max_changes: usize, exploration: f64) -> GuessGenerator {
        GuessGenerator::new(
            GeneratorConfig {
                max_changes_per_guess: max_changes,
                exploration_probability: exploration,
                recent_history_limit: 8,
            },
            Some(42),
        )
    }

    #[test]
    fn test_confirmed_slots_are_never_changed() {
        let mut model = ConfidenceModel::new(3, 4);
        let mut confirmed = ConfirmedMap::new(3);
        confirmed.confirm(0, 3).unwrap();
        let best = Assignment::new(vec![3, 1, 1]);

        let mut gen = generator(3, 0.0);
        for _ in 0..20 {
            let guess = gen.next(&mut model, &confirmed, &best).unwrap();
            assert_eq!(guess.option(0).unwrap(), 3);
            gen.record_tried(&guess);
        }
    }

    #[test]
    fn test_respects_max_changes() {
        let mut model = ConfidenceModel::new(6, 4);
        let confirmed = ConfirmedMap::new(6);
        let best = Assignment::uniform(6);

        let mut gen = generator(2, 0.0);
        let guess = gen.next(&mut model, &confirmed, &best).unwrap();
        assert!(best.diff(&guess).len() <= 2);
        assert!(!best.diff(&guess).is_empty());
    }

    #[test]
    fn test_untested_first() {
        let mut model = ConfidenceModel::new(1, 4);
        let confirmed = ConfirmedMap::new(1);
        let best = Assignment::uniform(1);

        // Option 2 already tried; 3 is the lowest untested non-current.
        model.mark_tested(0, 1).unwrap();
        model.mark_tested(0, 2).unwrap();

        let mut gen = generator(1, 0.0);
        let guess = gen.next(&mut model, &confirmed, &best).unwrap();
        assert_eq!(guess.option(0).unwrap(), 3);
    }

    #[test]
    fn test_exhausted_slot_is_cleared_and_resampled() {
        let mut model = ConfidenceModel::new(1, 3);
        let confirmed = ConfirmedMap::new(1);
        let best = Assignment::uniform(1);

        for option in 1..=3 {
            model.mark_tested(0, option).unwrap();
        }

        let mut gen = generator(1, 0.0);
        let guess = gen.next(&mut model, &confirmed, &best).unwrap();
        // Still produced a change, and the tested set was reset.
        assert_ne!(guess.option(0).unwrap(), 1);
        assert_eq!(model.untested_options(0).len(), 3);
    }

    #[test]
    fn test_avoids_recent_repeats() {
        let mut model = ConfidenceModel::new(2, 3);
        let confirmed = ConfirmedMap::new(2);
        let best = Assignment::uniform(2);

        let mut gen = generator(1, 0.0);
        let first = gen.next(&mut model, &confirmed, &best).unwrap();
        gen.record_tried(&first);

        let second = gen.next(&mut model, &confirmed, &best).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_recent_history_is_bounded() {
        let mut gen = generator(1, 0.0);
        for i in 0..20 {
            gen.record_tried(&Assignment::new(vec![i as u8 + 1]));
        }
        // Limit is 8; the set must have been cleared along the way.
        assert!(gen.recent.len() <= 8);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let best = Assignment::uniform(4);
        let confirmed = ConfirmedMap::new(4);

        let mut model_a = ConfidenceModel::new(4, 4);
        let mut gen_a = generator(2, 0.5);
        let mut model_b = ConfidenceModel::new(4, 4);
        let mut gen_b = generator(2, 0.5);

        for _ in 0..10 {
            let a = gen_a.next(&mut model_a, &confirmed, &best).unwrap();
            let b = gen_b.next(&mut model_b, &confirmed, &best).unwrap();
            assert_eq!(a, b);
            gen_a.record_tried(&a);
            gen_b.record_tried(&b);
        }
    }

    #[test]
    fn test_all_confirmed_returns_confirmed_assignment() {
        let mut model = ConfidenceModel::new(2, 4);
        let mut confirmed = ConfirmedMap::new(2);
        confirmed.confirm(0, 2).unwrap();
        confirmed.confirm(1, 4).unwrap();
        let best = Assignment::new(vec![2, 4]);

        let mut gen = generator(2, 0.0);
        let guess = gen.next(&mut model, &confirmed, &best).unwrap();
        assert_eq!(guess.options(), &[2, 4]);
    }
}
