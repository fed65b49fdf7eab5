//! Attribution of score deltas to individual slots.
//!
//! Given a trial against the best-known assignment and the observed score
//! delta, the resolver decides which changed slots (if any) the delta can
//! be pinned on:
//!
//! - A single-slot change with a higher score confirms that slot: every
//!   other slot was held at its best-known value, so only the flip can
//!   explain the increase.
//! - A single-slot change with a lower score rejects the tried option, and
//!   when the lower score proves the previous option was the last one
//!   standing, confirms the previous option by elimination.
//! - Multi-slot changes are ambiguous by construction. Even a delta equal
//!   to the number of changed slots only makes every slot *provisionally*
//!   right; the resolver demands single-slot probes and never confirms
//!   from the batch result alone.
//! - A tie confirms nothing and penalizes every changed option equally.

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::assignment::{Assignment, ConfirmedMap};
use crate::domain::models::search::confidence::ConfidenceModel;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Weight added to an option confirmed by a single-slot improvement.
pub const IMPROVEMENT_REWARD: f64 = 1.0;

/// Weight added to each changed option of an improved multi-slot batch,
/// pending probe confirmation.
pub const CORROBORATION_REWARD: f64 = 0.25;

/// Weight removed from an option rejected by a single-slot regression.
pub const REGRESSION_PENALTY: f64 = 1.0;

/// Weight removed from every changed option when the score does not move.
pub const TIE_PENALTY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// What a trial's score delta could be pinned on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Attribution {
    /// Nothing changed; nothing to attribute.
    NoChange,
    /// A lone changed slot raised the score; its option is proven.
    Confirmed { slot: usize, option: u8 },
    /// A lone changed slot lowered the score; the option is rejected.
    /// `eliminated` carries the previous option when the rejection left it
    /// as the only surviving candidate.
    Rejected {
        slot: usize,
        option: u8,
        eliminated: Option<u8>,
    },
    /// The score did not move; all changed options were penalized.
    Tied { slots: Vec<usize> },
    /// Several slots changed and the score rose; each listed slot needs a
    /// single-slot probe before anything is confirmed.
    ProbesRequired { slots: Vec<usize> },
    /// Several slots changed and the score fell; blame is spread.
    Regressed { slots: Vec<usize> },
}

/// Resolves score deltas into per-slot conclusions and applies the
/// corresponding confidence updates.
///
/// All mutation of the confidence model and confirmed map funnels through
/// here (and through the advisor seeding), never ad hoc.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionResolver;

impl AttributionResolver {
    /// Attribute a trial result and update slot knowledge.
    ///
    /// `prev_best`/`prev_score` describe the assignment the trial deviated
    /// from; `changed` lists the deviating slots. Every changed option is
    /// marked tested regardless of outcome.
    pub fn attribute(
        &self,
        prev_best: &Assignment,
        prev_score: u32,
        trial: &Assignment,
        trial_score: u32,
        changed: &[usize],
        model: &mut ConfidenceModel,
        confirmed: &mut ConfirmedMap,
    ) -> DomainResult<Attribution> {
        if changed.is_empty() {
            return Ok(Attribution::NoChange);
        }

        for &slot in changed {
            model.mark_tested(slot, trial.option(slot)?)?;
        }

        if changed.len() == 1 {
            let slot = changed[0];
            let option = trial.option(slot)?;

            return if trial_score > prev_score {
                model.reward(slot, option, IMPROVEMENT_REWARD)?;
                confirmed.confirm(slot, option)?;
                Ok(Attribution::Confirmed { slot, option })
            } else if trial_score < prev_score {
                model.penalize(slot, option, REGRESSION_PENALTY)?;
                let previous = prev_best.option(slot)?;
                let eliminated = if !confirmed.is_confirmed(slot)
                    && model.eliminated_to(slot, previous)?
                {
                    // The regression re-proves the previous option; once
                    // every alternative is tested and zeroed, it stands
                    // alone.
                    confirmed.confirm(slot, previous)?;
                    Some(previous)
                } else {
                    None
                };
                Ok(Attribution::Rejected {
                    slot,
                    option,
                    eliminated,
                })
            } else {
                model.penalize(slot, option, TIE_PENALTY)?;
                Ok(Attribution::Tied {
                    slots: vec![slot],
                })
            };
        }

        // Multiple slots changed: the delta cannot be attributed directly.
        if trial_score > prev_score {
            for &slot in changed {
                model.reward(slot, trial.option(slot)?, CORROBORATION_REWARD)?;
            }
            Ok(Attribution::ProbesRequired {
                slots: changed.to_vec(),
            })
        } else if trial_score < prev_score {
            let spread = REGRESSION_PENALTY / changed.len() as f64;
            for &slot in changed {
                model.penalize(slot, trial.option(slot)?, spread)?;
            }
            Ok(Attribution::Regressed {
                slots: changed.to_vec(),
            })
        } else {
            for &slot in changed {
                model.penalize(slot, trial.option(slot)?, TIE_PENALTY)?;
            }
            Ok(Attribution::Tied {
                slots: changed.to_vec(),
            })
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
