//! Advisor vote panel: initial-guess priors via weighted majority.
//!
//! Before the first oracle call, each configured advisor is asked for its
//! pick on every question. Votes combine by weighted majority per slot and
//! the winners are folded into the confidence model as prior rewards. This
//! is the only fan-out in the system, and it completes strictly before the
//! sequential search loop starts.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::ports::{AdvisorPrior, AnswerAdvisor, QuestionPrompt};

/// Base reward magnitude for a unanimous vote; scaled down by the winning
/// share when advisors disagree. Deliberately below the improvement reward
/// so oracle evidence always outranks opinion.
pub const ADVISOR_PRIOR_REWARD: f64 = 0.5;

/// A panel of independent answer advisors.
pub struct VotePanel {
    advisors: Vec<Arc<dyn AnswerAdvisor>>,
}

impl VotePanel {
    /// Create a panel. An empty panel is valid and yields no priors.
    pub fn new(advisors: Vec<Arc<dyn AnswerAdvisor>>) -> Self {
        Self { advisors }
    }

    /// Whether the panel has no advisors.
    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }

    /// Collect priors for the given questions.
    ///
    /// Advisors are queried concurrently per question (they are read-only
    /// and independent), failures are logged and dropped, and ties break
    /// toward the lowest option index.
    pub async fn collect_priors(&self, prompts: &[QuestionPrompt]) -> Vec<AdvisorPrior> {
        let mut priors = Vec::new();
        if self.advisors.is_empty() {
            return priors;
        }

        for prompt in prompts {
            let votes = join_all(self.advisors.iter().map(|advisor| {
                let advisor = Arc::clone(advisor);
                async move {
                    let vote = advisor.advise(prompt).await;
                    (advisor.name().to_string(), advisor.weight(), vote)
                }
            }))
            .await;

            let mut tally: BTreeMap<u8, f64> = BTreeMap::new();
            let mut total_weight = 0.0;
            for (name, weight, vote) in votes {
                match vote {
                    Ok(option) => {
                        debug!(slot = prompt.slot, advisor = %name, option, "vote received");
                        *tally.entry(option).or_default() += weight;
                        total_weight += weight;
                    }
                    Err(err) => {
                        warn!(slot = prompt.slot, advisor = %name, error = %err, "vote dropped");
                    }
                }
            }

            // Ascending iteration + strict comparison keeps the lowest
            // option on ties.
            let mut winner: Option<(u8, f64)> = None;
            for (&option, &weight) in &tally {
                if winner.is_none() || weight > winner.map_or(0.0, |(_, w)| w) {
                    winner = Some((option, weight));
                }
            }

            if let Some((option, weight)) = winner {
                let share = weight / total_weight;
                priors.push(AdvisorPrior {
                    slot: prompt.slot,
                    option,
                    reward: ADVISOR_PRIOR_REWARD * share,
                });
            }
        }

        info!(
            questions = prompts.len(),
            priors = priors.len(),
            "advisor voting complete"
        );
        priors
    }
}

// =========================================================================
// Tests
// =========================================================================
