//! Answer advisor port - optional initial-guess voters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// A question shown to advisors: the slot it belongs to, its text, and the
/// option texts in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    /// Slot index this question occupies.
    pub slot: usize,
    /// Question text.
    pub text: String,
    /// Option texts, index 0 corresponding to option 1.
    pub options: Vec<String>,
}

/// A prior fed into the confidence model before the first oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvisorPrior {
    /// Slot the prior applies to.
    pub slot: usize,
    /// Winning option from the vote.
    pub option: u8,
    /// Reward magnitude to apply.
    pub reward: f64,
}

/// Trait for initial-guess advisors.
///
/// Advisors are consulted once, before the search loop starts, and their
/// votes are folded into the confidence model as priors. They are strictly
/// read-only collaborators; a failing advisor contributes no vote and
/// never blocks the run.
#[async_trait]
pub trait AnswerAdvisor: Send + Sync {
    /// Advisor name, for logs and diagnostics.
    fn name(&self) -> &str;

    /// Vote weight in the majority combination.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Return the option this advisor believes is correct, in `1..=K`.
    async fn advise(&self, prompt: &QuestionPrompt) -> DomainResult<u8>;
}
