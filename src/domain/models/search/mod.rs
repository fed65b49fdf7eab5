//! Core search models: score interpretation, confidence estimation,
//! attribution, guess generation, and the phase state machine.

pub mod attribution;
pub mod confidence;
pub mod generator;
pub mod phase;
pub mod score;

pub use attribution::{
    Attribution, AttributionResolver, CORROBORATION_REWARD, IMPROVEMENT_REWARD,
    REGRESSION_PENALTY, TIE_PENALTY,
};
pub use confidence::{Confidence, ConfidenceModel, UNIFORM_PRIOR};
pub use generator::{GeneratorConfig, GuessGenerator};
pub use phase::{RunOutcome, RunReport, SearchPhase};
pub use score::{ParseError, ScoreInterpreter};
