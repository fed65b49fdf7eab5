//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters
//! must implement:
//! - `Oracle`: the external scoring system
//! - `CheckpointStore`: durable solver state
//! - `AnswerAdvisor`: optional initial-guess voters
//! - `Sleeper`: injectable delays for retry/backoff
//!
//! These traits define the contracts that allow the domain to be
//! independent of specific infrastructure implementations.

pub mod advisor;
pub mod checkpoint_store;
pub mod oracle;
pub mod sleeper;

pub use advisor::{AdvisorPrior, AnswerAdvisor, QuestionPrompt};
pub use checkpoint_store::{CheckpointStore, PersistenceError};
pub use oracle::{Oracle, OracleError, RawEvaluation};
pub use sleeper::{NoopSleeper, Sleeper, TokioSleeper};
