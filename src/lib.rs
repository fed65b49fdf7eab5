//! Assay - Hidden-Assignment Discovery Engine
//!
//! Assay discovers the maximum-scoring assignment of discrete options to
//! independent slots, using an opaque oracle that evaluates a complete
//! assignment and reveals only an aggregate correctness count. The oracle
//! is slow, rate-limited, occasionally malformed, and may fail outright;
//! the engine separates per-slot signal from that aggregate feedback
//! channel, attributes score deltas to individual slots, balances
//! exploration against exploitation, escapes local optima with clustered
//! brute force, and checkpoints after every evaluation so an interrupted
//! run resumes exactly where it left off.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure business logic and domain models
//! - **Service Layer** (`services`): The search control loop and advisor voting
//! - **Infrastructure Layer** (`infrastructure`): External integrations and adapters
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use assay::domain::models::{Assignment, SolverConfig};
//! use assay::infrastructure::oracle::{RetryPolicy, ScriptedOracle, TokenBucketRateLimiter};
//! use assay::infrastructure::persistence::MemoryStore;
//! use assay::services::SearchEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let oracle = Arc::new(ScriptedOracle::new(Assignment::new(vec![2, 1, 2])));
//!     let store = Arc::new(MemoryStore::new());
//!     let config = SolverConfig {
//!         num_slots: 3,
//!         num_options: 2,
//!         ..Default::default()
//!     };
//!     let engine = SearchEngine::new(
//!         oracle,
//!         store,
//!         config,
//!         RetryPolicy::default(),
//!         TokenBucketRateLimiter::new(100.0, 1),
//!     );
//!     let report = engine.run().await?;
//!     println!("{:?}", report.final_answers);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Assignment, Attempt, AttributionResolver, BestState, Checkpoint, Config, ConfidenceModel,
    ConfirmedMap, GuessGenerator, RunOutcome, RunReport, ScoreInterpreter, SearchPhase,
    SolverConfig,
};
pub use domain::ports::{AnswerAdvisor, CheckpointStore, Oracle, OracleError, Sleeper};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{SearchEngine, SearchEvent, VotePanel};
