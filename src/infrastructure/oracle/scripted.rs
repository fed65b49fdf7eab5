//! Scripted oracle for tests and dry runs.
//!
//! Scores assignments by Hamming match against a hidden key, with an
//! optional queue of scripted responses (malformed output, transient and
//! fatal failures) injected ahead of the honest behavior. This is the
//! in-tree stand-in for the real external session, mirroring how the other
//! adapters are exercised without their backing systems.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::Assignment;
use crate::domain::ports::{Oracle, OracleError, RawEvaluation};

/// A canned response to play before honest scoring resumes.
#[derive(Debug)]
pub enum ScriptedResponse {
    /// Return this raw score text verbatim.
    Raw(String),
    /// Fail with the given error.
    Fail(OracleError),
}

/// Deterministic oracle with a hidden answer key.
pub struct ScriptedOracle {
    hidden: Assignment,
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicU64,
}

impl ScriptedOracle {
    /// Create an oracle that scores against `hidden`.
    pub fn new(hidden: Assignment) -> Self {
        Self {
            hidden,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Queue a scripted response to be played before honest scoring.
    pub async fn push_response(&self, response: ScriptedResponse) {
        self.script.lock().await.push_back(response);
    }

    /// Number of evaluate calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The hidden key length (N).
    pub fn num_slots(&self) -> usize {
        self.hidden.len()
    }

    fn hamming_score(&self, assignment: &Assignment) -> u32 {
        self.hidden
            .options()
            .iter()
            .zip(assignment.options())
            .filter(|(h, a)| h == a)
            .count() as u32
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn evaluate(&self, assignment: &Assignment) -> Result<RawEvaluation, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = self.script.lock().await.pop_front() {
            return match scripted {
                ScriptedResponse::Raw(raw) => Ok(RawEvaluation {
                    status: "ok".to_string(),
                    raw_score: Some(raw),
                }),
                ScriptedResponse::Fail(err) => Err(err),
            };
        }

        let score = self.hamming_score(assignment);
        Ok(RawEvaluation {
            status: "ok".to_string(),
            raw_score: Some(format!("{}/{}", score, self.hidden.len())),
        })
    }
}
