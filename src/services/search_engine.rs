//! Search engine service: the top-level convergence control loop.
//!
//! The engine owns the full lifecycle of a run:
//!
//! - **LOAD** -- restore the checkpoint (if any) or initialize fresh state,
//!   folding advisor priors into the confidence model.
//! - **SEARCH** -- generate a guess, evaluate it through the oracle wrapper
//!   (rate limit, retry with backoff, score interpretation), attribute the
//!   delta, update confidence, checkpoint.
//! - **ESCALATE** -- when the stagnation counter trips, brute-force small
//!   clusters of the most uncertain slots and return to searching.
//! - **RESOLVE** -- converge when every slot is confirmed or the best score
//!   hits the maximum; abort on budget exhaustion or a fatal oracle error,
//!   still returning the best-known assignment.
//!
//! The loop is strictly sequential: the oracle is one shared external
//! session and is never queried concurrently. Checkpointing happens after
//! each full update of the attempt history, so a resumed run never replays
//! state older than the last completed oracle call. Cancellation is safe
//! between oracle calls; the last written checkpoint is authoritative.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::search::{
    Attribution, AttributionResolver, GeneratorConfig, GuessGenerator, RunOutcome, RunReport,
    ScoreInterpreter, SearchPhase,
};
use crate::domain::models::{
    Assignment, Attempt, BestState, Checkpoint, ConfidenceModel, ConfirmedMap, SolverConfig,
};
use crate::domain::ports::{AdvisorPrior, CheckpointStore, Oracle, Sleeper, TokioSleeper};
use crate::infrastructure::oracle::{RetryPolicy, TokenBucketRateLimiter};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Progress events emitted while the engine runs. Consumers (the CLI
/// progress display) are read-only observers; dropping the receiver never
/// affects the search.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// The control loop changed phase.
    PhaseChanged {
        /// The phase entered.
        phase: SearchPhase,
    },
    /// A trial was evaluated and scored.
    TrialEvaluated {
        /// Query count so far.
        trial: u64,
        /// Score of this trial.
        score: u32,
        /// Best score so far.
        best_score: u32,
        /// Confirmed slot count so far.
        confirmed: usize,
    },
    /// A trial was skipped after exhausting retries.
    TrialSkipped {
        /// Query count so far.
        trial: u64,
    },
    /// A slot's correct option was proven.
    SlotConfirmed {
        /// The confirmed slot.
        slot: usize,
        /// Its proven option.
        option: u8,
    },
    /// The run ended.
    Finished {
        /// Terminal outcome.
        outcome: RunOutcome,
    },
}

// ---------------------------------------------------------------------------
// Internal state and control
// ---------------------------------------------------------------------------

/// All mutable solver state, threaded explicitly through the loop. Every
/// mutation funnels through the attribution resolver and best-state
/// methods; nothing outside the engine touches it.
struct SearchState {
    model: ConfidenceModel,
    confirmed: ConfirmedMap,
    best: BestState,
    attempts: Vec<Attempt>,
    stuck_counter: u32,
    total_trials: u64,
    phase: SearchPhase,
}

/// Result of one evaluated-or-skipped trial, from the loop's perspective.
enum TrialControl {
    /// Keep searching.
    Continue,
    /// The query budget ran out.
    Budget,
    /// The oracle failed fatally.
    Fatal(String),
}

/// Outcome of one oracle call after retries.
enum EvalOutcome {
    Scored(u32),
    Skipped,
    Fatal(String),
    Budget,
}

// ---------------------------------------------------------------------------
// SearchEngine
// ---------------------------------------------------------------------------

/// The convergence controller driving the whole search.
pub struct SearchEngine<O: Oracle, S: CheckpointStore> {
    oracle: Arc<O>,
    store: Arc<S>,
    sleeper: Arc<dyn Sleeper>,
    rate_limiter: TokenBucketRateLimiter,
    retry: RetryPolicy,
    interpreter: ScoreInterpreter,
    resolver: AttributionResolver,
    config: SolverConfig,
    priors: Vec<AdvisorPrior>,
    events: Option<mpsc::UnboundedSender<SearchEvent>>,
}

impl<O: Oracle, S: CheckpointStore> SearchEngine<O, S> {
    /// Create an engine over an oracle and checkpoint store.
    pub fn new(
        oracle: Arc<O>,
        store: Arc<S>,
        config: SolverConfig,
        retry: RetryPolicy,
        rate_limiter: TokenBucketRateLimiter,
    ) -> Self {
        let interpreter = ScoreInterpreter::new(config.num_slots as u32);
        Self {
            oracle,
            store,
            sleeper: Arc::new(TokioSleeper),
            rate_limiter,
            retry,
            interpreter,
            resolver: AttributionResolver,
            config,
            priors: Vec::new(),
            events: None,
        }
    }

    /// Replace the sleeper used for backoff and rate-limit waits. Tests
    /// inject an instant sleeper here.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fold advisor priors into a fresh run's confidence model. Ignored
    /// when a checkpoint is resumed: persisted evidence outranks votes.
    pub fn with_priors(mut self, priors: Vec<AdvisorPrior>) -> Self {
        self.priors = priors;
        self
    }

    /// Attach a progress event channel.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Drive the search to a terminal phase and report.
    pub async fn run(&self) -> DomainResult<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let mut state = self.load_or_init().await?;
        let mut generator = GuessGenerator::new(
            GeneratorConfig {
                max_changes_per_guess: self.config.max_changes_per_guess,
                exploration_probability: self.config.exploration_probability,
                recent_history_limit: self.config.recent_history_limit,
            },
            self.config.seed,
        );
        for attempt in &state.attempts {
            generator.record_tried(&attempt.answers);
        }

        info!(
            %run_id,
            num_slots = self.config.num_slots,
            num_options = self.config.num_options,
            resumed_trials = state.total_trials,
            oracle = self.oracle.name(),
            "starting search"
        );
        self.emit(SearchEvent::PhaseChanged { phase: state.phase });

        let mut abort: Option<RunOutcome> = None;

        // Establish the baseline: the initial assignment itself is the
        // first trial, so every later delta has a reference score.
        if state.total_trials == 0 && abort.is_none() {
            let baseline = state.best.answers.clone();
            let reference = state.best.clone();
            let (control, _) = self
                .scored_trial(&mut state, &mut generator, &baseline, &reference, &[])
                .await?;
            abort = Self::control_to_abort(control);
        }

        while abort.is_none() {
            if self.solved(&state) {
                self.set_phase(&mut state, SearchPhase::Converged);
                break;
            }
            if state.total_trials >= self.config.max_trials {
                abort = Some(RunOutcome::BudgetExhausted);
                break;
            }

            match state.phase {
                SearchPhase::Searching => {
                    if state.stuck_counter >= self.config.stuck_threshold {
                        self.set_phase(&mut state, SearchPhase::Stuck);
                        continue;
                    }
                    let guess =
                        generator.next(&mut state.model, &state.confirmed, &state.best.answers)?;
                    let changed = state.best.answers.diff(&guess);
                    if changed.is_empty() {
                        // Every slot is pinned; the solved check above
                        // will terminate on the next pass.
                        continue;
                    }
                    let control = self
                        .run_search_trial(&mut state, &mut generator, guess, changed)
                        .await?;
                    abort = Self::control_to_abort(control);
                }
                SearchPhase::Stuck => {
                    warn!(
                        stuck_counter = state.stuck_counter,
                        best_score = state.best.score,
                        "stagnated; escalating to brute force"
                    );
                    self.set_phase(&mut state, SearchPhase::BruteForce);
                }
                SearchPhase::BruteForce => {
                    let control = self.run_brute_force(&mut state, &mut generator).await?;
                    abort = Self::control_to_abort(control);
                    if abort.is_none() {
                        state.stuck_counter = 0;
                        self.set_phase(&mut state, SearchPhase::Searching);
                    }
                }
                SearchPhase::Converged | SearchPhase::Aborted => break,
            }
        }

        let outcome = match abort {
            Some(reason) => {
                self.set_phase(&mut state, SearchPhase::Aborted);
                reason
            }
            None => {
                self.set_phase(&mut state, SearchPhase::Converged);
                RunOutcome::Converged
            }
        };

        let report = self.build_report(&state, run_id, outcome, started_at)?;
        info!(
            %run_id,
            outcome = ?report.outcome,
            best_score = report.best_score,
            confirmed = report.confirmed_slots,
            trials = report.total_trials,
            "search finished"
        );
        self.emit(SearchEvent::Finished { outcome });
        Ok(report)
    }

    // -- initialization ----------------------------------------------------

    async fn load_or_init(&self) -> DomainResult<SearchState> {
        match self.store.load().await {
            Ok(Some(checkpoint)) => {
                let restored = checkpoint.restore(self.config.num_options)?;
                if restored.model.num_slots() != self.config.num_slots {
                    return Err(crate::domain::errors::DomainError::CorruptCheckpoint(
                        format!(
                            "checkpoint covers {} slots but the run is configured for {}",
                            restored.model.num_slots(),
                            self.config.num_slots
                        ),
                    ));
                }
                info!(
                    trials = restored.total_trials,
                    best_score = restored.best.score,
                    confirmed = restored.confirmed.confirmed_count(),
                    "resuming from checkpoint"
                );
                Ok(SearchState {
                    model: restored.model,
                    confirmed: restored.confirmed,
                    best: restored.best,
                    attempts: restored.attempts,
                    stuck_counter: restored.stuck_counter,
                    total_trials: restored.total_trials,
                    phase: SearchPhase::Searching,
                })
            }
            Ok(None) => {
                let mut model =
                    ConfidenceModel::new(self.config.num_slots, self.config.num_options);
                for prior in &self.priors {
                    model.reward(prior.slot, prior.option, prior.reward)?;
                }
                if !self.priors.is_empty() {
                    info!(priors = self.priors.len(), "seeded advisor priors");
                }
                // The initial assignment follows the (possibly seeded)
                // weight argmax per slot.
                let mut initial = Assignment::uniform(self.config.num_slots);
                for slot in 0..self.config.num_slots {
                    initial.set_option(slot, model.best_option(slot)?)?;
                }
                Ok(SearchState {
                    model,
                    confirmed: ConfirmedMap::new(self.config.num_slots),
                    best: BestState::new(initial),
                    attempts: Vec::new(),
                    stuck_counter: 0,
                    total_trials: 0,
                    phase: SearchPhase::Searching,
                })
            }
            Err(err) => {
                // A broken store at startup means resume is impossible;
                // surface it rather than silently discarding progress.
                Err(crate::domain::errors::DomainError::CorruptCheckpoint(
                    err.to_string(),
                ))
            }
        }
    }

    // -- trial execution ---------------------------------------------------

    /// One searching-phase trial, including probe follow-ups for ambiguous
    /// multi-slot batches.
    async fn run_search_trial(
        &self,
        state: &mut SearchState,
        generator: &mut GuessGenerator,
        guess: Assignment,
        changed: Vec<usize>,
    ) -> DomainResult<TrialControl> {
        let reference = state.best.clone();
        let (control, attribution) = self
            .scored_trial(state, generator, &guess, &reference, &changed)
            .await?;
        if !matches!(control, TrialControl::Continue) {
            return Ok(control);
        }

        if let Some(Attribution::ProbesRequired { slots }) = attribution {
            return self
                .run_probes(state, generator, &reference, &guess, &slots)
                .await;
        }
        Ok(TrialControl::Continue)
    }

    /// Single-slot disambiguation probes after an ambiguous improvement:
    /// each changed slot is re-queried alone, holding every other slot at
    /// its pre-batch value, and only those probes may confirm.
    async fn run_probes(
        &self,
        state: &mut SearchState,
        generator: &mut GuessGenerator,
        reference: &BestState,
        trial: &Assignment,
        slots: &[usize],
    ) -> DomainResult<TrialControl> {
        for &slot in slots {
            if state.confirmed.is_confirmed(slot) {
                continue;
            }
            let probe = reference.answers.with_option(slot, trial.option(slot)?)?;
            debug!(slot, "issuing disambiguation probe");
            let (control, _) = self
                .scored_trial(state, generator, &probe, reference, &[slot])
                .await?;
            if !matches!(control, TrialControl::Continue) {
                return Ok(control);
            }
        }
        Ok(TrialControl::Continue)
    }

    /// Brute-force episode: cluster the most uncertain unconfirmed slots
    /// into small groups and exhaustively enumerate each group's option
    /// combinations against the pre-cluster baseline. Only single-change
    /// combinations can confirm; ambiguous combinations contribute weight
    /// evidence and may still advance the best state.
    async fn run_brute_force(
        &self,
        state: &mut SearchState,
        generator: &mut GuessGenerator,
    ) -> DomainResult<TrialControl> {
        let ranked = state.model.slots_by_uncertainty(&state.confirmed);
        let groups: Vec<Vec<usize>> = ranked
            .chunks(self.config.brute_force_group_size)
            .take(self.config.brute_force_groups)
            .map(<[usize]>::to_vec)
            .collect();

        info!(groups = groups.len(), "starting brute-force episode");

        for group in groups {
            if self.solved(state) {
                break;
            }
            let baseline = state.best.clone();
            let mut combo = vec![1u8; group.len()];

            'combos: loop {
                let mut candidate = baseline.answers.clone();
                let mut valid = true;
                for (i, &slot) in group.iter().enumerate() {
                    // A slot confirmed mid-episode is pinned; any combo
                    // proposing something else is discarded.
                    if let Some(option) = state.confirmed.get(slot) {
                        if combo[i] != option {
                            valid = false;
                            break;
                        }
                    }
                    candidate.set_option(slot, combo[i])?;
                }

                if valid {
                    let changed = baseline.answers.diff(&candidate);
                    if !changed.is_empty() && !generator.was_tried(&candidate) {
                        let (control, _) = self
                            .scored_trial(state, generator, &candidate, &baseline, &changed)
                            .await?;
                        if !matches!(control, TrialControl::Continue) {
                            return Ok(control);
                        }
                        if self.solved(state) {
                            return Ok(TrialControl::Continue);
                        }
                    }
                }

                // Odometer increment over the group's option space.
                for i in 0..combo.len() {
                    if combo[i] < self.config.num_options {
                        combo[i] += 1;
                        continue 'combos;
                    }
                    combo[i] = 1;
                }
                break;
            }
        }
        Ok(TrialControl::Continue)
    }

    /// Evaluate one assignment, record the attempt, attribute the delta,
    /// update the best state and stagnation counter, checkpoint, and emit
    /// progress. `reference` is the assignment the delta is measured
    /// against (the current best for search trials, the pre-batch best for
    /// probes and brute-force combinations).
    async fn scored_trial(
        &self,
        state: &mut SearchState,
        generator: &mut GuessGenerator,
        candidate: &Assignment,
        reference: &BestState,
        changed: &[usize],
    ) -> DomainResult<(TrialControl, Option<Attribution>)> {
        match self.evaluate_assignment(state, candidate).await {
            EvalOutcome::Budget => Ok((TrialControl::Budget, None)),
            EvalOutcome::Fatal(message) => Ok((TrialControl::Fatal(message), None)),
            EvalOutcome::Skipped => {
                // No state update beyond the query counter; the trial is
                // as if it never happened.
                self.persist(state).await;
                self.emit(SearchEvent::TrialSkipped {
                    trial: state.total_trials,
                });
                Ok((TrialControl::Continue, None))
            }
            EvalOutcome::Scored(score) => {
                generator.record_tried(candidate);
                let baseline = state.attempts.is_empty();
                state.attempts.push(Attempt {
                    answers: candidate.clone(),
                    score,
                    changed_indices: changed.to_vec(),
                });
                // Keep the in-memory history a bounded tail too.
                if state.attempts.len() > self.config.attempt_history_limit {
                    let excess = state.attempts.len() - self.config.attempt_history_limit;
                    state.attempts.drain(..excess);
                }

                // The first recorded attempt establishes the baseline; there
                // is no real reference score to attribute against yet.
                let attribution = if baseline {
                    for &slot in changed {
                        state.model.mark_tested(slot, candidate.option(slot)?)?;
                    }
                    Attribution::NoChange
                } else {
                    self.resolver.attribute(
                        &reference.answers,
                        reference.score,
                        candidate,
                        score,
                        changed,
                        &mut state.model,
                        &mut state.confirmed,
                    )?
                };
                match &attribution {
                    Attribution::Confirmed { slot, option } => {
                        info!(slot, option, score, "slot confirmed");
                        self.emit(SearchEvent::SlotConfirmed {
                            slot: *slot,
                            option: *option,
                        });
                    }
                    Attribution::Rejected {
                        slot,
                        eliminated: Some(option),
                        ..
                    } => {
                        info!(slot, option, "slot confirmed by elimination");
                        self.emit(SearchEvent::SlotConfirmed {
                            slot: *slot,
                            option: *option,
                        });
                    }
                    _ => {}
                }

                let improved = state.best.record(candidate, score, baseline);
                if improved {
                    state.stuck_counter = 0;
                } else if !changed.is_empty() {
                    state.stuck_counter += 1;
                }

                self.persist(state).await;
                self.emit(SearchEvent::TrialEvaluated {
                    trial: state.total_trials,
                    score,
                    best_score: state.best.score,
                    confirmed: state.confirmed.confirmed_count(),
                });
                debug!(
                    trial = state.total_trials,
                    score,
                    best_score = state.best.score,
                    stuck = state.stuck_counter,
                    "trial evaluated"
                );
                Ok((TrialControl::Continue, Some(attribution)))
            }
        }
    }

    /// The oracle-call wrapper: budget check, rate limiting, retry with
    /// exponential backoff. Malformed output and transient errors retry up
    /// to the cap, then the trial is skipped; a fatal error surfaces
    /// immediately. Each logical trial increments the query counter once.
    async fn evaluate_assignment(
        &self,
        state: &mut SearchState,
        assignment: &Assignment,
    ) -> EvalOutcome {
        if state.total_trials >= self.config.max_trials {
            return EvalOutcome::Budget;
        }
        state.total_trials += 1;

        let mut attempt: u32 = 0;
        loop {
            self.rate_limiter.acquire(self.sleeper.as_ref()).await;

            match self.oracle.evaluate(assignment).await {
                Ok(raw) => {
                    let raw_score = raw.raw_score.as_deref().unwrap_or_default();
                    match self.interpreter.interpret(raw_score) {
                        Ok(score) => return EvalOutcome::Scored(score),
                        Err(err) => {
                            warn!(
                                status = %raw.status,
                                raw = raw_score,
                                error = %err,
                                attempt,
                                "unusable oracle output"
                            );
                            if !self.retry.allows_retry(attempt) {
                                warn!("retries exhausted; skipping trial");
                                return EvalOutcome::Skipped;
                            }
                        }
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(error = %err, attempt, "transient oracle error");
                    if !self.retry.allows_retry(attempt) {
                        warn!("retries exhausted; skipping trial");
                        return EvalOutcome::Skipped;
                    }
                }
                Err(err) => {
                    error!(error = %err, "fatal oracle error");
                    return EvalOutcome::Fatal(err.to_string());
                }
            }

            let backoff = self.retry.backoff_for(attempt);
            debug!(?backoff, "backing off before retry");
            self.sleeper.sleep(backoff).await;
            attempt += 1;
        }
    }

    // -- bookkeeping -------------------------------------------------------

    /// Best-effort checkpoint write; a failure is logged and the run
    /// continues in memory.
    async fn persist(&self, state: &SearchState) {
        let checkpoint = Checkpoint::capture(
            &state.model,
            &state.confirmed,
            &state.best,
            &state.attempts,
            state.stuck_counter,
            state.total_trials,
            self.config.attempt_history_limit,
        );
        if let Err(err) = self.store.save(&checkpoint).await {
            warn!(error = %err, "checkpoint write failed; continuing in memory");
        }
    }

    fn solved(&self, state: &SearchState) -> bool {
        state.confirmed.is_complete()
            || (!state.attempts.is_empty()
                && state.best.score as usize == self.config.num_slots)
    }

    fn set_phase(&self, state: &mut SearchState, phase: SearchPhase) {
        if state.phase != phase {
            state.phase = phase;
            self.emit(SearchEvent::PhaseChanged { phase });
        }
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver is not the engine's problem.
            drop(events.send(event));
        }
    }

    fn control_to_abort(control: TrialControl) -> Option<RunOutcome> {
        match control {
            TrialControl::Continue => None,
            TrialControl::Budget => Some(RunOutcome::BudgetExhausted),
            TrialControl::Fatal(message) => {
                error!(error = %message, "aborting run");
                Some(RunOutcome::OracleFatal)
            }
        }
    }

    fn build_report(
        &self,
        state: &SearchState,
        run_id: Uuid,
        outcome: RunOutcome,
        started_at: chrono::DateTime<Utc>,
    ) -> DomainResult<RunReport> {
        // Fill unconfirmed slots with their best knowledge: the proven
        // option when confirmed, the perfect-scoring assignment when one
        // was observed, the highest-weighted option otherwise.
        let perfect = state.best.score as usize == self.config.num_slots;
        let mut final_answers = state.best.answers.clone();
        for slot in 0..self.config.num_slots {
            let option = match state.confirmed.get(slot) {
                Some(option) => option,
                None if perfect => state.best.answers.option(slot)?,
                None => state.model.best_option(slot)?,
            };
            final_answers.set_option(slot, option)?;
        }

        Ok(RunReport {
            run_id,
            outcome,
            final_answers,
            best_score: state.best.score,
            confirmed_slots: state.confirmed.confirmed_count(),
            total_slots: self.config.num_slots,
            total_trials: state.total_trials,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
