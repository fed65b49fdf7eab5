//! Implementation of the `assay run` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::warn;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::search::RunReport;
use crate::domain::models::{Assignment, Config};
use crate::domain::ports::{AdvisorPrior, AnswerAdvisor, CheckpointStore, Oracle, QuestionPrompt};
use crate::infrastructure::advisors::HttpAdvisor;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging;
use crate::infrastructure::oracle::{
    HttpOracle, RetryPolicy, ScriptedOracle, TokenBucketRateLimiter,
};
use crate::infrastructure::persistence::JsonFileStore;
use crate::services::{SearchEngine, SearchEvent, VotePanel};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Score against this hidden key with the built-in scripted oracle
    /// instead of the configured HTTP endpoint (comma-separated options)
    #[arg(long, value_delimiter = ',')]
    pub demo_key: Vec<u8>,

    /// JSON file of questions to put before the configured advisors
    #[arg(long)]
    pub questions: Option<PathBuf>,

    /// Override the exploration seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the oracle query budget
    #[arg(long)]
    pub max_trials: Option<u64>,

    /// Discard any existing checkpoint and start fresh
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Debug, serde::Deserialize)]
struct QuestionEntry {
    text: String,
    options: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    #[serde(flatten)]
    pub report: RunReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let answers = self
            .report
            .final_answers
            .options()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "Outcome:   {:?}\nBest score: {}/{}\nConfirmed:  {}/{}\nTrials:     {}\nAnswers:    {}",
            self.report.outcome,
            self.report.best_score,
            self.report.total_slots,
            self.report.confirmed_slots,
            self.report.total_slots,
            self.report.total_trials,
            answers
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    logging::init(&config.logging);

    if let Some(seed) = args.seed {
        config.solver.seed = Some(seed);
    }
    if let Some(max_trials) = args.max_trials {
        config.solver.max_trials = max_trials;
    }

    if args.fresh {
        match tokio::fs::remove_file(&config.persistence.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).context("Failed to remove existing checkpoint");
            }
        }
    }

    let store = Arc::new(JsonFileStore::new(&config.persistence.path));

    // Advisor votes only matter for a fresh start; a resumed run already
    // carries hard-won oracle evidence.
    let priors = if store
        .load()
        .await
        .context("Failed to read existing checkpoint")?
        .is_none()
    {
        collect_priors(&config, args.questions.as_deref()).await?
    } else {
        Vec::new()
    };

    if args.demo_key.is_empty() {
        let oracle = Arc::new(HttpOracle::new(
            config.oracle.endpoint.clone(),
            Duration::from_secs(config.oracle.timeout_secs),
        )?);
        run_engine(oracle, store, config, priors, json_mode).await
    } else {
        if args.demo_key.len() != config.solver.num_slots {
            bail!(
                "demo key has {} slots but the run is configured for {}",
                args.demo_key.len(),
                config.solver.num_slots
            );
        }
        if let Some(&bad) = args
            .demo_key
            .iter()
            .find(|&&option| option == 0 || option > config.solver.num_options)
        {
            bail!(
                "demo key option {bad} outside 1..={}",
                config.solver.num_options
            );
        }
        let oracle = Arc::new(ScriptedOracle::new(Assignment::new(args.demo_key)));
        run_engine(oracle, store, config, priors, json_mode).await
    }
}

async fn run_engine<O: Oracle + 'static>(
    oracle: Arc<O>,
    store: Arc<JsonFileStore>,
    config: Config,
    priors: Vec<AdvisorPrior>,
    json_mode: bool,
) -> Result<()> {
    let engine = SearchEngine::new(
        oracle,
        store,
        config.solver.clone(),
        RetryPolicy::from(&config.retry),
        TokenBucketRateLimiter::from(&config.rate_limit),
    )
    .with_priors(priors);

    let report = if json_mode {
        engine.run().await?
    } else {
        run_with_progress(engine, config.solver.num_slots).await?
    };

    output(&RunOutput { report }, json_mode);
    Ok(())
}

/// Drive the engine while rendering confirmation progress on a bar.
async fn run_with_progress<O: Oracle + 'static, S: CheckpointStore + 'static>(
    engine: SearchEngine<O, S>,
    num_slots: usize,
) -> Result<RunReport> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = engine.with_events(tx);

    let bar = ProgressBar::new(num_slots as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} confirmed  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let handle = tokio::spawn(async move { engine.run().await });

    while let Some(event) = rx.recv().await {
        match event {
            SearchEvent::TrialEvaluated {
                trial,
                score,
                best_score,
                confirmed,
            } => {
                bar.set_position(confirmed as u64);
                bar.set_message(format!(
                    "best {best_score}/{num_slots} · trial {trial} · last {score}"
                ));
            }
            SearchEvent::TrialSkipped { trial } => {
                bar.set_message(format!("trial {trial} skipped"));
            }
            SearchEvent::PhaseChanged { phase } => {
                bar.set_message(format!("phase {phase:?}"));
            }
            SearchEvent::SlotConfirmed { .. } | SearchEvent::Finished { .. } => {}
        }
    }
    bar.finish_and_clear();

    let report = handle.await.context("engine task panicked")??;
    Ok(report)
}

/// Load the questions file (if given) and put it before the advisor panel.
async fn collect_priors(
    config: &Config,
    questions: Option<&Path>,
) -> Result<Vec<AdvisorPrior>> {
    let Some(path) = questions else {
        return Ok(Vec::new());
    };
    if config.advisors.is_empty() {
        warn!("questions file provided but no advisors configured; skipping voting");
        return Ok(Vec::new());
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read questions file {}", path.display()))?;
    let entries: Vec<QuestionEntry> =
        serde_json::from_str(&raw).context("Failed to parse questions file")?;

    if entries.len() != config.solver.num_slots {
        bail!(
            "questions file has {} entries but the run is configured for {} slots",
            entries.len(),
            config.solver.num_slots
        );
    }

    let prompts: Vec<QuestionPrompt> = entries
        .into_iter()
        .enumerate()
        .map(|(slot, entry)| QuestionPrompt {
            slot,
            text: entry.text,
            options: entry.options,
        })
        .collect();

    let mut advisors: Vec<Arc<dyn AnswerAdvisor>> = Vec::new();
    for advisor_config in &config.advisors {
        advisors.push(Arc::new(HttpAdvisor::new(
            advisor_config,
            Duration::from_secs(60),
        )?));
    }

    Ok(VotePanel::new(advisors).collect_priors(&prompts).await)
}
