//! Implementation of the `assay init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "{}\n\nConfig written to {}\nEdit it to point at your oracle endpoint, then run `assay run`.",
                self.message,
                self.config_path.display()
            )
        } else {
            self.message.clone()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let assay_dir = target.join(".assay");
    let config_path = assay_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        output(
            &InitOutput {
                success: false,
                message: "Project already initialized. Use --force to reinitialize.".to_string(),
                config_path,
            },
            json_mode,
        );
        return Ok(());
    }

    fs::create_dir_all(&assay_dir)
        .await
        .context("Failed to create .assay directory")?;

    fs::write(&config_path, default_config_yaml())
        .await
        .context("Failed to write config.yaml")?;

    output(
        &InitOutput {
            success: true,
            message: "Initialized assay project.".to_string(),
            config_path,
        },
        json_mode,
    );
    Ok(())
}

/// Render the default configuration as a commented YAML template.
fn default_config_yaml() -> String {
    let defaults = Config::default();
    format!(
        r"# Assay configuration. Environment variables with the ASSAY_ prefix
# override these values (e.g. ASSAY_SOLVER__NUM_SLOTS=30).

solver:
  num_slots: {num_slots}
  num_options: {num_options}
  max_trials: {max_trials}
  stuck_threshold: {stuck_threshold}
  max_changes_per_guess: {max_changes}
  exploration_probability: {exploration}
  brute_force_group_size: {group_size}
  brute_force_groups: {groups}
  attempt_history_limit: {history}
  recent_history_limit: {recent}
  # seed: 42

oracle:
  endpoint: {endpoint}
  timeout_secs: {timeout}

persistence:
  path: {checkpoint}

logging:
  level: {log_level}
  format: {log_format}

rate_limit:
  requests_per_second: {rps}
  burst_size: {burst}

retry:
  max_retries: {retries}
  initial_backoff_ms: {initial_backoff}
  max_backoff_ms: {max_backoff}

# Optional initial-guess advisors, consulted once before the search:
# advisors:
#   - name: local-llm
#     endpoint: http://127.0.0.1:11434/advise
#     weight: 1.0
",
        num_slots = defaults.solver.num_slots,
        num_options = defaults.solver.num_options,
        max_trials = defaults.solver.max_trials,
        stuck_threshold = defaults.solver.stuck_threshold,
        max_changes = defaults.solver.max_changes_per_guess,
        exploration = defaults.solver.exploration_probability,
        group_size = defaults.solver.brute_force_group_size,
        groups = defaults.solver.brute_force_groups,
        history = defaults.solver.attempt_history_limit,
        recent = defaults.solver.recent_history_limit,
        endpoint = defaults.oracle.endpoint,
        timeout = defaults.oracle.timeout_secs,
        checkpoint = defaults.persistence.path,
        log_level = defaults.logging.level,
        log_format = defaults.logging.format,
        rps = defaults.rate_limit.requests_per_second,
        burst = defaults.rate_limit.burst_size,
        retries = defaults.retry.max_retries,
        initial_backoff = defaults.retry.initial_backoff_ms,
        max_backoff = defaults.retry.max_backoff_ms,
    )
}
