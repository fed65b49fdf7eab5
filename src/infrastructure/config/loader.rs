use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid num_slots: {0}. Must be between 1 and 1024")]
    InvalidNumSlots(usize),

    #[error("Invalid num_options: {0}. Must be between 2 and 64")]
    InvalidNumOptions(u8),

    #[error("Invalid max_trials: {0}. Cannot be 0")]
    InvalidMaxTrials(u64),

    #[error("Invalid stuck_threshold: {0}. Cannot be 0")]
    InvalidStuckThreshold(u32),

    #[error("Invalid max_changes_per_guess: {0}. Must be between 1 and num_slots ({1})")]
    InvalidMaxChanges(usize, usize),

    #[error("Invalid exploration_probability: {0}. Must be within [0, 1]")]
    InvalidExplorationProbability(f64),

    #[error("Invalid brute_force_group_size: {0}. Must be between 1 and 3")]
    InvalidGroupSize(usize),

    #[error("Invalid attempt_history_limit: {0}. Cannot be 0")]
    InvalidAttemptHistoryLimit(usize),

    #[error("Oracle endpoint cannot be empty")]
    EmptyOracleEndpoint,

    #[error("Checkpoint path cannot be empty")]
    EmptyCheckpointPath,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .assay/config.yaml (project config, created by init)
    /// 3. .assay/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ASSAY_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.assay/) so several
    /// searches against different targets can coexist on one machine.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            // 1. Start with programmatic defaults
            .merge(Serialized::defaults(Config::default()))
            // 2. Merge project config (primary config, created by init)
            .merge(Yaml::file(".assay/config.yaml"))
            // 3. Merge project local overrides (optional, for dev/test overrides)
            .merge(Yaml::file(".assay/local.yaml"))
            // 4. Merge environment variables (highest priority)
            .merge(Env::prefixed("ASSAY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let solver = &config.solver;

        if solver.num_slots == 0 || solver.num_slots > 1024 {
            return Err(ConfigError::InvalidNumSlots(solver.num_slots));
        }

        if solver.num_options < 2 || solver.num_options > 64 {
            return Err(ConfigError::InvalidNumOptions(solver.num_options));
        }

        if solver.max_trials == 0 {
            return Err(ConfigError::InvalidMaxTrials(solver.max_trials));
        }

        if solver.stuck_threshold == 0 {
            return Err(ConfigError::InvalidStuckThreshold(solver.stuck_threshold));
        }

        if solver.max_changes_per_guess == 0 || solver.max_changes_per_guess > solver.num_slots {
            return Err(ConfigError::InvalidMaxChanges(
                solver.max_changes_per_guess,
                solver.num_slots,
            ));
        }

        if !(0.0..=1.0).contains(&solver.exploration_probability) {
            return Err(ConfigError::InvalidExplorationProbability(
                solver.exploration_probability,
            ));
        }

        if solver.brute_force_group_size == 0 || solver.brute_force_group_size > 3 {
            return Err(ConfigError::InvalidGroupSize(solver.brute_force_group_size));
        }

        if solver.attempt_history_limit == 0 {
            return Err(ConfigError::InvalidAttemptHistoryLimit(
                solver.attempt_history_limit,
            ));
        }

        if config.oracle.endpoint.is_empty() {
            return Err(ConfigError::EmptyOracleEndpoint);
        }

        if config.persistence.path.is_empty() {
            return Err(ConfigError::EmptyCheckpointPath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        for advisor in &config.advisors {
            if advisor.name.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Advisor name cannot be empty".to_string(),
                ));
            }
            if advisor.endpoint.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Advisor '{}' endpoint cannot be empty",
                    advisor.name
                )));
            }
            if advisor.weight <= 0.0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "Advisor '{}' weight must be positive",
                    advisor.name
                )));
            }
        }

        Ok(())
    }
}
