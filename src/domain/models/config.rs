use serde::{Deserialize, Serialize};

/// Main configuration structure for assay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Search loop configuration
    #[serde(default)]
    pub solver: SolverConfig,

    /// Oracle endpoint configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Checkpoint persistence configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Initial-guess advisor endpoints
    #[serde(default)]
    pub advisors: Vec<AdvisorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            oracle: OracleConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            advisors: vec![],
        }
    }
}

/// Search loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// Number of slots (N) in the hidden assignment
    #[serde(default = "default_num_slots")]
    pub num_slots: usize,

    /// Number of options (K) per slot
    #[serde(default = "default_num_options")]
    pub num_options: u8,

    /// Maximum total oracle queries before aborting
    #[serde(default = "default_max_trials")]
    pub max_trials: u64,

    /// Trials without improvement before escalating to brute force
    #[serde(default = "default_stuck_threshold")]
    pub stuck_threshold: u32,

    /// Maximum slots changed per generated guess
    #[serde(default = "default_max_changes_per_guess")]
    pub max_changes_per_guess: usize,

    /// Probability of exploring instead of taking the next untested option
    #[serde(default = "default_exploration_probability")]
    pub exploration_probability: f64,

    /// Slots per brute-force cluster (kept small to bound enumeration)
    #[serde(default = "default_brute_force_group_size")]
    pub brute_force_group_size: usize,

    /// Number of clusters enumerated per brute-force episode
    #[serde(default = "default_brute_force_groups")]
    pub brute_force_groups: usize,

    /// Attempts retained in the checkpoint tail
    #[serde(default = "default_attempt_history_limit")]
    pub attempt_history_limit: usize,

    /// Cap on the recently-tried assignment set
    #[serde(default = "default_recent_history_limit")]
    pub recent_history_limit: usize,

    /// Seed for exploration sampling; omit for OS entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

const fn default_num_slots() -> usize {
    30
}

const fn default_num_options() -> u8 {
    4
}

const fn default_max_trials() -> u64 {
    1000
}

const fn default_stuck_threshold() -> u32 {
    8
}

const fn default_max_changes_per_guess() -> usize {
    2
}

const fn default_exploration_probability() -> f64 {
    0.1
}

const fn default_brute_force_group_size() -> usize {
    3
}

const fn default_brute_force_groups() -> usize {
    2
}

const fn default_attempt_history_limit() -> usize {
    200
}

const fn default_recent_history_limit() -> usize {
    512
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            num_slots: default_num_slots(),
            num_options: default_num_options(),
            max_trials: default_max_trials(),
            stuck_threshold: default_stuck_threshold(),
            max_changes_per_guess: default_max_changes_per_guess(),
            exploration_probability: default_exploration_probability(),
            brute_force_group_size: default_brute_force_group_size(),
            brute_force_groups: default_brute_force_groups(),
            attempt_history_limit: default_attempt_history_limit(),
            recent_history_limit: default_recent_history_limit(),
            seed: None,
        }
    }
}

/// Oracle endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Evaluation endpoint URL
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_oracle_endpoint() -> String {
    "http://127.0.0.1:8460/evaluate".to_string()
}

const fn default_oracle_timeout_secs() -> u64 {
    30
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

/// Checkpoint persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersistenceConfig {
    /// Path to the checkpoint file
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
}

fn default_checkpoint_path() -> String {
    ".assay/checkpoint.json".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Rate limiting configuration
///
/// The oracle is one shared external session; the defaults keep the loop
/// well below anything that would trip its own throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    1.0
}

const fn default_burst_size() -> u32 {
    1
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Initial-guess advisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdvisorConfig {
    /// Advisor name, for logs and vote weighting diagnostics
    pub name: String,

    /// Advisor endpoint URL
    pub endpoint: String,

    /// Vote weight in the majority combination
    #[serde(default = "default_advisor_weight")]
    pub weight: f64,
}

const fn default_advisor_weight() -> f64 {
    1.0
}
