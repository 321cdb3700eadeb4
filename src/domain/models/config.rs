use serde::{Deserialize, Serialize};

/// Main configuration structure for autoresolve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Predictor configuration
    #[serde(default)]
    pub learning: LearningConfig,

    /// Similarity retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Tool selection limits
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Self-optimization loop configuration
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".autoresolve/autoresolve.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
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

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,

    /// Write log lines to stderr as well
    #[serde(default = "default_console")]
    pub console: bool,

    /// Rotated log files older than this many days are deleted at startup
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

const fn default_console() -> bool {
    true
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
            console: default_console(),
            retention_days: default_retention_days(),
        }
    }
}

/// Predictor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LearningConfig {
    /// Learning rate used until the optimizer tunes it
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Learning history ring buffer capacity
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Entries kept when the history overflows
    #[serde(default = "default_history_trim_to")]
    pub history_trim_to: usize,

    /// Patterns replayed to rebuild predictor state on cold start
    #[serde(default = "default_warm_start_limit")]
    pub warm_start_limit: usize,
}

const fn default_learning_rate() -> f64 {
    0.01
}

const fn default_history_capacity() -> usize {
    1000
}

const fn default_history_trim_to() -> usize {
    500
}

const fn default_warm_start_limit() -> usize {
    1000
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            history_capacity: default_history_capacity(),
            history_trim_to: default_history_trim_to(),
            warm_start_limit: default_warm_start_limit(),
        }
    }
}

/// Similarity retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Candidate rows pulled before similarity scoring
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// Maximum similar patterns returned
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Similarity threshold used until the optimizer tunes it
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Confidence threshold used until the optimizer tunes it
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

const fn default_candidate_pool() -> usize {
    10
}

const fn default_max_results() -> usize {
    5
}

const fn default_similarity_threshold() -> f64 {
    0.6
}

const fn default_confidence_threshold() -> f64 {
    0.7
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_pool: default_candidate_pool(),
            max_results: default_max_results(),
            similarity_threshold: default_similarity_threshold(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Tool selection limits per complexity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectorConfig {
    #[serde(default = "default_low_limit")]
    pub low_limit: usize,

    #[serde(default = "default_medium_limit")]
    pub medium_limit: usize,

    #[serde(default = "default_high_limit")]
    pub high_limit: usize,
}

const fn default_low_limit() -> usize {
    8
}

const fn default_medium_limit() -> usize {
    12
}

const fn default_high_limit() -> usize {
    16
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            low_limit: default_low_limit(),
            medium_limit: default_medium_limit(),
            high_limit: default_high_limit(),
        }
    }
}

/// Self-optimization loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizerConfig {
    /// Seconds between tuning cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run a cycle immediately when the daemon starts
    #[serde(default)]
    pub run_on_startup: bool,

    /// Trend fitting window
    #[serde(default = "default_analysis_window_minutes")]
    pub analysis_window_minutes: i64,

    /// Minimum samples for a metric to be considered
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Minimum |score| that triggers an adjustment
    #[serde(default = "default_adjustment_threshold")]
    pub adjustment_threshold: f64,

    /// Fraction of a parameter's range moved per unit score
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,

    /// Consecutive failed cycles before the daemon stops
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_analysis_window_minutes() -> i64 {
    60
}

const fn default_min_samples() -> usize {
    3
}

const fn default_adjustment_threshold() -> f64 {
    0.05
}

const fn default_step_fraction() -> f64 {
    0.1
}

const fn default_max_consecutive_failures() -> u32 {
    5
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_on_startup: false,
            analysis_window_minutes: default_analysis_window_minutes(),
            min_samples: default_min_samples(),
            adjustment_threshold: default_adjustment_threshold(),
            step_fraction: default_step_fraction(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}
