use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::infrastructure::logging::RotationPolicy;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid {name}: {value}. Must be within [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

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
    /// 2. .autoresolve/config.yaml (project config, created by init)
    /// 3. .autoresolve/local.yaml (project local overrides, optional)
    /// 4. Environment variables (AUTORESOLVE_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".autoresolve/config.yaml"))
            .merge(Yaml::file(".autoresolve/local.yaml"))
            .merge(Env::prefixed("AUTORESOLVE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("AUTORESOLVE_").split("__"))
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
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if config.logging.rotation.parse::<RotationPolicy>().is_err() {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }
        if config.logging.retention_days == 0 {
            return Err(ConfigError::ValidationFailed(
                "logging.retention_days must be at least 1".to_string(),
            ));
        }

        check_range("learning.learning_rate", config.learning.learning_rate, 0.001, 0.1)?;
        if config.learning.history_capacity == 0
            || config.learning.history_trim_to >= config.learning.history_capacity
        {
            return Err(ConfigError::ValidationFailed(format!(
                "learning.history_trim_to ({}) must be below history_capacity ({})",
                config.learning.history_trim_to, config.learning.history_capacity
            )));
        }

        if config.retrieval.max_results == 0
            || config.retrieval.candidate_pool < config.retrieval.max_results
        {
            return Err(ConfigError::ValidationFailed(format!(
                "retrieval.candidate_pool ({}) must be at least max_results ({}) and max_results at least 1",
                config.retrieval.candidate_pool, config.retrieval.max_results
            )));
        }
        check_range(
            "retrieval.similarity_threshold",
            config.retrieval.similarity_threshold,
            0.4,
            0.9,
        )?;
        check_range(
            "retrieval.confidence_threshold",
            config.retrieval.confidence_threshold,
            0.5,
            0.95,
        )?;

        let limits = &config.selector;
        if limits.low_limit == 0 || limits.low_limit > limits.medium_limit || limits.medium_limit > limits.high_limit {
            return Err(ConfigError::ValidationFailed(format!(
                "selector limits must satisfy 1 <= low ({}) <= medium ({}) <= high ({})",
                limits.low_limit, limits.medium_limit, limits.high_limit
            )));
        }

        let optimizer = &config.optimizer;
        if optimizer.interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "optimizer.interval_secs must be at least 1".to_string(),
            ));
        }
        if optimizer.analysis_window_minutes <= 0 {
            return Err(ConfigError::ValidationFailed(
                "optimizer.analysis_window_minutes must be positive".to_string(),
            ));
        }
        if optimizer.min_samples < 2 {
            return Err(ConfigError::ValidationFailed(
                "optimizer.min_samples must be at least 2".to_string(),
            ));
        }
        check_range(
            "optimizer.adjustment_threshold",
            optimizer.adjustment_threshold,
            0.0,
            1.0,
        )?;
        check_range("optimizer.step_fraction", optimizer.step_fraction, 0.001, 1.0)?;
        if optimizer.max_consecutive_failures == 0 {
            return Err(ConfigError::ValidationFailed(
                "optimizer.max_consecutive_failures must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".autoresolve/autoresolve.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.retrieval.candidate_pool, 10);
        assert_eq!(config.optimizer.interval_secs, 300);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/path.db
  max_connections: 3
logging:
  level: debug
  format: json
learning:
  learning_rate: 0.05
retrieval:
  similarity_threshold: 0.75
optimizer:
  interval_secs: 60
  run_on_startup: true
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.logging.format, "json");
        assert!((config.learning.learning_rate - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.learning.history_capacity, 1000);
        assert!((config.retrieval.similarity_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.optimizer.interval_secs, 60);
        assert!(config.optimizer.run_on_startup);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_log_rotation_and_retention() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogRotation(_)
        ));

        config.logging.rotation = "Hourly".to_string();
        ConfigLoader::validate(&config).expect("rotation is case-insensitive");

        config.logging.retention_days = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConnections(0)
        ));
    }

    #[test]
    fn test_validate_learning_rate_bounds() {
        let mut config = Config::default();
        config.learning.learning_rate = 0.5;

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::OutOfRange { name, .. } => assert_eq!(name, "learning.learning_rate"),
            other => panic!("Expected OutOfRange error, got {other:?}"),
        }

        config.learning.learning_rate = f64::NAN;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_history_trim() {
        let mut config = Config::default();
        config.learning.history_trim_to = config.learning.history_capacity;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_candidate_pool() {
        let mut config = Config::default();
        config.retrieval.candidate_pool = 2;
        config.retrieval.max_results = 5;

        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_selector_limits_ordering() {
        let mut config = Config::default();
        config.selector.low_limit = 20;

        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_optimizer() {
        let mut config = Config::default();
        config.optimizer.min_samples = 1;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.optimizer.step_fraction = 0.0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "retrieval:\n  candidate_pool: 20\n  max_results: 8\nselector:\n  high_limit: 20"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.retrieval.candidate_pool, 20);
        assert_eq!(config.retrieval.max_results, 8);
        assert_eq!(config.selector.high_limit, 20);
        assert_eq!(config.selector.low_limit, 8);
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "optimizer:\n  step_fraction: 3.0").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "logging:\n  level: info\n  format: json\noptimizer:\n  interval_secs: 120"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.optimizer.interval_secs, 120);
    }
}
