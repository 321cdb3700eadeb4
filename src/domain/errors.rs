//! Domain errors for the autoresolve selection engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the selection engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Pattern not found: {0}")]
    PatternNotFound(Uuid),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Parameter {key} value {value} is outside [{min}, {max}]")]
    ParameterOutOfBounds {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Telemetry unavailable: {0}")]
    TelemetryUnavailable(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = DomainError::ParameterOutOfBounds {
            key: "timeouts.agent_timeout".to_string(),
            value: 10.0,
            min: 300_000.0,
            max: 3_600_000.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("timeouts.agent_timeout"));
        assert!(msg.contains("300000"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: DomainError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, DomainError::SerializationError(_)));
    }
}
