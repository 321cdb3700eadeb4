//! Tunable operating parameters and the optimizer's adjustment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::telemetry::MetricType;

/// Well-known parameter keys read by the request path.
pub mod keys {
    pub const MAX_CONCURRENT_AGENTS: &str = "concurrency.max_concurrent_agents";
    pub const MAX_PARALLEL_TOOLS: &str = "concurrency.max_parallel_tools";
    pub const AGENT_TIMEOUT: &str = "timeouts.agent_timeout";
    pub const SESSION_TIMEOUT: &str = "timeouts.session_timeout";
    pub const CONFIDENCE_THRESHOLD: &str = "thresholds.confidence_threshold";
    pub const SIMILARITY_THRESHOLD: &str = "thresholds.similarity_threshold";
    pub const LEARNING_RATE: &str = "learning.learning_rate";
}

/// Direction a parameter moves when a reactive metric degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Increase,
    Decrease,
}

impl Response {
    pub const fn sign(self) -> f64 {
        match self {
            Self::Increase => 1.0,
            Self::Decrease => -1.0,
        }
    }
}

/// A telemetry signal a parameter reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactiveSignal {
    pub metric: MetricType,
    pub on_degrade: Response,
}

impl ReactiveSignal {
    pub const fn new(metric: MetricType, on_degrade: Response) -> Self {
        Self { metric, on_degrade }
    }
}

/// One tunable knob. Invariant: `min <= current_value <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParameter {
    pub category: String,
    pub name: String,
    pub current_value: f64,
    pub min: f64,
    pub max: f64,
    pub optimal: f64,
    pub signals: Vec<ReactiveSignal>,
    pub updated_at: DateTime<Utc>,
}

impl OptimizationParameter {
    pub fn new(
        category: &str,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
        signals: Vec<ReactiveSignal>,
    ) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            current_value: value.clamp(min, max),
            min,
            max,
            optimal: value.clamp(min, max),
            signals,
            updated_at: Utc::now(),
        }
    }

    /// Flat `category.name` key.
    pub fn key(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Factory defaults for every tunable parameter.
pub fn default_parameters() -> Vec<OptimizationParameter> {
    use MetricType::{
        AvgCompletionTime, CpuUsage, ErrorRate, FailedSessions, MemoryUsage, SuccessRate,
        Throughput,
    };
    use Response::{Decrease, Increase};

    let s = ReactiveSignal::new;
    vec![
        OptimizationParameter::new(
            "concurrency",
            "max_concurrent_agents",
            8.0,
            1.0,
            32.0,
            vec![
                s(CpuUsage, Decrease),
                s(MemoryUsage, Decrease),
                s(ErrorRate, Decrease),
                s(Throughput, Increase),
            ],
        ),
        OptimizationParameter::new(
            "concurrency",
            "max_parallel_tools",
            4.0,
            1.0,
            16.0,
            vec![s(CpuUsage, Decrease), s(MemoryUsage, Decrease)],
        ),
        OptimizationParameter::new(
            "timeouts",
            "agent_timeout",
            1_800_000.0,
            300_000.0,
            3_600_000.0,
            vec![s(ErrorRate, Decrease), s(AvgCompletionTime, Increase)],
        ),
        OptimizationParameter::new(
            "timeouts",
            "session_timeout",
            3_600_000.0,
            600_000.0,
            7_200_000.0,
            vec![s(AvgCompletionTime, Increase), s(FailedSessions, Decrease)],
        ),
        OptimizationParameter::new(
            "thresholds",
            "confidence_threshold",
            0.7,
            0.5,
            0.95,
            vec![s(SuccessRate, Increase), s(ErrorRate, Increase)],
        ),
        OptimizationParameter::new(
            "thresholds",
            "similarity_threshold",
            0.6,
            0.4,
            0.9,
            vec![s(SuccessRate, Increase)],
        ),
        OptimizationParameter::new(
            "learning",
            "learning_rate",
            0.01,
            0.001,
            0.1,
            vec![s(SuccessRate, Increase), s(ErrorRate, Decrease)],
        ),
    ]
}

/// Direction of a proposed adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

/// A proposed change to one parameter, computed from trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAdjustment {
    pub category: String,
    pub name: String,
    pub previous_value: f64,
    pub proposed_value: f64,
    pub score: f64,
    pub direction: AdjustmentDirection,
}

impl ParameterAdjustment {
    pub fn key(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Applied,
    Failed,
}

impl AdjustmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AdjustmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown adjustment status: {other}")),
        }
    }
}

/// History row for one acted-upon adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub id: Uuid,
    pub adjustment: ParameterAdjustment,
    pub status: AdjustmentStatus,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AdjustmentRecord {
    pub fn new(adjustment: ParameterAdjustment, status: AdjustmentStatus, error: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            adjustment,
            status,
            error,
            recorded_at: Utc::now(),
        }
    }
}
