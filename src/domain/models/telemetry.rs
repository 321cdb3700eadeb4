//! Telemetry samples and derived per-metric trends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether larger values of a metric are desirable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    HigherIsWorse,
}

/// Telemetry signal the optimizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    CpuUsage,
    MemoryUsage,
    ActiveSessions,
    CompletedSessions,
    FailedSessions,
    AvgCompletionTime,
    ErrorRate,
    SuccessRate,
    Throughput,
}

impl MetricType {
    pub const ALL: [MetricType; 9] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::ActiveSessions,
        Self::CompletedSessions,
        Self::FailedSessions,
        Self::AvgCompletionTime,
        Self::ErrorRate,
        Self::SuccessRate,
        Self::Throughput,
    ];

    pub const fn polarity(self) -> Polarity {
        match self {
            Self::CompletedSessions | Self::SuccessRate | Self::Throughput => {
                Polarity::HigherIsBetter
            }
            _ => Polarity::HigherIsWorse,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::ActiveSessions => "active_sessions",
            Self::CompletedSessions => "completed_sessions",
            Self::FailedSessions => "failed_sessions",
            Self::AvgCompletionTime => "avg_completion_time",
            Self::ErrorRate => "error_rate",
            Self::SuccessRate => "success_rate",
            Self::Throughput => "throughput",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric type: {s}"))
    }
}

/// One time-series row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub metric: MetricType,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl TelemetrySample {
    pub fn now(metric: MetricType, value: f64) -> Self {
        Self {
            metric,
            value,
            recorded_at: Utc::now(),
        }
    }
}

/// Least-squares trend of one metric over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub metric: MetricType,
    pub sample_count: usize,
    pub mean: f64,
    /// Raw slope in value units per hour.
    pub slope: f64,
    /// Slope divided by `max(|mean|, 1.0)`.
    pub normalized_slope: f64,
    pub variance: f64,
}

impl MetricTrend {
    /// Coefficient of variation; zero when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean.abs() < f64::EPSILON {
            0.0
        } else {
            self.variance.sqrt() / self.mean.abs()
        }
    }

    /// Slope in the "worse" direction: positive when the metric degrades.
    pub fn degradation(&self) -> f64 {
        match self.metric.polarity() {
            Polarity::HigherIsWorse => self.normalized_slope,
            Polarity::HigherIsBetter => -self.normalized_slope,
        }
    }
}
