//! Common test utilities for integration tests
//!
//! Shared fixtures for building an engine over an in-memory database.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use autoresolve::adapters::sqlite::create_migrated_test_pool;
use autoresolve::cli::context::EngineContext;
use autoresolve::domain::models::{
    Complexity, Config, IssueCategory, IssueCharacteristics, MetricType, OutcomeReport,
    PatternKind, SolutionApproach, TelemetrySample,
};
use autoresolve::domain::ports::TelemetrySource;
use autoresolve::DomainResult;

/// Engine context over a fresh migrated in-memory database.
pub async fn engine_context() -> EngineContext {
    engine_context_with(Config::default()).await
}

pub async fn engine_context_with(config: Config) -> EngineContext {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    EngineContext::from_pool(config, pool)
        .await
        .expect("Failed to build engine context")
}

pub fn low_js_bug() -> IssueCharacteristics {
    IssueCharacteristics::new(Complexity::Low, IssueCategory::Bug).with_language("javascript")
}

pub fn outcome(
    issue: IssueCharacteristics,
    kind: PatternKind,
    tools: &[&str],
    duration_ms: u64,
) -> OutcomeReport {
    OutcomeReport {
        issue_characteristics: issue,
        solution_approach: SolutionApproach {
            agent_types: vec!["debugger".to_string(), "coder".to_string()],
            tools_used: tools.iter().map(|t| (*t).to_string()).collect(),
            duration_ms,
        },
        outcome: kind,
        confidence: 0.9,
    }
}

/// Samples spread evenly over the last `span_minutes`, oldest first, rising
/// by `per_hour` from `start`.
pub fn rising_samples(
    metric: MetricType,
    start: f64,
    per_hour: f64,
    count: usize,
    span_minutes: i64,
) -> Vec<TelemetrySample> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let offset = span_minutes - (span_minutes * i as i64) / (count as i64 - 1).max(1);
            let elapsed_hours = (span_minutes - offset) as f64 / 60.0;
            TelemetrySample {
                metric,
                value: start + per_hour * elapsed_hours,
                recorded_at: now - Duration::minutes(offset) - Duration::seconds(5),
            }
        })
        .collect()
}

/// Telemetry source that reports nothing, so cycles only see stored samples.
pub struct SilentTelemetry;

#[async_trait]
impl TelemetrySource for SilentTelemetry {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        Ok(Vec::new())
    }
}

/// Shorthand for an `Arc<dyn TelemetrySource>` that never reports.
pub fn silent() -> Arc<dyn TelemetrySource> {
    Arc::new(SilentTelemetry)
}
