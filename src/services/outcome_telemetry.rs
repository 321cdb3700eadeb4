//! Session telemetry derived from recorded outcomes.
//!
//! Every process writes outcomes to the shared pattern store, so rates read
//! back from it reflect all `record` activity, not just this process's.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MetricType, OutcomeTotals, TelemetrySample};
use crate::domain::ports::{PatternRepository, TelemetrySource};

pub struct OutcomeTelemetrySource {
    patterns: Arc<dyn PatternRepository>,
    /// Lookback used for the first collection.
    initial_window: Duration,
    last_collect: Mutex<Option<DateTime<Utc>>>,
}

impl OutcomeTelemetrySource {
    pub fn new(patterns: Arc<dyn PatternRepository>, initial_window: Duration) -> Self {
        Self {
            patterns,
            initial_window,
            last_collect: Mutex::new(None),
        }
    }
}

/// Samples for one collection interval of `minutes` length.
fn interval_samples(totals: OutcomeTotals, minutes: f64) -> Vec<TelemetrySample> {
    let mut samples = vec![
        TelemetrySample::now(MetricType::CompletedSessions, totals.completed as f64),
        TelemetrySample::now(MetricType::FailedSessions, totals.failed as f64),
        TelemetrySample::now(MetricType::Throughput, totals.completed as f64 / minutes),
    ];

    let finished = totals.finished();
    if finished > 0 {
        let error_rate = totals.failed as f64 / finished as f64;
        samples.push(TelemetrySample::now(MetricType::ErrorRate, error_rate));
        samples.push(TelemetrySample::now(MetricType::SuccessRate, 1.0 - error_rate));
        samples.push(TelemetrySample::now(
            MetricType::AvgCompletionTime,
            totals.duration_ms as f64 / finished as f64,
        ));
    }
    samples
}

#[async_trait]
impl TelemetrySource for OutcomeTelemetrySource {
    /// Outcomes recorded since the previous collection. The interval only
    /// advances when the store answered.
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        let mut last = self.last_collect.lock().await;
        let until = Utc::now();
        let since = last.unwrap_or(until - self.initial_window).min(until);

        let totals = self.patterns.outcome_totals(since, until).await?;
        *last = Some(until);

        let minutes = ((until - since).num_milliseconds() as f64 / 60_000.0).max(1.0 / 60.0);
        debug!(
            completed = totals.completed,
            failed = totals.failed,
            minutes,
            "Collected outcome telemetry"
        );
        Ok(interval_samples(totals, minutes))
    }
}
