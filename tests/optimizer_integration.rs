//! Integration tests for tuning cycles and the optimizer daemon.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use autoresolve::cli::context::EngineContext;
use autoresolve::domain::models::optimization::keys;
use autoresolve::domain::models::{
    AdjustmentDirection, AdjustmentRecord, AdjustmentStatus, MetricType, OptimizationParameter,
    PatternKind, TelemetrySample,
};
use autoresolve::domain::ports::{
    ParameterRepository, TelemetryRepository, TelemetrySource, ToolStatsRepository,
};
use autoresolve::services::{
    CycleOutcome, CycleReport, Optimizer, OptimizerDaemon, OptimizerEvent, StopReason,
};
use autoresolve::{DomainError, DomainResult};

use common::{engine_context, low_js_bug, outcome, rising_samples, silent};

fn optimizer_with(
    ctx: &EngineContext,
    telemetry: Arc<dyn TelemetrySource>,
    parameters: Arc<dyn ParameterRepository>,
) -> Optimizer {
    Optimizer::new(
        telemetry,
        ctx.telemetry.clone(),
        parameters,
        ctx.patterns.clone(),
        ctx.tool_stats.clone(),
        ctx.runtime.clone(),
        ctx.config.optimizer.clone(),
    )
}

fn silent_optimizer(ctx: &EngineContext) -> Optimizer {
    optimizer_with(ctx, silent(), ctx.parameters.clone())
}

fn completed(outcome: CycleOutcome) -> CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Skipped => panic!("cycle was skipped"),
    }
}

async fn seed_rising_error_rate(ctx: &EngineContext) {
    ctx.telemetry
        .record(&rising_samples(MetricType::ErrorRate, 0.05, 0.12, 6, 50))
        .await
        .unwrap();
}

/// Parameter store whose writes to one key always fail.
struct FailingParameters {
    inner: Arc<dyn ParameterRepository>,
    failing_key: &'static str,
}

#[async_trait]
impl ParameterRepository for FailingParameters {
    async fn seed(&self, parameters: &[OptimizationParameter]) -> DomainResult<usize> {
        self.inner.seed(parameters).await
    }

    async fn get(&self, category: &str, name: &str) -> DomainResult<Option<OptimizationParameter>> {
        self.inner.get(category, name).await
    }

    async fn list(&self) -> DomainResult<Vec<OptimizationParameter>> {
        self.inner.list().await
    }

    async fn update_value(&self, category: &str, name: &str, value: f64) -> DomainResult<()> {
        if format!("{category}.{name}") == self.failing_key {
            return Err(DomainError::DatabaseError("disk I/O error".to_string()));
        }
        self.inner.update_value(category, name, value).await
    }

    async fn record_adjustment(&self, record: &AdjustmentRecord) -> DomainResult<()> {
        self.inner.record_adjustment(record).await
    }

    async fn recent_adjustments(&self, limit: usize) -> DomainResult<Vec<AdjustmentRecord>> {
        self.inner.recent_adjustments(limit).await
    }
}

/// Telemetry source that takes a while to answer.
struct SlowTelemetry;

#[async_trait]
impl TelemetrySource for SlowTelemetry {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(Vec::new())
    }
}

struct BrokenTelemetry;

#[async_trait]
impl TelemetrySource for BrokenTelemetry {
    async fn collect(&self) -> DomainResult<Vec<TelemetrySample>> {
        Err(DomainError::TelemetryUnavailable("collector offline".to_string()))
    }
}

#[tokio::test]
async fn test_rising_error_rate_shortens_agent_timeout() {
    let ctx = engine_context().await;
    seed_rising_error_rate(&ctx).await;

    let report = completed(silent_optimizer(&ctx).run_cycle().await.unwrap());

    assert!(report.trends.iter().any(|t| t.metric == MetricType::ErrorRate));
    let adjustment = report
        .applied
        .iter()
        .find(|a| a.key() == keys::AGENT_TIMEOUT)
        .expect("agent_timeout should be adjusted");
    assert_eq!(adjustment.direction, AdjustmentDirection::Decrease);
    assert!(adjustment.proposed_value >= 300_000.0);
    assert!(adjustment.proposed_value < 1_800_000.0);
    assert!(report.failed.is_empty());

    assert_eq!(
        ctx.runtime.get(keys::AGENT_TIMEOUT).await,
        Some(adjustment.proposed_value)
    );
    let stored = ctx
        .parameters
        .get("timeouts", "agent_timeout")
        .await
        .unwrap()
        .unwrap();
    assert!((stored.current_value - adjustment.proposed_value).abs() < 1e-6);

    let history = ctx.parameters.recent_adjustments(20).await.unwrap();
    assert!(history.iter().any(|r| {
        r.adjustment.key() == keys::AGENT_TIMEOUT && r.status == AdjustmentStatus::Applied
    }));
}

#[tokio::test]
async fn test_no_trends_means_no_adjustments() {
    let ctx = engine_context().await;

    let report = completed(silent_optimizer(&ctx).run_cycle().await.unwrap());

    assert!(report.trends.is_empty());
    assert!(report.applied.is_empty());
    assert_eq!(ctx.runtime.get(keys::AGENT_TIMEOUT).await, Some(1_800_000.0));
    assert!(ctx.parameters.recent_adjustments(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_update_does_not_abort_cycle() {
    let ctx = engine_context().await;
    seed_rising_error_rate(&ctx).await;

    let parameters = Arc::new(FailingParameters {
        inner: ctx.parameters.clone(),
        failing_key: keys::AGENT_TIMEOUT,
    });
    let optimizer = optimizer_with(&ctx, silent(), parameters);
    let report = completed(optimizer.run_cycle().await.unwrap());

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].adjustment.key(), keys::AGENT_TIMEOUT);
    assert!(report.failed[0].error.contains("disk I/O error"));
    assert!(report
        .applied
        .iter()
        .any(|a| a.key() == keys::MAX_CONCURRENT_AGENTS));

    // The runtime view only follows committed values.
    assert_eq!(ctx.runtime.get(keys::AGENT_TIMEOUT).await, Some(1_800_000.0));

    let history = ctx.parameters.recent_adjustments(20).await.unwrap();
    let failed = history
        .iter()
        .find(|r| r.adjustment.key() == keys::AGENT_TIMEOUT)
        .expect("failed adjustment should be recorded");
    assert_eq!(failed.status, AdjustmentStatus::Failed);
    assert!(failed.error.is_some());
}

#[tokio::test]
async fn test_adjustment_clamps_to_minimum() {
    let ctx = engine_context().await;
    ctx.parameters
        .update_value("timeouts", "agent_timeout", 300_010.0)
        .await
        .unwrap();
    seed_rising_error_rate(&ctx).await;

    let report = completed(silent_optimizer(&ctx).run_cycle().await.unwrap());

    let adjustment = report
        .applied
        .iter()
        .find(|a| a.key() == keys::AGENT_TIMEOUT)
        .unwrap();
    assert_eq!(adjustment.proposed_value, 300_000.0);
    let stored = ctx
        .parameters
        .get("timeouts", "agent_timeout")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_value, stored.min);
}

#[tokio::test]
async fn test_overlapping_cycles_are_skipped() {
    let ctx = engine_context().await;
    let optimizer = optimizer_with(&ctx, Arc::new(SlowTelemetry), ctx.parameters.clone());

    let (first, second) = tokio::join!(optimizer.run_cycle(), optimizer.run_cycle());
    let outcomes = [first.unwrap(), second.unwrap()];

    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, CycleOutcome::Skipped))
        .count();
    assert_eq!(skipped, 1);

    // The guard is released once the running cycle ends.
    assert!(matches!(
        optimizer.run_cycle().await.unwrap(),
        CycleOutcome::Completed(_)
    ));
}

#[tokio::test]
async fn test_telemetry_failure_fails_cycle() {
    let ctx = engine_context().await;
    let optimizer = optimizer_with(&ctx, Arc::new(BrokenTelemetry), ctx.parameters.clone());

    let err = optimizer.run_cycle().await.unwrap_err();
    assert!(matches!(err, DomainError::TelemetryUnavailable(_)));
    assert!(matches!(
        optimizer.state(),
        autoresolve::services::OptimizerState::Idle
    ));
}

#[tokio::test]
async fn test_cycle_recomputes_tool_stats() {
    let ctx = engine_context().await;
    for _ in 0..3 {
        ctx.engine
            .record_outcome(&outcome(low_js_bug(), PatternKind::Success, &["eslint"], 60_000))
            .await
            .unwrap();
    }

    let report = completed(silent_optimizer(&ctx).run_cycle().await.unwrap());
    assert_eq!(report.tools_recomputed, 1);

    let stat = ctx.tool_stats.get("eslint").await.unwrap().unwrap();
    assert_eq!(stat.success_rate, 1.0);
    assert!(stat.performance_score > 0.5);
}

#[tokio::test]
async fn test_outcomes_recorded_by_another_context_feed_the_cycle() {
    let recorder = engine_context().await;
    for kind in [PatternKind::Failure; 5].into_iter().chain([PatternKind::Success]) {
        recorder
            .engine
            .record_outcome(&outcome(low_js_bug(), kind, &["eslint"], 120_000))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(5)).await;

    // A separate command process sees only the shared store.
    let tuner = EngineContext::from_pool(recorder.config.clone(), recorder.pool.clone())
        .await
        .unwrap();
    assert_eq!(tuner.counters.active(), 0);

    let since = chrono::Utc::now() - chrono::Duration::seconds(1);
    let report = completed(tuner.optimizer().run_cycle().await.unwrap());
    assert!(report.samples_collected >= 6);

    let error_rate = tuner
        .telemetry
        .samples_since(MetricType::ErrorRate, since)
        .await
        .unwrap();
    assert_eq!(error_rate.len(), 1);
    assert!((error_rate[0].value - 5.0 / 6.0).abs() < 1e-9);

    let failed = tuner
        .telemetry
        .samples_since(MetricType::FailedSessions, since)
        .await
        .unwrap();
    assert_eq!(failed[0].value, 5.0);

    let duration = tuner
        .telemetry
        .samples_since(MetricType::AvgCompletionTime, since)
        .await
        .unwrap();
    assert_eq!(duration[0].value, 120_000.0);
}

#[tokio::test]
async fn test_sparse_tool_history_is_left_alone() {
    let ctx = engine_context().await;
    let before = ctx.tool_stats.get("pytest").await.unwrap().unwrap();
    for _ in 0..2 {
        ctx.engine
            .record_outcome(&outcome(low_js_bug(), PatternKind::Failure, &["pytest"], 60_000))
            .await
            .unwrap();
    }

    let updated = silent_optimizer(&ctx).recompute_tool_stats().await.unwrap();
    assert_eq!(updated, 0);
    let after = ctx.tool_stats.get("pytest").await.unwrap().unwrap();
    assert_eq!(after.success_rate, before.success_rate);
}

#[tokio::test]
async fn test_daemon_runs_on_startup_and_stops_on_request() {
    let mut ctx = engine_context().await;
    ctx.config.optimizer.run_on_startup = true;
    ctx.config.optimizer.interval_secs = 3600;

    let daemon = OptimizerDaemon::new(Arc::new(silent_optimizer(&ctx)));
    let handle = daemon.handle();
    let mut events = daemon.run();

    let wait = Duration::from_secs(5);
    assert!(matches!(
        timeout(wait, events.recv()).await.unwrap(),
        Some(OptimizerEvent::Started)
    ));
    assert!(matches!(
        timeout(wait, events.recv()).await.unwrap(),
        Some(OptimizerEvent::CycleStarted { run_number: 1 })
    ));
    assert!(matches!(
        timeout(wait, events.recv()).await.unwrap(),
        Some(OptimizerEvent::CycleCompleted { run_number: 1, .. })
    ));

    handle.stop();
    match timeout(wait, events.recv()).await.unwrap() {
        Some(OptimizerEvent::Stopped { reason }) => assert_eq!(reason, StopReason::Requested),
        other => panic!("unexpected event: {other:?}"),
    }

    let status = handle.status().await;
    assert!(!status.running);
    assert_eq!(status.total_runs, 1);
    assert_eq!(status.successful_runs, 1);
}

#[tokio::test]
async fn test_daemon_stops_after_consecutive_failures() {
    let mut ctx = engine_context().await;
    ctx.config.optimizer.run_on_startup = true;
    ctx.config.optimizer.max_consecutive_failures = 2;

    let optimizer = optimizer_with(&ctx, Arc::new(BrokenTelemetry), ctx.parameters.clone());
    let daemon = OptimizerDaemon::new(Arc::new(optimizer)).with_period(Duration::from_millis(50));
    let handle = daemon.handle();
    let mut events = daemon.run();

    let mut failures = 0;
    let reason = loop {
        match timeout(Duration::from_secs(5), events.recv()).await.unwrap() {
            Some(OptimizerEvent::CycleFailed { .. }) => failures += 1,
            Some(OptimizerEvent::Stopped { reason }) => break reason,
            Some(_) => {}
            None => panic!("event channel closed before stop"),
        }
    };

    assert_eq!(reason, StopReason::TooManyFailures);
    assert_eq!(failures, 2);
    assert_eq!(handle.status().await.failed_runs, 2);
}
