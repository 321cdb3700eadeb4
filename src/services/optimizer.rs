//! Self-optimization loop.
//!
//! One tuning cycle collects telemetry, fits per-metric trends over the
//! analysis window, scores every tunable parameter from the trends of its
//! reactive signals, applies clamped adjustments, records history and finally
//! recomputes tool statistics from recent outcomes.
//!
//! At most one cycle is ever in flight: a cycle that starts while another is
//! running returns [`CycleOutcome::Skipped`] immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    find_tool, AdjustmentRecord, AdjustmentStatus, MetricTrend, MetricType, OptimizerConfig,
    ParameterAdjustment, PatternKind, ToolUsageStat,
};
use crate::domain::ports::{
    ParameterRepository, PatternRepository, TelemetryRepository, TelemetrySource,
    ToolStatsRepository,
};
use crate::services::runtime_parameters::RuntimeParameters;
use crate::services::trend::{adjustment_score, fit_trend, propose_adjustment};
use crate::services::vectorizer::normalize_duration;

/// Window of outcomes used to recompute tool statistics.
const TOOL_STATS_WINDOW_HOURS: i64 = 24;
const TOOL_STATS_MAX_PATTERNS: usize = 500;
const TOOL_STATS_MIN_SAMPLES: usize = 3;
/// Samples older than this many analysis windows are pruned each cycle.
const SAMPLE_RETENTION_WINDOWS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerState {
    Idle,
    Optimizing,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAdjustment {
    pub adjustment: ParameterAdjustment,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub samples_collected: usize,
    pub trends: Vec<MetricTrend>,
    pub applied: Vec<ParameterAdjustment>,
    pub failed: Vec<FailedAdjustment>,
    pub tools_recomputed: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped,
}

/// Resets the in-flight flag however the cycle ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Optimizer {
    telemetry: Arc<dyn TelemetrySource>,
    samples: Arc<dyn TelemetryRepository>,
    parameters: Arc<dyn ParameterRepository>,
    patterns: Arc<dyn PatternRepository>,
    tool_stats: Arc<dyn ToolStatsRepository>,
    runtime: RuntimeParameters,
    config: OptimizerConfig,
    in_flight: AtomicBool,
}

impl Optimizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        samples: Arc<dyn TelemetryRepository>,
        parameters: Arc<dyn ParameterRepository>,
        patterns: Arc<dyn PatternRepository>,
        tool_stats: Arc<dyn ToolStatsRepository>,
        runtime: RuntimeParameters,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            telemetry,
            samples,
            parameters,
            patterns,
            tool_stats,
            runtime,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> OptimizerState {
        if self.in_flight.load(Ordering::Acquire) {
            OptimizerState::Optimizing
        } else {
            OptimizerState::Idle
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run one tuning cycle unless one is already in flight.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> DomainResult<CycleOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Tuning cycle already in flight, skipping");
            return Ok(CycleOutcome::Skipped);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let start = Instant::now();
        let mut report = CycleReport::default();

        let collected = self.telemetry.collect().await?;
        report.samples_collected = collected.len();
        self.samples.record(&collected).await?;
        self.prune_samples().await;

        let trends = self.analyze_trends().await?;
        report.trends = trends.values().cloned().collect();
        report.trends.sort_by_key(|t| t.metric);

        for parameter in self.parameters.list().await? {
            let score = adjustment_score(&parameter, &trends);
            let Some(adjustment) = propose_adjustment(
                &parameter,
                score,
                self.config.adjustment_threshold,
                self.config.step_fraction,
            ) else {
                continue;
            };

            match self
                .parameters
                .update_value(&adjustment.category, &adjustment.name, adjustment.proposed_value)
                .await
            {
                Ok(()) => {
                    self.runtime
                        .set(&adjustment.key(), adjustment.proposed_value)
                        .await;
                    info!(
                        parameter = %adjustment.key(),
                        from = adjustment.previous_value,
                        to = adjustment.proposed_value,
                        score,
                        "Applied parameter adjustment"
                    );
                    self.record_history(&adjustment, AdjustmentStatus::Applied, None)
                        .await;
                    report.applied.push(adjustment);
                }
                Err(e) => {
                    warn!(parameter = %adjustment.key(), error = %e, "Failed to apply parameter adjustment");
                    self.record_history(&adjustment, AdjustmentStatus::Failed, Some(e.to_string()))
                        .await;
                    report.failed.push(FailedAdjustment {
                        adjustment,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.tools_recomputed = self.recompute_tool_stats().await?;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            samples = report.samples_collected,
            trends = report.trends.len(),
            applied = report.applied.len(),
            failed = report.failed.len(),
            tools = report.tools_recomputed,
            duration_ms = report.duration_ms,
            "Tuning cycle complete"
        );
        Ok(CycleOutcome::Completed(report))
    }

    async fn prune_samples(&self) {
        let retention = self.config.analysis_window_minutes * SAMPLE_RETENTION_WINDOWS;
        let before = Utc::now() - chrono::Duration::minutes(retention);
        match self.samples.prune_before(before).await {
            Ok(0) => {}
            Ok(pruned) => debug!(pruned, "Pruned old telemetry samples"),
            Err(e) => warn!(error = %e, "Failed to prune telemetry samples"),
        }
    }

    async fn analyze_trends(&self) -> DomainResult<HashMap<MetricType, MetricTrend>> {
        let since = Utc::now() - chrono::Duration::minutes(self.config.analysis_window_minutes);
        let mut trends = HashMap::new();
        for metric in MetricType::ALL {
            let samples = self.samples.samples_since(metric, since).await?;
            if let Some(trend) = fit_trend(metric, &samples, self.config.min_samples) {
                debug!(metric = %metric, slope = trend.slope, normalized = trend.normalized_slope, "Fitted trend");
                trends.insert(metric, trend);
            }
        }
        Ok(trends)
    }

    async fn record_history(
        &self,
        adjustment: &ParameterAdjustment,
        status: AdjustmentStatus,
        error: Option<String>,
    ) {
        let record = AdjustmentRecord::new(adjustment.clone(), status, error);
        if let Err(e) = self.parameters.record_adjustment(&record).await {
            warn!(parameter = %adjustment.key(), error = %e, "Failed to record adjustment history");
        }
    }

    /// Recompute statistics of tools with enough recent outcomes. Returns the
    /// number of tools updated.
    pub async fn recompute_tool_stats(&self) -> DomainResult<usize> {
        let since = Utc::now() - chrono::Duration::hours(TOOL_STATS_WINDOW_HOURS);
        let patterns = self
            .patterns
            .created_since(since, TOOL_STATS_MAX_PATTERNS)
            .await?;

        #[derive(Default)]
        struct Observed {
            samples: usize,
            successes: usize,
            duration_sum: f64,
        }

        let mut observed: HashMap<&str, Observed> = HashMap::new();
        for pattern in &patterns {
            let duration = normalize_duration(pattern.solution_approach.duration_ms);
            for tool in &pattern.solution_approach.tools_used {
                let entry = observed.entry(tool.as_str()).or_default();
                entry.samples += 1;
                entry.duration_sum += duration;
                if pattern.kind == PatternKind::Success {
                    entry.successes += 1;
                }
            }
        }

        let mut updated = 0;
        for (name, obs) in observed {
            if obs.samples < TOOL_STATS_MIN_SAMPLES {
                continue;
            }
            let mut stat = match self.tool_stats.get(name).await? {
                Some(stat) => stat,
                None => match find_tool(name) {
                    Some(def) => ToolUsageStat::seed(def),
                    None => continue,
                },
            };

            let n = obs.samples as f64;
            stat.success_rate = obs.successes as f64 / n;
            stat.performance_score = 0.5 * stat.success_rate + 0.5 * (1.0 - obs.duration_sum / n);
            self.tool_stats.upsert(&stat).await?;
            updated += 1;
        }

        Ok(updated)
    }
}

/// Event emitted by the optimizer daemon.
#[derive(Debug, Clone)]
pub enum OptimizerEvent {
    Started,
    CycleStarted { run_number: u64 },
    CycleCompleted {
        run_number: u64,
        report: CycleReport,
    },
    CycleSkipped { run_number: u64 },
    CycleFailed { run_number: u64, error: String },
    Stopped { reason: StopReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    TooManyFailures,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub skipped_runs: u64,
    pub failed_runs: u64,
    pub total_adjustments: u64,
}

/// Handle to control a running daemon.
#[derive(Clone)]
pub struct DaemonHandle {
    stop_flag: Arc<AtomicBool>,
    status: Arc<RwLock<DaemonStatus>>,
}

impl DaemonHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    pub async fn status(&self) -> DaemonStatus {
        self.status.read().await.clone()
    }
}

/// Runs tuning cycles on a fixed period.
pub struct OptimizerDaemon {
    optimizer: Arc<Optimizer>,
    period: Duration,
    run_on_startup: bool,
    max_consecutive_failures: u32,
    status: Arc<RwLock<DaemonStatus>>,
    stop_flag: Arc<AtomicBool>,
}

impl OptimizerDaemon {
    pub fn new(optimizer: Arc<Optimizer>) -> Self {
        let config = optimizer.config().clone();
        Self {
            optimizer,
            period: Duration::from_secs(config.interval_secs.max(1)),
            run_on_startup: config.run_on_startup,
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            status: Arc::new(RwLock::new(DaemonStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            stop_flag: self.stop_flag.clone(),
            status: self.status.clone(),
        }
    }

    /// Spawn the loop, returning a channel of events.
    pub fn run(self) -> mpsc::Receiver<OptimizerEvent> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            self.run_loop(tx).await;
        });
        rx
    }

    async fn run_loop(self, tx: mpsc::Sender<OptimizerEvent>) {
        self.status.write().await.running = true;
        let _ = tx.send(OptimizerEvent::Started).await;
        info!(period_secs = self.period.as_secs(), "Optimizer daemon started");

        let mut consecutive_failures = 0u32;
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        timer.tick().await;

        if self.run_on_startup {
            self.run_one(&tx, &mut consecutive_failures).await;
        }

        let reason = loop {
            if self.stop_flag.load(Ordering::Acquire) {
                break StopReason::Requested;
            }
            if consecutive_failures >= self.max_consecutive_failures {
                break StopReason::TooManyFailures;
            }

            tokio::select! {
                _ = timer.tick() => {
                    if self.stop_flag.load(Ordering::Acquire) {
                        break StopReason::Requested;
                    }
                    self.run_one(&tx, &mut consecutive_failures).await;
                }
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        };

        self.status.write().await.running = false;
        info!(?reason, "Optimizer daemon stopped");
        let _ = tx.send(OptimizerEvent::Stopped { reason }).await;
    }

    async fn run_one(&self, tx: &mpsc::Sender<OptimizerEvent>, consecutive_failures: &mut u32) {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };
        let _ = tx.send(OptimizerEvent::CycleStarted { run_number }).await;

        match self.optimizer.run_cycle().await {
            Ok(CycleOutcome::Completed(report)) => {
                *consecutive_failures = 0;
                {
                    let mut status = self.status.write().await;
                    status.successful_runs += 1;
                    status.total_adjustments += report.applied.len() as u64;
                }
                let _ = tx
                    .send(OptimizerEvent::CycleCompleted { run_number, report })
                    .await;
            }
            Ok(CycleOutcome::Skipped) => {
                self.status.write().await.skipped_runs += 1;
                let _ = tx.send(OptimizerEvent::CycleSkipped { run_number }).await;
            }
            Err(e) => {
                *consecutive_failures += 1;
                self.status.write().await.failed_runs += 1;
                warn!(run_number, error = %e, consecutive_failures = *consecutive_failures, "Tuning cycle failed");
                let _ = tx
                    .send(OptimizerEvent::CycleFailed {
                        run_number,
                        error: e.to_string(),
                    })
                    .await;
            }
        }
    }
}
