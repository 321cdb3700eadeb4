//! `autoresolve daemon`: run tuning cycles until interrupted.

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cli::commands::optimize::render_report;
use crate::cli::context::EngineContext;
use crate::services::{OptimizerDaemon, OptimizerEvent};

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Override the configured interval between cycles, in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

fn event_json(event: &OptimizerEvent) -> serde_json::Value {
    match event {
        OptimizerEvent::Started => serde_json::json!({ "event": "started" }),
        OptimizerEvent::CycleStarted { run_number } => {
            serde_json::json!({ "event": "cycle_started", "run_number": run_number })
        }
        OptimizerEvent::CycleCompleted { run_number, report } => serde_json::json!({
            "event": "cycle_completed",
            "run_number": run_number,
            "report": report,
        }),
        OptimizerEvent::CycleSkipped { run_number } => {
            serde_json::json!({ "event": "cycle_skipped", "run_number": run_number })
        }
        OptimizerEvent::CycleFailed { run_number, error } => serde_json::json!({
            "event": "cycle_failed",
            "run_number": run_number,
            "error": error,
        }),
        OptimizerEvent::Stopped { reason } => {
            serde_json::json!({ "event": "stopped", "reason": format!("{reason:?}") })
        }
    }
}

fn event_human(event: &OptimizerEvent) -> Option<String> {
    match event {
        OptimizerEvent::Started => Some("Optimizer daemon started. Press Ctrl-C to stop.".to_string()),
        OptimizerEvent::CycleStarted { .. } => None,
        OptimizerEvent::CycleCompleted { run_number, report } => {
            Some(format!("[run {run_number}] {}", render_report(report)))
        }
        OptimizerEvent::CycleSkipped { run_number } => {
            Some(format!("[run {run_number}] skipped, previous cycle still running"))
        }
        OptimizerEvent::CycleFailed { run_number, error } => {
            Some(format!("[run {run_number}] failed: {error}"))
        }
        OptimizerEvent::Stopped { reason } => Some(format!("Optimizer daemon stopped ({reason:?})")),
    }
}

pub async fn execute(args: DaemonArgs, ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let mut daemon = OptimizerDaemon::new(Arc::new(ctx.optimizer()));
    if let Some(secs) = args.interval {
        daemon = daemon.with_period(Duration::from_secs(secs.max(1)));
    }
    let handle = daemon.handle();
    let mut events = daemon.run();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if json_mode {
                    println!("{}", event_json(&event));
                } else if let Some(line) = event_human(&event) {
                    println!("{line}");
                }
                if matches!(event, OptimizerEvent::Stopped { .. }) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping optimizer daemon");
                handle.stop();
            }
        }
    }

    let status = handle.status().await;
    info!(
        total_runs = status.total_runs,
        successful_runs = status.successful_runs,
        failed_runs = status.failed_runs,
        total_adjustments = status.total_adjustments,
        "Optimizer daemon exited"
    );
    Ok(())
}
