//! `autoresolve optimize`: run one tuning cycle now.

use anyhow::{Context, Result};
use comfy_table::Cell;

use crate::cli::context::EngineContext;
use crate::cli::output::{output, table, CommandOutput};
use crate::services::{CycleOutcome, CycleReport};

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct OptimizeOutput(pub CycleOutcome);

/// Human rendering of one completed cycle, shared with the daemon.
pub fn render_report(report: &CycleReport) -> String {
    let mut lines = vec![format!(
        "Cycle finished in {} ms: {} sample(s), {} trend(s), {} adjustment(s), {} failure(s), {} tool stat(s) recomputed",
        report.duration_ms,
        report.samples_collected,
        report.trends.len(),
        report.applied.len(),
        report.failed.len(),
        report.tools_recomputed
    )];

    if !report.trends.is_empty() {
        let mut trends = table(&["METRIC", "SAMPLES", "MEAN", "SLOPE/H", "NORMALIZED"]);
        for trend in &report.trends {
            trends.add_row(vec![
                Cell::new(trend.metric),
                Cell::new(trend.sample_count),
                Cell::new(format!("{:.4}", trend.mean)),
                Cell::new(format!("{:+.4}", trend.slope)),
                Cell::new(format!("{:+.4}", trend.normalized_slope)),
            ]);
        }
        lines.push(trends.to_string());
    }

    for adj in &report.applied {
        lines.push(format!(
            "  applied {}: {} -> {} (score {:+.3})",
            adj.key(),
            adj.previous_value,
            adj.proposed_value,
            adj.score
        ));
    }
    for failed in &report.failed {
        lines.push(format!("  failed {}: {}", failed.adjustment.key(), failed.error));
    }
    lines.join("\n")
}

impl CommandOutput for OptimizeOutput {
    fn to_human(&self) -> String {
        match &self.0 {
            CycleOutcome::Completed(report) => render_report(report),
            CycleOutcome::Skipped => "A tuning cycle is already in flight; skipped.".to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let outcome = ctx
        .optimizer()
        .run_cycle()
        .await
        .context("Tuning cycle failed")?;
    output(&OptimizeOutput(outcome), json_mode);
    Ok(())
}
