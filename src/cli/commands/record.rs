//! `autoresolve record`: ingest the outcome of an attempt.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::read_json;
use crate::cli::context::EngineContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{OutcomeReport, PatternKind};
use crate::domain::ports::PatternRepository;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Outcome JSON: {"issue_characteristics", "solution_approach", "outcome", "confidence"}
    #[arg(long, short)]
    pub input: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct RecordOutput {
    pub pattern_id: String,
    pub outcome: PatternKind,
    pub stored_patterns: u64,
    pub predictor_updates: u64,
}

impl CommandOutput for RecordOutput {
    fn to_human(&self) -> String {
        format!(
            "Recorded {} outcome as pattern {}\nPatterns stored: {}\nPredictor updates: {}",
            self.outcome, self.pattern_id, self.stored_patterns, self.predictor_updates
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RecordArgs, ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let report: OutcomeReport = read_json(&args.input).await?;
    let pattern = ctx
        .engine
        .record_outcome(&report)
        .await
        .context("Failed to record outcome")?;

    let out = RecordOutput {
        pattern_id: pattern.id.to_string(),
        outcome: pattern.kind,
        stored_patterns: ctx.patterns.count().await?,
        predictor_updates: ctx.engine.predictor().snapshot().await.updates,
    };
    output(&out, json_mode);
    Ok(())
}
