//! `autoresolve params`: tunable parameters and recent adjustments.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;

use crate::cli::context::EngineContext;
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::{AdjustmentRecord, OptimizationParameter};
use crate::domain::ports::ParameterRepository;

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Number of recent adjustment history rows to show
    #[arg(long, default_value = "10")]
    pub history: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct ParamsOutput {
    pub parameters: Vec<OptimizationParameter>,
    pub history: Vec<AdjustmentRecord>,
}

impl CommandOutput for ParamsOutput {
    fn to_human(&self) -> String {
        let mut params = table(&["PARAMETER", "VALUE", "MIN", "MAX", "DEFAULT", "UPDATED"]);
        for p in &self.parameters {
            params.add_row(vec![
                Cell::new(p.key()),
                Cell::new(p.current_value),
                Cell::new(p.min),
                Cell::new(p.max),
                Cell::new(p.optimal),
                Cell::new(p.updated_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }

        let mut lines = vec![params.to_string()];
        if self.history.is_empty() {
            lines.push("\nNo adjustments recorded yet.".to_string());
        } else {
            let mut history = table(&["WHEN", "PARAMETER", "FROM", "TO", "SCORE", "STATUS", "ERROR"]);
            for record in &self.history {
                let adj = &record.adjustment;
                history.add_row(vec![
                    Cell::new(record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                    Cell::new(adj.key()),
                    Cell::new(adj.previous_value),
                    Cell::new(adj.proposed_value),
                    Cell::new(format!("{:+.3}", adj.score)),
                    Cell::new(record.status),
                    Cell::new(truncate(record.error.as_deref().unwrap_or("-"), 40)),
                ]);
            }
            lines.push(format!("\nRecent adjustments:\n{history}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ParamsArgs, ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let parameters = ctx
        .parameters
        .list()
        .await
        .context("Failed to list parameters")?;
    let history = ctx
        .parameters
        .recent_adjustments(args.history)
        .await
        .context("Failed to list adjustment history")?;

    output(&ParamsOutput { parameters, history }, json_mode);
    Ok(())
}
