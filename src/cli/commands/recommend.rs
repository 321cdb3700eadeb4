//! `autoresolve recommend`: classify a ticket and select tools and agents.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use std::path::PathBuf;

use crate::cli::commands::read_json;
use crate::cli::context::EngineContext;
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::IssueTicket;
use crate::services::issue_classifier::analyze;
use crate::services::{Recommendation, SuggestionStatus};

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Issue ticket JSON: {"number", "title", "body", "labels"}
    #[arg(long, short)]
    pub input: PathBuf,
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct RecommendOutput(pub Recommendation);

impl CommandOutput for RecommendOutput {
    fn to_human(&self) -> String {
        let rec = &self.0;
        let status = match rec.suggestion {
            SuggestionStatus::Suggested => "suggested (backed by similar successes)",
            SuggestionStatus::NoMatch => "no similar successes, rules only",
            SuggestionStatus::LowConfidence => "similar successes found, confidence too low",
        };

        let mut tools = table(&["#", "TOOL", "CATEGORY", "PRIORITY", "SCORE"]);
        for (i, tool) in rec.tools.iter().enumerate() {
            tools.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&tool.name),
                Cell::new(tool.category),
                Cell::new(format!("{:.2}", tool.priority)),
                Cell::new(format!("{:.3}", tool.score)),
            ]);
        }

        let mut lines = vec![
            format!("Selection:  {}", rec.selection_id),
            format!("Confidence: {:.1}%", rec.confidence * 100.0),
            format!("Suggestion: {status}"),
            format!("Agents:     {}", rec.agents.join(", ")),
            format!(
                "Limits:     {} agents, {} parallel tools, agent timeout {}s, session timeout {}s",
                rec.limits.max_concurrent_agents,
                rec.limits.max_parallel_tools,
                rec.limits.agent_timeout_ms / 1000,
                rec.limits.session_timeout_ms / 1000
            ),
            String::new(),
            tools.to_string(),
        ];
        if !rec.similar.is_empty() {
            lines.push(format!("\nSimilar past successes ({}):", rec.similar.len()));
            for scored in &rec.similar {
                let tools_used: Vec<&str> = scored
                    .pattern
                    .solution_approach
                    .tools_used
                    .iter()
                    .map(String::as_str)
                    .collect();
                lines.push(format!(
                    "  {} similarity {:.2}  tools: {}",
                    &scored.pattern.id.to_string()[..8],
                    scored.similarity,
                    truncate(&tools_used.join(", "), 60)
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RecommendArgs, ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let ticket: IssueTicket = read_json(&args.input).await?;
    let analysis = analyze(&ticket);
    let recommendation = ctx
        .engine
        .recommend(&analysis)
        .await
        .context("Failed to produce recommendation")?;
    output(&RecommendOutput(recommendation), json_mode);
    Ok(())
}
