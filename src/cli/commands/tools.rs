//! `autoresolve tools`: tool statistics table.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;

use crate::cli::context::EngineContext;
use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::ToolUsageStat;
use crate::domain::ports::ToolStatsRepository;

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Sort by usage count instead of name
    #[arg(long)]
    pub by_usage: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ToolsOutput {
    pub tools: Vec<ToolUsageStat>,
    pub total: usize,
}

impl CommandOutput for ToolsOutput {
    fn to_human(&self) -> String {
        if self.tools.is_empty() {
            return "No tool statistics found. Run 'autoresolve init' first.".to_string();
        }

        let mut t = table(&["TOOL", "CATEGORY", "SUCCESS", "PERFORMANCE", "USED", "LAST USED"]);
        for tool in &self.tools {
            t.add_row(vec![
                Cell::new(&tool.name),
                Cell::new(tool.category),
                Cell::new(format!("{:.2}", tool.success_rate)),
                Cell::new(format!("{:.2}", tool.performance_score)),
                Cell::new(tool.usage_count),
                Cell::new(
                    tool.last_used_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        format!("{t}\n\n{} tool(s)", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ToolsArgs, ctx: &EngineContext, json_mode: bool) -> Result<()> {
    let mut tools = ctx
        .tool_stats
        .list()
        .await
        .context("Failed to list tool statistics")?;
    if args.by_usage {
        tools.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.name.cmp(&b.name)));
    }

    let out = ToolsOutput {
        total: tools.len(),
        tools,
    };
    output(&out, json_mode);
    Ok(())
}
