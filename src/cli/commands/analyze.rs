//! `autoresolve analyze`: classify a raw issue ticket.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::read_json;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{IssueTicket, TaskAnalysis};
use crate::services::issue_classifier::analyze;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Issue ticket JSON: {"number", "title", "body", "labels"}
    #[arg(long, short)]
    pub input: PathBuf,
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct AnalyzeOutput(pub TaskAnalysis);

impl CommandOutput for AnalyzeOutput {
    fn to_human(&self) -> String {
        let chars = &self.0.characteristics;
        let join = |set: &std::collections::BTreeSet<String>| {
            if set.is_empty() {
                "-".to_string()
            } else {
                set.iter().cloned().collect::<Vec<_>>().join(", ")
            }
        };
        let mut lines = Vec::new();
        if let Some(number) = self.0.issue_number {
            lines.push(format!("Issue #{number}: {}", self.0.title));
        } else {
            lines.push(format!("Issue: {}", self.0.title));
        }
        lines.push(format!("Category:   {}", chars.category));
        lines.push(format!("Complexity: {}", chars.complexity));
        lines.push(format!("Priority:   {:?}", chars.priority));
        lines.push(format!("Languages:  {}", join(&chars.languages)));
        lines.push(format!("Frameworks: {}", join(&chars.frameworks)));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AnalyzeArgs, json_mode: bool) -> Result<()> {
    let ticket: IssueTicket = read_json(&args.input).await?;
    output(&AnalyzeOutput(analyze(&ticket)), json_mode);
    Ok(())
}
