//! Implementation of the `autoresolve init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::context::seed;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml with defaults
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_written: Option<PathBuf>,
    pub database_path: String,
    pub tools_seeded: usize,
    pub parameters_seeded: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if let Some(ref path) = self.config_written {
            lines.push(format!("\nWrote default configuration to {}", path.display()));
        }
        lines.push(format!("Database initialized at {}", self.database_path));
        if self.tools_seeded > 0 || self.parameters_seeded > 0 {
            lines.push(format!(
                "Seeded {} tool(s) and {} parameter(s)",
                self.tools_seeded, self.parameters_seeded
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let project_dir = PathBuf::from(".autoresolve");
    fs::create_dir_all(&project_dir)
        .await
        .context("Failed to create .autoresolve directory")?;

    let config_path = project_dir.join("config.yaml");
    let config_written = if args.force || !config_path.exists() {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Some(config_path)
    } else {
        None
    };

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    let (tools_seeded, parameters_seeded) = seed(&pool, config).await?;
    pool.close().await;

    let out = InitOutput {
        success: true,
        message: "Project initialized successfully.".to_string(),
        config_written,
        database_path: config.database.path.clone(),
        tools_seeded,
        parameters_seeded,
    };
    output(&out, json_mode);
    Ok(())
}
