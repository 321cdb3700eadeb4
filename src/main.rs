//! autoresolve CLI entry point.

use anyhow::Result;
use clap::Parser;

use autoresolve::cli::commands;
use autoresolve::cli::context::EngineContext;
use autoresolve::cli::{handle_error, Cli, Commands};
use autoresolve::infrastructure::config::ConfigLoader;
use autoresolve::infrastructure::logging::{prune_expired_logs, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let log_config = LogConfig::from(&config.logging);
    let _logger = LoggerImpl::init(&log_config)?;
    if let Some(ref log_dir) = log_config.log_dir {
        if let Err(e) = prune_expired_logs(log_dir, log_config.retention_days).await {
            tracing::warn!(error = %e, "Failed to prune old log files");
        }
    }

    let json = cli.json;
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, json).await,
        Commands::Analyze(args) => commands::analyze::execute(args, json).await,
        command => {
            let ctx = EngineContext::build(config).await?;
            let result = match command {
                Commands::Recommend(args) => commands::recommend::execute(args, &ctx, json).await,
                Commands::Record(args) => commands::record::execute(args, &ctx, json).await,
                Commands::Optimize => commands::optimize::execute(&ctx, json).await,
                Commands::Daemon(args) => commands::daemon::execute(args, &ctx, json).await,
                Commands::Tools(args) => commands::tools::execute(args, &ctx, json).await,
                Commands::Params(args) => commands::params::execute(args, &ctx, json).await,
                Commands::Init(_) | Commands::Analyze(_) => Ok(()),
            };
            ctx.pool.close().await;
            result
        }
    }
}
