//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::analyze::AnalyzeArgs;
use commands::daemon::DaemonArgs;
use commands::init::InitArgs;
use commands::params::ParamsArgs;
use commands::recommend::RecommendArgs;
use commands::record::RecordArgs;
use commands::tools::ToolsArgs;

#[derive(Parser, Debug)]
#[command(name = "autoresolve")]
#[command(about = "Adaptive tool and agent selection for automated issue resolution", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .autoresolve/config.yaml plus local overrides)
    #[arg(short, long, global = true, env = "AUTORESOLVE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project directory, default config and database
    Init(InitArgs),

    /// Classify an issue ticket without selecting tools
    Analyze(AnalyzeArgs),

    /// Recommend tools and agents for an issue ticket
    Recommend(RecommendArgs),

    /// Record the outcome of a resolution attempt
    Record(RecordArgs),

    /// Run a single self-optimization cycle
    Optimize,

    /// Run the self-optimization loop until interrupted
    Daemon(DaemonArgs),

    /// Show tool statistics
    Tools(ToolsArgs),

    /// Show tunable parameters and adjustment history
    Params(ParamsArgs),
}

/// Print an error the way the selected output mode expects and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}
