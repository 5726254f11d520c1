mod commands;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use crate::commands::{
    analyze::AnalyzeArgs, assess::AssessArgs, classify::ClassifyArgs, init_config::InitConfigArgs,
    optimize::OptimizeArgs, simulate::SimulateArgs,
};

#[derive(Parser)]
#[command(name = "adaptive")]
#[command(author, version, about = "Regime-conditioned portfolio rebalancing engine", long_about = None)]
pub struct Cli {
    /// Engine configuration file (YAML, TOML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the market regime of a snapshot window
    Classify(ClassifyArgs),

    /// Compute the risk profile of a strategy return series
    Assess(AssessArgs),

    /// Compute target weights for a scope under a given regime
    Optimize(OptimizeArgs),

    /// Summarize realized performance of a return series
    Analyze(AnalyzeArgs),

    /// Run the configured scopes against the synthetic market
    Simulate(SimulateArgs),

    /// Write the default configuration as YAML
    InitConfig(InitConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    adaptive_core::init_tracing(&cli.log_level, cli.json_logs)
        .map_err(|err| anyhow!("failed to initialize logging: {}", err))?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Classify(args) => commands::classify::run_classify_command(args, config_path),
        Command::Assess(args) => commands::assess::run_assess_command(args, config_path),
        Command::Optimize(args) => commands::optimize::run_optimize_command(args, config_path),
        Command::Analyze(args) => commands::analyze::run_analyze_command(args),
        Command::Simulate(args) => commands::simulate::run_simulate_command(args, config_path).await,
        Command::InitConfig(args) => commands::init_config::run_init_config_command(args),
    }
}
