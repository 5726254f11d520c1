use std::path::{Path, PathBuf};

use adaptive_core::{RiskAssessor, RiskEngine, StrategyParams};
use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table};

use super::{load_config, print_json, read_json};

#[derive(Args, Debug)]
pub struct AssessArgs {
    /// JSON array of periodic returns
    #[arg(long, short)]
    pub returns: PathBuf,

    /// Strategy the returns belong to
    #[arg(long, default_value = "adhoc")]
    pub strategy_id: String,

    /// Print the risk profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_assess_command(args: AssessArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let returns: Vec<f64> = read_json(&args.returns)?;

    let engine = RiskEngine::new(config.risk);
    let profile = engine
        .assess(&StrategyParams::new(args.strategy_id.clone()), &returns)
        .with_context(|| format!("Failed to assess risk for {}", args.strategy_id))?;

    if args.json {
        return print_json(&profile);
    }

    let tail_color = if profile.conditional_value_at_risk < -0.05 {
        Color::Red
    } else {
        Color::Reset
    };

    let mut table = Table::new();
    table.set_header(vec!["Strategy", "Observations", "Volatility", "VaR", "CVaR", "Confidence"]);
    table.add_row(vec![
        Cell::new(&profile.strategy_id),
        Cell::new(profile.observations),
        Cell::new(format!("{:.5}", profile.volatility)),
        Cell::new(format!("{:.5}", profile.value_at_risk)),
        Cell::new(format!("{:.5}", profile.conditional_value_at_risk)).fg(tail_color),
        Cell::new(format!("{:.2}", profile.confidence_level)),
    ]);
    println!("{table}");
    Ok(())
}
