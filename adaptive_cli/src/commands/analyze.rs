use std::path::PathBuf;

use adaptive_core::{PerformanceAnalyzer, PerformanceConfig};
use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table};

use super::{print_json, read_json};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JSON array of periodic returns
    #[arg(long, short)]
    pub returns: PathBuf,

    #[arg(long, default_value = "adhoc")]
    pub strategy_id: String,

    /// Annual risk-free rate used for the Sharpe ratio
    #[arg(long, default_value = "0.0")]
    pub risk_free_rate: f64,

    /// Return periods per year
    #[arg(long, default_value = "252")]
    pub periods_per_year: f64,

    #[arg(long)]
    pub json: bool,
}

pub fn run_analyze_command(args: AnalyzeArgs) -> Result<()> {
    let returns: Vec<f64> = read_json(&args.returns)?;
    let analyzer = PerformanceAnalyzer::new(PerformanceConfig {
        risk_free_rate: args.risk_free_rate,
        periods_per_year: args.periods_per_year,
    });
    let report = analyzer
        .analyze(args.strategy_id.clone(), &returns)
        .with_context(|| format!("Failed to analyze {}", args.returns.display()))?;

    if args.json {
        return print_json(&report);
    }

    let return_color = if report.cumulative_return >= 0.0 { Color::Green } else { Color::Red };
    let sharpe = report
        .sharpe_ratio
        .map(|s| format!("{:.3}", s))
        .unwrap_or_else(|| "n/a".to_string());

    let mut table = Table::new();
    table.set_header(vec!["Strategy", "Periods", "Cumulative", "Annualized", "Volatility", "Sharpe", "Max DD"]);
    table.add_row(vec![
        Cell::new(&report.strategy_id),
        Cell::new(report.observations),
        Cell::new(format!("{:.2}%", report.cumulative_return * 100.0)).fg(return_color),
        Cell::new(format!("{:.2}%", report.annualized_return * 100.0)),
        Cell::new(format!("{:.2}%", report.annualized_volatility * 100.0)),
        Cell::new(sharpe),
        Cell::new(format!("{:.2}%", report.max_drawdown * 100.0)),
    ]);
    println!("{table}");
    Ok(())
}
