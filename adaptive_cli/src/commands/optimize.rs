use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use adaptive_core::{
    AllocationOptimizer, AssetId, RegimeAllocationOptimizer, RegimeLabel, RegimeState, RiskProfile,
};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use super::{colored_label, load_config, print_json, read_json};

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Scope to optimize; defaults to the first configured scope
    #[arg(long, short)]
    pub scope: Option<String>,

    /// Regime label (bullish, bearish, volatile, neutral)
    #[arg(long, value_parser = parse_label)]
    pub regime: RegimeLabel,

    /// Confidence in the regime label (0.0-1.0)
    #[arg(long, default_value = "1.0")]
    pub confidence: f64,

    /// JSON array of strategy risk profiles
    #[arg(long)]
    pub profiles: Option<PathBuf>,

    /// Print the allocation target as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_label(raw: &str) -> Result<RegimeLabel, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown regime '{}'", raw))
}

pub fn run_optimize_command(args: OptimizeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let scope = match &args.scope {
        Some(scope_id) => config.scopes.iter().find(|s| &s.scope_id == scope_id),
        None => config.scopes.first(),
    }
    .ok_or_else(|| anyhow!("No scope {} in configuration", args.scope.as_deref().unwrap_or("")))?;

    let profiles: HashMap<_, _> = match &args.profiles {
        Some(path) => read_json::<Vec<RiskProfile>>(path)?
            .into_iter()
            .map(|p| (p.strategy_id.clone(), p))
            .collect(),
        None => HashMap::new(),
    };

    let mut allocation = config.allocation.clone();
    allocation.asset_classes.extend(scope.asset_classes.clone());
    let optimizer = RegimeAllocationOptimizer::new(allocation);

    let universe: BTreeSet<AssetId> = scope.assets.iter().cloned().collect();
    let regime = RegimeState::new(args.regime, args.confidence, Utc::now());
    let outcome = optimizer
        .optimize(&universe, &regime, &profiles, &scope.goals)
        .with_context(|| format!("Failed to optimize scope {}", scope.scope_id))?;
    let target = outcome.target.for_scope(scope.scope_id.clone());

    if args.json {
        return print_json(&target);
    }

    println!("Scope {} under {} regime", scope.scope_id.bold(), colored_label(args.regime));
    if let Some(warning) = &outcome.warning {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    let mut table = Table::new();
    table.set_header(vec!["Asset", "Class", "Goal", "Target", "Change"]);
    for (asset_id, weight) in &target.weights {
        let goal = scope.goals.get(asset_id).copied().unwrap_or(0.0);
        let change = weight - goal;
        let change_color = if change > 1e-9 {
            Color::Green
        } else if change < -1e-9 {
            Color::Red
        } else {
            Color::Reset
        };
        table.add_row(vec![
            Cell::new(asset_id),
            Cell::new(format!("{:?}", optimizer.asset_class(asset_id))),
            Cell::new(format!("{:.2}%", goal * 100.0)),
            Cell::new(format!("{:.2}%", weight * 100.0)),
            Cell::new(format!("{:+.2}%", change * 100.0)).fg(change_color),
        ]);
    }
    println!("{table}");
    Ok(())
}
