use std::path::{Path, PathBuf};

use adaptive_core::{MarketSnapshot, RegimeClassifier, ThresholdRegimeClassifier};
use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};

use super::{label_color, load_config, print_json, read_json};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// JSON array of market snapshots
    #[arg(long, short)]
    pub input: PathBuf,

    /// Print the regime state as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_classify_command(args: ClassifyArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let window: Vec<MarketSnapshot> = read_json(&args.input)?;

    let classifier = ThresholdRegimeClassifier::new(config.regime);
    let state = classifier
        .classify(&window)
        .with_context(|| format!("Failed to classify {}", args.input.display()))?;

    if args.json {
        return print_json(&state);
    }

    let mut table = Table::new();
    table.set_header(vec!["Regime", "Confidence", "Volatility %", "Trend %", "Window", "As Of"]);
    table.add_row(vec![
        Cell::new(state.label).fg(label_color(state.label)),
        Cell::new(format!("{:.3}", state.confidence)),
        Cell::new(format!("{:.2}", state.volatility)),
        Cell::new(format!("{:.2}", state.trend)),
        Cell::new(state.window_size),
        Cell::new(state.timestamp.to_rfc3339()),
    ]);
    println!("{table}");
    Ok(())
}
