pub mod analyze;
pub mod assess;
pub mod classify;
pub mod init_config;
pub mod optimize;
pub mod simulate;

use std::fs;
use std::path::Path;

use adaptive_core::{EngineConfig, RegimeLabel};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use comfy_table::Color;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load the engine configuration, falling back to defaults without a file
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from the environment".to_string(),
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

pub fn label_color(label: RegimeLabel) -> Color {
    match label {
        RegimeLabel::Bullish => Color::Green,
        RegimeLabel::Bearish => Color::Red,
        RegimeLabel::Volatile => Color::Yellow,
        RegimeLabel::Neutral => Color::Grey,
    }
}

pub fn colored_label(label: RegimeLabel) -> ColoredString {
    let text = label.to_string();
    match label {
        RegimeLabel::Bullish => text.green().bold(),
        RegimeLabel::Bearish => text.red().bold(),
        RegimeLabel::Volatile => text.yellow().bold(),
        RegimeLabel::Neutral => text.normal(),
    }
}
