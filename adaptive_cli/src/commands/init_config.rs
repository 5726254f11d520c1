use std::fs;
use std::path::PathBuf;

use adaptive_core::EngineConfig;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Destination file; prints to stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run_init_config_command(args: InitConfigArgs) -> Result<()> {
    let yaml = serde_yaml::to_string(&EngineConfig::default()).context("Failed to render default configuration")?;

    match args.output {
        Some(path) => {
            if path.exists() && !args.force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            fs::write(&path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Wrote default configuration to".green(), path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
