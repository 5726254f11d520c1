use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adaptive_core::{
    BroadcastEventSink, CancellationToken, FanoutEventSink, OrchestratorEvent, PaperExecutionClient,
    ScopeSupervisor, SyntheticDataFeed, SyntheticFeedConfig, TracingEventSink,
};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Table};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::{colored_label, label_color, load_config};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Stop after this many seconds; Ctrl-C stops earlier
    #[arg(long, short, default_value = "30")]
    pub duration_secs: u64,

    /// Seed of the synthetic market
    #[arg(long, default_value = "7")]
    pub seed: u64,

    /// Full rebalance interval for the simulation
    #[arg(long, default_value = "5000")]
    pub poll_ms: u64,

    /// Regime probe interval for the simulation
    #[arg(long, default_value = "1000")]
    pub probe_ms: u64,

    /// Also print every state transition
    #[arg(long)]
    pub verbose: bool,
}

pub async fn run_simulate_command(args: SimulateArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.orchestrator.poll_interval_ms = args.poll_ms;
    config.orchestrator.regime_probe_interval_ms = args.probe_ms;

    let feed = Arc::new(SyntheticDataFeed::new(SyntheticFeedConfig {
        seed: args.seed,
        ..Default::default()
    }));
    let execution = Arc::new(PaperExecutionClient::new());
    let broadcast = Arc::new(BroadcastEventSink::new(1024));
    let mut receiver = broadcast.subscribe();
    let events = Arc::new(
        FanoutEventSink::new()
            .with_sink(Arc::new(TracingEventSink))
            .with_sink(broadcast.clone()),
    );

    let mut supervisor = ScopeSupervisor::from_config(
        &config,
        feed,
        execution.clone(),
        events,
        CancellationToken::new(),
    )
    .context("Failed to build scopes")?;

    info!(scopes = ?supervisor.scope_ids(), "Starting simulation for {}s", args.duration_secs);
    supervisor.spawn_all();

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                println!("{}", "Interrupted, shutting down".yellow());
                break;
            }
            received = receiver.recv() => match received {
                Ok(event) => print_event(&event, args.verbose),
                Err(RecvError::Lagged(skipped)) => warn!("Event display lagged by {} events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    let scope_ids = supervisor.scope_ids();
    let orchestrators: Vec<_> = scope_ids
        .iter()
        .filter_map(|id| supervisor.orchestrator(id))
        .collect();
    supervisor.shutdown().await;

    let mut table = Table::new();
    table.set_header(vec!["Scope", "Regime", "Confidence", "Failures", "Target Weights"]);
    for orchestrator in orchestrators {
        let (regime_cell, confidence) = match orchestrator.current_regime() {
            Some(regime) => (
                Cell::new(regime.label).fg(label_color(regime.label)),
                format!("{:.3}", regime.confidence),
            ),
            None => (Cell::new("-"), "-".to_string()),
        };
        let weights = orchestrator
            .current_target()
            .map(|target| {
                target
                    .weights
                    .iter()
                    .map(|(asset, w)| format!("{} {:.1}%", asset, w * 100.0))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(orchestrator.scope_id()),
            regime_cell,
            Cell::new(confidence),
            Cell::new(orchestrator.consecutive_failures()),
            Cell::new(weights),
        ]);
    }

    println!();
    println!("{table}");
    println!("Targets submitted: {}", execution.submitted().len());
    Ok(())
}

fn print_event(event: &OrchestratorEvent, verbose: bool) {
    match event {
        OrchestratorEvent::StateTransition { scope_id, from, to, .. } if verbose => {
            println!("{} {} -> {}", format!("[{}]", scope_id).dimmed(), from, to);
        }
        OrchestratorEvent::StateTransition { .. } => {}
        OrchestratorEvent::AllocationPublished { scope_id, target_id, regime, .. } => {
            println!(
                "{} published {} under {}",
                format!("[{}]", scope_id).cyan(),
                target_id,
                colored_label(*regime)
            );
        }
        OrchestratorEvent::DegenerateAllocation { scope_id, warning, .. } => {
            println!("{} {} {}", format!("[{}]", scope_id).cyan(), "degenerate:".yellow(), warning);
        }
        OrchestratorEvent::Failure(alert) => {
            println!(
                "{} {} in {} ({}x): {}",
                format!("[{}]", alert.scope_id).cyan(),
                alert.error_kind.to_string().red().bold(),
                alert.state,
                alert.consecutive_failures,
                alert.message
            );
        }
        OrchestratorEvent::ExecutionAcknowledged { scope_id, receipt } => {
            println!(
                "{} execution {:?} for {}",
                format!("[{}]", scope_id).cyan(),
                receipt.status,
                receipt.target_id
            );
        }
    }
}
