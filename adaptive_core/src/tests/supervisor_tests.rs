// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Noderr Protocol Foundation
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::fixtures::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::execution::PaperExecutionClient;
use crate::orchestrator::{CancellationToken, CycleOutcome, CycleTrigger, ScopeSupervisor, StrategyOrchestrator};
use crate::telemetry::RecordingEventSink;

fn two_scope_config() -> EngineConfig {
    EngineConfig {
        orchestrator: test_config(),
        scopes: vec![test_scope("equities", &["SPY", "QQQ"]), test_scope("rates", &["TLT", "BIL"])],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_supervisor_runs_scopes_concurrently() {
    let feed = bullish_feed(&["SPY", "QQQ", "TLT", "BIL"], 80);
    feed.set_latency(Some(Duration::from_millis(150)));
    let execution = Arc::new(PaperExecutionClient::new());
    let events = Arc::new(RecordingEventSink::new());

    let supervisor = ScopeSupervisor::from_config(
        &two_scope_config(),
        feed,
        execution.clone(),
        events.clone(),
        CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(supervisor.scope_ids(), vec!["equities".to_string(), "rates".to_string()]);

    let started = Instant::now();
    let results = supervisor.run_once(CycleTrigger::Scheduled).await;
    // Two sequential cycles would need at least 300ms
    assert!(started.elapsed() < Duration::from_millis(290));

    for (scope_id, result) in &results {
        assert!(
            matches!(result, Ok(CycleOutcome::Published { .. })),
            "{} failed: {:?}",
            scope_id,
            result
        );
    }

    let equities = supervisor.orchestrator("equities").unwrap().current_target().unwrap();
    let rates = supervisor.orchestrator("rates").unwrap().current_target().unwrap();
    assert_eq!(equities.weights.keys().collect::<Vec<_>>(), vec!["QQQ", "SPY"]);
    assert_eq!(rates.weights.keys().collect::<Vec<_>>(), vec!["BIL", "TLT"]);
    assert!(equities.is_valid() && rates.is_valid());

    supervisor.shutdown().await;
    assert_eq!(execution.submitted().len(), 2);
    assert_eq!(events.transitions("equities").len(), 7);
}

#[tokio::test]
async fn test_supervisor_loops_stop_on_shutdown() {
    let feed = bullish_feed(&["SPY", "QQQ", "TLT", "BIL"], 80);
    let execution = Arc::new(PaperExecutionClient::new());
    let mut supervisor = ScopeSupervisor::from_config(
        &two_scope_config(),
        feed,
        execution.clone(),
        Arc::new(RecordingEventSink::new()),
        CancellationToken::new(),
    )
    .unwrap();

    supervisor.spawn_all();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let equities = supervisor.orchestrator("equities").unwrap();

    tokio::time::timeout(Duration::from_secs(2), supervisor.shutdown())
        .await
        .expect("shutdown should finish");

    assert!(equities.current_target().is_some());
    assert_eq!(execution.submitted().len(), 2);
}

#[tokio::test]
async fn test_duplicate_scopes_are_rejected() {
    let feed = bullish_feed(&["SPY", "QQQ"], 40);
    let mut supervisor = ScopeSupervisor::new(CancellationToken::new());

    let build = || {
        StrategyOrchestrator::builder(test_scope("equities", &["SPY", "QQQ"]))
            .data_feed(feed.clone())
            .leases(supervisor.leases())
            .build()
            .map(Arc::new)
    };
    let first = build().unwrap();
    let second = build().unwrap();

    supervisor.add(first).unwrap();
    assert!(matches!(supervisor.add(second), Err(EngineError::InvalidInput(_))));
}
