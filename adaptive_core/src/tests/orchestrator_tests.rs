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
use std::time::Duration;

use super::fixtures::*;
use crate::asset_allocator::{AllocationConfig, ClassMultipliers, RegimeAllocationOptimizer};
use crate::error::{EngineError, ErrorKind};
use crate::market_regime::RegimeLabel;
use crate::orchestrator::{CancellationToken, CycleOutcome, CycleTrigger, OrchestratorState, ScopeLeases, StrategyOrchestrator};
use crate::telemetry::{OrchestratorEvent, RecordingEventSink};

use OrchestratorState::*;

const ASSETS: [&str; 3] = ["SPY", "TLT", "BIL"];

#[tokio::test]
async fn test_data_unavailable_goes_through_error_with_one_alert() {
    let feed = bullish_feed(&ASSETS, 80);
    feed.set_available(false);
    let h = harness(feed, test_scope("core", &ASSETS), test_config());

    let err = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::DataUnavailable { .. }));
    assert_eq!(h.events.transitions("core"), vec![Idle, Collecting, Error, Idle]);

    let alerts = h.events.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, Collecting);
    assert_eq!(alerts[0].error_kind, ErrorKind::DataUnavailable);
    assert_eq!(alerts[0].consecutive_failures, 1);
    assert_eq!(h.orchestrator.state(), Idle);
    assert!(h.orchestrator.current_target().is_none());
}

#[tokio::test]
async fn test_scheduled_cycle_publishes_and_submits() {
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), test_config());

    let outcome = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap();
    h.orchestrator.flush_submissions().await;

    let target = h.orchestrator.current_target().expect("published target");
    match outcome {
        CycleOutcome::Published {
            target_id,
            regime,
            degenerate,
        } => {
            assert_eq!(target_id, target.id);
            assert_eq!(regime, RegimeLabel::Bullish);
            assert!(!degenerate);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert_eq!(
        h.events.transitions("core"),
        vec![Idle, Collecting, Classifying, AssessingRisk, Optimizing, Publishing, Idle]
    );
    assert!(target.is_valid());
    assert_eq!(target.scope_id, "core");
    // Bullish tilts toward the growth asset
    assert!(target.weight("SPY") > target.weight("BIL"));
    assert!(target.risk_snapshot.contains_key("core_core"));
    assert_eq!(h.orchestrator.risk_profiles().len(), 1);

    assert_eq!(h.execution.submitted().len(), 1);
    assert!(h
        .events
        .events()
        .iter()
        .any(|e| matches!(e, OrchestratorEvent::ExecutionAcknowledged { .. })));
    assert!(h.events.alerts().is_empty());
}

#[tokio::test]
async fn test_probe_runs_only_on_regime_change() {
    let feed = bullish_feed(&ASSETS, 80);
    let h = harness(feed.clone(), test_scope("core", &ASSETS), test_config());
    let cancel = CancellationToken::new();

    // Nothing published yet, so the first probe runs to publication
    let first = h.orchestrator.run_cycle(CycleTrigger::Probe, &cancel).await.unwrap();
    assert!(matches!(first, CycleOutcome::Published { regime: RegimeLabel::Bullish, .. }));
    let published = h.orchestrator.current_target().unwrap();

    // Same regime: stop after classification
    for asset in ASSETS {
        extend_trend(&feed, asset, 5, BULL_STEP).await;
    }
    h.events.clear();
    let second = h.orchestrator.run_cycle(CycleTrigger::Probe, &cancel).await.unwrap();
    assert_eq!(second, CycleOutcome::Unchanged { regime: RegimeLabel::Bullish });
    assert_eq!(h.events.transitions("core"), vec![Idle, Collecting, Classifying, Idle]);
    assert_eq!(h.orchestrator.current_target().unwrap().id, published.id);

    // Regime flips to bearish: re-optimize
    for asset in ASSETS {
        extend_trend(&feed, asset, 40, BEAR_STEP).await;
    }
    let third = h.orchestrator.run_cycle(CycleTrigger::Probe, &cancel).await.unwrap();
    assert!(matches!(third, CycleOutcome::Published { regime: RegimeLabel::Bearish, .. }));

    let target = h.orchestrator.current_target().unwrap();
    assert_ne!(target.id, published.id);
    assert_eq!(target.regime_at_computation.label, RegimeLabel::Bearish);
    assert!(target.weight("BIL") > target.weight("SPY"));
}

#[tokio::test]
async fn test_next_trigger_follows_poll_interval() {
    let mut config = test_config();
    config.poll_interval_ms = 30;
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), config);

    assert_eq!(h.orchestrator.next_trigger(), CycleTrigger::Scheduled);
    h.orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(h.orchestrator.next_trigger(), CycleTrigger::Probe);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.orchestrator.next_trigger(), CycleTrigger::Scheduled);
}

#[tokio::test]
async fn test_execution_failure_keeps_published_target() {
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), test_config());
    h.execution.set_rejecting(true);

    let outcome = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap();
    h.orchestrator.flush_submissions().await;

    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    assert!(h.orchestrator.current_target().is_some());
    assert_eq!(h.orchestrator.state(), Idle);
    assert!(!h.events.transitions("core").contains(&Error));

    let alerts = h.events.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, Publishing);
    assert_eq!(alerts[0].error_kind, ErrorKind::ExecutionSubmission);
}

#[tokio::test]
async fn test_execution_timeout_is_reported_as_submission_failure() {
    let mut config = test_config();
    config.execution_timeout_ms = 20;
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), config);
    h.execution.set_latency(Some(Duration::from_millis(300)));

    h.orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap();
    h.orchestrator.flush_submissions().await;

    let alerts = h.events.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].error_kind, ErrorKind::ExecutionSubmission);
    assert!(alerts[0].message.contains("timed out"));
    assert!(h.execution.submitted().is_empty());
}

#[tokio::test]
async fn test_feed_timeout_fails_cycle() {
    let feed = bullish_feed(&ASSETS, 80);
    feed.set_latency(Some(Duration::from_millis(300)));
    let mut config = test_config();
    config.feed_timeout_ms = 20;
    let h = harness(feed, test_scope("core", &ASSETS), config);

    let err = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Timeout { timeout_ms: 20, .. }));
    assert_eq!(h.events.transitions("core"), vec![Idle, Collecting, Error, Idle]);
    assert_eq!(h.events.alerts()[0].error_kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_insufficient_history_fails_in_assessing_stage() {
    let h = harness(bullish_feed(&ASSETS, 25), test_scope("core", &ASSETS), test_config());

    let err = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientHistory { required: 30, actual: 24, .. }));
    let alerts = h.events.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, AssessingRisk);
    assert!(h.orchestrator.current_regime().is_none());
}

#[tokio::test]
async fn test_insufficient_window_fails_in_classifying_stage() {
    let h = harness(bullish_feed(&ASSETS, 10), test_scope("core", &ASSETS), test_config());

    let err = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::InsufficientData { required: 20, actual: 10 });
    assert_eq!(h.events.alerts()[0].state, Classifying);
}

#[tokio::test]
async fn test_busy_scope_fails_fast_without_transitions() {
    let leases = Arc::new(ScopeLeases::new());
    let events = Arc::new(RecordingEventSink::new());
    let orchestrator = StrategyOrchestrator::builder(test_scope("core", &ASSETS))
        .config(test_config())
        .data_feed(bullish_feed(&ASSETS, 80))
        .event_sink(events.clone())
        .leases(leases.clone())
        .build()
        .unwrap();

    let _held = leases.try_acquire("core").unwrap();
    let err = orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::ScopeBusy("core".to_string()));
    assert!(events.events().is_empty());
    assert_eq!(orchestrator.state(), Idle);
}

#[tokio::test]
async fn test_overlapping_cycles_are_rejected() {
    let feed = bullish_feed(&ASSETS, 80);
    feed.set_latency(Some(Duration::from_millis(50)));
    let h = harness(feed, test_scope("core", &ASSETS), test_config());
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        h.orchestrator.run_cycle(CycleTrigger::Scheduled, &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.orchestrator.run_cycle(CycleTrigger::Scheduled, &cancel).await
        }
    );

    assert!(matches!(first, Ok(CycleOutcome::Published { .. })));
    assert_eq!(second.unwrap_err(), EngineError::ScopeBusy("core".to_string()));
}

#[tokio::test]
async fn test_cancellation_is_observed_at_stage_boundary() {
    let token = CancellationToken::new();
    let feed = Arc::new(CancellingFeed {
        inner: bullish_feed(&ASSETS, 80),
        token: token.clone(),
    });
    let h = harness(feed, test_scope("core", &ASSETS), test_config());

    let outcome = h.orchestrator.run_cycle(CycleTrigger::Scheduled, &token).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Cancelled { stage: Collecting });
    assert_eq!(h.events.transitions("core"), vec![Idle, Collecting, Idle]);
    assert!(h.orchestrator.current_target().is_none());
}

#[tokio::test]
async fn test_cancelled_token_skips_cycle() {
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), test_config());
    let token = CancellationToken::new();
    token.cancel();

    let outcome = h.orchestrator.run_cycle(CycleTrigger::Scheduled, &token).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Cancelled { stage: Idle });
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_stuck_scope_repeats_alert_until_recovery() {
    let feed = bullish_feed(&ASSETS, 80);
    feed.set_available(false);
    let h = harness(feed.clone(), test_scope("core", &ASSETS), test_config());
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        assert!(h.orchestrator.run_cycle(CycleTrigger::Scheduled, &cancel).await.is_err());
    }
    let alerts = h.events.alerts();
    assert_eq!(alerts.len(), 3);
    assert!(alerts.iter().all(|a| a.error_kind == ErrorKind::DataUnavailable));
    assert_eq!(
        alerts.iter().map(|a| a.consecutive_failures).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(h.orchestrator.consecutive_failures(), 3);

    feed.set_available(true);
    h.orchestrator.run_cycle(CycleTrigger::Scheduled, &cancel).await.unwrap();
    assert_eq!(h.orchestrator.consecutive_failures(), 0);

    feed.set_available(false);
    h.events.clear();
    assert!(h.orchestrator.run_cycle(CycleTrigger::Scheduled, &cancel).await.is_err());
    assert_eq!(h.events.alerts()[0].consecutive_failures, 1);
}

#[tokio::test]
async fn test_retry_budget_reruns_failed_cycle() {
    let feed = bullish_feed(&ASSETS, 80);
    feed.set_available(false);
    let mut config = test_config();
    config.retry_budget = 2;
    let h = harness(feed.clone(), test_scope("core", &ASSETS), config);

    let err = h
        .orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::DataUnavailable { .. }));
    assert_eq!(h.events.alerts().len(), 3);
    let errors = h.events.transitions("core").iter().filter(|s| **s == Error).count();
    assert_eq!(errors, 3);
    assert!(feed.fetch_count() >= 3);
}

#[tokio::test]
async fn test_degenerate_allocation_is_published_with_warning() {
    let mut allocation = AllocationConfig::default();
    allocation.regime_multipliers.bullish = ClassMultipliers::uniform(-1.0);

    let events = Arc::new(RecordingEventSink::new());
    let orchestrator = StrategyOrchestrator::builder(test_scope("core", &ASSETS))
        .config(test_config())
        .data_feed(bullish_feed(&ASSETS, 80))
        .optimizer(Arc::new(RegimeAllocationOptimizer::new(allocation)))
        .event_sink(events.clone())
        .build()
        .unwrap();

    let outcome = orchestrator
        .run_cycle(CycleTrigger::Scheduled, &CancellationToken::new())
        .await
        .unwrap();
    orchestrator.flush_submissions().await;

    assert!(matches!(outcome, CycleOutcome::Published { degenerate: true, .. }));
    assert!(events
        .events()
        .iter()
        .any(|e| matches!(e, OrchestratorEvent::DegenerateAllocation { .. })));
    let target = orchestrator.current_target().unwrap();
    assert!(target.is_valid());
    assert!((target.weight("SPY") - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_run_loop_publishes_until_cancelled() {
    let h = harness(bullish_feed(&ASSETS, 80), test_scope("core", &ASSETS), test_config());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(h.orchestrator.clone().run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(80)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should stop")
        .unwrap();

    assert!(h.orchestrator.current_target().is_some());
    assert_eq!(h.execution.submitted().len(), 1);
    // Later ticks are probes against an unchanged regime
    assert!(h.events.transitions("core").len() > 7);
    assert_eq!(h.orchestrator.state(), Idle);
}
