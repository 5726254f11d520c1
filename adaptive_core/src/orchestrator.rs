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

//! Per-scope rebalancing state machine.
//!
//! A cycle walks `Idle -> Collecting -> Classifying -> AssessingRisk ->
//! Optimizing -> Publishing -> Idle`. Any stage failure moves the scope to
//! `Error`, raises one alert, backs off and returns to `Idle`.

pub mod buffer;
pub mod cancel;
pub mod lease;
pub mod supervisor;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::asset_allocator::{AllocationConfig, AllocationOptimizer, AllocationTarget, RegimeAllocationOptimizer};
use crate::config::{validate_scope, EngineConfig, ScopeConfig};
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::execution::{ExecutionClient, PaperExecutionClient};
use crate::market::{AssetId, DataFeed, MarketSnapshot};
use crate::market_regime::{RegimeClassifier, RegimeConfig, RegimeLabel, RegimeState, ThresholdRegimeClassifier};
use crate::risk::{RiskAssessor, RiskConfig, RiskEngine, RiskProfile};
use crate::strategy::StrategyId;
use crate::telemetry::{EventSink, FailureAlert, OrchestratorEvent, TracingEventSink};

pub use buffer::SnapshotHistory;
pub use cancel::CancellationToken;
pub use lease::{ScopeLease, ScopeLeases};
pub use supervisor::ScopeSupervisor;

/// Scope identifier
pub type ScopeId = String;

/// Stage of a scope's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Collecting,
    Classifying,
    AssessingRisk,
    Optimizing,
    Publishing,
    Error,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Idle => write!(f, "IDLE"),
            OrchestratorState::Collecting => write!(f, "COLLECTING"),
            OrchestratorState::Classifying => write!(f, "CLASSIFYING"),
            OrchestratorState::AssessingRisk => write!(f, "ASSESSING_RISK"),
            OrchestratorState::Optimizing => write!(f, "OPTIMIZING"),
            OrchestratorState::Publishing => write!(f, "PUBLISHING"),
            OrchestratorState::Error => write!(f, "ERROR"),
        }
    }
}

/// Why a cycle was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrigger {
    /// Poll interval elapsed: always runs to publication
    Scheduled,
    /// Regime probe: stops after classification unless the label changed
    Probe,
}

/// How a cycle that did not fail ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published {
        target_id: String,
        regime: RegimeLabel,
        degenerate: bool,
    },
    /// Probe found the published regime unchanged
    Unchanged { regime: RegimeLabel },
    /// Cancellation observed at the boundary after `stage`
    Cancelled { stage: OrchestratorState },
}

/// Orchestrator timing and buffering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Interval after which a full cycle runs regardless of regime
    pub poll_interval_ms: u64,

    /// Scheduler tick; ticks between polls run regime probes
    pub regime_probe_interval_ms: u64,

    /// Pause in `Error` before returning to `Idle`
    pub backoff_ms: u64,

    /// Bound on every data feed call
    pub feed_timeout_ms: u64,

    /// Bound on every execution submission
    pub execution_timeout_ms: u64,

    /// Re-runs allowed after a failed cycle
    pub retry_budget: u32,

    /// Snapshots per asset handed to the classifier
    pub window_size: usize,

    /// Snapshots kept per asset for risk assessment
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 300_000,        // 5 minutes
            regime_probe_interval_ms: 30_000, // 30 seconds
            backoff_ms: 5_000,
            feed_timeout_ms: 2_000,
            execution_timeout_ms: 5_000,
            retry_budget: 0,
            window_size: 60,
            history_capacity: 512,
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn regime_probe_interval(&self) -> Duration {
        Duration::from_millis(self.regime_probe_interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_timeout_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}

/// Counts consecutive failures of the same kind
#[derive(Debug, Default)]
struct FailureTracker {
    last_kind: Option<ErrorKind>,
    consecutive: u32,
}

impl FailureTracker {
    fn record(&mut self, kind: ErrorKind) -> u32 {
        if self.last_kind == Some(kind) {
            self.consecutive += 1;
        } else {
            self.last_kind = Some(kind);
            self.consecutive = 1;
        }
        self.consecutive
    }

    fn reset(&mut self) {
        self.last_kind = None;
        self.consecutive = 0;
    }
}

/// Drives one scope through collect, classify, assess, optimize and publish.
///
/// Each produced entity has a single writer: the assessing stage replaces the
/// risk profiles, the publishing stage replaces regime and target.
pub struct StrategyOrchestrator {
    scope: ScopeConfig,
    universe: BTreeSet<AssetId>,
    config: OrchestratorConfig,
    feed: Arc<dyn DataFeed>,
    classifier: Arc<dyn RegimeClassifier>,
    risk: Arc<dyn RiskAssessor>,
    optimizer: Arc<dyn AllocationOptimizer>,
    execution: Arc<dyn ExecutionClient>,
    events: Arc<dyn EventSink>,
    leases: Arc<ScopeLeases>,

    state: Mutex<OrchestratorState>,
    history: Mutex<SnapshotHistory>,
    risk_profiles: RwLock<Arc<HashMap<StrategyId, RiskProfile>>>,
    current_regime: RwLock<Option<Arc<RegimeState>>>,
    current_target: RwLock<Option<Arc<AllocationTarget>>>,
    last_published_at: Mutex<Option<Instant>>,
    failures: Mutex<FailureTracker>,
    execution_failures: Arc<AtomicU32>,
    submissions: Mutex<Vec<JoinHandle<()>>>,
}

impl StrategyOrchestrator {
    pub fn builder(scope: ScopeConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(scope)
    }

    pub fn scope_id(&self) -> &ScopeId {
        &self.scope.scope_id
    }

    pub fn scope(&self) -> &ScopeConfig {
        &self.scope
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    /// Last published regime
    pub fn current_regime(&self) -> Option<Arc<RegimeState>> {
        self.current_regime.read().clone()
    }

    /// Last published allocation target
    pub fn current_target(&self) -> Option<Arc<AllocationTarget>> {
        self.current_target.read().clone()
    }

    /// Risk profiles from the last completed assessment
    pub fn risk_profiles(&self) -> Arc<HashMap<StrategyId, RiskProfile>> {
        self.risk_profiles.read().clone()
    }

    /// Consecutive failed cycles of the current error kind
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.lock().consecutive
    }

    /// Returns of `strategy_id` over the collected history
    pub fn strategy_returns(&self, strategy_id: &str) -> Option<Vec<f64>> {
        let strategy = self.scope.strategies.iter().find(|s| s.strategy_id == strategy_id)?;
        let history = self.history.lock();
        Some(strategy.returns_from(history.series(), self.config.history_capacity))
    }

    /// Pick the trigger for the next scheduler tick
    pub fn next_trigger(&self) -> CycleTrigger {
        match *self.last_published_at.lock() {
            Some(at) if at.elapsed() < self.config.poll_interval() => CycleTrigger::Probe,
            _ => CycleTrigger::Scheduled,
        }
    }

    /// Run one cycle under the scope lease.
    ///
    /// Fails fast with [`EngineError::ScopeBusy`] when another cycle of the
    /// scope is in flight. A failed cycle has already been alerted and backed
    /// off when its error is returned.
    pub async fn run_cycle(&self, trigger: CycleTrigger, cancel: &CancellationToken) -> EngineResult<CycleOutcome> {
        let _lease = self.leases.try_acquire(self.scope_id())?;

        let mut retries_left = self.config.retry_budget;
        loop {
            match self.execute_cycle(trigger, cancel).await {
                Ok(outcome) => {
                    self.failures.lock().reset();
                    return Ok(outcome);
                }
                Err(err) => {
                    self.fail(&err, cancel).await;
                    if retries_left == 0 || cancel.is_cancelled() {
                        return Err(err);
                    }
                    retries_left -= 1;
                    info!(scope = %self.scope_id(), retries_left, "Retrying failed cycle");
                }
            }
        }
    }

    async fn execute_cycle(&self, trigger: CycleTrigger, cancel: &CancellationToken) -> EngineResult<CycleOutcome> {
        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled {
                stage: OrchestratorState::Idle,
            });
        }

        self.transition(OrchestratorState::Collecting);
        let window = self.collect().await?;
        if let Some(cancelled) = self.checkpoint(cancel) {
            return Ok(cancelled);
        }

        self.transition(OrchestratorState::Classifying);
        let regime = self.classifier.classify(&window)?;
        if trigger == CycleTrigger::Probe && !regime.is_regime_change(self.current_regime().as_deref()) {
            debug!(scope = %self.scope_id(), regime = %regime.label, "Regime unchanged, skipping re-optimization");
            self.transition(OrchestratorState::Idle);
            return Ok(CycleOutcome::Unchanged { regime: regime.label });
        }
        if let Some(cancelled) = self.checkpoint(cancel) {
            return Ok(cancelled);
        }

        self.transition(OrchestratorState::AssessingRisk);
        let profiles = self.assess()?;
        if let Some(cancelled) = self.checkpoint(cancel) {
            return Ok(cancelled);
        }

        self.transition(OrchestratorState::Optimizing);
        let outcome = self
            .optimizer
            .optimize(&self.universe, &regime, &profiles, &self.scope.goals)?;
        let degenerate = outcome.warning.is_some();
        if let Some(warning) = outcome.warning {
            self.events.emit(OrchestratorEvent::DegenerateAllocation {
                scope_id: self.scope_id().clone(),
                warning,
                timestamp: Utc::now(),
            });
        }
        if let Some(cancelled) = self.checkpoint(cancel) {
            return Ok(cancelled);
        }

        self.transition(OrchestratorState::Publishing);
        let target = Arc::new(outcome.target.for_scope(self.scope_id().clone()));
        let label = regime.label;
        self.publish(Arc::new(regime), target.clone());
        self.dispatch_execution(target.clone());
        self.transition(OrchestratorState::Idle);

        Ok(CycleOutcome::Published {
            target_id: target.id.clone(),
            regime: label,
            degenerate,
        })
    }

    /// Fetch new snapshots for every asset and return the classification window
    async fn collect(&self) -> EngineResult<Vec<MarketSnapshot>> {
        let timeout = self.config.feed_timeout();
        let timeout_ms = self.config.feed_timeout_ms;

        let requests = self.scope.assets.iter().map(|asset_id| {
            let since = self.history.lock().last_timestamp(asset_id);
            let feed = self.feed.clone();
            async move {
                match time::timeout(timeout, feed.fetch(asset_id, since)).await {
                    Ok(result) => result.map(|snapshots| (asset_id.clone(), snapshots)),
                    Err(_) => Err(EngineError::Timeout {
                        operation: format!("fetch {}", asset_id),
                        timeout_ms,
                    }),
                }
            }
        });
        let fetched = try_join_all(requests).await?;

        let mut history = self.history.lock();
        let mut appended = 0;
        for (asset_id, snapshots) in fetched {
            appended += history.extend(&asset_id, snapshots);
        }
        debug!(scope = %self.scope_id(), appended, "Collected snapshots");

        Ok(history.window(&self.scope.assets, self.config.window_size))
    }

    fn assess(&self) -> EngineResult<Arc<HashMap<StrategyId, RiskProfile>>> {
        let mut profiles = HashMap::with_capacity(self.scope.strategies.len());
        {
            let history = self.history.lock();
            for strategy in &self.scope.strategies {
                let returns = strategy.returns_from(history.series(), self.config.history_capacity);
                let profile = self.risk.assess(strategy, &returns)?;
                profiles.insert(strategy.strategy_id.clone(), profile);
            }
        }

        let profiles = Arc::new(profiles);
        *self.risk_profiles.write() = profiles.clone();
        Ok(profiles)
    }

    fn publish(&self, regime: Arc<RegimeState>, target: Arc<AllocationTarget>) {
        *self.current_regime.write() = Some(regime.clone());
        *self.current_target.write() = Some(target.clone());
        *self.last_published_at.lock() = Some(Instant::now());

        self.events.emit(OrchestratorEvent::AllocationPublished {
            scope_id: self.scope_id().clone(),
            target_id: target.id.clone(),
            regime: regime.label,
            timestamp: Utc::now(),
        });
    }

    /// Submit the target on a background task; the outcome is reported
    /// through the event sink only.
    fn dispatch_execution(&self, target: Arc<AllocationTarget>) {
        let execution = self.execution.clone();
        let events = self.events.clone();
        let failures = self.execution_failures.clone();
        let scope_id = self.scope_id().clone();
        let timeout = self.config.execution_timeout();
        let timeout_ms = self.config.execution_timeout_ms;

        let handle = tokio::spawn(async move {
            let result = match time::timeout(timeout, execution.submit(&target)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::ExecutionSubmission(format!(
                    "submission of target {} timed out after {}ms",
                    target.id, timeout_ms
                ))),
            };

            match result {
                Ok(receipt) => {
                    failures.store(0, Ordering::SeqCst);
                    events.emit(OrchestratorEvent::ExecutionAcknowledged { scope_id, receipt });
                }
                Err(err) => {
                    let consecutive = failures.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(scope = %scope_id, target = %target.id, "Execution failed, target stays published: {}", err);
                    events.emit(OrchestratorEvent::Failure(FailureAlert {
                        scope_id,
                        state: OrchestratorState::Publishing,
                        error_kind: err.kind(),
                        message: err.to_string(),
                        consecutive_failures: consecutive,
                        timestamp: Utc::now(),
                    }));
                }
            }
        });

        let mut submissions = self.submissions.lock();
        submissions.retain(|h| !h.is_finished());
        submissions.push(handle);
    }

    /// Wait for every outstanding execution submission
    pub async fn flush_submissions(&self) {
        let handles: Vec<JoinHandle<()>> = self.submissions.lock().drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(scope = %self.scope_id(), "Execution task aborted: {}", err);
            }
        }
    }

    fn transition(&self, to: OrchestratorState) {
        let from = std::mem::replace(&mut *self.state.lock(), to);
        debug!(scope = %self.scope_id(), %from, %to, "Transition");
        self.events.emit(OrchestratorEvent::StateTransition {
            scope_id: self.scope_id().clone(),
            from,
            to,
            timestamp: Utc::now(),
        });
    }

    fn checkpoint(&self, cancel: &CancellationToken) -> Option<CycleOutcome> {
        if !cancel.is_cancelled() {
            return None;
        }
        let stage = self.state();
        info!(scope = %self.scope_id(), %stage, "Cycle cancelled");
        self.transition(OrchestratorState::Idle);
        Some(CycleOutcome::Cancelled { stage })
    }

    async fn fail(&self, err: &EngineError, cancel: &CancellationToken) {
        let stage = self.state();
        self.transition(OrchestratorState::Error);

        let consecutive_failures = self.failures.lock().record(err.kind());
        self.events.emit(OrchestratorEvent::Failure(FailureAlert {
            scope_id: self.scope_id().clone(),
            state: stage,
            error_kind: err.kind(),
            message: err.to_string(),
            consecutive_failures,
            timestamp: Utc::now(),
        }));

        tokio::select! {
            _ = time::sleep(self.config.backoff()) => {}
            _ = cancel.cancelled() => {
                debug!(scope = %self.scope_id(), "Backoff interrupted by cancellation");
            }
        }
        self.transition(OrchestratorState::Idle);
    }

    /// Scheduling loop: tick every probe interval until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            scope = %self.scope_id(),
            "Starting orchestrator (poll {}ms, probe {}ms)",
            self.config.poll_interval_ms,
            self.config.regime_probe_interval_ms
        );

        let mut ticker = time::interval(self.config.regime_probe_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }

            let trigger = self.next_trigger();
            match self.run_cycle(trigger, &cancel).await {
                Ok(outcome) => debug!(scope = %self.scope_id(), ?trigger, ?outcome, "Cycle finished"),
                Err(EngineError::ScopeBusy(_)) => debug!(scope = %self.scope_id(), "Previous cycle still in flight"),
                Err(err) => debug!(scope = %self.scope_id(), "Cycle failed: {}", err),
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        self.flush_submissions().await;
        info!(scope = %self.scope_id(), "Orchestrator stopped");
    }
}

/// Wires a [`StrategyOrchestrator`] from interchangeable collaborators.
///
/// Only the data feed is mandatory; the rest default to the in-crate
/// implementations with default configuration.
pub struct OrchestratorBuilder {
    scope: ScopeConfig,
    config: OrchestratorConfig,
    regime_config: RegimeConfig,
    risk_config: RiskConfig,
    allocation_config: AllocationConfig,
    feed: Option<Arc<dyn DataFeed>>,
    classifier: Option<Arc<dyn RegimeClassifier>>,
    risk: Option<Arc<dyn RiskAssessor>>,
    optimizer: Option<Arc<dyn AllocationOptimizer>>,
    execution: Option<Arc<dyn ExecutionClient>>,
    events: Option<Arc<dyn EventSink>>,
    leases: Option<Arc<ScopeLeases>>,
}

impl OrchestratorBuilder {
    pub fn new(scope: ScopeConfig) -> Self {
        Self {
            scope,
            config: OrchestratorConfig::default(),
            regime_config: RegimeConfig::default(),
            risk_config: RiskConfig::default(),
            allocation_config: AllocationConfig::default(),
            feed: None,
            classifier: None,
            risk: None,
            optimizer: None,
            execution: None,
            events: None,
            leases: None,
        }
    }

    /// Take every component configuration from `engine`
    pub fn engine_config(mut self, engine: &EngineConfig) -> Self {
        self.config = engine.orchestrator.clone();
        self.regime_config = engine.regime.clone();
        self.risk_config = engine.risk.clone();
        self.allocation_config = engine.allocation.clone();
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn data_feed(mut self, feed: Arc<dyn DataFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn RegimeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn risk_assessor(mut self, risk: Arc<dyn RiskAssessor>) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn optimizer(mut self, optimizer: Arc<dyn AllocationOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn execution_client(mut self, execution: Arc<dyn ExecutionClient>) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn leases(mut self, leases: Arc<ScopeLeases>) -> Self {
        self.leases = Some(leases);
        self
    }

    pub fn build(self) -> EngineResult<StrategyOrchestrator> {
        validate_scope(&self.scope).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        let feed = self
            .feed
            .ok_or_else(|| EngineError::InvalidInput(format!("scope {} has no data feed", self.scope.scope_id)))?;

        let optimizer = self.optimizer.unwrap_or_else(|| {
            let mut allocation = self.allocation_config;
            for (asset_id, class) in &self.scope.asset_classes {
                allocation.asset_classes.insert(asset_id.clone(), *class);
            }
            Arc::new(RegimeAllocationOptimizer::new(allocation))
        });
        let regime_config = self.regime_config;
        let risk_config = self.risk_config;

        Ok(StrategyOrchestrator {
            universe: self.scope.assets.iter().cloned().collect(),
            history: Mutex::new(SnapshotHistory::new(self.config.history_capacity)),
            config: self.config,
            feed,
            classifier: self
                .classifier
                .unwrap_or_else(|| Arc::new(ThresholdRegimeClassifier::new(regime_config))),
            risk: self.risk.unwrap_or_else(|| Arc::new(RiskEngine::new(risk_config))),
            optimizer,
            execution: self.execution.unwrap_or_else(|| Arc::new(PaperExecutionClient::new())),
            events: self.events.unwrap_or_else(|| Arc::new(TracingEventSink)),
            leases: self.leases.unwrap_or_default(),
            scope: self.scope,
            state: Mutex::new(OrchestratorState::Idle),
            risk_profiles: RwLock::new(Arc::new(HashMap::new())),
            current_regime: RwLock::new(None),
            current_target: RwLock::new(None),
            last_published_at: Mutex::new(None),
            failures: Mutex::new(FailureTracker::default()),
            execution_failures: Arc::new(AtomicU32::new(0)),
            submissions: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_tracker_counts_same_kind() {
        let mut tracker = FailureTracker::default();
        assert_eq!(tracker.record(ErrorKind::DataUnavailable), 1);
        assert_eq!(tracker.record(ErrorKind::DataUnavailable), 2);
        assert_eq!(tracker.record(ErrorKind::Timeout), 1);
        tracker.reset();
        assert_eq!(tracker.record(ErrorKind::Timeout), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(OrchestratorState::AssessingRisk.to_string(), "ASSESSING_RISK");
        assert_eq!(
            serde_json::to_string(&OrchestratorState::AssessingRisk).unwrap(),
            "\"assessing_risk\""
        );
    }

    #[test]
    fn test_builder_requires_feed() {
        let err = StrategyOrchestrator::builder(ScopeConfig::balanced()).build().err().unwrap();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_rejects_exposure_outside_universe() {
        let mut scope = ScopeConfig::balanced();
        scope.strategies = vec![crate::strategy::StrategyParams::new("leaky")
            .with_exposure("SPY", 0.9)
            .with_exposure("QQQ", 0.1)];

        let err = StrategyOrchestrator::builder(scope)
            .data_feed(Arc::new(crate::market::InMemoryDataFeed::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::InvalidInput(message) if message.contains("QQQ")));
    }
}
