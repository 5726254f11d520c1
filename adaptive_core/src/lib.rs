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

pub mod error;
pub mod stats;
pub mod market;
pub mod strategy;
pub mod market_regime;
pub mod risk;
pub mod asset_allocator;
pub mod analytics;
pub mod execution;
pub mod telemetry;
pub mod orchestrator;
pub mod config;
pub mod logging;

#[cfg(test)]
mod tests;

// Re-export common types
pub use error::{EngineError, EngineResult, ErrorKind};
pub use market::{
    AssetId, DataFeed, DerivedStats, InMemoryDataFeed, MarketSnapshot,
    SyntheticDataFeed, SyntheticFeedConfig
};
pub use strategy::{StrategyId, StrategyParams};
pub use market_regime::{
    RegimeClassifier, RegimeConfig, RegimeLabel, RegimeState, RegimeThresholds,
    ThresholdRegimeClassifier, WindowMetrics, compute_window_metrics, create_threshold_classifier
};
pub use risk::{RiskAssessor, RiskConfig, RiskEngine, RiskProfile, create_risk_engine};
pub use asset_allocator::{
    AllocationConfig, AllocationOptimizer, AllocationOutcome, AllocationTarget, AssetClass,
    ClassMultipliers, DegenerateAllocationWarning, RegimeAllocationOptimizer, RegimeMultipliers,
    create_allocation_optimizer, project_to_simplex
};
pub use analytics::{PerformanceAnalyzer, PerformanceConfig, PerformanceReport};
pub use execution::{ExecutionClient, ExecutionReceipt, ExecutionStatus, PaperExecutionClient};
pub use telemetry::{
    BroadcastEventSink, EventSink, FailureAlert, FanoutEventSink, OrchestratorEvent,
    RecordingEventSink, TracingEventSink
};
pub use orchestrator::{
    CancellationToken, CycleOutcome, CycleTrigger, OrchestratorBuilder, OrchestratorConfig,
    OrchestratorState, ScopeId, ScopeLeases, ScopeSupervisor, StrategyOrchestrator
};
pub use config::{ConfigError, EngineConfig, ScopeConfig};
pub use logging::init_tracing;
