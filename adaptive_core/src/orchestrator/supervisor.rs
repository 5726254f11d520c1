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

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{CancellationToken, CycleOutcome, CycleTrigger, ScopeId, ScopeLeases, StrategyOrchestrator};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::execution::ExecutionClient;
use crate::market::DataFeed;
use crate::telemetry::EventSink;

/// Runs independent scopes side by side.
///
/// Scopes share the data feed, the execution client and the lease table;
/// every orchestrator owns its own risk profiles and targets.
pub struct ScopeSupervisor {
    orchestrators: BTreeMap<ScopeId, Arc<StrategyOrchestrator>>,
    leases: Arc<ScopeLeases>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ScopeSupervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            orchestrators: BTreeMap::new(),
            leases: Arc::new(ScopeLeases::new()),
            cancel,
            handles: Vec::new(),
        }
    }

    /// Build one orchestrator per configured scope
    pub fn from_config(
        config: &EngineConfig,
        feed: Arc<dyn DataFeed>,
        execution: Arc<dyn ExecutionClient>,
        events: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> EngineResult<Self> {
        let mut supervisor = Self::new(cancel);
        for scope in &config.scopes {
            let orchestrator = StrategyOrchestrator::builder(scope.clone())
                .engine_config(config)
                .data_feed(feed.clone())
                .execution_client(execution.clone())
                .event_sink(events.clone())
                .leases(supervisor.leases.clone())
                .build()?;
            supervisor.add(Arc::new(orchestrator))?;
        }
        Ok(supervisor)
    }

    /// Lease table to hand to orchestrators built outside the supervisor
    pub fn leases(&self) -> Arc<ScopeLeases> {
        self.leases.clone()
    }

    pub fn add(&mut self, orchestrator: Arc<StrategyOrchestrator>) -> EngineResult<()> {
        let scope_id = orchestrator.scope_id().clone();
        if self.orchestrators.contains_key(&scope_id) {
            return Err(EngineError::InvalidInput(format!("duplicate scope id {}", scope_id)));
        }
        self.orchestrators.insert(scope_id, orchestrator);
        Ok(())
    }

    pub fn orchestrator(&self, scope_id: &str) -> Option<Arc<StrategyOrchestrator>> {
        self.orchestrators.get(scope_id).cloned()
    }

    pub fn scope_ids(&self) -> Vec<ScopeId> {
        self.orchestrators.keys().cloned().collect()
    }

    /// Run one cycle of every scope concurrently
    pub async fn run_once(&self, trigger: CycleTrigger) -> Vec<(ScopeId, EngineResult<CycleOutcome>)> {
        let cycles = self.orchestrators.iter().map(|(scope_id, orchestrator)| {
            let cancel = self.cancel.clone();
            async move { (scope_id.clone(), orchestrator.run_cycle(trigger, &cancel).await) }
        });
        join_all(cycles).await
    }

    /// Start the scheduling loop of every scope on its own task
    pub fn spawn_all(&mut self) {
        for orchestrator in self.orchestrators.values() {
            info!(scope = %orchestrator.scope_id(), "Spawning scope");
            self.handles
                .push(tokio::spawn(orchestrator.clone().run(self.cancel.clone())));
        }
    }

    /// Cancel every scope and wait for their loops to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                warn!("Scope task ended abnormally: {}", err);
            }
        }
        for orchestrator in self.orchestrators.values() {
            orchestrator.flush_submissions().await;
        }
        info!("All scopes stopped");
    }
}
