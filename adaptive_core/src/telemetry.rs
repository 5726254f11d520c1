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

//! Structured orchestrator events and the sinks that receive them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::asset_allocator::DegenerateAllocationWarning;
use crate::error::ErrorKind;
use crate::execution::ExecutionReceipt;
use crate::market_regime::RegimeLabel;
use crate::orchestrator::{OrchestratorState, ScopeId};

/// Alert raised once per failed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAlert {
    pub scope_id: ScopeId,
    /// Stage that was running when the failure happened
    pub state: OrchestratorState,
    pub error_kind: ErrorKind,
    pub message: String,
    /// Number of consecutive failures of this kind, starting at 1
    pub consecutive_failures: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    StateTransition {
        scope_id: ScopeId,
        from: OrchestratorState,
        to: OrchestratorState,
        timestamp: DateTime<Utc>,
    },
    Failure(FailureAlert),
    DegenerateAllocation {
        scope_id: ScopeId,
        warning: DegenerateAllocationWarning,
        timestamp: DateTime<Utc>,
    },
    AllocationPublished {
        scope_id: ScopeId,
        target_id: String,
        regime: RegimeLabel,
        timestamp: DateTime<Utc>,
    },
    ExecutionAcknowledged {
        scope_id: ScopeId,
        receipt: ExecutionReceipt,
    },
}

impl OrchestratorEvent {
    pub fn scope_id(&self) -> &ScopeId {
        match self {
            OrchestratorEvent::StateTransition { scope_id, .. }
            | OrchestratorEvent::DegenerateAllocation { scope_id, .. }
            | OrchestratorEvent::AllocationPublished { scope_id, .. }
            | OrchestratorEvent::ExecutionAcknowledged { scope_id, .. } => scope_id,
            OrchestratorEvent::Failure(alert) => &alert.scope_id,
        }
    }
}

/// Receives orchestrator events. Emission must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OrchestratorEvent);
}

/// Writes every event to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: OrchestratorEvent) {
        match &event {
            OrchestratorEvent::StateTransition { scope_id, from, to, .. } => {
                tracing::debug!(scope = %scope_id, %from, %to, "State transition");
            }
            OrchestratorEvent::Failure(alert) => {
                error!(
                    scope = %alert.scope_id,
                    state = %alert.state,
                    kind = %alert.error_kind,
                    consecutive = alert.consecutive_failures,
                    "Cycle failed: {}",
                    alert.message
                );
            }
            OrchestratorEvent::DegenerateAllocation { scope_id, warning, .. } => {
                warn!(scope = %scope_id, "{}", warning);
            }
            OrchestratorEvent::AllocationPublished { scope_id, target_id, regime, .. } => {
                info!(scope = %scope_id, target = %target_id, %regime, "Allocation published");
            }
            OrchestratorEvent::ExecutionAcknowledged { scope_id, receipt } => {
                info!(
                    scope = %scope_id,
                    target = %receipt.target_id,
                    status = %receipt.status,
                    "Execution acknowledged"
                );
            }
        }
    }
}

/// Publishes events on a broadcast channel
pub struct BroadcastEventSink {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<OrchestratorEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().clone()
    }

    /// Target states of every transition of `scope_id`, prefixed by the
    /// first source state
    pub fn transitions(&self, scope_id: &str) -> Vec<OrchestratorState> {
        let events = self.events.lock();
        let mut states = Vec::new();
        for event in events.iter() {
            if let OrchestratorEvent::StateTransition { scope_id: s, from, to, .. } = event {
                if s == scope_id {
                    if states.is_empty() {
                        states.push(*from);
                    }
                    states.push(*to);
                }
            }
        }
        states
    }

    pub fn alerts(&self) -> Vec<FailureAlert> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                OrchestratorEvent::Failure(alert) => Some(alert.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: OrchestratorEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards every event to several sinks
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: OrchestratorEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
