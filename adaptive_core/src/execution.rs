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

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::asset_allocator::AllocationTarget;
use crate::error::{EngineError, EngineResult};

/// Outcome reported by the execution venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Accepted,
    Rejected,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Accepted => write!(f, "ACCEPTED"),
            ExecutionStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Acknowledgement of a submitted allocation target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub receipt_id: String,
    pub target_id: String,
    pub status: ExecutionStatus,
    pub submitted_at: DateTime<Utc>,
}

impl ExecutionReceipt {
    pub fn new(target_id: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            receipt_id: Uuid::new_v4().to_string(),
            target_id: target_id.into(),
            status,
            submitted_at: Utc::now(),
        }
    }
}

/// Hands allocation targets to whatever rebalances the portfolio.
///
/// Failures are reported as [`EngineError::ExecutionSubmission`]; they never
/// invalidate the submitted target.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn submit(&self, target: &AllocationTarget) -> EngineResult<ExecutionReceipt>;
}

/// Execution client that records targets instead of trading
#[derive(Default)]
pub struct PaperExecutionClient {
    submitted: RwLock<Vec<AllocationTarget>>,
    rejecting: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl PaperExecutionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent submission fail
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Delay every submission by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Targets accepted so far, oldest first
    pub fn submitted(&self) -> Vec<AllocationTarget> {
        self.submitted.read().clone()
    }

    pub fn last_submitted(&self) -> Option<AllocationTarget> {
        self.submitted.read().last().cloned()
    }
}

#[async_trait]
impl ExecutionClient for PaperExecutionClient {
    async fn submit(&self, target: &AllocationTarget) -> EngineResult<ExecutionReceipt> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.rejecting.load(Ordering::SeqCst) {
            warn!("Paper execution rejected target {} for scope {}", target.id, target.scope_id);
            return Err(EngineError::ExecutionSubmission(format!(
                "paper venue rejected target {}",
                target.id
            )));
        }

        let summary: Vec<String> = target
            .weights
            .iter()
            .map(|(asset, weight)| format!("{}={:.2}%", asset, weight * 100.0))
            .collect();
        info!("Paper rebalance for scope {}: {}", target.scope_id, summary.join(", "));

        self.submitted.write().push(target.clone());
        Ok(ExecutionReceipt::new(target.id.clone(), ExecutionStatus::Accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_regime::{RegimeLabel, RegimeState};
    use std::collections::BTreeMap;

    fn target() -> AllocationTarget {
        AllocationTarget {
            id: "t-1".to_string(),
            scope_id: "paper".to_string(),
            weights: [("SPY".to_string(), 1.0)].into_iter().collect(),
            regime_at_computation: RegimeState::new(RegimeLabel::Neutral, 0.5, Utc::now()),
            goal_snapshot: BTreeMap::new(),
            risk_snapshot: BTreeMap::new(),
            computed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_paper_client_records_targets() {
        let client = PaperExecutionClient::new();
        let receipt = client.submit(&target()).await.unwrap();
        assert_eq!(receipt.status, ExecutionStatus::Accepted);
        assert_eq!(receipt.target_id, "t-1");
        assert_eq!(client.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_paper_client_rejects_on_demand() {
        let client = PaperExecutionClient::new();
        client.set_rejecting(true);
        let err = client.submit(&target()).await.unwrap_err();
        assert!(matches!(err, EngineError::ExecutionSubmission(_)));
        assert!(client.last_submitted().is_none());
    }
}
