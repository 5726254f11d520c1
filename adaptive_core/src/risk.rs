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

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::stats;
use crate::strategy::{StrategyId, StrategyParams};

/// Risk engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Minimum number of returns required for an assessment
    pub min_history: usize,

    /// Confidence level for Value-at-Risk (0.0-1.0, exclusive)
    pub var_confidence: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_history: 30,
            var_confidence: 0.95, // 5% tail
        }
    }
}

/// Risk metrics of one strategy at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Strategy these metrics describe
    pub strategy_id: StrategyId,

    /// Sample standard deviation of per-period returns
    pub volatility: f64,

    /// Historical VaR, expressed as a return (negative values are losses)
    pub value_at_risk: f64,

    /// Mean of the returns at or below the VaR threshold
    pub conditional_value_at_risk: f64,

    /// Confidence level used for VaR/CVaR
    pub confidence_level: f64,

    /// Number of returns the metrics were computed from
    pub observations: usize,

    /// When the profile was computed; never decreases for a strategy
    pub as_of: DateTime<Utc>,
}

/// Computes risk profiles from return histories
pub trait RiskAssessor: Send + Sync {
    fn assess(&self, strategy: &StrategyParams, returns_history: &[f64]) -> EngineResult<RiskProfile>;
}

/// Historical-simulation risk engine.
///
/// Keeps the last issued `as_of` per strategy so that profiles for a
/// strategy are monotonic in time even when the wall clock steps back.
pub struct RiskEngine {
    config: RiskConfig,
    last_as_of: Mutex<HashMap<StrategyId, DateTime<Utc>>>,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            last_as_of: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Assess `returns_history` with an explicit timestamp.
    pub fn assess_at(
        &self,
        strategy: &StrategyParams,
        returns_history: &[f64],
        as_of: DateTime<Utc>,
    ) -> EngineResult<RiskProfile> {
        let n = returns_history.len();
        if n < self.config.min_history {
            return Err(EngineError::InsufficientHistory {
                strategy_id: strategy.strategy_id.clone(),
                required: self.config.min_history,
                actual: n,
            });
        }
        if n == 0 {
            return Err(EngineError::InsufficientHistory {
                strategy_id: strategy.strategy_id.clone(),
                required: 1,
                actual: 0,
            });
        }
        if let Some(bad) = returns_history.iter().find(|r| !r.is_finite()) {
            return Err(EngineError::InvalidInput(format!(
                "non-finite return {} in history of {}",
                bad, strategy.strategy_id
            )));
        }

        let (volatility, value_at_risk, conditional_value_at_risk) = if stats::is_constant(returns_history) {
            let c = returns_history[0];
            (0.0, c, c)
        } else {
            let mut sorted = returns_history.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));

            let var = stats::quantile_sorted(&sorted, 1.0 - self.config.var_confidence).unwrap_or(sorted[0]);
            let tail: Vec<f64> = sorted.iter().copied().take_while(|r| *r <= var).collect();
            // The minimum is always <= the interpolated quantile, so the tail is never empty
            let cvar = if tail.is_empty() { var } else { stats::mean(&tail) };

            (stats::sample_std_dev(returns_history), var, cvar)
        };

        let as_of = self.advance_as_of(&strategy.strategy_id, as_of);

        debug!(
            "Assessed {}: vol={:.6}, VaR={:.6}, CVaR={:.6} over {} returns",
            strategy.strategy_id, volatility, value_at_risk, conditional_value_at_risk, n
        );

        Ok(RiskProfile {
            strategy_id: strategy.strategy_id.clone(),
            volatility,
            value_at_risk,
            conditional_value_at_risk,
            confidence_level: self.config.var_confidence,
            observations: n,
            as_of,
        })
    }

    fn advance_as_of(&self, strategy_id: &StrategyId, requested: DateTime<Utc>) -> DateTime<Utc> {
        let mut last_as_of = self.last_as_of.lock();
        let issued = match last_as_of.get(strategy_id) {
            Some(previous) if *previous > requested => {
                warn!(
                    "Clock moved back for {} ({} < {}), keeping previous as_of",
                    strategy_id, requested, previous
                );
                *previous
            }
            _ => requested,
        };
        last_as_of.insert(strategy_id.clone(), issued);
        issued
    }
}

impl RiskAssessor for RiskEngine {
    fn assess(&self, strategy: &StrategyParams, returns_history: &[f64]) -> EngineResult<RiskProfile> {
        self.assess_at(strategy, returns_history, Utc::now())
    }
}

/// Create a shareable risk engine
pub fn create_risk_engine(config: RiskConfig) -> Arc<dyn RiskAssessor> {
    Arc::new(RiskEngine::new(config))
}
