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

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::market::AssetId;
use crate::market_regime::{RegimeLabel, RegimeState};
use crate::risk::RiskProfile;
use crate::strategy::StrategyId;

/// Tolerance on the weight sum of a published target
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// How an asset responds to regime risk aversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Risk assets (equities, crypto)
    Growth,

    /// Low-risk assets (bonds, gold)
    Defensive,

    /// Cash and cash proxies
    Cash,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Growth => write!(f, "GROWTH"),
            AssetClass::Defensive => write!(f, "DEFENSIVE"),
            AssetClass::Cash => write!(f, "CASH"),
        }
    }
}

/// Weight multipliers per asset class for one regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMultipliers {
    pub growth: f64,
    pub defensive: f64,
    pub cash: f64,
}

impl ClassMultipliers {
    pub const fn uniform(value: f64) -> Self {
        Self {
            growth: value,
            defensive: value,
            cash: value,
        }
    }

    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Growth => self.growth,
            AssetClass::Defensive => self.defensive,
            AssetClass::Cash => self.cash,
        }
    }
}

/// Risk-aversion multipliers for every regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeMultipliers {
    pub bullish: ClassMultipliers,
    pub bearish: ClassMultipliers,
    pub volatile: ClassMultipliers,
    pub neutral: ClassMultipliers,
}

impl RegimeMultipliers {
    pub fn for_label(&self, label: RegimeLabel) -> &ClassMultipliers {
        match label {
            RegimeLabel::Bullish => &self.bullish,
            RegimeLabel::Bearish => &self.bearish,
            RegimeLabel::Volatile => &self.volatile,
            RegimeLabel::Neutral => &self.neutral,
        }
    }
}

impl Default for RegimeMultipliers {
    fn default() -> Self {
        Self {
            // Lean into growth
            bullish: ClassMultipliers {
                growth: 1.25,
                defensive: 0.9,
                cash: 0.75,
            },
            bearish: ClassMultipliers {
                growth: 0.6,
                defensive: 1.1,
                cash: 1.4,
            },
            // Shrink toward cash
            volatile: ClassMultipliers {
                growth: 0.5,
                defensive: 1.0,
                cash: 1.5,
            },
            neutral: ClassMultipliers::uniform(1.0),
        }
    }
}

/// Allocation optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Maximum water-filling passes of the simplex projection
    pub projection_max_iterations: usize,

    /// Acceptable deviation of the projected weight sum from one
    pub projection_tolerance: f64,

    /// Class for assets without an explicit entry in `asset_classes`
    pub default_asset_class: AssetClass,

    /// Per-asset class overrides
    pub asset_classes: BTreeMap<AssetId, AssetClass>,

    /// Multipliers applied to the goal prior per regime
    pub regime_multipliers: RegimeMultipliers,

    /// Blend multipliers toward 1.0 by the regime confidence
    pub confidence_weighted: bool,

    /// Growth assets are scaled down when any strategy's CVaR falls below this
    pub cvar_floor: Option<f64>,

    /// Extra growth multiplier applied on a CVaR floor breach
    pub risk_breach_multiplier: f64,

    /// Optional per-asset weight ceiling (0.0-1.0)
    pub max_asset_weight: Option<f64>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            projection_max_iterations: 64,
            projection_tolerance: 1e-12,
            default_asset_class: AssetClass::Growth,
            asset_classes: BTreeMap::new(),
            regime_multipliers: RegimeMultipliers::default(),
            confidence_weighted: false,
            cvar_floor: None,
            risk_breach_multiplier: 0.5,
            max_asset_weight: None,
        }
    }
}

/// Target weights for one scope.
///
/// Superseded by the next optimization, never edited in place. Remains the
/// authoritative intent even if execution fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTarget {
    /// Unique target identifier
    pub id: String,

    /// Scope the target was computed for (empty outside an orchestrator)
    #[serde(default)]
    pub scope_id: String,

    /// Weight per asset, non-negative and summing to one
    pub weights: BTreeMap<AssetId, f64>,

    /// Regime the weights were conditioned on
    pub regime_at_computation: RegimeState,

    /// Goal weights the optimization started from
    pub goal_snapshot: BTreeMap<AssetId, f64>,

    /// `as_of` of every risk profile that was taken into account
    pub risk_snapshot: BTreeMap<StrategyId, DateTime<Utc>>,

    /// When the target was computed
    pub computed_at: DateTime<Utc>,
}

impl AllocationTarget {
    pub fn for_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = scope_id.into();
        self
    }

    pub fn weight(&self, asset_id: &str) -> f64 {
        self.weights.get(asset_id).copied().unwrap_or(0.0)
    }

    /// Whether the weights form a valid simplex vector
    pub fn is_valid(&self) -> bool {
        let sum: f64 = self.weights.values().sum();
        self.weights.values().all(|w| w.is_finite() && (0.0..=1.0).contains(w))
            && (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

/// Raised when projection clipped every weight and the goal prior was used instead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateAllocationWarning {
    pub regime: RegimeLabel,
    pub reason: String,
}

impl fmt::Display for DegenerateAllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "degenerate allocation under {} regime: {}", self.regime, self.reason)
    }
}

/// Optimizer result: the target plus an optional non-fatal warning
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub target: AllocationTarget,
    pub warning: Option<DegenerateAllocationWarning>,
}

/// Derives target weights from regime, risk and goals
pub trait AllocationOptimizer: Send + Sync {
    fn optimize(
        &self,
        assets: &BTreeSet<AssetId>,
        regime: &RegimeState,
        risk_profiles: &HashMap<StrategyId, RiskProfile>,
        goals: &BTreeMap<AssetId, f64>,
    ) -> EngineResult<AllocationOutcome>;
}

/// Goal-prior optimizer with regime multipliers and simplex projection
#[derive(Debug, Clone)]
pub struct RegimeAllocationOptimizer {
    config: AllocationConfig,
}

impl RegimeAllocationOptimizer {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn asset_class(&self, asset_id: &str) -> AssetClass {
        self.config
            .asset_classes
            .get(asset_id)
            .copied()
            .unwrap_or(self.config.default_asset_class)
    }

    /// Goals restricted to the universe; missing goals count as zero
    fn prior(&self, assets: &BTreeSet<AssetId>, goals: &BTreeMap<AssetId, f64>) -> EngineResult<BTreeMap<AssetId, f64>> {
        if assets.is_empty() {
            return Err(EngineError::InvalidInput("asset universe is empty".to_string()));
        }

        let mut prior = BTreeMap::new();
        for asset_id in assets {
            let goal = goals.get(asset_id).copied().unwrap_or(0.0);
            if !goal.is_finite() || goal < 0.0 {
                return Err(EngineError::InvalidInput(format!("goal weight {} for {} must be a non-negative number", goal, asset_id)));
            }
            prior.insert(asset_id.clone(), goal);
        }

        if prior.values().sum::<f64>() <= 0.0 {
            return Err(EngineError::InvalidInput("goal weights for the universe sum to zero".to_string()));
        }
        Ok(prior)
    }

    /// Regime-scaled weights before projection
    pub fn regime_scaled_weights(
        &self,
        assets: &BTreeSet<AssetId>,
        regime: &RegimeState,
        risk_profiles: &HashMap<StrategyId, RiskProfile>,
        goals: &BTreeMap<AssetId, f64>,
    ) -> EngineResult<BTreeMap<AssetId, f64>> {
        let prior = self.prior(assets, goals)?;
        Ok(self.scale(&prior, regime, risk_profiles))
    }

    fn scale(
        &self,
        prior: &BTreeMap<AssetId, f64>,
        regime: &RegimeState,
        risk_profiles: &HashMap<StrategyId, RiskProfile>,
    ) -> BTreeMap<AssetId, f64> {
        let multipliers = self.config.regime_multipliers.for_label(regime.label);

        let breached: Vec<&StrategyId> = match self.config.cvar_floor {
            Some(floor) => risk_profiles
                .values()
                .filter(|p| p.conditional_value_at_risk < floor)
                .map(|p| &p.strategy_id)
                .collect(),
            None => Vec::new(),
        };
        if !breached.is_empty() {
            warn!(
                "CVaR floor breached by {:?}, scaling growth assets by {}",
                breached, self.config.risk_breach_multiplier
            );
        }

        prior
            .iter()
            .map(|(asset_id, goal)| {
                let class = self.asset_class(asset_id);
                let mut multiplier = multipliers.get(class);
                if self.config.confidence_weighted {
                    multiplier = 1.0 + regime.confidence * (multiplier - 1.0);
                }
                if class == AssetClass::Growth && !breached.is_empty() {
                    multiplier *= self.config.risk_breach_multiplier;
                }
                (asset_id.clone(), goal * multiplier)
            })
            .collect()
    }
}

impl AllocationOptimizer for RegimeAllocationOptimizer {
    fn optimize(
        &self,
        assets: &BTreeSet<AssetId>,
        regime: &RegimeState,
        risk_profiles: &HashMap<StrategyId, RiskProfile>,
        goals: &BTreeMap<AssetId, f64>,
    ) -> EngineResult<AllocationOutcome> {
        let prior = self.prior(assets, goals)?;
        let scaled = self.scale(&prior, regime, risk_profiles);
        let raw: Vec<f64> = scaled.values().copied().collect();

        let projected = if raw.iter().all(|w| w.is_finite()) {
            // Never stop looser than the weight-sum check
            let tolerance = self.config.projection_tolerance.min(WEIGHT_SUM_TOLERANCE);
            project_to_simplex(&raw, self.config.projection_max_iterations, tolerance)
        } else {
            None
        };

        let (mut weights, warning) = match projected {
            Some(weights) => (weights, None),
            None => {
                let warning = DegenerateAllocationWarning {
                    regime: regime.label,
                    reason: "every regime-scaled weight was clipped to zero".to_string(),
                };
                warn!("{}; falling back to goal prior", warning);
                let total: f64 = prior.values().sum();
                (prior.values().map(|g| g / total).collect(), Some(warning))
            }
        };

        if let Some(cap) = self.config.max_asset_weight {
            if cap * weights.len() as f64 >= 1.0 {
                apply_weight_cap(&mut weights, cap);
            } else {
                warn!(
                    "Ignoring max_asset_weight {}: {} assets cannot sum to one under it",
                    cap,
                    weights.len()
                );
            }
        }

        let target = AllocationTarget {
            id: Uuid::new_v4().to_string(),
            scope_id: String::new(),
            weights: prior.keys().cloned().zip(weights).collect(),
            regime_at_computation: regime.clone(),
            goal_snapshot: prior,
            risk_snapshot: risk_profiles
                .iter()
                .map(|(id, profile)| (id.clone(), profile.as_of))
                .collect(),
            computed_at: Utc::now(),
        };

        debug!("Optimized {} weights under {} regime", target.weights.len(), regime.label);
        Ok(AllocationOutcome { target, warning })
    }
}

/// Project a weight vector onto the probability simplex by water-filling.
///
/// Each pass clips negative weights to zero and spreads the deficit
/// `1 - sum` over the remaining positive weights in proportion to their size.
/// A vector that is already on the simplex is returned unchanged. Returns
/// `None` when every weight is clipped to zero.
pub fn project_to_simplex(weights: &[f64], max_iterations: usize, tolerance: f64) -> Option<Vec<f64>> {
    let mut projected = weights.to_vec();

    for _ in 0..max_iterations.max(1) {
        let mut clipped = false;
        for w in projected.iter_mut() {
            if *w < 0.0 {
                *w = 0.0;
                clipped = true;
            }
        }

        let total: f64 = projected.iter().sum();
        if total <= 0.0 {
            return None;
        }

        let deficit = 1.0 - total;
        if !clipped && deficit.abs() <= tolerance {
            break;
        }

        for w in projected.iter_mut().filter(|w| **w > 0.0) {
            *w += deficit * *w / total;
        }
    }

    Some(projected)
}

/// Cap every weight at `cap`, handing the surplus to uncapped assets in
/// proportion to their weight. Requires `cap * len >= 1`.
fn apply_weight_cap(weights: &mut [f64], cap: f64) {
    for _ in 0..weights.len() {
        let surplus: f64 = weights.iter().filter(|w| **w > cap).map(|w| w - cap).sum();
        if surplus <= 0.0 {
            return;
        }
        for w in weights.iter_mut() {
            if *w > cap {
                *w = cap;
            }
        }

        let open: Vec<usize> = (0..weights.len()).filter(|i| weights[*i] < cap).collect();
        if open.is_empty() {
            return;
        }
        let open_mass: f64 = open.iter().map(|i| weights[*i]).sum();
        for i in &open {
            let share = if open_mass > 0.0 {
                weights[*i] / open_mass
            } else {
                1.0 / open.len() as f64
            };
            weights[*i] += surplus * share;
        }
    }
}

/// Create a shareable optimizer
pub fn create_allocation_optimizer(config: AllocationConfig) -> Arc<dyn AllocationOptimizer> {
    info!(
        "Creating regime allocation optimizer (max {} projection passes)",
        config.projection_max_iterations
    );
    Arc::new(RegimeAllocationOptimizer::new(config))
}
