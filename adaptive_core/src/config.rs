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

//! Engine configuration: defaults, optional file, `ADAPTIVE__*` environment.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::asset_allocator::{AllocationConfig, AssetClass, WEIGHT_SUM_TOLERANCE};
use crate::market::AssetId;
use crate::market_regime::RegimeConfig;
use crate::orchestrator::{OrchestratorConfig, ScopeId};
use crate::risk::RiskConfig;
use crate::strategy::StrategyParams;

/// Prefix of environment overrides, e.g. `ADAPTIVE__RISK__VAR_CONFIDENCE=0.99`
pub const ENV_PREFIX: &str = "ADAPTIVE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// One independently scheduled portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub scope_id: ScopeId,

    /// Asset universe of the scope
    pub assets: Vec<AssetId>,

    /// Goal weight per asset, used as the allocation prior
    #[serde(default)]
    pub goals: BTreeMap<AssetId, f64>,

    /// Class overrides for this scope's assets
    #[serde(default)]
    pub asset_classes: BTreeMap<AssetId, AssetClass>,

    /// Candidate strategies assessed every cycle
    #[serde(default)]
    pub strategies: Vec<StrategyParams>,
}

impl ScopeConfig {
    /// The 60/30/10 stock, bond, cash portfolio shipped as an example
    pub fn balanced() -> Self {
        let asset_classes = [
            ("SPY".to_string(), AssetClass::Growth),
            ("TLT".to_string(), AssetClass::Defensive),
            ("BIL".to_string(), AssetClass::Cash),
        ];
        Self {
            scope_id: "balanced".to_string(),
            assets: asset_classes.iter().map(|(id, _)| id.clone()).collect(),
            goals: [("SPY".to_string(), 0.6), ("TLT".to_string(), 0.3), ("BIL".to_string(), 0.1)]
                .into_iter()
                .collect(),
            asset_classes: asset_classes.into_iter().collect(),
            strategies: vec![
                StrategyParams::new("spy_tlt_60_40")
                    .with_name("60/40 stocks and bonds")
                    .with_exposure("SPY", 0.6)
                    .with_exposure("TLT", 0.4),
                StrategyParams::new("spy_momentum")
                    .with_name("Equity momentum")
                    .with_exposure("SPY", 1.0),
            ],
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub regime: RegimeConfig,
    pub risk: RiskConfig,
    pub allocation: AllocationConfig,
    pub orchestrator: OrchestratorConfig,
    pub scopes: Vec<ScopeConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regime: RegimeConfig::default(),
            risk: RiskConfig::default(),
            allocation: AllocationConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            scopes: vec![ScopeConfig::balanced()],
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `path` (format chosen by extension), then
    /// `ADAPTIVE__SECTION__KEY` environment variables, and validate.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let engine_config: EngineConfig = builder.build()?.try_deserialize()?;
        engine_config.validate()?;
        Ok(engine_config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let regime = &self.regime;
        let t = &regime.thresholds;
        ensure(regime.min_window_size >= 2, "regime.min_window_size must be at least 2")?;
        ensure(regime.periods_per_year > 0.0, "regime.periods_per_year must be positive")?;
        ensure(
            [t.volatile_above, t.bullish_above, t.bearish_at_or_below].iter().all(|v| v.is_finite()),
            "regime thresholds must be finite",
        )?;
        ensure(
            t.bearish_at_or_below <= t.bullish_above,
            "regime.thresholds.bearish_at_or_below must not exceed bullish_above",
        )?;
        ensure(
            t.volatility_scale > 0.0 && t.trend_scale > 0.0,
            "regime confidence scales must be positive",
        )?;

        ensure(self.risk.min_history >= 2, "risk.min_history must be at least 2")?;
        ensure(
            self.risk.var_confidence > 0.0 && self.risk.var_confidence < 1.0,
            "risk.var_confidence must lie strictly between 0 and 1",
        )?;

        let allocation = &self.allocation;
        ensure(
            allocation.projection_max_iterations >= 1,
            "allocation.projection_max_iterations must be at least 1",
        )?;
        ensure(
            allocation.projection_tolerance > 0.0 && allocation.projection_tolerance <= WEIGHT_SUM_TOLERANCE,
            "allocation.projection_tolerance must lie in (0, 1e-9]",
        )?;
        ensure(
            allocation.risk_breach_multiplier.is_finite() && allocation.risk_breach_multiplier >= 0.0,
            "allocation.risk_breach_multiplier must be non-negative",
        )?;
        if let Some(cap) = allocation.max_asset_weight {
            ensure(cap > 0.0 && cap <= 1.0, "allocation.max_asset_weight must lie in (0, 1]")?;
        }

        let orchestrator = &self.orchestrator;
        ensure(
            orchestrator.poll_interval_ms > 0 && orchestrator.regime_probe_interval_ms > 0,
            "orchestrator intervals must be positive",
        )?;
        ensure(
            orchestrator.feed_timeout_ms > 0 && orchestrator.execution_timeout_ms > 0,
            "orchestrator timeouts must be positive",
        )?;
        ensure(
            orchestrator.window_size >= regime.min_window_size,
            "orchestrator.window_size must be at least regime.min_window_size",
        )?;
        ensure(
            orchestrator.history_capacity >= orchestrator.window_size,
            "orchestrator.history_capacity must be at least orchestrator.window_size",
        )?;

        let mut seen = HashSet::new();
        for scope in &self.scopes {
            validate_scope(scope)?;
            ensure(
                seen.insert(scope.scope_id.as_str()),
                &format!("duplicate scope id {}", scope.scope_id),
            )?;
        }
        Ok(())
    }
}

/// Validate a single scope definition
pub fn validate_scope(scope: &ScopeConfig) -> ConfigResult<()> {
    ensure(!scope.scope_id.trim().is_empty(), "scope ids must not be empty")?;
    ensure(
        !scope.assets.is_empty(),
        &format!("scope {} has no assets", scope.scope_id),
    )?;
    ensure(
        scope.goals.values().all(|g| g.is_finite() && *g >= 0.0),
        &format!("scope {} has a negative goal weight", scope.scope_id),
    )?;
    ensure(
        scope
            .assets
            .iter()
            .any(|asset| scope.goals.get(asset).copied().unwrap_or(0.0) > 0.0),
        &format!("goal weights of scope {} sum to zero", scope.scope_id),
    )?;
    for strategy in &scope.strategies {
        ensure(
            !strategy.strategy_id.trim().is_empty(),
            &format!("scope {} has a strategy without an id", scope.scope_id),
        )?;
        for asset in strategy.exposures.keys() {
            ensure(
                scope.assets.contains(asset),
                &format!(
                    "strategy {} of scope {} is exposed to {} outside the universe",
                    strategy.strategy_id, scope.scope_id, asset
                ),
            )?;
        }
    }
    Ok(())
}

fn ensure(condition: bool, message: &str) -> ConfigResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message.to_string()))
    }
}
