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

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::market::{AssetId, MarketSnapshot};

/// Strategy identifier
pub type StrategyId = String;

/// A candidate strategy described by its proposed asset exposures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Unique strategy identifier
    pub strategy_id: StrategyId,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Proposed exposure per asset
    pub exposures: BTreeMap<AssetId, f64>,
}

impl StrategyParams {
    pub fn new(strategy_id: impl Into<StrategyId>) -> Self {
        let strategy_id = strategy_id.into();
        Self {
            name: strategy_id.clone(),
            strategy_id,
            exposures: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_exposure(mut self, asset_id: impl Into<AssetId>, weight: f64) -> Self {
        self.exposures.insert(asset_id.into(), weight);
        self
    }

    /// Per-period return series of this strategy.
    ///
    /// Each asset history contributes its simple returns; the series are
    /// aligned on their most recent observations and combined with the
    /// strategy exposures. Returns at most `max_len` values, oldest first.
    /// Assets without history shorten the series to zero.
    pub fn returns_from(&self, history: &BTreeMap<AssetId, VecDeque<MarketSnapshot>>, max_len: usize) -> Vec<f64> {
        let per_asset: Vec<(f64, Vec<f64>)> = self
            .exposures
            .iter()
            .filter(|(_, weight)| **weight != 0.0)
            .map(|(asset_id, weight)| {
                let returns = history
                    .get(asset_id)
                    .map(|snapshots| simple_returns(snapshots.iter().map(|s| s.price())))
                    .unwrap_or_default();
                (*weight, returns)
            })
            .collect();

        if per_asset.is_empty() {
            return Vec::new();
        }

        let len = per_asset
            .iter()
            .map(|(_, returns)| returns.len())
            .min()
            .unwrap_or(0)
            .min(max_len);

        (0..len)
            .map(|i| {
                per_asset
                    .iter()
                    .map(|(weight, returns)| weight * returns[returns.len() - len + i])
                    .sum()
            })
            .collect()
    }
}

/// Simple returns over the longest tail of valid prices.
///
/// A non-positive or non-finite price cuts the series there, so every
/// returned value still ends at the newest observation.
fn simple_returns(prices: impl Iterator<Item = f64>) -> Vec<f64> {
    let prices: Vec<f64> = prices.collect();
    let start = prices
        .iter()
        .rposition(|p| !(p.is_finite() && *p > 0.0))
        .map_or(0, |i| i + 1);
    prices[start..]
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}
