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

//! Window statistics feeding the regime rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::market::MarketSnapshot;
use crate::stats;

/// Volatility and trend of a window, averaged across its assets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Annualized volatility of log returns, in percent
    pub volatility: f64,
    /// Annualized slope of log price, in percent
    pub trend: f64,
    /// Number of distinct assets in the window
    pub assets: usize,
    /// Total number of snapshots in the window
    pub window_size: usize,
    /// Newest snapshot timestamp
    pub latest: DateTime<Utc>,
}

/// Compute the classification metrics of a window.
///
/// Snapshots are grouped by asset; every group must contain at least
/// `min_window_size` observations with non-decreasing timestamps and
/// strictly positive prices.
pub fn compute_window_metrics(
    window: &[MarketSnapshot],
    min_window_size: usize,
    periods_per_year: f64,
) -> EngineResult<WindowMetrics> {
    let required = min_window_size.max(2);

    let mut by_asset: BTreeMap<&str, Vec<&MarketSnapshot>> = BTreeMap::new();
    for snapshot in window {
        by_asset.entry(snapshot.asset_id().as_str()).or_default().push(snapshot);
    }

    let smallest = by_asset.values().map(Vec::len).min().unwrap_or(0);
    if smallest < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: smallest,
        });
    }

    let mut volatility_sum = 0.0;
    let mut trend_sum = 0.0;
    let mut latest: Option<DateTime<Utc>> = None;

    for (asset_id, snapshots) in &by_asset {
        let mut log_prices = Vec::with_capacity(snapshots.len());
        for (i, snapshot) in snapshots.iter().enumerate() {
            let price = snapshot.price();
            if !price.is_finite() || price <= 0.0 {
                return Err(EngineError::InvalidInput(format!(
                    "non-positive price {} for {} at {}",
                    price,
                    asset_id,
                    snapshot.timestamp()
                )));
            }
            if i > 0 && snapshot.timestamp() < snapshots[i - 1].timestamp() {
                return Err(EngineError::InvalidInput(format!(
                    "snapshots for {} are not ordered by timestamp",
                    asset_id
                )));
            }
            log_prices.push(price.ln());
        }

        let log_returns: Vec<f64> = log_prices.windows(2).map(|pair| pair[1] - pair[0]).collect();
        volatility_sum += stats::sample_std_dev(&log_returns) * periods_per_year.sqrt() * 100.0;
        trend_sum += stats::ols_slope(&log_prices) * periods_per_year * 100.0;

        if let Some(last) = snapshots.last() {
            latest = Some(latest.map_or(last.timestamp(), |t| t.max(last.timestamp())));
        }
    }

    let assets = by_asset.len();
    let latest = latest.ok_or(EngineError::InsufficientData { required, actual: 0 })?;

    Ok(WindowMetrics {
        volatility: volatility_sum / assets as f64,
        trend: trend_sum / assets as f64,
        assets,
        window_size: window.len(),
        latest,
    })
}
