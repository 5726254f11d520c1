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

pub mod metrics;
pub mod threshold;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::market::MarketSnapshot;

pub use metrics::{compute_window_metrics, WindowMetrics};
pub use threshold::{create_threshold_classifier, ThresholdRegimeClassifier};

/// Discrete market regime labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeLabel {
    /// Positive drift with contained volatility
    Bullish,

    /// Negative drift with contained volatility
    Bearish,

    /// Volatility above the configured ceiling, regardless of drift
    Volatile,

    /// No decisive drift
    Neutral,
}

impl RegimeLabel {
    pub const ALL: [RegimeLabel; 4] = [
        RegimeLabel::Bullish,
        RegimeLabel::Bearish,
        RegimeLabel::Volatile,
        RegimeLabel::Neutral,
    ];
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeLabel::Bullish => write!(f, "BULLISH"),
            RegimeLabel::Bearish => write!(f, "BEARISH"),
            RegimeLabel::Volatile => write!(f, "VOLATILE"),
            RegimeLabel::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl Default for RegimeLabel {
    fn default() -> Self {
        RegimeLabel::Neutral
    }
}

/// Result of classifying one window of snapshots.
///
/// A state is never mutated after classification; newer classifications
/// supersede it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    /// Regime label
    pub label: RegimeLabel,

    /// Confidence in the label (0.0-1.0)
    pub confidence: f64,

    /// Timestamp of the newest snapshot in the window
    pub timestamp: DateTime<Utc>,

    /// Number of snapshots in the window
    pub window_size: usize,

    /// Annualized volatility in percent
    pub volatility: f64,

    /// Annualized log-price drift in percent
    pub trend: f64,
}

impl RegimeState {
    pub fn new(label: RegimeLabel, confidence: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
            window_size: 0,
            volatility: 0.0,
            trend: 0.0,
        }
    }

    pub fn with_metrics(mut self, metrics: &WindowMetrics) -> Self {
        self.window_size = metrics.window_size;
        self.volatility = metrics.volatility;
        self.trend = metrics.trend;
        self
    }

    /// Whether this state carries a different label than `previous`
    pub fn is_regime_change(&self, previous: Option<&RegimeState>) -> bool {
        previous.map_or(true, |previous| previous.label != self.label)
    }
}

/// Threshold rules mapping (volatility, trend) to a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    /// Volatility (annualized %) strictly above which the regime is volatile
    pub volatile_above: f64,
    /// Trend (annualized %) strictly above which the regime is bullish
    pub bullish_above: f64,
    /// Trend (annualized %) at or below which the regime is bearish
    pub bearish_at_or_below: f64,
    /// Volatility distance that counts as one unit of confidence
    pub volatility_scale: f64,
    /// Trend distance that counts as one unit of confidence
    pub trend_scale: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            volatile_above: 20.0,
            bullish_above: 5.0,
            bearish_at_or_below: -5.0,
            volatility_scale: 10.0,
            trend_scale: 10.0,
        }
    }
}

/// Configuration for regime classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Minimum number of snapshots per asset in a window
    pub min_window_size: usize,
    /// Observation periods per year used for annualization
    pub periods_per_year: f64,
    /// Label thresholds
    pub thresholds: RegimeThresholds,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            min_window_size: 20,
            periods_per_year: 252.0,
            thresholds: RegimeThresholds::default(),
        }
    }
}

/// Maps a rolling window of snapshots to a regime.
///
/// Implementations must be pure: the same window always yields the same state.
pub trait RegimeClassifier: Send + Sync {
    fn classify(&self, window: &[MarketSnapshot]) -> EngineResult<RegimeState>;
}
