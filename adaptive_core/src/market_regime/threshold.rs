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

use std::sync::Arc;

use tracing::debug;

use super::metrics::compute_window_metrics;
use super::{RegimeClassifier, RegimeConfig, RegimeLabel, RegimeState, RegimeThresholds};
use crate::error::EngineResult;
use crate::market::MarketSnapshot;

/// Rule-based classifier over window volatility and trend.
///
/// Rules are evaluated in order: volatility above the ceiling wins, then a
/// trend above the bullish bound, then a trend at or below the bearish bound,
/// otherwise neutral. Strict comparisons on the risky side send metrics that
/// sit exactly on a boundary to the lower-risk label.
#[derive(Debug, Clone)]
pub struct ThresholdRegimeClassifier {
    config: RegimeConfig,
}

impl ThresholdRegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Apply the rule table to precomputed metrics, returning the label and
    /// its confidence.
    pub fn classify_metrics(&self, volatility: f64, trend: f64) -> (RegimeLabel, f64) {
        let t = &self.config.thresholds;

        let label = if volatility > t.volatile_above {
            RegimeLabel::Volatile
        } else if trend > t.bullish_above {
            RegimeLabel::Bullish
        } else if trend <= t.bearish_at_or_below {
            RegimeLabel::Bearish
        } else {
            RegimeLabel::Neutral
        };

        (label, confidence(label, volatility, trend, t))
    }
}

/// `d / (1 + d)` where `d` is the smallest scaled distance to a boundary
/// that would flip the label.
fn confidence(label: RegimeLabel, volatility: f64, trend: f64, t: &RegimeThresholds) -> f64 {
    let vol_margin = (t.volatile_above - volatility) / t.volatility_scale;
    let distance = match label {
        RegimeLabel::Volatile => -vol_margin,
        RegimeLabel::Bullish => vol_margin.min((trend - t.bullish_above) / t.trend_scale),
        RegimeLabel::Bearish => vol_margin.min((t.bearish_at_or_below - trend) / t.trend_scale),
        RegimeLabel::Neutral => vol_margin
            .min((t.bullish_above - trend) / t.trend_scale)
            .min((trend - t.bearish_at_or_below) / t.trend_scale),
    };

    if !distance.is_finite() {
        return if distance.is_nan() { 0.0 } else { 1.0 };
    }
    let distance = distance.max(0.0);
    (distance / (1.0 + distance)).clamp(0.0, 1.0)
}

impl RegimeClassifier for ThresholdRegimeClassifier {
    fn classify(&self, window: &[MarketSnapshot]) -> EngineResult<RegimeState> {
        let metrics = compute_window_metrics(window, self.config.min_window_size, self.config.periods_per_year)?;
        let (label, confidence) = self.classify_metrics(metrics.volatility, metrics.trend);

        debug!(
            "Classified {} snapshots over {} assets as {} (vol={:.2}, trend={:.2}, confidence={:.2})",
            metrics.window_size, metrics.assets, label, metrics.volatility, metrics.trend, confidence
        );

        Ok(RegimeState::new(label, confidence, metrics.latest).with_metrics(&metrics))
    }
}

/// Create a shareable threshold classifier
pub fn create_threshold_classifier(config: RegimeConfig) -> Arc<dyn RegimeClassifier> {
    Arc::new(ThresholdRegimeClassifier::new(config))
}
