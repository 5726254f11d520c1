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

//! Realized performance of a strategy's return series.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::stats;
use crate::strategy::StrategyId;

/// Performance analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Annual risk-free rate used for the Sharpe ratio
    pub risk_free_rate: f64,
    /// Return periods per year
    pub periods_per_year: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 252.0,
        }
    }
}

/// Summary of realized performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub strategy_id: StrategyId,
    pub observations: usize,
    /// Compounded return over the whole series
    pub cumulative_return: f64,
    /// Geometric annualized return
    pub annualized_return: f64,
    /// Sample volatility scaled by the square root of periods per year
    pub annualized_volatility: f64,
    /// `None` when the series has no volatility
    pub sharpe_ratio: Option<f64>,
    /// Largest peak-to-trough decline of the equity curve (0.0-1.0)
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    config: PerformanceConfig,
}

impl PerformanceAnalyzer {
    pub fn new(config: PerformanceConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, strategy_id: impl Into<StrategyId>, returns: &[f64]) -> EngineResult<PerformanceReport> {
        let strategy_id = strategy_id.into();
        let n = returns.len();
        if n < 2 {
            return Err(EngineError::InsufficientHistory {
                strategy_id,
                required: 2,
                actual: n,
            });
        }
        if returns.iter().any(|r| !r.is_finite() || *r <= -1.0) {
            return Err(EngineError::InvalidInput(format!(
                "returns of {} must be finite and greater than -100%",
                strategy_id
            )));
        }

        let mut equity = 1.0_f64;
        let mut peak = 1.0_f64;
        let mut max_drawdown = 0.0_f64;
        for r in returns {
            equity *= 1.0 + r;
            peak = peak.max(equity);
            max_drawdown = max_drawdown.max(1.0 - equity / peak);
        }

        let periods = self.config.periods_per_year;
        let cumulative_return = equity - 1.0;
        let annualized_return = equity.powf(periods / n as f64) - 1.0;
        let period_volatility = if stats::is_constant(returns) {
            0.0
        } else {
            stats::sample_std_dev(returns)
        };
        let annualized_volatility = period_volatility * periods.sqrt();

        let sharpe_ratio = if period_volatility > 0.0 {
            let excess = stats::mean(returns) - self.config.risk_free_rate / periods;
            Some(excess / period_volatility * periods.sqrt())
        } else {
            None
        };

        debug!(
            "Performance of {}: cumulative={:.4}, sharpe={:?}, max_drawdown={:.4}",
            strategy_id, cumulative_return, sharpe_ratio, max_drawdown
        );

        Ok(PerformanceReport {
            strategy_id,
            observations: n,
            cumulative_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_series() {
        let analyzer = PerformanceAnalyzer::new(PerformanceConfig {
            risk_free_rate: 0.0,
            periods_per_year: 4.0,
        });
        let report = analyzer.analyze("q", &[0.10, -0.20, 0.25, 0.0]).unwrap();

        // 1.1 * 0.8 * 1.25 * 1.0 = 1.1
        assert!((report.cumulative_return - 0.1).abs() < 1e-12);
        assert!((report.annualized_return - 0.1).abs() < 1e-12);
        // Peak 1.1, trough 0.88
        assert!((report.max_drawdown - 0.2).abs() < 1e-12);
        assert!(report.sharpe_ratio.unwrap() > 0.0);
        assert_eq!(report.observations, 4);
    }

    #[test]
    fn test_flat_series_has_no_sharpe() {
        let report = PerformanceAnalyzer::default().analyze("flat", &[0.001; 10]).unwrap();
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.annualized_volatility, 0.0);
    }

    #[test]
    fn test_rejects_short_or_invalid_series() {
        let analyzer = PerformanceAnalyzer::default();
        assert!(matches!(
            analyzer.analyze("x", &[0.01]),
            Err(EngineError::InsufficientHistory { required: 2, actual: 1, .. })
        ));
        assert!(matches!(analyzer.analyze("x", &[0.01, -1.0]), Err(EngineError::InvalidInput(_))));
    }
}
