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

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::fixtures::*;
use crate::analytics::{PerformanceAnalyzer, PerformanceConfig};
use crate::asset_allocator::{AllocationConfig, AllocationOptimizer, ClassMultipliers, RegimeAllocationOptimizer};
use crate::market::{AssetId, DataFeed, InMemoryDataFeed, MarketSnapshot, SyntheticDataFeed, SyntheticFeedConfig};
use crate::market_regime::{RegimeClassifier, RegimeConfig, RegimeLabel, RegimeState, ThresholdRegimeClassifier};
use crate::risk::{RiskAssessor, RiskConfig, RiskEngine};
use crate::strategy::StrategyParams;

async fn load_history(feed: &dyn DataFeed, assets: &[&str]) -> BTreeMap<AssetId, VecDeque<MarketSnapshot>> {
    let mut history = BTreeMap::new();
    for asset in assets {
        let snapshots = feed.fetch(&asset.to_string(), None).await.unwrap();
        history.insert(asset.to_string(), snapshots.into_iter().collect::<VecDeque<_>>());
    }
    history
}

fn tail_window(history: &BTreeMap<AssetId, VecDeque<MarketSnapshot>>, size: usize) -> Vec<MarketSnapshot> {
    history
        .values()
        .flat_map(|series| series.iter().skip(series.len().saturating_sub(size)).cloned())
        .collect()
}

#[tokio::test]
async fn test_synthetic_market_flows_through_every_stage() {
    let assets = ["SPY", "TLT", "BIL"];
    let feed = SyntheticDataFeed::new(SyntheticFeedConfig::default()).with_start_time(base_time());
    let history = load_history(&feed, &assets).await;
    assert!(history.values().all(|series| series.len() == 200));

    let classifier = ThresholdRegimeClassifier::new(RegimeConfig::default());
    let regime = classifier.classify(&tail_window(&history, 40)).unwrap();
    assert!((0.0..=1.0).contains(&regime.confidence));
    assert_eq!(regime.window_size, 40);

    let strategy = StrategyParams::new("balanced")
        .with_exposure("SPY", 0.6)
        .with_exposure("TLT", 0.4);
    let returns = strategy.returns_from(&history, 128);
    assert_eq!(returns.len(), 128);

    let risk = RiskEngine::new(RiskConfig::default());
    let profile = risk.assess(&strategy, &returns).unwrap();
    assert!(profile.volatility > 0.0);
    assert!(profile.conditional_value_at_risk <= profile.value_at_risk);

    let scope = test_scope("synthetic", &assets);
    let optimizer = RegimeAllocationOptimizer::new(AllocationConfig {
        asset_classes: scope.asset_classes.clone(),
        ..Default::default()
    });
    let universe: BTreeSet<AssetId> = scope.assets.iter().cloned().collect();
    let mut profiles = HashMap::new();
    profiles.insert(strategy.strategy_id.clone(), profile);
    let outcome = optimizer.optimize(&universe, &regime, &profiles, &scope.goals).unwrap();
    assert!(outcome.target.is_valid(), "{:?}", outcome.target.weights);
    assert_eq!(outcome.target.regime_at_computation.label, regime.label);

    let report = PerformanceAnalyzer::new(PerformanceConfig::default())
        .analyze("balanced", &returns)
        .unwrap();
    assert_eq!(report.observations, 128);
    assert!(report.max_drawdown >= 0.0 && report.max_drawdown <= 1.0);
}

#[tokio::test]
async fn test_synthetic_feed_is_reproducible_across_instances() {
    let first = SyntheticDataFeed::new(SyntheticFeedConfig::default()).with_start_time(base_time());
    let second = SyntheticDataFeed::new(SyntheticFeedConfig::default()).with_start_time(base_time());

    let a = first.fetch(&"SPY".to_string(), None).await.unwrap();
    let b = second.fetch(&"SPY".to_string(), None).await.unwrap();
    let prices = |s: &[MarketSnapshot]| s.iter().map(|x| x.price()).collect::<Vec<_>>();
    assert_eq!(prices(&a), prices(&b));
}

#[tokio::test]
async fn test_bear_market_shifts_weight_to_cash() {
    let assets = ["SPY", "TLT", "BIL"];
    let feed = InMemoryDataFeed::new();
    for (i, asset) in assets.iter().enumerate() {
        record_trend(&feed, asset, 0, 60, 80.0 + 10.0 * i as f64, BEAR_STEP);
    }
    let history = load_history(&feed, &assets).await;

    let regime = ThresholdRegimeClassifier::new(RegimeConfig::default())
        .classify(&tail_window(&history, 30))
        .unwrap();
    assert_eq!(regime.label, RegimeLabel::Bearish);

    let scope = test_scope("bear", &assets);
    let optimizer = RegimeAllocationOptimizer::new(AllocationConfig {
        asset_classes: scope.asset_classes.clone(),
        ..Default::default()
    });
    let universe: BTreeSet<AssetId> = scope.assets.iter().cloned().collect();
    let target = optimizer
        .optimize(&universe, &regime, &HashMap::new(), &scope.goals)
        .unwrap()
        .target;

    assert!(target.is_valid());
    assert!(target.weight("BIL") > target.weight("SPY"));
    assert!(target.weight("BIL") > 1.0 / 3.0);
}

#[test]
fn test_uniform_volatile_scaling_keeps_goal_mix() {
    let mut config = AllocationConfig::default();
    config.regime_multipliers.volatile = ClassMultipliers::uniform(0.5);
    let optimizer = RegimeAllocationOptimizer::new(config);

    let universe: BTreeSet<AssetId> = ["A", "B"].iter().map(|s| s.to_string()).collect();
    let goals: BTreeMap<AssetId, f64> = [("A".to_string(), 0.5), ("B".to_string(), 0.5)].into_iter().collect();
    let regime = RegimeState::new(RegimeLabel::Volatile, 0.8, base_time());

    let outcome = optimizer.optimize(&universe, &regime, &HashMap::new(), &goals).unwrap();
    assert!(outcome.warning.is_none());
    assert!((outcome.target.weight("A") - 0.5).abs() < 1e-9);
    assert!((outcome.target.weight("B") - 0.5).abs() < 1e-9);
}
