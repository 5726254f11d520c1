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
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};

/// Asset identifier (ticker or symbol)
pub type AssetId = String;

/// Optional statistics a data source may precompute for a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Rolling volatility as reported by the source
    pub rolling_volatility: Option<f64>,
    /// Trend slope as reported by the source
    pub trend_slope: Option<f64>,
}

/// A single timestamped observation for one asset.
///
/// Snapshots are immutable once recorded; fields are only reachable through
/// getters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    asset_id: AssetId,
    timestamp: DateTime<Utc>,
    price: f64,
    volume: f64,
    #[serde(default)]
    derived: DerivedStats,
}

impl MarketSnapshot {
    /// Create a new snapshot
    pub fn new(asset_id: impl Into<AssetId>, timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            asset_id: asset_id.into(),
            timestamp,
            price,
            volume,
            derived: DerivedStats::default(),
        }
    }

    /// Attach source-provided derived statistics
    pub fn with_derived(mut self, derived: DerivedStats) -> Self {
        self.derived = derived;
        self
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn derived(&self) -> &DerivedStats {
        &self.derived
    }
}

/// Source of market snapshots.
///
/// `fetch` returns the snapshots for `asset_id` strictly newer than `since`
/// (all available snapshots when `since` is `None`), ordered by timestamp.
/// Unreachable sources fail with [`EngineError::DataUnavailable`].
#[async_trait]
pub trait DataFeed: Send + Sync {
    async fn fetch(&self, asset_id: &AssetId, since: Option<DateTime<Utc>>) -> EngineResult<Vec<MarketSnapshot>>;
}

/// Data feed backed by recorded snapshots
#[derive(Default)]
pub struct InMemoryDataFeed {
    snapshots: RwLock<HashMap<AssetId, Vec<MarketSnapshot>>>,
    offline: AtomicBool,
    latency: Mutex<Option<Duration>>,
    fetch_count: AtomicUsize,
}

impl InMemoryDataFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot, keeping each asset's series ordered by timestamp
    pub fn record(&self, snapshot: MarketSnapshot) {
        let mut snapshots = self.snapshots.write();
        let series = snapshots.entry(snapshot.asset_id().clone()).or_default();
        let out_of_order = series
            .last()
            .map_or(false, |last| last.timestamp() > snapshot.timestamp());
        series.push(snapshot);
        if out_of_order {
            series.sort_by_key(|s| s.timestamp());
        }
    }

    /// Record several snapshots
    pub fn record_all(&self, snapshots: impl IntoIterator<Item = MarketSnapshot>) {
        for snapshot in snapshots {
            self.record(snapshot);
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`)
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Delay every fetch by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataFeed for InMemoryDataFeed {
    async fn fetch(&self, asset_id: &AssetId, since: Option<DateTime<Utc>>) -> EngineResult<Vec<MarketSnapshot>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(EngineError::DataUnavailable {
                asset_id: asset_id.clone(),
                reason: "feed offline".to_string(),
            });
        }

        let snapshots = self.snapshots.read();
        let series = snapshots.get(asset_id).ok_or_else(|| EngineError::DataUnavailable {
            asset_id: asset_id.clone(),
            reason: "no source configured for asset".to_string(),
        })?;

        Ok(series
            .iter()
            .filter(|s| since.map_or(true, |since| s.timestamp() > since))
            .cloned()
            .collect())
    }
}

/// Parameters for the synthetic market
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticFeedConfig {
    /// Seed for reproducible series
    pub seed: u64,
    /// Price of every asset at the first bar
    pub start_price: f64,
    /// Spacing between bars in seconds
    pub bar_interval_secs: i64,
    /// Bars returned by the first fetch of an asset
    pub initial_history_bars: usize,
    /// Bars appended on every subsequent fetch
    pub bars_per_fetch: usize,
    /// Bars spent in one market phase before switching
    pub phase_length_bars: usize,
}

impl Default for SyntheticFeedConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            start_price: 100.0,
            bar_interval_secs: 3600,
            initial_history_bars: 200,
            bars_per_fetch: 5,
            phase_length_bars: 60,
        }
    }
}

/// (drift per bar, volatility per bar) of each market phase
const SYNTHETIC_PHASES: [(f64, f64); 4] = [
    (0.0009, 0.004),  // steady advance
    (0.0, 0.003),     // quiet range
    (-0.0009, 0.005), // decline
    (0.0, 0.025),     // turbulence
];

struct SyntheticSeries {
    rng: StdRng,
    price: f64,
    next_bar: usize,
    beta: f64,
}

/// Seeded regime-switching random walk.
///
/// Every asset follows the same phase schedule scaled by a per-asset beta,
/// so classification over the universe moves through all four regimes.
pub struct SyntheticDataFeed {
    config: SyntheticFeedConfig,
    start_time: DateTime<Utc>,
    series: Mutex<HashMap<AssetId, SyntheticSeries>>,
}

impl SyntheticDataFeed {
    pub fn new(config: SyntheticFeedConfig) -> Self {
        let history = chrono::Duration::seconds(config.bar_interval_secs * config.initial_history_bars as i64);
        Self {
            start_time: Utc::now() - history,
            config,
            series: Mutex::new(HashMap::new()),
        }
    }

    /// Pin the timestamp of the first bar
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    fn asset_seed(&self, asset_id: &str) -> u64 {
        // FNV-1a so seeds are stable across runs and platforms
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in asset_id.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash ^ self.config.seed
    }

    fn bar_time(&self, bar: usize) -> DateTime<Utc> {
        self.start_time + chrono::Duration::seconds(self.config.bar_interval_secs * bar as i64)
    }

    fn generate(&self, asset_id: &AssetId, bars: usize) -> Vec<MarketSnapshot> {
        let mut all_series = self.series.lock();
        let series = all_series.entry(asset_id.clone()).or_insert_with(|| {
            let mut rng = StdRng::seed_from_u64(self.asset_seed(asset_id));
            let beta = rng.gen_range(0.6..1.4);
            SyntheticSeries {
                rng,
                price: self.config.start_price,
                next_bar: 0,
                beta,
            }
        });

        let phase_length = self.config.phase_length_bars.max(1);
        let mut snapshots = Vec::with_capacity(bars);
        for _ in 0..bars {
            let (drift, volatility) = SYNTHETIC_PHASES[(series.next_bar / phase_length) % SYNTHETIC_PHASES.len()];
            let drift = drift * series.beta;
            let volatility = volatility * series.beta;

            let shock = standard_normal(&mut series.rng);
            series.price *= (drift - 0.5 * volatility * volatility + volatility * shock).exp();

            let volume = 1_000.0 * (1.0 + shock.abs());
            snapshots.push(MarketSnapshot::new(
                asset_id.clone(),
                self.bar_time(series.next_bar),
                series.price,
                volume,
            ));
            series.next_bar += 1;
        }

        trace!("Generated {} synthetic bars for {}", bars, asset_id);
        snapshots
    }
}

#[async_trait]
impl DataFeed for SyntheticDataFeed {
    async fn fetch(&self, asset_id: &AssetId, since: Option<DateTime<Utc>>) -> EngineResult<Vec<MarketSnapshot>> {
        let bars = if self.series.lock().contains_key(asset_id) {
            self.config.bars_per_fetch
        } else {
            self.config.initial_history_bars
        };

        let snapshots = self.generate(asset_id, bars);
        debug!("Synthetic feed served {} bars for {}", snapshots.len(), asset_id);

        Ok(snapshots
            .into_iter()
            .filter(|s| since.map_or(true, |since| s.timestamp() > since))
            .collect())
    }
}

/// Box-Muller draw from the standard normal distribution
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
