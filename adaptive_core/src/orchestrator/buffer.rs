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

use chrono::{DateTime, Utc};

use crate::market::{AssetId, MarketSnapshot};

/// Bounded per-asset snapshot history fed incrementally by the collector
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    capacity: usize,
    series: BTreeMap<AssetId, VecDeque<MarketSnapshot>>,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: BTreeMap::new(),
        }
    }

    /// Timestamp of the newest stored snapshot of `asset_id`
    pub fn last_timestamp(&self, asset_id: &str) -> Option<DateTime<Utc>> {
        self.series
            .get(asset_id)
            .and_then(|s| s.back())
            .map(|s| s.timestamp())
    }

    /// Append snapshots newer than the stored tail, evicting the oldest
    /// beyond capacity. Returns the number appended.
    pub fn extend(&mut self, asset_id: &AssetId, snapshots: Vec<MarketSnapshot>) -> usize {
        let series = self.series.entry(asset_id.clone()).or_default();
        let mut appended = 0;
        for snapshot in snapshots {
            if snapshot.asset_id() != asset_id {
                continue;
            }
            if series.back().map_or(false, |last| snapshot.timestamp() <= last.timestamp()) {
                continue;
            }
            series.push_back(snapshot);
            appended += 1;
            if series.len() > self.capacity {
                series.pop_front();
            }
        }
        appended
    }

    /// The newest `size` snapshots of every asset in `assets`, grouped by asset
    pub fn window(&self, assets: &[AssetId], size: usize) -> Vec<MarketSnapshot> {
        let mut window = Vec::new();
        for asset_id in assets {
            if let Some(series) = self.series.get(asset_id) {
                let skip = series.len().saturating_sub(size);
                window.extend(series.iter().skip(skip).cloned());
            }
        }
        window
    }

    pub fn series(&self) -> &BTreeMap<AssetId, VecDeque<MarketSnapshot>> {
        &self.series
    }

    pub fn len(&self, asset_id: &str) -> usize {
        self.series.get(asset_id).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshots(asset: &str, start: DateTime<Utc>, range: std::ops::Range<i64>) -> Vec<MarketSnapshot> {
        range
            .map(|i| MarketSnapshot::new(asset, start + Duration::minutes(i), 100.0 + i as f64, 1.0))
            .collect()
    }

    #[test]
    fn test_history_is_bounded_and_deduplicated() {
        let start = Utc::now();
        let asset = "SPY".to_string();
        let mut history = SnapshotHistory::new(5);

        assert_eq!(history.extend(&asset, snapshots("SPY", start, 0..4)), 4);
        // Overlapping fetch only appends the new tail
        assert_eq!(history.extend(&asset, snapshots("SPY", start, 2..8)), 4);
        assert_eq!(history.len("SPY"), 5);
        assert_eq!(history.last_timestamp("SPY"), Some(start + Duration::minutes(7)));

        let window = history.window(&[asset.clone(), "QQQ".to_string()], 3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].price(), 105.0);
    }
}
