// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cardinality Monitor (C6)
//!
//! Recomputes a [`CardinalitySnapshot`] from the [`MetricRegistry`]'s current
//! series set, on demand, no more often than once every 30 seconds — scraping
//! this view must never itself become an expensive, hot-path operation.
//! A short rolling history (at least three snapshots) feeds a %-per-10-minute
//! growth rate per metric, so a slow leak in label values shows up before it
//! crosses the critical threshold.

use crate::infrastructure::config::CardinalityThresholds;
use crate::infrastructure::metrics::registry::MetricRegistry;
use chrono::{DateTime, Utc};
use exporter_domain::{CardinalitySnapshot, LabelUsage};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const MIN_RECOMPUTE_INTERVAL: Duration = Duration::from_secs(30);
const HISTORY_LEN: usize = 20;
const GROWTH_WINDOW_MINUTES: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityLevel {
    Ok,
    Warning,
    Critical,
}

/// Per-level tallies across every metric in a snapshot, per §4.6: the
/// Monitor "classifies each metric as normal/warning/critical and
/// aggregates counts into a health banner."
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CardinalityBanner {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
}

struct State {
    history: VecDeque<CardinalitySnapshot>,
}

/// Wraps a [`MetricRegistry`] to expose series-cardinality accounting
/// without forcing registry writers to maintain it themselves.
pub struct CardinalityMonitor {
    registry: Arc<MetricRegistry>,
    thresholds: CardinalityThresholds,
    state: Mutex<State>,
}

impl CardinalityMonitor {
    pub fn new(registry: Arc<MetricRegistry>, thresholds: CardinalityThresholds) -> Self {
        Self { registry, thresholds, state: Mutex::new(State { history: VecDeque::with_capacity(HISTORY_LEN) }) }
    }

    /// Returns the most recent snapshot, recomputing first if at least
    /// [`MIN_RECOMPUTE_INTERVAL`] has elapsed since the last one (or none
    /// exists yet).
    pub fn snapshot(&self, now: DateTime<Utc>) -> CardinalitySnapshot {
        let mut state = self.state.lock();
        let stale = match state.history.back() {
            Some(last) => match (now - last.computed_at).to_std() {
                Ok(age) => age >= MIN_RECOMPUTE_INTERVAL,
                Err(_) => false,
            },
            None => true,
        };

        if stale {
            let fresh = self.recompute(now, &state.history);
            state.history.push_back(fresh.clone());
            if state.history.len() > HISTORY_LEN {
                state.history.pop_front();
            }
            fresh
        } else {
            state.history.back().cloned().unwrap_or_else(|| CardinalitySnapshot::empty(now))
        }
    }

    fn recompute(&self, now: DateTime<Utc>, history: &VecDeque<CardinalitySnapshot>) -> CardinalitySnapshot {
        let series = self.registry.series_snapshot();
        let label_names = self.registry.label_names_snapshot();

        let mut per_metric = HashMap::new();
        let mut per_label: HashMap<String, LabelUsage> = HashMap::new();
        let mut total_series = 0usize;

        for (metric, series_list) in &series {
            per_metric.insert(metric.clone(), series_list.len());
            total_series += series_list.len();

            if let Some(names) = label_names.get(metric) {
                for name in names {
                    let usage = per_label.entry(name.clone()).or_insert(LabelUsage { total_series: 0, metrics_using: 0 });
                    usage.metrics_using += 1;
                    usage.total_series += series_list.len();
                }
            }
        }

        let growth_rate = history
            .front()
            .filter(|_| history.len() + 1 >= 3)
            .map(|earliest| self.growth_rate(earliest, &per_metric, now))
            .unwrap_or_default();

        CardinalitySnapshot { computed_at: now, total_series, per_metric, per_label, growth_rate }
    }

    fn growth_rate(
        &self,
        earliest: &CardinalitySnapshot,
        current_per_metric: &HashMap<String, usize>,
        now: DateTime<Utc>,
    ) -> HashMap<String, f64> {
        let elapsed_minutes = (now - earliest.computed_at).num_seconds() as f64 / 60.0;
        if elapsed_minutes <= 0.0 {
            return HashMap::new();
        }
        let scale = GROWTH_WINDOW_MINUTES / elapsed_minutes;

        current_per_metric
            .iter()
            .map(|(metric, &current)| {
                let before = *earliest.per_metric.get(metric).unwrap_or(&0);
                let pct = if before == 0 {
                    if current == 0 { 0.0 } else { 100.0 }
                } else {
                    ((current as f64 - before as f64) / before as f64) * 100.0
                };
                (metric.clone(), pct * scale)
            })
            .collect()
    }

    /// Classifies a single metric's series count. Thresholds are absolute
    /// counts per metric (§4.6), never the registry-wide total.
    pub fn level_for_count(&self, count: usize) -> CardinalityLevel {
        if count >= self.thresholds.critical {
            CardinalityLevel::Critical
        } else if count >= self.thresholds.warning {
            CardinalityLevel::Warning
        } else {
            CardinalityLevel::Ok
        }
    }

    pub fn levels(&self, snapshot: &CardinalitySnapshot) -> HashMap<String, CardinalityLevel> {
        snapshot.per_metric.iter().map(|(metric, &count)| (metric.clone(), self.level_for_count(count))).collect()
    }

    /// Aggregates every metric's level into the health banner operators scan
    /// first.
    pub fn banner(&self, snapshot: &CardinalitySnapshot) -> CardinalityBanner {
        let mut banner = CardinalityBanner::default();
        for &count in snapshot.per_metric.values() {
            match self.level_for_count(count) {
                CardinalityLevel::Ok => banner.ok += 1,
                CardinalityLevel::Warning => banner.warning += 1,
                CardinalityLevel::Critical => banner.critical += 1,
            }
        }
        banner
    }

    pub fn snapshot_json(&self, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
        let snapshot = self.snapshot(now);
        let banner = self.banner(&snapshot);
        let levels = self.levels(&snapshot);
        let view = serde_json::json!({
            "snapshot": snapshot,
            "banner": banner,
            "per_metric_levels": levels,
        });
        serde_json::to_string_pretty(&view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::IntervalsConfig;
    use exporter_domain::{LabelSchema, MetricDefinition, MetricKind, Tier};
    use std::collections::HashMap as StdHashMap;

    fn monitor() -> (Arc<MetricRegistry>, CardinalityMonitor) {
        let registry = Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ));
        let thresholds = CardinalityThresholds { warning: 2, critical: 4 };
        let monitor = CardinalityMonitor::new(registry.clone(), thresholds);
        (registry, monitor)
    }

    #[test]
    fn empty_registry_yields_zero_total() {
        let (_registry, monitor) = monitor();
        let snap = monitor.snapshot(Utc::now());
        assert_eq!(snap.total_series, 0);
        let banner = monitor.banner(&snap);
        assert_eq!(banner.ok, 0);
        assert_eq!(banner.warning, 0);
        assert_eq!(banner.critical, 0);
    }

    #[test]
    fn a_metric_over_its_own_threshold_is_warning_even_with_a_tiny_registry_total() {
        let (registry, monitor) = monitor();
        let schema = LabelSchema::new(["serial"]).unwrap();
        registry.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();

        for i in 0..3 {
            let mut labels = StdHashMap::new();
            labels.insert("serial".to_string(), format!("Q{i}"));
            registry.set_gauge("devices_total", &labels, 1.0, Tier::Fast).unwrap();
        }

        let snap = monitor.snapshot(Utc::now());
        assert_eq!(snap.total_series, 3);
        assert_eq!(monitor.level_for_count(3), CardinalityLevel::Warning);

        let banner = monitor.banner(&snap);
        assert_eq!(banner.warning, 1);
        assert_eq!(banner.ok, 0);
        assert_eq!(banner.critical, 0);
    }

    #[test]
    fn banner_aggregates_across_multiple_metrics_independently() {
        let (registry, monitor) = monitor();
        let schema = LabelSchema::new(["serial"]).unwrap();
        registry.register(MetricDefinition::new("quiet_total", MetricKind::Gauge, "help", schema.clone()).unwrap()).unwrap();
        registry.register(MetricDefinition::new("busy_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();

        let mut quiet_labels = StdHashMap::new();
        quiet_labels.insert("serial".to_string(), "Q1".to_string());
        registry.set_gauge("quiet_total", &quiet_labels, 1.0, Tier::Fast).unwrap();

        for i in 0..5 {
            let mut labels = StdHashMap::new();
            labels.insert("serial".to_string(), format!("B{i}"));
            registry.set_gauge("busy_total", &labels, 1.0, Tier::Fast).unwrap();
        }

        // thresholds: warning=2, critical=4 (per monitor()) — a registry-wide
        // total of 6 would previously have been flagged Warning for
        // everything; per-metric, only busy_total (5 series) crosses into
        // Critical, quiet_total (1 series) stays Ok.
        let snap = monitor.snapshot(Utc::now());
        assert_eq!(snap.total_series, 6);
        let banner = monitor.banner(&snap);
        assert_eq!(banner.ok, 1);
        assert_eq!(banner.warning, 0);
        assert_eq!(banner.critical, 1);
    }

    #[test]
    fn recompute_is_rate_limited() {
        let (registry, monitor) = monitor();
        let schema = LabelSchema::new(["serial"]).unwrap();
        registry.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();

        let now = Utc::now();
        let first = monitor.snapshot(now);
        assert_eq!(first.total_series, 0);

        let mut labels = StdHashMap::new();
        labels.insert("serial".to_string(), "Q1".to_string());
        registry.set_gauge("devices_total", &labels, 1.0, Tier::Fast).unwrap();

        // Within the 30s window, the stale snapshot is reused.
        let second = monitor.snapshot(now + chrono::Duration::seconds(5));
        assert_eq!(second.total_series, 0);

        let third = monitor.snapshot(now + chrono::Duration::seconds(31));
        assert_eq!(third.total_series, 1);
    }
}
