// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metric Registry (C5)
//!
//! The hardest subsystem, per §4.5. Two phases:
//!
//! - **Definition** (startup): collectors declare metrics by name, kind,
//!   help, and label schema. [`MetricRegistry::register`] is fatal on
//!   double-registration.
//! - **Write** (during collection): [`MetricRegistry::set_gauge`],
//!   [`MetricRegistry::inc_counter`], [`MetricRegistry::observe_histogram`],
//!   [`MetricRegistry::set_info`]. Every write validates the label set
//!   against the declared schema exactly and stamps `recorded_at`.
//!
//! Storage is backed by `prometheus`'s label-vector types
//! (`GaugeVec`/`CounterVec`/`HistogramVec`), which already give per-series
//! locking and text encoding; a side table tracks `recorded_at` and the
//! writing tier per series so expiration (§3's TTL rule) can be enforced on
//! top of a crate that has no TTL concept of its own. Expired series are
//! evicted from both the side table and the underlying vector so a scrape
//! never renders them (§4.5's "expiration" + §8 invariant 2).

use crate::infrastructure::config::IntervalsConfig;
use chrono::{DateTime, Utc};
use exporter_domain::{ErrorCategory, ExporterError, LabelSchema, MetricDefinition, MetricKind, Tier};
use parking_lot::RwLock;
use prometheus::{CounterVec, GaugeVec, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
struct SeriesMeta {
    recorded_at: DateTime<Utc>,
    tier: Tier,
}

enum Storage {
    Gauge(GaugeVec),
    Counter(CounterVec),
    Histogram(HistogramVec),
    Info(GaugeVec),
}

struct MetricEntry {
    definition: MetricDefinition,
    storage: Storage,
    series: HashMap<Vec<String>, SeriesMeta>,
}

/// The typed metric factory and label-bound sample store.
pub struct MetricRegistry {
    prom: Arc<Registry>,
    entries: RwLock<HashMap<String, MetricEntry>>,
    intervals: IntervalsConfig,
    ttl_multiplier: f64,
}

impl MetricRegistry {
    pub fn new(intervals: IntervalsConfig, ttl_multiplier: f64) -> Self {
        Self { prom: Arc::new(Registry::new()), entries: RwLock::new(HashMap::new()), intervals, ttl_multiplier }
    }

    pub fn prometheus_registry(&self) -> Arc<Registry> {
        self.prom.clone()
    }

    /// Definition-phase registration. Double-registration of the same name
    /// is a fatal startup error (§4.5).
    pub fn register(&self, definition: MetricDefinition) -> Result<(), ExporterError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&definition.name) {
            return Err(ExporterError::validation(format!(
                "metric '{}' is already registered (double registration is fatal)",
                definition.name
            )));
        }

        let label_names: Vec<&str> = definition.label_schema.names().iter().map(String::as_str).collect();
        let opts = Opts::new(definition.name.clone(), definition.help_text.clone());

        let storage = match definition.kind {
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts, &label_names)
                    .map_err(|e| ExporterError::validation(format!("failed to create gauge '{}': {e}", definition.name)))?;
                self.prom
                    .register(Box::new(vec.clone()))
                    .map_err(|e| ExporterError::validation(format!("failed to register gauge '{}': {e}", definition.name)))?;
                Storage::Gauge(vec)
            }
            MetricKind::Counter => {
                let vec = CounterVec::new(opts, &label_names)
                    .map_err(|e| ExporterError::validation(format!("failed to create counter '{}': {e}", definition.name)))?;
                self.prom
                    .register(Box::new(vec.clone()))
                    .map_err(|e| ExporterError::validation(format!("failed to register counter '{}': {e}", definition.name)))?;
                Storage::Counter(vec)
            }
            MetricKind::Histogram => {
                // `MetricDefinition::new` always fills this in for Histogram
                // kind; the fallback here only guards a manually constructed
                // definition that skipped the constructor.
                const FALLBACK_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];
                let buckets = definition.bucket_spec.clone().unwrap_or_else(|| FALLBACK_BUCKETS.to_vec());
                let hopts = prometheus::HistogramOpts::new(definition.name.clone(), definition.help_text.clone())
                    .buckets(buckets);
                let vec = HistogramVec::new(hopts, &label_names).map_err(|e| {
                    ExporterError::validation(format!("failed to create histogram '{}': {e}", definition.name))
                })?;
                self.prom.register(Box::new(vec.clone())).map_err(|e| {
                    ExporterError::validation(format!("failed to register histogram '{}': {e}", definition.name))
                })?;
                Storage::Histogram(vec)
            }
            MetricKind::Info => {
                let vec = GaugeVec::new(opts, &label_names)
                    .map_err(|e| ExporterError::validation(format!("failed to create info metric '{}': {e}", definition.name)))?;
                self.prom
                    .register(Box::new(vec.clone()))
                    .map_err(|e| ExporterError::validation(format!("failed to register info metric '{}': {e}", definition.name)))?;
                Storage::Info(vec)
            }
        };

        entries.insert(definition.name.clone(), MetricEntry { definition, storage, series: HashMap::new() });
        Ok(())
    }

    fn ttl_for(&self, tier: Tier) -> std::time::Duration {
        self.intervals.period(tier).mul_f64(self.ttl_multiplier)
    }

    /// Evicts this entry's series whose `now - recorded_at > ttl(series)`
    /// from both the side table and the underlying vector. Shared by
    /// [`Self::prune_expired`]'s full sweep and every write method, so a
    /// high-churn label set never outgrows its TTL between scrapes (§4.5).
    fn evict_expired_in_entry(&self, entry: &mut MetricEntry, now: DateTime<Utc>) {
        let expired: Vec<Vec<String>> = entry
            .series
            .iter()
            .filter_map(|(values, meta)| {
                let ttl = self.ttl_for(meta.tier);
                let expired = match (now - meta.recorded_at).to_std() {
                    Ok(age) => age > ttl,
                    Err(_) => false,
                };
                expired.then(|| values.clone())
            })
            .collect();

        for values in expired {
            let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
            match &entry.storage {
                Storage::Gauge(vec) | Storage::Info(vec) => {
                    let _ = vec.remove_label_values(&value_refs);
                }
                Storage::Counter(vec) => {
                    let _ = vec.remove_label_values(&value_refs);
                }
                Storage::Histogram(vec) => {
                    let _ = vec.remove_label_values(&value_refs);
                }
            }
            entry.series.remove(&values);
        }
    }

    fn ordered_values(
        &self,
        entry: &MetricEntry,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<String>, ExporterError> {
        entry.definition.label_schema.ordered_values(labels)
    }

    /// `set(name, labels, value)` for Gauges.
    pub fn set_gauge(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        value: f64,
        tier: Tier,
    ) -> Result<(), ExporterError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ExporterError::validation(format!("metric '{name}' is not registered")))?;
        if !matches!(entry.storage, Storage::Gauge(_)) {
            return Err(ExporterError::validation(format!("metric '{name}' is not a Gauge")));
        }
        let values = self.ordered_values(entry, labels)?;
        let now = Utc::now();
        self.evict_expired_in_entry(entry, now);
        let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if let Storage::Gauge(vec) = &entry.storage {
            vec.with_label_values(&value_refs).set(value);
        }
        entry.series.insert(values, SeriesMeta { recorded_at: now, tier });
        Ok(())
    }

    /// `inc(name, labels, delta)` for Counters. Per §4.5, the registry never
    /// coerces a decreasing value — a negative delta is rejected with a
    /// logged warning and the series is left unchanged.
    pub fn inc_counter(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        delta: f64,
        tier: Tier,
    ) -> Result<(), ExporterError> {
        if delta < 0.0 {
            warn!(metric = name, delta, "rejected counter decrement; leaving series unchanged");
            return Ok(());
        }
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ExporterError::validation(format!("metric '{name}' is not registered")))?;
        if !matches!(entry.storage, Storage::Counter(_)) {
            return Err(ExporterError::validation(format!("metric '{name}' is not a Counter")));
        }
        let values = self.ordered_values(entry, labels)?;
        let now = Utc::now();
        self.evict_expired_in_entry(entry, now);
        let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if let Storage::Counter(vec) = &entry.storage {
            vec.with_label_values(&value_refs).inc_by(delta);
        }
        entry.series.insert(values, SeriesMeta { recorded_at: now, tier });
        Ok(())
    }

    /// Convenience for collectors deriving a counter from an upstream
    /// cumulative snapshot value (§4.5's "translate absolute values to
    /// deltas before calling inc"): reads the series' current value, computes
    /// the delta against it, and applies [`Self::inc_counter`]. A decrease
    /// between cumulative reads therefore naturally yields a negative delta,
    /// which is rejected and leaves the counter (and `recorded_at`)
    /// unchanged, per S6.
    pub fn set_counter_from_absolute(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        absolute: f64,
        tier: Tier,
    ) -> Result<(), ExporterError> {
        let current = self.counter_value(name, labels)?.unwrap_or(0.0);
        self.inc_counter(name, labels, absolute - current, tier)
    }

    fn counter_value(&self, name: &str, labels: &HashMap<String, String>) -> Result<Option<f64>, ExporterError> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| ExporterError::validation(format!("metric '{name}' is not registered")))?;
        let values = self.ordered_values(entry, labels)?;
        if let Storage::Counter(vec) = &entry.storage {
            let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
            Ok(Some(vec.with_label_values(&value_refs).get()))
        } else {
            Err(ExporterError::validation(format!("metric '{name}' is not a Counter")))
        }
    }

    /// `observe(name, labels, value)` for Histograms.
    pub fn observe_histogram(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        value: f64,
        tier: Tier,
    ) -> Result<(), ExporterError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ExporterError::validation(format!("metric '{name}' is not registered")))?;
        if !matches!(entry.storage, Storage::Histogram(_)) {
            return Err(ExporterError::validation(format!("metric '{name}' is not a Histogram")));
        }
        let values = self.ordered_values(entry, labels)?;
        let now = Utc::now();
        self.evict_expired_in_entry(entry, now);
        let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if let Storage::Histogram(vec) = &entry.storage {
            vec.with_label_values(&value_refs).observe(value);
        }
        entry.series.insert(values, SeriesMeta { recorded_at: now, tier });
        Ok(())
    }

    /// `setInfo(name, labels)`: value is always 1, state lives in labels.
    pub fn set_info(&self, name: &str, labels: &HashMap<String, String>, tier: Tier) -> Result<(), ExporterError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ExporterError::validation(format!("metric '{name}' is not registered")))?;
        if !matches!(entry.storage, Storage::Info(_)) {
            return Err(ExporterError::validation(format!("metric '{name}' is not an Info metric")));
        }
        let values = self.ordered_values(entry, labels)?;
        let now = Utc::now();
        self.evict_expired_in_entry(entry, now);
        let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if let Storage::Info(vec) = &entry.storage {
            vec.with_label_values(&value_refs).set(1.0);
        }
        entry.series.insert(values, SeriesMeta { recorded_at: now, tier });
        Ok(())
    }

    /// Evicts series whose `now - recorded_at > ttl(series)`. Called before
    /// every scrape and from a periodic sweep task, whichever comes first
    /// (§4.5).
    pub fn prune_expired(&self, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        for entry in entries.values_mut() {
            self.evict_expired_in_entry(entry, now);
        }
    }

    /// Read-only scrape snapshot rendered as Prometheus text exposition
    /// format. Expired series are pruned immediately beforehand so the
    /// render never includes them (§8 invariant 2).
    pub fn scrape_text(&self) -> Result<String, ExporterError> {
        self.prune_expired(Utc::now());
        let families = self.prom.gather();
        TextEncoder::new()
            .encode_to_string(&families)
            .map_err(|e| ExporterError::validation(format!("failed to encode metrics: {e}")))
    }

    /// Non-expired series per metric, for the Cardinality Monitor (C6).
    pub fn series_snapshot(&self) -> HashMap<String, Vec<Vec<String>>> {
        let entries = self.entries.read();
        entries.iter().map(|(name, entry)| (name.clone(), entry.series.keys().cloned().collect())).collect()
    }

    /// Label schema per metric, for the Cardinality Monitor's per-label
    /// aggregation.
    pub fn label_names_snapshot(&self) -> HashMap<String, Vec<String>> {
        let entries = self.entries.read();
        entries.iter().map(|(name, entry)| (name.clone(), entry.definition.label_schema.names().to_vec())).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Used by Health Accounting to classify a write-site error without
    /// re-deriving the taxonomy.
    pub fn validation_error(message: impl Into<String>) -> (ErrorCategory, String) {
        (ErrorCategory::Validation, message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MetricRegistry {
        MetricRegistry::new(IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 }, 2.0)
    }

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn double_registration_is_fatal() {
        let reg = registry();
        let schema = LabelSchema::new(["org_id"]).unwrap();
        let def = MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema.clone()).unwrap();
        reg.register(def).unwrap();
        let dup = MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap();
        assert!(reg.register(dup).is_err());
    }

    #[test]
    fn gauge_write_then_read_roundtrips() {
        let reg = registry();
        let schema = LabelSchema::new(["org_id"]).unwrap();
        reg.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();
        reg.set_gauge("devices_total", &labels(&[("org_id", "1")]), 5.0, Tier::Fast).unwrap();
        let text = reg.scrape_text().unwrap();
        assert!(text.contains("devices_total"));
        assert!(text.contains("org_id=\"1\""));
    }

    #[test]
    fn counter_rejects_negative_delta() {
        let reg = registry();
        let schema = LabelSchema::new(["serial"]).unwrap();
        reg.register(MetricDefinition::new("bytes_total", MetricKind::Counter, "help", schema).unwrap()).unwrap();
        let l = labels(&[("serial", "Q1")]);
        reg.set_counter_from_absolute("bytes_total", &l, 1000.0, Tier::Fast).unwrap();
        assert_eq!(reg.counter_value("bytes_total", &l).unwrap(), Some(1000.0));

        // S6: cumulative value goes backward, write is rejected.
        reg.set_counter_from_absolute("bytes_total", &l, 900.0, Tier::Fast).unwrap();
        assert_eq!(reg.counter_value("bytes_total", &l).unwrap(), Some(1000.0));

        // Subsequent higher cumulative value increments normally.
        reg.set_counter_from_absolute("bytes_total", &l, 1100.0, Tier::Fast).unwrap();
        assert_eq!(reg.counter_value("bytes_total", &l).unwrap(), Some(1100.0));
    }

    #[test]
    fn label_schema_mismatch_is_rejected() {
        let reg = registry();
        let schema = LabelSchema::new(["org_id", "serial"]).unwrap();
        reg.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();
        let bad = labels(&[("org_id", "1")]);
        assert!(reg.set_gauge("devices_total", &bad, 1.0, Tier::Fast).is_err());
    }

    #[test]
    fn expired_series_are_pruned_from_scrape() {
        let reg = registry();
        let schema = LabelSchema::new(["org_id"]).unwrap();
        reg.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();
        reg.set_gauge("devices_total", &labels(&[("org_id", "1")]), 5.0, Tier::Fast).unwrap();
        // ttl = 2.0 * 60s = 120s for Fast tier.
        reg.prune_expired(Utc::now() + chrono::Duration::seconds(121));
        let text = reg.scrape_text().unwrap();
        assert!(!text.contains("org_id=\"1\""));
    }

    #[test]
    fn expired_series_are_evicted_on_next_write_without_a_scrape() {
        // ttl = 1.0 * 0s = 0 for every tier, so any series is expired the
        // instant after it's written.
        let reg = MetricRegistry::new(IntervalsConfig { fast_secs: 0, medium_secs: 0, slow_secs: 0 }, 1.0);
        let schema = LabelSchema::new(["org_id"]).unwrap();
        reg.register(MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap()).unwrap();
        reg.set_gauge("devices_total", &labels(&[("org_id", "1")]), 5.0, Tier::Fast).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        // A write for an unrelated series must evict the stale one even
        // though nothing has scraped (and so called prune_expired) in between.
        reg.set_gauge("devices_total", &labels(&[("org_id", "2")]), 1.0, Tier::Fast).unwrap();

        let snapshot = reg.series_snapshot();
        let series = &snapshot["devices_total"];
        assert_eq!(series.len(), 1);
        assert_eq!(series[0], vec!["2".to_string()]);
    }

    #[test]
    fn empty_registry_scrapes_without_error() {
        let reg = registry();
        assert!(reg.scrape_text().unwrap().is_empty() || !reg.scrape_text().unwrap().contains("devices_total"));
    }
}
