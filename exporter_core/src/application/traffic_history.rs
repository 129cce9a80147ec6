// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Traffic History Collector
//!
//! A Slow-tier collector reading per-network cumulative traffic counters. The
//! upstream endpoint only accepts a handful of discrete `timespan` values; this
//! collector always asks for the 3600s window. That constant belongs here and
//! not in the engine, since a different collector querying the same kind of
//! endpoint might need a different window — the Inventory Cache keys its
//! single-flight entries on the full query string, so two collectors asking
//! for different timespans against the same network never collide.
//!
//! The upstream figure is a lifetime cumulative byte count, not a delta, so
//! this is where [`MetricSink::set_counter_from_absolute`] earns its keep:
//! Prometheus counters may only increase, and a device reboot that resets the
//! vendor-side counter must not make ours go backwards.

use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{
    Collector, CollectorOutcome, CycleContext, ErrorCategory, ExporterError, LabelSchema, MetricDefinition,
    MetricKind, Tier,
};
use std::collections::HashMap;

const TRAFFIC_TIMESPAN_SECS: &str = "3600";

pub struct TrafficHistoryCollector;

impl TrafficHistoryCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        sink.registry.register(MetricDefinition::new(
            "meraki_network_traffic_bytes_total",
            MetricKind::Counter,
            "Cumulative bytes observed on a network over the trailing hour, as reported upstream",
            LabelSchema::new(["org_id", "network_id"])?,
        )?)?;
        Ok(())
    }
}

impl Default for TrafficHistoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector<Inventory, MetricSink> for TrafficHistoryCollector {
    fn name(&self) -> &str {
        "traffic_history"
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    async fn collect(&self, ctx: &CycleContext<Inventory, MetricSink>) -> CollectorOutcome {
        let orgs = match ctx.inventory.list_organizations().await {
            Ok(orgs) => orgs,
            Err(e) => return CollectorOutcome::Failed { errors: vec![(e.category(), e.to_string())] },
        };

        let mut errors: Vec<(ErrorCategory, String)> = Vec::new();
        let mut jobs: Vec<(String, String)> = Vec::new();

        for org in &orgs {
            if ctx.is_cancelled() {
                errors.push((ErrorCategory::Cancellation, "traffic history cancelled mid-cycle".to_string()));
                break;
            }
            let org_id = org.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();

            let networks = match ctx.inventory.list_networks(&org_id).await {
                Ok(networks) => networks,
                Err(e) => {
                    errors.push((e.category(), e.to_string()));
                    continue;
                }
            };

            for network in &networks {
                let network_id = network.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                jobs.push((org_id.clone(), network_id));
            }
        }

        // One `get_json` per network is the genuinely high-fanout part of
        // this collector; run it through the Execution Pipeline's batching
        // policy (§4.4) so `api.batch_size`/`api.batch_delay` bound how many
        // traffic requests land on upstream at once.
        let inventory_for_jobs = ctx.inventory.clone();
        let sink = ctx.metric_sink.clone();
        let results = ctx
            .inventory
            .run_batched(jobs, move |(org_id, network_id)| {
                let inventory = inventory_for_jobs.clone();
                let sink = sink.clone();
                async move { fetch_and_record(&inventory, &sink, org_id, network_id).await }
            })
            .await;

        for result in results {
            if let Err(e) = result {
                errors.push((e.category(), e.to_string()));
            }
        }

        if errors.is_empty() {
            CollectorOutcome::Ok
        } else {
            CollectorOutcome::Partial { errors }
        }
    }
}

async fn fetch_and_record(
    inventory: &Inventory,
    sink: &MetricSink,
    org_id: String,
    network_id: String,
) -> Result<(), ExporterError> {
    let path = format!("/networks/{network_id}/traffic");
    let query = [("timespan".to_string(), TRAFFIC_TIMESPAN_SECS.to_string())];

    let body = inventory.get_json(&path, &query).await?;

    let total_bytes = match body.get("totalBytes").and_then(|v| v.as_f64()) {
        Some(value) => value,
        None => {
            return Err(ExporterError::parsing(format!("network {network_id} traffic response missing totalBytes")));
        }
    };

    let mut labels = HashMap::new();
    labels.insert("org_id".to_string(), org_id);
    labels.insert("network_id".to_string(), network_id);
    sink.set_counter_from_absolute("meraki_network_traffic_bytes_total", &labels, total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::IntervalsConfig;
    use crate::infrastructure::engine::inventory::InventoryCache;
    use crate::infrastructure::engine::pipeline::ExecutionPipeline;
    use crate::infrastructure::metrics::registry::MetricRegistry;
    use async_trait::async_trait as at;
    use exporter_domain::UpstreamApi;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    struct TrafficApi {
        calls: AtomicU64,
        total_bytes: f64,
    }

    #[at]
    impl UpstreamApi for TrafficApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![json!({"id": "1"})])
        }
        async fn list_networks(&self, _org_id: &str) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![json!({"id": "N1"})])
        }
        async fn list_devices(&self, _org_id: &str, _filters: &[String]) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(path, "/networks/N1/traffic");
            assert_eq!(query, &[("timespan".to_string(), "3600".to_string())]);
            Ok(json!({"totalBytes": self.total_bytes}))
        }
    }

    struct ManyNetworksApi {
        calls: AtomicU64,
        in_flight: AtomicU64,
        max_observed_in_flight: AtomicU64,
        network_count: usize,
    }

    #[at]
    impl UpstreamApi for ManyNetworksApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![json!({"id": "1"})])
        }
        async fn list_networks(&self, _org_id: &str) -> Result<Vec<Value>, ExporterError> {
            Ok((0..self.network_count).map(|i| json!({"id": format!("N{i}")})).collect())
        }
        async fn list_devices(&self, _org_id: &str, _filters: &[String]) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn get_json(&self, _path: &str, _query: &[(String, String)]) -> Result<Value, ExporterError> {
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({"totalBytes": 1.0}))
        }
    }

    fn registry() -> Arc<MetricRegistry> {
        Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ))
    }

    #[tokio::test]
    async fn writes_absolute_value_as_monotonic_counter() {
        let registry = registry();
        let collector = TrafficHistoryCollector::new();
        let sink = MetricSink::new(registry.clone(), Tier::Slow);
        collector.register_metrics(&sink).unwrap();

        let api = Arc::new(TrafficApi { calls: AtomicU64::new(0), total_bytes: 4096.0 });
        let pipeline = Arc::new(ExecutionPipeline::new(5, 3, std::time::Duration::from_secs(5), 20, std::time::Duration::from_millis(0)));
        let inventory = Arc::new(InventoryCache::new(api.clone(), pipeline));
        let cycle_ctx = CycleContext::new(
            Tier::Slow,
            Instant::now() + std::time::Duration::from_secs(900),
            inventory,
            sink,
            Arc::new(|| false),
        );

        let outcome = collector.collect(&cycle_ctx).await;
        assert!(matches!(outcome, CollectorOutcome::Ok));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        let text = registry.scrape_text().unwrap();
        assert!(text.contains("meraki_network_traffic_bytes_total{network_id=\"N1\",org_id=\"1\"} 4096"));
    }

    #[tokio::test]
    async fn per_network_fetches_honor_the_configured_batch_size() {
        let registry = registry();
        let collector = TrafficHistoryCollector::new();
        let sink = MetricSink::new(registry.clone(), Tier::Slow);
        collector.register_metrics(&sink).unwrap();

        let api = Arc::new(ManyNetworksApi {
            calls: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            max_observed_in_flight: AtomicU64::new(0),
            network_count: 9,
        });
        // batch_size=3: within a batch up to 3 networks fetch concurrently,
        // but never more than that across the whole run.
        let pipeline = Arc::new(ExecutionPipeline::new(10, 3, std::time::Duration::from_secs(5), 3, std::time::Duration::from_millis(1)));
        let inventory = Arc::new(InventoryCache::new(api.clone(), pipeline));
        let cycle_ctx = CycleContext::new(
            Tier::Slow,
            Instant::now() + std::time::Duration::from_secs(900),
            inventory,
            sink,
            Arc::new(|| false),
        );

        let outcome = collector.collect(&cycle_ctx).await;
        assert!(matches!(outcome, CollectorOutcome::Ok));
        assert_eq!(api.calls.load(Ordering::SeqCst), 9);
        assert!(api.max_observed_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn a_second_cycle_ignores_a_decrease() {
        let registry = registry();
        let sink = MetricSink::new(registry.clone(), Tier::Slow);
        TrafficHistoryCollector::new().register_metrics(&sink).unwrap();

        let mut labels = HashMap::new();
        labels.insert("org_id".to_string(), "1".to_string());
        labels.insert("network_id".to_string(), "N1".to_string());
        sink.set_counter_from_absolute("meraki_network_traffic_bytes_total", &labels, 4096.0).unwrap();

        // A device reboot resetting the vendor-side cumulative counter must
        // not walk ours backwards; the write is accepted but has no effect.
        sink.set_counter_from_absolute("meraki_network_traffic_bytes_total", &labels, 1024.0).unwrap();
        let text = registry.scrape_text().unwrap();
        assert!(text.contains("meraki_network_traffic_bytes_total{network_id=\"N1\",org_id=\"1\"} 4096"));
    }
}
