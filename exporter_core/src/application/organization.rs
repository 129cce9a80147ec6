// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Organization Collector
//!
//! The simplest collector in the catalog: one upstream call
//! (`listOrganizations`, served through the Inventory Cache so every other
//! collector in the same cycle that also needs the org list gets it for
//! free), one Gauge, one Info metric per organization. A good first read for
//! anyone new to the collector contract before `device` (§4.4's coordinator
//! example).

use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{
    Collector, CollectorOutcome, CycleContext, ErrorCategory, ExporterError, LabelSchema, MetricDefinition,
    MetricKind, Tier,
};
use std::collections::HashMap;
use tracing::warn;

pub struct OrganizationCollector {
    tier: Tier,
}

impl OrganizationCollector {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }

    pub fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        sink.registry.register(MetricDefinition::new(
            "meraki_organizations_total",
            MetricKind::Gauge,
            "Number of organizations visible to the configured API key",
            LabelSchema::new(Vec::<String>::new())?,
        )?)?;
        sink.registry.register(MetricDefinition::new(
            "meraki_organization_info",
            MetricKind::Info,
            "Static organization identity",
            LabelSchema::new(["org_id", "name"])?,
        )?)?;
        Ok(())
    }
}

#[async_trait]
impl Collector<Inventory, MetricSink> for OrganizationCollector {
    fn name(&self) -> &str {
        "organization"
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn collect(&self, ctx: &CycleContext<Inventory, MetricSink>) -> CollectorOutcome {
        let orgs = match ctx.inventory.list_organizations().await {
            Ok(orgs) => orgs,
            Err(e) => {
                warn!(error = %e, "failed to list organizations; organization collector has nothing to write");
                return CollectorOutcome::Failed { errors: vec![(e.category(), e.to_string())] };
            }
        };

        let mut errors: Vec<(ErrorCategory, String)> = Vec::new();

        if let Err(e) = ctx.metric_sink.set_gauge("meraki_organizations_total", &HashMap::new(), orgs.len() as f64) {
            errors.push((e.category(), e.to_string()));
        }

        for org in &orgs {
            let org_id = org.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let name = org.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let mut labels = HashMap::new();
            labels.insert("org_id".to_string(), org_id);
            labels.insert("name".to_string(), name);
            if let Err(e) = ctx.metric_sink.set_info("meraki_organization_info", &labels) {
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
    use std::sync::Arc;
    use std::time::Instant;

    struct StaticApi;

    #[at]
    impl UpstreamApi for StaticApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![json!({"id": "1", "name": "Acme"}), json!({"id": "2", "name": "Globex"})])
        }
        async fn list_networks(&self, _org_id: &str) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn list_devices(&self, _org_id: &str, _filters: &[String]) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn get_json(&self, _path: &str, _query: &[(String, String)]) -> Result<Value, ExporterError> {
            Ok(Value::Null)
        }
    }

    fn ctx(registry: Arc<MetricRegistry>) -> CycleContext<Inventory, MetricSink> {
        let pipeline = Arc::new(ExecutionPipeline::new(5, 3, std::time::Duration::from_secs(5), 20, std::time::Duration::from_millis(0)));
        let inventory = Arc::new(InventoryCache::new(Arc::new(StaticApi), pipeline));
        let sink = MetricSink::new(registry, Tier::Fast);
        CycleContext::new(
            Tier::Fast,
            Instant::now() + std::time::Duration::from_secs(60),
            inventory,
            sink,
            Arc::new(|| false),
        )
    }

    #[tokio::test]
    async fn writes_one_series_per_organization() {
        let registry = Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ));
        let collector = OrganizationCollector::new(Tier::Fast);
        let cycle_ctx = ctx(registry.clone());
        collector.register_metrics(&cycle_ctx.metric_sink).unwrap();

        let outcome = collector.collect(&cycle_ctx).await;
        assert!(matches!(outcome, CollectorOutcome::Ok));

        let text = registry.scrape_text().unwrap();
        assert!(text.contains("meraki_organizations_total 2"));
        assert!(text.contains("org_id=\"1\""));
        assert!(text.contains("org_id=\"2\""));
    }
}
