// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Switch family sub-collector: one `device_status` series per switch.
//! Deliberately the thinnest possible [`FamilyCollector`] — it does no
//! further upstream calls of its own, just turns the device list the
//! coordinator already fetched into label series.

use super::{DeviceRecord, FamilyCollector};
use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{CollectorOutcome, CycleContext, ErrorCategory, ExporterError, LabelSchema, MetricDefinition, MetricKind};
use std::collections::HashMap;

pub struct SwitchFamilyCollector;

#[async_trait]
impl FamilyCollector for SwitchFamilyCollector {
    fn family(&self) -> &'static str {
        "switch"
    }

    fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        sink.registry.register(MetricDefinition::new(
            "meraki_device_status",
            MetricKind::Gauge,
            "Device online status, 1 for online, 0 otherwise",
            LabelSchema::new(["org_id", "network_id", "serial", "model"])?,
        )?)?;
        Ok(())
    }

    async fn collect_family(
        &self,
        ctx: &CycleContext<Inventory, MetricSink>,
        devices: &[DeviceRecord],
    ) -> CollectorOutcome {
        let mut errors: Vec<(ErrorCategory, String)> = Vec::new();

        for device in devices {
            let status = device.raw.get("status").and_then(|v| v.as_str()).unwrap_or_default();
            let value = if status == "online" { 1.0 } else { 0.0 };
            let mut labels = HashMap::new();
            labels.insert("org_id".to_string(), device.org_id.clone());
            labels.insert("network_id".to_string(), device.network_id.clone());
            labels.insert("serial".to_string(), device.serial.clone());
            labels.insert("model".to_string(), device.model.clone());
            if let Err(e) = ctx.metric_sink.set_gauge("meraki_device_status", &labels, value) {
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
    use exporter_domain::{Tier, UpstreamApi};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Instant;

    struct NoopApi;

    #[at]
    impl UpstreamApi for NoopApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
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

    #[tokio::test]
    async fn writes_online_and_offline_status() {
        let registry = Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ));
        let sink = MetricSink::new(registry.clone(), Tier::Medium);
        let collector = SwitchFamilyCollector;
        collector.register_metrics(&sink).unwrap();

        let pipeline = Arc::new(ExecutionPipeline::new(5, 3, std::time::Duration::from_secs(5), 20, std::time::Duration::from_millis(0)));
        let inventory = Arc::new(InventoryCache::new(Arc::new(NoopApi), pipeline));
        let cycle_ctx = CycleContext::new(
            Tier::Medium,
            Instant::now() + std::time::Duration::from_secs(300),
            inventory,
            sink,
            Arc::new(|| false),
        );

        let devices = vec![
            DeviceRecord {
                org_id: "1".into(),
                network_id: "N1".into(),
                serial: "Q1".into(),
                model: "MS120".into(),
                product_type: "switch".into(),
                raw: json!({"status": "online"}),
            },
            DeviceRecord {
                org_id: "1".into(),
                network_id: "N1".into(),
                serial: "Q2".into(),
                model: "MS120".into(),
                product_type: "switch".into(),
                raw: json!({"status": "alerting"}),
            },
        ];

        let outcome = collector.collect_family(&cycle_ctx, &devices).await;
        assert!(matches!(outcome, CollectorOutcome::Ok));
        let text = registry.scrape_text().unwrap();
        assert!(text.contains("serial=\"Q1\""));
        assert!(text.contains("serial=\"Q2\""));
    }
}
