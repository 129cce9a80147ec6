// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Device Collector — the canonical coordinator (§4.4)
//!
//! `DeviceCollector` is a `Collector` in its own right, registered once with
//! the Collector Registry, but it is not where device metrics are written.
//! It lists devices for every organization once per cycle (through the
//! Inventory Cache, so a family sub-collector never re-fetches the same
//! list), groups them by `productType`, and dispatches each group to the
//! matching [`FamilyCollector`] in registration order — composition, not
//! inheritance, per §9's re-architecture note. The Registry never sees the
//! family sub-collectors directly.

mod switches;
mod wireless;

pub use switches::SwitchFamilyCollector;
pub use wireless::WirelessFamilyCollector;

use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{Collector, CollectorOutcome, CycleContext, ErrorCategory, ExporterError, Tier};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One upstream device record, lightly typed out of the raw JSON payload.
/// Family sub-collectors work from this rather than re-parsing `Value`
/// themselves.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub org_id: String,
    pub network_id: String,
    pub serial: String,
    pub model: String,
    pub product_type: String,
    pub raw: Value,
}

impl DeviceRecord {
    fn from_json(org_id: &str, value: &Value) -> Self {
        Self {
            org_id: org_id.to_string(),
            network_id: value.get("networkId").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            serial: value.get("serial").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            model: value.get("model").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            product_type: value.get("productType").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            raw: value.clone(),
        }
    }
}

/// A specialized handler for one device family (switch, wireless AP, ...).
/// Sub-collectors are an implementation detail of [`DeviceCollector`] — they
/// are never registered with the Collector Registry themselves (§4.2).
#[async_trait]
pub trait FamilyCollector: Send + Sync {
    /// The `productType` value this sub-collector claims, e.g. `"switch"`.
    fn family(&self) -> &'static str;

    fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError>;

    /// Called once per cycle with every device of this family across every
    /// organization, even an empty slice — dispatch order must stay
    /// deterministic regardless of which families actually have devices this
    /// tick (§9).
    async fn collect_family(
        &self,
        ctx: &CycleContext<Inventory, MetricSink>,
        devices: &[DeviceRecord],
    ) -> CollectorOutcome;
}

pub struct DeviceCollector {
    tier: Tier,
    families: Vec<Arc<dyn FamilyCollector>>,
}

impl DeviceCollector {
    pub fn new(tier: Tier, families: Vec<Arc<dyn FamilyCollector>>) -> Self {
        Self { tier, families }
    }

    pub fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        for family in &self.families {
            family.register_metrics(sink)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Collector<Inventory, MetricSink> for DeviceCollector {
    fn name(&self) -> &str {
        "device"
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn collect(&self, ctx: &CycleContext<Inventory, MetricSink>) -> CollectorOutcome {
        let orgs = match ctx.inventory.list_organizations().await {
            Ok(orgs) => orgs,
            Err(e) => return CollectorOutcome::Failed { errors: vec![(e.category(), e.to_string())] },
        };

        let mut errors: Vec<(ErrorCategory, String)> = Vec::new();
        let mut by_family: HashMap<&'static str, Vec<DeviceRecord>> =
            self.families.iter().map(|f| (f.family(), Vec::new())).collect();

        for org in &orgs {
            if ctx.is_cancelled() {
                errors.push((ErrorCategory::Cancellation, "device listing cancelled mid-cycle".to_string()));
                break;
            }
            let org_id = org.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let devices = match ctx.inventory.list_devices(&org_id, &[]).await {
                Ok(devices) => devices,
                Err(e) => {
                    errors.push((e.category(), e.to_string()));
                    continue;
                }
            };

            for device in &devices {
                let record = DeviceRecord::from_json(&org_id, device);
                if let Some(bucket) = by_family.get_mut(record.product_type.as_str()) {
                    bucket.push(record);
                }
                // Families with no registered sub-collector are silently
                // skipped here; the per-family metric catalog (§1) decides
                // what's worth collecting, not this coordinator.
            }
        }

        for family in &self.families {
            if ctx.is_cancelled() {
                errors.push((ErrorCategory::Cancellation, "device dispatch cancelled mid-cycle".to_string()));
                break;
            }
            let devices = by_family.remove(family.family()).unwrap_or_default();
            let outcome = family.collect_family(ctx, &devices).await;
            errors.extend(outcome.errors().iter().cloned());
            if outcome.is_failed() {
                errors.push((
                    ErrorCategory::Validation,
                    format!("family collector '{}' reported failed", family.family()),
                ));
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
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    struct MixedDevicesApi;

    #[at]
    impl UpstreamApi for MixedDevicesApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![json!({"id": "1"})])
        }
        async fn list_networks(&self, _org_id: &str) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn list_devices(&self, _org_id: &str, _filters: &[String]) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![
                json!({"serial": "Q1", "networkId": "N1", "model": "MS120", "productType": "switch"}),
                json!({"serial": "Q2", "networkId": "N1", "model": "MR36", "productType": "wireless"}),
                json!({"serial": "Q3", "networkId": "N1", "model": "MX64", "productType": "appliance"}),
            ])
        }
        async fn get_json(&self, _path: &str, _query: &[(String, String)]) -> Result<Value, ExporterError> {
            Ok(Value::Null)
        }
    }

    struct RecordingFamily {
        family: &'static str,
        seen: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[at]
    impl FamilyCollector for RecordingFamily {
        fn family(&self) -> &'static str {
            self.family
        }
        fn register_metrics(&self, _sink: &MetricSink) -> Result<(), ExporterError> {
            Ok(())
        }
        async fn collect_family(
            &self,
            _ctx: &CycleContext<Inventory, MetricSink>,
            devices: &[DeviceRecord],
        ) -> CollectorOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = devices.iter().map(|d| d.serial.clone()).collect();
            CollectorOutcome::Ok
        }
    }

    #[tokio::test]
    async fn groups_devices_by_product_type_and_dispatches_every_family() {
        let registry = Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ));
        let switch = Arc::new(RecordingFamily { family: "switch", seen: Mutex::new(vec![]), calls: AtomicUsize::new(0) });
        let wireless =
            Arc::new(RecordingFamily { family: "wireless", seen: Mutex::new(vec![]), calls: AtomicUsize::new(0) });
        // No family claims "appliance" on purpose: that family's devices are
        // silently dropped from dispatch, and only switch/wireless run.
        let collector = DeviceCollector::new(Tier::Medium, vec![switch.clone(), wireless.clone()]);

        let pipeline = Arc::new(ExecutionPipeline::new(5, 3, std::time::Duration::from_secs(5), 20, std::time::Duration::from_millis(0)));
        let inventory = Arc::new(InventoryCache::new(Arc::new(MixedDevicesApi), pipeline));
        let sink = MetricSink::new(registry, Tier::Medium);
        let cycle_ctx = CycleContext::new(
            Tier::Medium,
            Instant::now() + std::time::Duration::from_secs(300),
            inventory,
            sink,
            Arc::new(|| false),
        );

        let outcome = collector.collect(&cycle_ctx).await;
        assert!(matches!(outcome, CollectorOutcome::Ok));
        assert_eq!(*switch.seen.lock().unwrap(), vec!["Q1".to_string()]);
        assert_eq!(*wireless.seen.lock().unwrap(), vec!["Q2".to_string()]);
        assert_eq!(switch.calls.load(Ordering::SeqCst), 1);
        assert_eq!(wireless.calls.load(Ordering::SeqCst), 1);
    }
}
