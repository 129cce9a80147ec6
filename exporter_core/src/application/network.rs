// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Network Collector
//!
//! Lists organizations (almost always already cached by
//! [`super::organization::OrganizationCollector`] from the same cycle — the
//! Inventory Cache's single-flight rule means this costs nothing extra), then
//! lists networks per organization, emitting one gauge series per org and one
//! info series per network. A per-item failure (one org's network listing
//! failing) does not stop the others — the collector returns `partial`.

use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{
    Collector, CollectorOutcome, CycleContext, ErrorCategory, ExporterError, LabelSchema, MetricDefinition,
    MetricKind, Tier,
};
use std::collections::HashMap;

pub struct NetworkCollector {
    tier: Tier,
}

impl NetworkCollector {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }

    pub fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        sink.registry.register(MetricDefinition::new(
            "meraki_networks_total",
            MetricKind::Gauge,
            "Number of networks within an organization",
            LabelSchema::new(["org_id"])?,
        )?)?;
        sink.registry.register(MetricDefinition::new(
            "meraki_network_info",
            MetricKind::Info,
            "Static network identity",
            LabelSchema::new(["org_id", "network_id", "name"])?,
        )?)?;
        Ok(())
    }
}

#[async_trait]
impl Collector<Inventory, MetricSink> for NetworkCollector {
    fn name(&self) -> &str {
        "network"
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

        for org in &orgs {
            if ctx.is_cancelled() {
                errors.push((ErrorCategory::Cancellation, "network collector cancelled mid-cycle".to_string()));
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

            let mut org_labels = HashMap::new();
            org_labels.insert("org_id".to_string(), org_id.clone());
            if let Err(e) = ctx.metric_sink.set_gauge("meraki_networks_total", &org_labels, networks.len() as f64) {
                errors.push((e.category(), e.to_string()));
            }

            for network in &networks {
                let network_id = network.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let name = network.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let mut labels = HashMap::new();
                labels.insert("org_id".to_string(), org_id.clone());
                labels.insert("network_id".to_string(), network_id);
                labels.insert("name".to_string(), name);
                if let Err(e) = ctx.metric_sink.set_info("meraki_network_info", &labels) {
                    errors.push((e.category(), e.to_string()));
                }
            }
        }

        if errors.is_empty() {
            CollectorOutcome::Ok
        } else {
            CollectorOutcome::Partial { errors }
        }
    }
}
