// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Wireless family sub-collector: client count per access point (Gauge) plus
//! a histogram of reported RSSI, a second metric kind next to switch's single
//! Gauge so the catalog shape in tests isn't all one kind.

use super::{DeviceRecord, FamilyCollector};
use crate::infrastructure::engine::collector_registry::{Inventory, MetricSink};
use async_trait::async_trait;
use exporter_domain::{CollectorOutcome, CycleContext, ErrorCategory, ExporterError, LabelSchema, MetricDefinition, MetricKind};
use std::collections::HashMap;

pub struct WirelessFamilyCollector;

#[async_trait]
impl FamilyCollector for WirelessFamilyCollector {
    fn family(&self) -> &'static str {
        "wireless"
    }

    fn register_metrics(&self, sink: &MetricSink) -> Result<(), ExporterError> {
        sink.registry.register(MetricDefinition::new(
            "meraki_ap_client_count",
            MetricKind::Gauge,
            "Connected wireless clients per access point",
            LabelSchema::new(["org_id", "network_id", "serial", "model"])?,
        )?)?;
        sink.registry.register(MetricDefinition::new(
            "meraki_ap_rssi_dbm",
            MetricKind::Histogram,
            "Reported access point RSSI in dBm",
            LabelSchema::new(["org_id", "network_id", "serial"])?,
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
            let client_count = device.raw.get("clientCount").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let mut labels = HashMap::new();
            labels.insert("org_id".to_string(), device.org_id.clone());
            labels.insert("network_id".to_string(), device.network_id.clone());
            labels.insert("serial".to_string(), device.serial.clone());
            labels.insert("model".to_string(), device.model.clone());
            if let Err(e) = ctx.metric_sink.set_gauge("meraki_ap_client_count", &labels, client_count) {
                errors.push((e.category(), e.to_string()));
            }

            if let Some(rssi) = device.raw.get("rssi").and_then(|v| v.as_f64()) {
                let mut rssi_labels = HashMap::new();
                rssi_labels.insert("org_id".to_string(), device.org_id.clone());
                rssi_labels.insert("network_id".to_string(), device.network_id.clone());
                rssi_labels.insert("serial".to_string(), device.serial.clone());
                if let Err(e) = ctx.metric_sink.observe_histogram("meraki_ap_rssi_dbm", &rssi_labels, rssi) {
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
